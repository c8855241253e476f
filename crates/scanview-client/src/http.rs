use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use scanview_core::config::BackendConfig;
use scanview_core::error::{Result, ScanError};
use scanview_core::types::{
    AnalyzeOutcome, AnalyzeResponse, ChatReply, ChatRequest, ImageUpload, ScanRecord,
};
use scanview_core::Backend;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// The analysis service over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ScanError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Read the whole body and decode it as JSON, whatever the status.
    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<(StatusCode, T)> {
        let status = response.status();
        let body = response.bytes().await?;
        let value = serde_json::from_slice(&body).map_err(|e| {
            ScanError::decode(endpoint, format!("HTTP {}: {}", status.as_u16(), e))
        })?;
        Ok((status, value))
    }

    fn require_success(endpoint: &str, status: StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ScanError::Backend(format!(
                "{} answered HTTP {}",
                endpoint,
                status.as_u16()
            )))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint("chat")?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(request).send().await?;
        let (status, reply) = Self::read_json::<ChatReply>("/chat", response).await?;
        Self::require_success("/chat", status)?;
        Ok(reply)
    }

    async fn analyze(
        &self,
        upload: &ImageUpload,
        patient_name: Option<&str>,
    ) -> Result<AnalyzeOutcome> {
        let url = self.endpoint("analyze")?;
        debug!("POST {} ({} bytes)", url, upload.bytes.len());

        let image = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let mut form = Form::new().part("image", image);
        if let Some(name) = patient_name {
            form = form.text("patient_name", name.to_string());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        // `{error}` bodies arrive with 4xx/5xx statuses and are still answers.
        let (status, body) = Self::read_json::<AnalyzeResponse>("/analyze", response).await?;
        debug!("/analyze answered HTTP {}", status.as_u16());
        body.into_outcome()
    }

    async fn recent_scans(&self) -> Result<Vec<ScanRecord>> {
        let url = self.endpoint("recent-scans")?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        Self::require_success("/recent-scans", status)?;
        let (_, scans) = Self::read_json("/recent-scans", response).await?;
        Ok(scans)
    }

    fn thumbnail_url(&self, filename: &str) -> String {
        let mut url = self.base_url.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push("uploads").push(filename);
            }
            Err(()) => return format!("{}uploads/{}", self.base_url, filename),
        }
        url.to_string()
    }
}
