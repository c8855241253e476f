use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Result, ScanError};

/// A single entry in the chat message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    /// Wall-clock display time, e.g. `14:03:27`.
    pub fn display_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

/// A prior analysis as persisted by the backend. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub filename: String,
    #[serde(default)]
    pub patient_name: String,
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub timestamp: String,
    /// Records created by the legacy upload endpoint carry no report.
    #[serde(default)]
    pub report: String,
}

/// The report currently shown in the report pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReport {
    pub text: String,
    pub patient_name: String,
}

/// An image read from disk, ready to be sent as a multipart part.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read an image file once. The file name sent to the backend is the
    /// final path component.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ScanError::Config(format!("Not a file path: {}", path.display()))
            })?;
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "scanType")]
    pub scan_type: Option<String>,
}

/// Reply from `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A completed classification of one uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub label: String,
    pub confidence: f64,
    pub report: Option<String>,
    pub filename: Option<String>,
}

/// What `/analyze` said about an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    Completed(Analysis),
    /// The backend answered with an `error` field (or `success: false`).
    Rejected(String),
}

/// Every shape `/analyze` has been seen to answer with, decoded into one
/// schema: `{prediction, confidence}`, `{success, report, predicted_class,
/// confidence, filename}`, or `{error}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub prediction: Option<String>,
    /// Report-flow spelling of `prediction`; preferred when both are sent.
    #[serde(default)]
    pub predicted_class: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalyzeResponse {
    pub fn into_outcome(self) -> Result<AnalyzeOutcome> {
        if let Some(error) = self.error {
            return Ok(AnalyzeOutcome::Rejected(error));
        }
        if self.success == Some(false) {
            return Ok(AnalyzeOutcome::Rejected("analysis failed".into()));
        }
        match (self.predicted_class.or(self.prediction), self.confidence) {
            (Some(label), Some(confidence)) => Ok(AnalyzeOutcome::Completed(Analysis {
                label,
                confidence,
                report: self.report,
                filename: self.filename,
            })),
            _ => Err(ScanError::decode(
                "/analyze",
                "response has neither an error nor a prediction with confidence",
            )),
        }
    }
}
