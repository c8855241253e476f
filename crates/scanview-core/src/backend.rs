use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AnalyzeOutcome, ChatReply, ChatRequest, ImageUpload, ScanRecord};

/// The analysis service as seen from the session controllers.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /analyze`. A backend-reported `error` field is an
    /// `AnalyzeOutcome::Rejected`, not an `Err`.
    async fn analyze(
        &self,
        upload: &ImageUpload,
        patient_name: Option<&str>,
    ) -> Result<AnalyzeOutcome>;

    /// `GET /recent-scans`
    async fn recent_scans(&self) -> Result<Vec<ScanRecord>>;

    /// Where the thumbnail for an uploaded file is served.
    fn thumbnail_url(&self, filename: &str) -> String;
}
