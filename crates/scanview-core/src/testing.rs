//! In-memory `Backend` used by the controller tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::backend::Backend;
use crate::error::{Result, ScanError};
use crate::types::{AnalyzeOutcome, ChatReply, ChatRequest, ImageUpload, ScanRecord};

#[derive(Default)]
pub struct FakeBackend {
    chat_reply: Mutex<Option<String>>,
    analyze_outcome: Mutex<Option<AnalyzeOutcome>>,
    scans: Mutex<Option<Vec<ScanRecord>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub analyze_patients: Mutex<Vec<Option<String>>>,
    pub chat_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
    pub scan_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat_reply(self, reply: &str) -> Self {
        *self.chat_reply.lock().unwrap() = Some(reply.to_string());
        self
    }

    pub fn with_analyze(self, outcome: AnalyzeOutcome) -> Self {
        *self.analyze_outcome.lock().unwrap() = Some(outcome);
        self
    }

    pub fn with_scans(self, scans: Vec<ScanRecord>) -> Self {
        self.set_scans(Some(scans));
        self
    }

    /// `None` makes `/recent-scans` fail.
    pub fn set_scans(&self, scans: Option<Vec<ScanRecord>>) {
        *self.scans.lock().unwrap() = scans;
    }

    pub fn total_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
            + self.analyze_calls.load(Ordering::SeqCst)
            + self.scan_calls.load(Ordering::SeqCst)
    }
}

fn unreachable_backend() -> ScanError {
    ScanError::Other(anyhow::anyhow!("connection refused"))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chat_requests.lock().unwrap().push(request.clone());
        match self.chat_reply.lock().unwrap().clone() {
            Some(response) => Ok(ChatReply {
                response,
                timestamp: None,
            }),
            None => Err(unreachable_backend()),
        }
    }

    async fn analyze(
        &self,
        _upload: &ImageUpload,
        patient_name: Option<&str>,
    ) -> Result<AnalyzeOutcome> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analyze_patients
            .lock()
            .unwrap()
            .push(patient_name.map(str::to_string));
        self.analyze_outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(unreachable_backend)
    }

    async fn recent_scans(&self) -> Result<Vec<ScanRecord>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.scans
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(unreachable_backend)
    }

    fn thumbnail_url(&self, filename: &str) -> String {
        format!("http://backend.test/uploads/{}", filename)
    }
}

pub fn record(patient: &str, prediction: &str, confidence: f64, report: &str) -> ScanRecord {
    ScanRecord {
        filename: format!("{}.png", patient.to_lowercase().replace(' ', "_")),
        patient_name: patient.to_string(),
        prediction: prediction.to_string(),
        confidence,
        timestamp: "2024-05-01 09:30:00".to_string(),
        report: report.to_string(),
    }
}

pub fn upload() -> ImageUpload {
    ImageUpload::new("brain.png", vec![0x89, b'P', b'N', b'G'])
}
