use tracing::{debug, error};

use crate::backend::Backend;
use crate::effect::Effect;
use crate::format::percent_precise;
use crate::types::{AnalyzeOutcome, ChatRequest, ImageUpload, Message};

const CHAT_FAILURE: &str = "Sorry, there was an error processing your request.";
const ANALYZE_FAILURE: &str = "Error analyzing the image. Please try again.";

/// State of the chat flow: the message list and the scan-type context sent
/// with each message. One per front-end.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    scan_type: Option<String>,
}

impl ChatSession {
    pub fn new(scan_type: Option<String>) -> Self {
        Self {
            messages: Vec::new(),
            scan_type,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn scan_type(&self) -> Option<&str> {
        self.scan_type.as_deref()
    }

    /// Set or clear the imaging modality. Blank strings clear it.
    pub fn set_scan_type(&mut self, scan_type: Option<String>) {
        self.scan_type = scan_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    /// Send a line of text. Blank input is dropped without a request.
    pub async fn submit_text(&mut self, backend: &dyn Backend, message: &str) -> Vec<Effect> {
        let message = message.trim();
        if message.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.append(Message::user(message), &mut effects);

        let request = ChatRequest {
            message: message.to_string(),
            scan_type: self.scan_type.clone(),
        };
        let reply = match backend.chat(&request).await {
            Ok(reply) => reply.response,
            Err(e) => {
                error!("Chat request failed: {}", e);
                CHAT_FAILURE.to_string()
            }
        };
        self.append(Message::assistant(reply), &mut effects);
        effects
    }

    /// Upload an image for classification and post the result.
    pub async fn submit_image(
        &mut self,
        backend: &dyn Backend,
        upload: &ImageUpload,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.append(
            Message::user(format!("Uploading scan image: {}", upload.file_name)),
            &mut effects,
        );

        let reply = match backend.analyze(upload, None).await {
            Ok(AnalyzeOutcome::Completed(analysis)) => {
                debug!(
                    "Chat upload {} classified as {}",
                    upload.file_name, analysis.label
                );
                format!(
                    "Analysis Results:\n• Prediction: {}\n• Confidence: {}",
                    analysis.label,
                    percent_precise(analysis.confidence)
                )
            }
            Ok(AnalyzeOutcome::Rejected(reason)) => format!("Error: {}", reason),
            Err(e) => {
                error!("Image analysis failed for {}: {}", upload.file_name, e);
                ANALYZE_FAILURE.to_string()
            }
        };
        self.append(Message::assistant(reply), &mut effects);
        effects
    }

    fn append(&mut self, message: Message, effects: &mut Vec<Effect>) {
        self.messages.push(message.clone());
        effects.push(Effect::AppendMessage(message));
        effects.push(Effect::ScrollMessagesToBottom);
    }
}
