pub mod backend;
pub mod chat;
pub mod config;
pub mod effect;
pub mod error;
pub mod format;
pub mod report;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use chat::ChatSession;
pub use config::AppConfig;
pub use effect::{Download, Effect, ScanEntry};
pub use error::ScanError;
pub use report::{ReportPhase, ReportSession};
