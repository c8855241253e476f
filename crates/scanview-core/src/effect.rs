use crate::types::Message;
use std::path::{Path, PathBuf};

/// A view change requested by a session command. The front-end decides how
/// each one is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append to the chat message list.
    AppendMessage(Message),
    /// Keep the newest chat message in view.
    ScrollMessagesToBottom,
    /// Replace the report flow's one-line status.
    SetStatus(String),
    /// Replace the report pane content and bring it into view.
    ShowReport(String),
    /// Redraw the recent-scan list from scratch.
    RenderRecentScans(Vec<ScanEntry>),
    /// Offer a file to the user.
    SaveFile(Download),
}

/// One row of the recent-scan list. Position in the list is the handle used
/// to open the entry's report.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub patient_name: String,
    /// `<prediction> (<rounded>%)`
    pub summary: String,
    pub timestamp: String,
    pub thumbnail_url: String,
}

/// A text file produced on the client side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime: &'static str,
    pub contents: String,
}

impl Download {
    /// Write the file into `dir`, consuming the buffer.
    pub fn save_in(self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, self.contents)?;
        tracing::debug!("Saved {} ({})", path.display(), self.mime);
        Ok(path)
    }
}
