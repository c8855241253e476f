use scanview_core::types::{Message, Sender};
use scanview_core::{Effect, ScanEntry};
use std::io::Write;
use std::path::PathBuf;

const RULE: &str = "────────────────────────────────────────────────────────";

/// Draws session effects on a terminal.
pub struct Renderer<W: Write> {
    out: W,
    download_dir: PathBuf,
}

impl Renderer<std::io::Stdout> {
    pub fn stdout(download_dir: PathBuf) -> Self {
        Self::new(std::io::stdout(), download_dir)
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, download_dir: PathBuf) -> Self {
        Self { out, download_dir }
    }

    pub fn apply(&mut self, effects: Vec<Effect>) -> anyhow::Result<()> {
        for effect in effects {
            match effect {
                Effect::AppendMessage(message) => self.message(&message)?,
                // The terminal follows its own output.
                Effect::ScrollMessagesToBottom => {}
                Effect::SetStatus(status) => {
                    writeln!(self.out, "\x1b[0;36m» {}\x1b[0m", status)?;
                }
                Effect::ShowReport(text) => {
                    writeln!(self.out, "{}\n{}\n{}", RULE, text, RULE)?;
                }
                Effect::RenderRecentScans(entries) => self.scans(&entries)?,
                Effect::SaveFile(download) => {
                    let path = download.save_in(&self.download_dir)?;
                    writeln!(self.out, "Saved report to {}", path.display())?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn message(&mut self, message: &Message) -> std::io::Result<()> {
        let (color, who) = match message.sender {
            Sender::User => ("1;32", "you"),
            Sender::Assistant => ("1;33", "assistant"),
        };
        writeln!(
            self.out,
            "\x1b[{}m{}\x1b[0m \x1b[2m{}\x1b[0m: {}",
            color,
            who,
            message.display_time(),
            message.content.replace('\n', "\n    ")
        )
    }

    fn scans(&mut self, entries: &[ScanEntry]) -> std::io::Result<()> {
        writeln!(self.out, "\x1b[1mRecent Scans\x1b[0m")?;
        if entries.is_empty() {
            writeln!(self.out, "  No scans yet.")?;
        }
        for (i, entry) in entries.iter().enumerate() {
            writeln!(
                self.out,
                "  [{}] {} · {} · {}\n      {}",
                i + 1,
                entry.patient_name,
                entry.summary,
                entry.timestamp,
                entry.thumbnail_url
            )?;
        }
        Ok(())
    }
}
