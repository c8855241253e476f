//! The image-to-report flow and the recent-scan browser.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::effect::{Download, Effect, ScanEntry};
use crate::error::{Result, ScanError};
use crate::format::{mask_patient, percent_rounded};
use crate::types::{ActiveReport, AnalyzeOutcome, ImageUpload, ScanRecord};

pub const DEFAULT_PATIENT_NAME: &str = "Unknown Patient";
const UPLOAD_FAILURE: &str = "Error uploading and analyzing image";

/// Where the report flow is.
///
/// `Idle -> Uploading -> (ReportShown | ErrorShown)`. Starting another upload
/// leaves whichever terminal phase was reached; opening a past scan goes
/// straight to `ReportShown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Idle,
    Uploading,
    ReportShown,
    ErrorShown,
}

#[derive(Debug)]
pub struct ReportSession {
    default_patient_name: String,
    patient_name: String,
    phase: ReportPhase,
    active: Option<ActiveReport>,
    scans: Vec<ScanRecord>,
}

impl Default for ReportSession {
    fn default() -> Self {
        Self::new(DEFAULT_PATIENT_NAME)
    }
}

impl ReportSession {
    pub fn new(default_patient_name: impl Into<String>) -> Self {
        Self {
            default_patient_name: default_patient_name.into(),
            patient_name: String::new(),
            phase: ReportPhase::Idle,
            active: None,
            scans: Vec::new(),
        }
    }

    pub fn phase(&self) -> ReportPhase {
        self.phase
    }

    pub fn active_report(&self) -> Option<&ActiveReport> {
        self.active.as_ref()
    }

    /// Snapshot from the last successful `fetch_recent_scans`.
    pub fn scans(&self) -> &[ScanRecord] {
        &self.scans
    }

    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    /// The patient-name field. Used by `display_report` and the next
    /// `analyze` that is given no name of its own.
    pub fn set_patient_name(&mut self, name: impl Into<String>) {
        self.patient_name = name.into().trim().to_string();
    }

    /// Upload an image with a patient name and show the generated report.
    pub async fn analyze(
        &mut self,
        backend: &dyn Backend,
        upload: &ImageUpload,
        patient_name: &str,
    ) -> Vec<Effect> {
        let patient = match patient_name.trim() {
            "" => self.default_patient_name.clone(),
            name => name.to_string(),
        };
        self.patient_name = patient.clone();
        self.phase = ReportPhase::Uploading;

        let mut effects = vec![Effect::SetStatus(format!(
            "Analyzing {}...",
            upload.file_name
        ))];
        info!(
            "Analyzing {} for patient {}",
            upload.file_name,
            mask_patient(&patient)
        );

        match backend.analyze(upload, Some(&patient)).await {
            Ok(AnalyzeOutcome::Completed(analysis)) => match analysis.report {
                Some(report) => {
                    effects.extend(self.display_report(&report));
                    effects.push(Effect::SetStatus(format!(
                        "Analysis complete: {} ({}% confidence)",
                        analysis.label,
                        percent_rounded(analysis.confidence)
                    )));
                    effects.extend(self.fetch_recent_scans(backend).await);
                }
                None => effects.push(self.fail("analysis returned no report")),
            },
            Ok(AnalyzeOutcome::Rejected(reason)) => effects.push(self.fail(&reason)),
            Err(e) => {
                error!("Upload of {} failed: {}", upload.file_name, e);
                self.phase = ReportPhase::ErrorShown;
                effects.push(Effect::SetStatus(UPLOAD_FAILURE.to_string()));
            }
        }
        effects
    }

    fn fail(&mut self, reason: &str) -> Effect {
        self.phase = ReportPhase::ErrorShown;
        Effect::SetStatus(format!("Error: {}", reason))
    }

    /// Replace the report pane with `text` for the current patient-name field.
    pub fn display_report(&mut self, text: &str) -> Vec<Effect> {
        let patient_name = self.patient_name.clone();
        self.show(text, patient_name)
    }

    fn show(&mut self, text: &str, patient_name: String) -> Vec<Effect> {
        self.active = Some(ActiveReport {
            text: text.to_string(),
            patient_name,
        });
        self.phase = ReportPhase::ReportShown;
        vec![Effect::ShowReport(text.to_string())]
    }

    /// Build the export of the active report.
    pub fn report_download(&self, now: DateTime<Utc>) -> Result<Download> {
        let active = self.active.as_ref().ok_or(ScanError::NoActiveReport)?;
        Ok(Download {
            filename: report_filename(&active.patient_name, now),
            mime: "text/plain",
            contents: active.text.clone(),
        })
    }

    /// Offer the active report as a text file, or say there is none.
    pub fn download_report(&self, now: DateTime<Utc>) -> Vec<Effect> {
        match self.report_download(now) {
            Ok(download) => vec![Effect::SaveFile(download)],
            Err(e) => vec![Effect::SetStatus(e.to_string())],
        }
    }

    /// Replace the recent-scan snapshot. Failures are logged and leave the
    /// previous list in place.
    pub async fn fetch_recent_scans(&mut self, backend: &dyn Backend) -> Vec<Effect> {
        match backend.recent_scans().await {
            Ok(records) => {
                debug!("Fetched {} recent scans", records.len());
                self.scans = records;
                let entries = self
                    .scans
                    .iter()
                    .map(|scan| ScanEntry {
                        patient_name: scan.patient_name.clone(),
                        summary: format!(
                            "{} ({}%)",
                            scan.prediction,
                            percent_rounded(scan.confidence)
                        ),
                        timestamp: scan.timestamp.clone(),
                        thumbnail_url: backend.thumbnail_url(&scan.filename),
                    })
                    .collect();
                vec![Effect::RenderRecentScans(entries)]
            }
            Err(e) => {
                error!("Error fetching recent scans: {}", e);
                Vec::new()
            }
        }
    }

    /// Open the stored report of the scan at `index` in the current list.
    /// No request is made.
    pub fn select_scan(&mut self, index: usize) -> Result<Vec<Effect>> {
        let scan = self.scans.get(index).ok_or(ScanError::UnknownScan(index))?;
        let report = scan.report.clone();
        let patient_name = scan.patient_name.clone();
        Ok(self.show(&report, patient_name))
    }
}

/// `<patient>_Brain_Scan_Report_<timestamp>.txt`, with whitespace and path
/// separators in the name turned into `_` and the timestamp's `:` and `.`
/// turned into `-`.
pub fn report_filename(patient_name: &str, now: DateTime<Utc>) -> String {
    let patient: String = patient_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();
    let patient = if patient.is_empty() {
        "Unknown_Patient".to_string()
    } else {
        patient
    };
    let timestamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_Brain_Scan_Report_{}.txt", patient, timestamp)
}
