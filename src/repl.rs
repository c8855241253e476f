use anyhow::Result;
use chrono::Utc;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use scanview_core::config::AppConfig;
use scanview_core::types::ImageUpload;
use scanview_core::{Backend, ChatSession, ReportSession};
use std::path::{Path, PathBuf};

use crate::render::Renderer;

const CHAT_HELP: &str = "  <text>              — Send a message
  /upload <path>      — Upload a scan image for analysis
  /scan-type [type]   — Set (or clear) the scan-type context
  /help               — Show this help
  /exit               — Quit";

const REPORT_HELP: &str = "  /patient <name>     — Set the patient name
  /analyze <path>     — Analyze a scan image and show its report
  /scans              — Refresh the recent scans list
  /open <n>           — Show the report of recent scan n
  /download           — Save the current report as a text file
  /help               — Show this help
  /exit               — Quit";

/// What a slash command asks the loop to do.
enum Flow {
    Continue,
    Exit,
}

fn editor(history_path: &Path) -> Result<DefaultEditor> {
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(history_path);
    Ok(rl)
}

fn save_history(rl: &mut DefaultEditor, history_path: &Path) -> Result<()> {
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(history_path);
    Ok(())
}

fn split_command(input: &str) -> (&str, &str) {
    match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    }
}

fn print_error(message: impl std::fmt::Display) {
    eprintln!("\x1b[0;31m{}\x1b[0m", message);
}

/// Read a line; `None` ends the loop.
fn read_line(rl: &mut DefaultEditor, prompt: &str) -> Option<String> {
    loop {
        match rl.readline(prompt) {
            Ok(line) => return Some(line),
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                return None;
            }
            Err(e) => {
                print_error(format!("Input error: {}", e));
                return None;
            }
        }
    }
}

/// Run the interactive chat.
pub async fn run_chat(config: &AppConfig, backend: &dyn Backend) -> Result<()> {
    println!("\n  scanview chat  |  backend: {}\n", config.backend.base_url);
    println!("{}\n", CHAT_HELP);

    let mut session = ChatSession::new(config.chat.scan_type.clone());
    let mut renderer = Renderer::stdout(config.report.resolved_download_dir());
    let history_path = AppConfig::data_dir().join("chat_history.txt");
    let mut rl = editor(&history_path)?;

    loop {
        let prompt = match session.scan_type() {
            Some(scan_type) => format!("\x1b[1;36mchat:{}\x1b[0m \x1b[1;32m❯\x1b[0m ", scan_type),
            None => "\x1b[1;36mchat\x1b[0m \x1b[1;32m❯\x1b[0m ".to_string(),
        };
        let Some(line) = read_line(&mut rl, &prompt) else {
            break;
        };
        let input = line.trim();

        if !input.starts_with('/') {
            let effects = session.submit_text(backend, input).await;
            renderer.apply(effects)?;
            continue;
        }

        let (cmd, arg) = split_command(input);
        match cmd {
            "/exit" | "/quit" | "/q" => {
                println!("Goodbye!");
                break;
            }
            "/upload" => {
                if arg.is_empty() {
                    println!("Usage: /upload <path>");
                    continue;
                }
                match ImageUpload::from_path(Path::new(arg)).await {
                    Ok(upload) => {
                        let effects = session.submit_image(backend, &upload).await;
                        renderer.apply(effects)?;
                    }
                    Err(e) => print_error(format!("Cannot read {}: {}", arg, e)),
                }
            }
            "/scan-type" => {
                session.set_scan_type(Some(arg.to_string()));
                match session.scan_type() {
                    Some(scan_type) => println!("Scan type set to {}", scan_type),
                    None => println!("Scan type cleared"),
                }
            }
            "/help" | "/?" => println!("{}", CHAT_HELP),
            _ => println!("Unknown command: {}. Type /help for available commands.", cmd),
        }
    }

    save_history(&mut rl, &history_path)
}

/// Run the interactive report browser.
pub async fn run_report(config: &AppConfig, backend: &dyn Backend) -> Result<()> {
    println!("\n  scanview reports  |  backend: {}\n", config.backend.base_url);
    println!("{}\n", REPORT_HELP);

    let mut session = ReportSession::new(config.report.default_patient_name.clone());
    let mut renderer = Renderer::stdout(config.report.resolved_download_dir());
    let history_path = AppConfig::data_dir().join("report_history.txt");
    let mut rl = editor(&history_path)?;

    renderer.apply(session.fetch_recent_scans(backend).await)?;

    loop {
        let prompt = match session.patient_name() {
            "" => "\x1b[1;36mreport\x1b[0m \x1b[1;32m❯\x1b[0m ".to_string(),
            name => format!("\x1b[1;36mreport:{}\x1b[0m \x1b[1;32m❯\x1b[0m ", name),
        };
        let Some(line) = read_line(&mut rl, &prompt) else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match handle_report_command(input, &mut session, backend, &mut renderer).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => print_error(e),
        }
    }

    save_history(&mut rl, &history_path)
}

async fn handle_report_command<W: std::io::Write>(
    input: &str,
    session: &mut ReportSession,
    backend: &dyn Backend,
    renderer: &mut Renderer<W>,
) -> Result<Flow> {
    let (cmd, arg) = split_command(input);
    match cmd {
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            return Ok(Flow::Exit);
        }
        "/patient" => {
            session.set_patient_name(arg);
            println!("Patient name: {}", display_patient(session.patient_name()));
        }
        "/analyze" => {
            if arg.is_empty() {
                println!("Usage: /analyze <path>");
                return Ok(Flow::Continue);
            }
            let upload = ImageUpload::from_path(&PathBuf::from(arg)).await?;
            let patient = session.patient_name().to_string();
            let effects = session.analyze(backend, &upload, &patient).await;
            renderer.apply(effects)?;
        }
        "/scans" => {
            let effects = session.fetch_recent_scans(backend).await;
            if effects.is_empty() {
                println!("Recent scans unavailable; showing the last list fetched.");
            }
            renderer.apply(effects)?;
        }
        "/open" => {
            let n: usize = arg
                .parse()
                .map_err(|_| anyhow::anyhow!("Usage: /open <n> (n from the scan list)"))?;
            let effects = n
                .checked_sub(1)
                .and_then(|i| session.select_scan(i).ok())
                .ok_or_else(|| anyhow::anyhow!("No scan numbered {}", n))?;
            renderer.apply(effects)?;
        }
        "/download" => {
            renderer.apply(session.download_report(Utc::now()))?;
        }
        "/help" | "/?" => println!("{}", REPORT_HELP),
        _ => println!("Unknown command: {}. Type /help for available commands.", cmd),
    }
    Ok(Flow::Continue)
}

fn display_patient(name: &str) -> &str {
    if name.is_empty() {
        "(unset)"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scanview_core::error::{Result as ScanResult, ScanError};
    use scanview_core::types::{AnalyzeOutcome, ChatReply, ChatRequest, ScanRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed scan list; everything else is unreachable.
    struct FixedScans {
        scans: Vec<ScanRecord>,
        calls: AtomicUsize,
    }

    impl FixedScans {
        fn new(reports: &[(&str, &str)]) -> Self {
            let scans = reports
                .iter()
                .map(|(patient, report)| ScanRecord {
                    filename: format!("{}.png", patient.to_lowercase()),
                    patient_name: patient.to_string(),
                    prediction: "glioma".into(),
                    confidence: 0.9,
                    timestamp: "2024-05-01 09:30:00".into(),
                    report: report.to_string(),
                })
                .collect();
            Self {
                scans,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for FixedScans {
        async fn chat(&self, _request: &ChatRequest) -> ScanResult<ChatReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ScanError::Backend("unreachable".into()))
        }

        async fn analyze(
            &self,
            _upload: &ImageUpload,
            _patient_name: Option<&str>,
        ) -> ScanResult<AnalyzeOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ScanError::Backend("unreachable".into()))
        }

        async fn recent_scans(&self) -> ScanResult<Vec<ScanRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scans.clone())
        }

        fn thumbnail_url(&self, filename: &str) -> String {
            format!("http://backend.test/uploads/{}", filename)
        }
    }

    /// Run one command line and return what it printed through the renderer.
    async fn run(
        input: &str,
        session: &mut ReportSession,
        backend: &FixedScans,
        download_dir: &Path,
    ) -> (Result<Flow>, String) {
        let mut buf = Vec::new();
        let flow = {
            let mut renderer = Renderer::new(&mut buf, download_dir.to_path_buf());
            handle_report_command(input, session, backend, &mut renderer).await
        };
        (flow, String::from_utf8(buf).unwrap())
    }

    async fn listed(backend: &FixedScans, dir: &Path) -> ReportSession {
        let mut session = ReportSession::default();
        let (flow, out) = run("/scans", &mut session, backend, dir).await;
        assert!(matches!(flow, Ok(Flow::Continue)));
        assert!(out.contains("[2] Bob"), "got: {out}");
        session
    }

    async fn listed_single(backend: &FixedScans, dir: &Path) -> ReportSession {
        let mut session = ReportSession::default();
        run("/scans", &mut session, backend, dir).await.0.unwrap();
        assert_eq!(session.scans().len(), 1);
        session
    }

    #[tokio::test]
    async fn test_open_is_one_based_and_offline() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = FixedScans::new(&[("Ann", "R0"), ("Bob", "R1")]);
        let mut session = listed(&backend, tmp.path()).await;
        let calls = backend.calls();

        let (flow, out) = run("/open 2", &mut session, &backend, tmp.path()).await;

        assert!(matches!(flow, Ok(Flow::Continue)));
        assert!(out.contains("R1"), "got: {out}");
        assert!(!out.contains("R0"), "got: {out}");
        assert_eq!(session.active_report().unwrap().patient_name, "Bob");
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn test_open_rejects_zero_out_of_range_and_non_numbers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = FixedScans::new(&[("Ann", "R0"), ("Bob", "R1")]);
        let mut session = listed(&backend, tmp.path()).await;

        for (input, expected) in [
            ("/open 0", "No scan numbered 0"),
            ("/open 3", "No scan numbered 3"),
            ("/open two", "Usage: /open"),
            ("/open", "Usage: /open"),
        ] {
            let (flow, _) = run(input, &mut session, &backend, tmp.path()).await;
            let err = flow.err().unwrap_or_else(|| panic!("{input} should fail"));
            assert!(err.to_string().contains(expected), "{input}: {err}");
        }
        assert!(session.active_report().is_none());
    }

    #[tokio::test]
    async fn test_download_after_open_saves_record_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = FixedScans::new(&[("Ann Lee", "R0")]);
        let mut session = listed_single(&backend, tmp.path()).await;

        run("/open 1", &mut session, &backend, tmp.path()).await.0.unwrap();
        let (flow, out) = run("/download", &mut session, &backend, tmp.path()).await;

        assert!(matches!(flow, Ok(Flow::Continue)));
        assert!(out.contains("Saved report to"), "got: {out}");
        let saved: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Ann_Lee_Brain_Scan_Report_"), "got: {name}");
        assert_eq!(std::fs::read_to_string(&saved[0]).unwrap(), "R0");
    }

    #[tokio::test]
    async fn test_analyze_failure_reaches_status_line() {
        let tmp = tempfile::TempDir::new().unwrap();
        let image = tmp.path().join("brain.png");
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
        let backend = FixedScans::new(&[]);
        let mut session = ReportSession::default();

        run("/patient Jane Doe", &mut session, &backend, tmp.path()).await.0.unwrap();
        let input = format!("/analyze {}", image.display());
        let (flow, out) = run(&input, &mut session, &backend, tmp.path()).await;

        assert!(matches!(flow, Ok(Flow::Continue)));
        assert_eq!(session.patient_name(), "Jane Doe");
        assert!(out.contains("Error uploading and analyzing image"), "got: {out}");
    }

    #[tokio::test]
    async fn test_exit_ends_loop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = FixedScans::new(&[]);
        let mut session = ReportSession::default();

        let (flow, _) = run("/exit", &mut session, &backend, tmp.path()).await;
        assert!(matches!(flow, Ok(Flow::Exit)));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("/open 3"), ("/open", "3"));
        assert_eq!(split_command("/upload  my scan.png "), ("/upload", "my scan.png"));
        assert_eq!(split_command("/download"), ("/download", ""));
    }
}
