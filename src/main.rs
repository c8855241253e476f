mod render;
mod repl;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scanview_client::HttpBackend;
use scanview_core::config::AppConfig;
use scanview_core::types::ImageUpload;
use scanview_core::{ReportPhase, ReportSession};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::render::Renderer;

#[derive(Parser)]
#[command(
    name = "scanview",
    about = "Terminal client for a scan analysis service: chat, reports, recent scans",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/scanview/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Scan-type context for chat messages (e.g. MRI)
    #[arg(long, global = true)]
    scan_type: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat (default)
    Chat,

    /// Browse recent scans and analyze images into reports
    Report,

    /// Analyze one image and print its report
    Analyze {
        /// Scan image (png or jpeg)
        image: PathBuf,
        /// Patient name recorded with the scan
        #[arg(short, long)]
        patient: Option<String>,
        /// Also save the report to the download directory
        #[arg(long)]
        download: bool,
    },

    /// List recent scans
    Scans {
        /// Print the stored report of scan n (1-based)
        #[arg(long)]
        open: Option<usize>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "scanview=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(url) = &cli.backend_url {
        config.backend.base_url = url.clone();
    }
    if let Some(scan_type) = &cli.scan_type {
        config.chat.scan_type = Some(scan_type.clone());
    }

    let command = match cli.command {
        Some(Commands::Config { action }) => return handle_config_command(action, &config),
        other => other,
    };

    let backend = HttpBackend::new(&config.backend)?;
    tracing::debug!("Using backend {}", backend.base_url());

    match command {
        Some(Commands::Report) => repl::run_report(&config, &backend).await?,
        Some(Commands::Analyze {
            image,
            patient,
            download,
        }) => analyze_once(&config, &backend, image, patient, download).await?,
        Some(Commands::Scans { open }) => list_scans(&config, &backend, open).await?,
        Some(Commands::Chat) | Some(Commands::Config { .. }) | None => {
            repl::run_chat(&config, &backend).await?
        }
    }

    Ok(())
}

async fn analyze_once(
    config: &AppConfig,
    backend: &HttpBackend,
    image: PathBuf,
    patient: Option<String>,
    download: bool,
) -> Result<()> {
    let upload = ImageUpload::from_path(&image).await?;
    let mut session = ReportSession::new(config.report.default_patient_name.clone());
    let mut renderer = Renderer::stdout(config.report.resolved_download_dir());

    let effects = session
        .analyze(backend, &upload, patient.as_deref().unwrap_or(""))
        .await;
    renderer.apply(effects)?;

    if session.phase() != ReportPhase::ReportShown {
        bail!("analysis of {} failed", image.display());
    }
    if download {
        renderer.apply(session.download_report(Utc::now()))?;
    }
    Ok(())
}

async fn list_scans(config: &AppConfig, backend: &HttpBackend, open: Option<usize>) -> Result<()> {
    let mut session = ReportSession::new(config.report.default_patient_name.clone());
    let mut renderer = Renderer::stdout(config.report.resolved_download_dir());

    let effects = session.fetch_recent_scans(backend).await;
    if effects.is_empty() {
        bail!("could not fetch recent scans from {}", config.backend.base_url);
    }
    renderer.apply(effects)?;

    if let Some(n) = open {
        let effects = n
            .checked_sub(1)
            .and_then(|i| session.select_scan(i).ok())
            .ok_or_else(|| anyhow::anyhow!("No scan numbered {}", n))?;
        renderer.apply(effects)?;
    }
    Ok(())
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
