//! examdesk - session, exam progress and site settings from the command line
//!
//! Main entry point for the examdesk CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{attempts, auth, config, courses, exam_url, settings, slug};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// examdesk - session, exam progress and site settings from the command line
#[derive(Parser)]
#[command(name = "examdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend API URL (overrides [server] url)
    #[arg(long, global = true, env = "EXAMDESK_SERVER_URL")]
    pub server: Option<String>,

    /// Directory for persisted state (overrides [storage] dir)
    #[arg(long, global = true, env = "EXAMDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in, log out, and check the session
    Auth(auth::AuthArgs),

    /// Show public site settings
    Settings(settings::SettingsArgs),

    /// Manage exam attempts
    Attempts(attempts::AttemptsArgs),

    /// Manage unlocked courses
    Courses(courses::CoursesArgs),

    /// Turn free text into a URL slug
    Slug(slug::SlugArgs),

    /// Build the canonical URL path for an exam
    ExamUrl(exam_url::ExamUrlArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = examdesk_config::load_config(None)?;
    let mut config = loaded.config.clone();
    if let Some(url) = &cli.server {
        config.set_server_url(url.as_str());
    }
    if let Some(dir) = &cli.data_dir {
        config.set_storage_dir(dir.as_path());
    }
    let data_dir = config.storage().effective_dir();

    let _guard = init_tracing(cli.verbose, &data_dir.join("logs"));

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    // `config` runs anyway so a broken file can be shown and fixed.
    if !matches!(cli.command, Commands::Config(_)) {
        config.validate().context("Invalid configuration")?;
    }
    tracing::debug!(
        data_dir = %data_dir.display(),
        sources = ?loaded.loaded_from(),
        "Configuration loaded"
    );

    let ctx = commands::Context {
        config,
        sources: loaded
            .loaded_from()
            .into_iter()
            .map(Path::to_path_buf)
            .collect(),
        data_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Settings(args) => settings::run(args, &ctx).await,
        Commands::Attempts(args) => attempts::run(args, &ctx).await,
        Commands::Courses(args) => courses::run(args, &ctx).await,
        Commands::Slug(args) => slug::run(args, &ctx),
        Commands::ExamUrl(args) => exam_url::run(args, &ctx),
        Commands::Config(args) => config::run(args, &ctx),
    }
}

/// Console (human-readable, stderr) + rotating JSON file in `log_dir`.
///
/// The file layer is skipped when the log directory cannot be created.
fn init_tracing(verbose: bool, log_dir: &Path) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "examdesk=debug,examdesk_client=debug,examdesk_cache=debug,examdesk_state=debug,examdesk_config=debug,info"
    } else {
        "examdesk=info,examdesk_client=info,examdesk_cache=info,examdesk_state=info,warn"
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("examdesk.log")
        .build(log_dir)
        .ok();
    let (file_writer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "examdesk=trace,examdesk_client=trace,examdesk_cache=trace,examdesk_state=trace,examdesk_config=trace,info",
                ))
        }))
        .init();

    guard
}
