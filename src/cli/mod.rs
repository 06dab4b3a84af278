//! Command-line interface for autoscribe.
//!
//! Provides the long-running serve command plus operational helpers for
//! inspecting the ledger, running maintenance, and debugging configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DialogNotifier, FunAsrEngine, WorkspacePlacement};
use crate::config;
use crate::core::{Orchestrator, Supervisor};
use crate::ingest::{LedgerDecision, ProcessingLedger, VideoWatcher, WatcherConfig};
use crate::maintain;

/// autoscribe - watch-folder video transcription daemon
#[derive(Parser, Debug)]
#[command(name = "autoscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch for new videos and transcribe them (runs until terminated)
    Serve {
        /// Watch these folder(s) instead of the configured ones
        #[arg(short, long)]
        path: Vec<PathBuf>,
    },

    /// Show ledger summary
    Status,

    /// Upgrade engine packages and sync models (weekly maintenance)
    Update,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { path } => execute_serve(path).await,
            Commands::Status => execute_status().await,
            Commands::Update => maintain::run().await,
            Commands::Config => execute_config(),
        }
    }
}

/// Wire the orchestrator together and run the supervisor
async fn execute_serve(path_overrides: Vec<PathBuf>) -> Result<()> {
    let cfg = config::config()?;

    tokio::fs::create_dir_all(&cfg.home)
        .await
        .context("Failed to create state directory")?;

    let ledger = Arc::new(ProcessingLedger::open(config::ledger_path()?).await?);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(DialogNotifier::new()),
        Arc::new(FunAsrEngine::new(cfg.engine.clone())),
        Arc::new(WorkspacePlacement::new(
            cfg.transcript_dir.clone(),
            cfg.video_dir.clone(),
            cfg.failed_dir.clone(),
        )),
        ledger,
        cfg.limits.max_concurrent_transcriptions,
    ));

    let watcher_config = WatcherConfig {
        watch_paths: if path_overrides.is_empty() {
            cfg.watch_paths.clone()
        } else {
            path_overrides
        },
        stability_delay_secs: cfg.stability_delay_secs,
        extensions: cfg.extensions.clone(),
    };

    println!("🎙 autoscribe starting");
    for path in &watcher_config.watch_paths {
        println!("👁  Watching: {}", path.display());
    }
    println!("    Save a video there to trigger transcription");
    println!("    Press Ctrl+C to stop");
    println!();

    let supervisor = Supervisor::new(
        VideoWatcher::with_config(watcher_config),
        orchestrator,
        Duration::from_secs(cfg.limits.shutdown_grace_secs),
    );
    supervisor.run().await?;

    println!("👋 stopped");
    Ok(())
}

/// Show ledger summary
async fn execute_status() -> Result<()> {
    let ledger = ProcessingLedger::open(config::ledger_path()?).await?;
    let entries = ledger.entries().await?;

    let confirmed = entries
        .iter()
        .filter(|e| e.decision == LedgerDecision::Confirmed)
        .count();
    let rejected = entries.len() - confirmed;

    println!();
    println!("Processing Ledger");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("Ledger file: {}", config::ledger_path()?.display());
    println!();
    println!("  Confirmed: {}", confirmed);
    println!("  Rejected:  {}", rejected);
    println!("  Total:     {}", entries.len());
    println!();

    if !entries.is_empty() {
        println!("Recent:");
        for entry in entries.iter().rev().take(5) {
            let decision = match entry.decision {
                LedgerDecision::Confirmed => "CONF",
                LedgerDecision::Rejected => "SKIP",
            };
            println!(
                "  [{}] {} ({})",
                decision,
                entry.path,
                entry.timestamp.format("%Y-%m-%d %H:%M")
            );
        }
        println!();
    }

    Ok(())
}

/// Show resolved configuration
fn execute_config() -> Result<()> {
    let cfg = config::config()?;

    println!();
    println!("Resolved Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    match &cfg.config_file {
        Some(path) => println!("Config file:  {}", path.display()),
        None => println!("Config file:  (none, using defaults)"),
    }
    println!("Home:         {}", cfg.home.display());
    println!("Transcripts:  {}", cfg.transcript_dir.display());
    println!("Videos:       {}", cfg.video_dir.display());
    println!("Failed:       {}", cfg.failed_dir.display());
    for path in &cfg.watch_paths {
        println!("Watch:        {}", path.display());
    }
    println!();
    println!("Stability:    {}s", cfg.stability_delay_secs);
    println!("Extensions:   {}", cfg.extensions.join(", "));
    println!();
    println!("ffmpeg:       {}", cfg.engine.ffmpeg_path);
    println!("ffprobe:      {}", cfg.engine.ffprobe_path);
    println!("Runner:       {}", cfg.engine.runner_path);
    println!("Python:       {}", cfg.engine.python_path);
    println!("ASR model:    {}", cfg.engine.asr_model);
    println!("Detect model: {}", cfg.engine.detect_model);
    println!();
    println!(
        "Concurrent transcriptions: {}",
        cfg.limits.max_concurrent_transcriptions
    );
    println!("Shutdown grace: {}s", cfg.limits.shutdown_grace_secs);
    println!();

    Ok(())
}
