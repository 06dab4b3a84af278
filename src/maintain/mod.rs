//! Weekly maintenance job: engine package upgrades and model sync.
//!
//! Invoked from an external scheduler (`autoscribe update`). Best-effort
//! throughout: each package and each model is handled independently, a
//! failure is logged and skipped, and the run always appends a history
//! record and emits exactly one summary notification. No interface to the
//! real-time pipeline beyond sharing the model cache.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info};

use crate::adapters::DialogNotifier;
use crate::config::{self, EngineSettings};

/// Engine packages upgraded on every run
pub const PACKAGES: &[&str] = &["funasr", "modelscope", "torch", "torchaudio"];

/// Models kept in sync with the hub
pub const MODELS: &[&str] = &[
    "iic/SenseVoiceSmall",
    "iic/speech_paraformer-large-vad-punc_asr_nat-zh-cn-16k-common-vocab8404-pytorch",
    "iic/speech_fsmn_vad_zh-cn-16k-common-pytorch",
    "iic/punc_ct-transformer_zh-cn-common-vocab272727-pytorch",
    "iic/speech_campplus_sv_zh-cn_16k-common",
];

/// History entries kept (roughly one year of weekly runs)
const HISTORY_CAP: usize = 52;

const PACKAGE_TIMEOUT: Duration = Duration::from_secs(300);
const MODEL_TIMEOUT: Duration = Duration::from_secs(600);

/// One maintenance run, as persisted in the rolling history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub time: DateTime<Utc>,
    pub packages_updated: Vec<String>,
    pub models_checked: usize,
}

/// Run the maintenance job end to end
pub async fn run() -> Result<()> {
    let cfg = config::config()?;
    tokio::fs::create_dir_all(&cfg.home)
        .await
        .context("Failed to create state directory")?;

    info!("maintenance run starting");

    let updated = upgrade_packages(&cfg.engine).await;
    let checked = sync_models(&cfg.engine).await;

    append_record(
        &config::update_history_path()?,
        UpdateRecord {
            time: Utc::now(),
            packages_updated: updated.clone(),
            models_checked: checked,
        },
    )
    .await
    .context("Failed to append update history")?;

    let message = if updated.is_empty() {
        "All packages and models are up to date".to_string()
    } else {
        format!("Updated: {}. Models synced.", updated.join(", "))
    };
    info!(%message, "maintenance run finished");

    // Single summary notification; its failure is not the job's failure
    if let Err(e) = DialogNotifier::new()
        .banner("Autoscribe update", &message)
        .await
    {
        error!(error = %e, "summary notification failed");
    }

    Ok(())
}

/// Upgrade every engine package, returning those that actually changed
async fn upgrade_packages(engine: &EngineSettings) -> Vec<String> {
    let mut updated = Vec::new();
    info!("checking engine package upgrades");

    for package in PACKAGES {
        let result = timeout(
            PACKAGE_TIMEOUT,
            Command::new(&engine.python_path)
                .args(["-m", "pip", "install", "--upgrade", "-q", package])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let combined = format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
                // pip prints "Successfully installed" only on a real change
                if combined.contains("Successfully installed") {
                    info!(package, "upgraded");
                    updated.push(package.to_string());
                } else if output.status.success() {
                    info!(package, "already current");
                } else {
                    error!(package, stderr = %combined.trim(), "upgrade failed");
                }
            }
            Ok(Err(e)) => error!(package, error = %e, "upgrade failed to start"),
            Err(_) => error!(package, "upgrade timed out"),
        }
    }

    updated
}

/// Sync each model snapshot, returning how many were checked
async fn sync_models(engine: &EngineSettings) -> usize {
    info!("checking model updates");
    let mut checked = 0;

    for model in MODELS {
        let short_name = model.rsplit('/').next().unwrap_or(model);
        let result = timeout(
            MODEL_TIMEOUT,
            Command::new(&engine.python_path)
                .args(["-m", "modelscope", "download", "--model", model])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                info!(model = short_name, "synced");
                checked += 1;
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(model = short_name, stderr = %stderr.trim(), "sync failed");
            }
            Ok(Err(e)) => error!(model = short_name, error = %e, "sync failed to start"),
            Err(_) => error!(model = short_name, "sync timed out"),
        }
    }

    checked
}

/// Append a record to the rolling history, keeping the most recent entries.
/// A corrupt history file is replaced rather than failing the run.
async fn append_record(path: &Path, record: UpdateRecord) -> Result<()> {
    let mut history: Vec<UpdateRecord> = match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    history.push(record);
    if history.len() > HISTORY_CAP {
        let excess = history.len() - HISTORY_CAP;
        history.drain(..excess);
    }

    let json = serde_json::to_string_pretty(&history)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
