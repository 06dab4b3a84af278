//! Configuration for autoscribe paths and engine settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (AUTOSCRIBE_HOME, AUTOSCRIBE_WATCH)
//! 2. Config file (.autoscribe/config.yaml)
//! 3. Defaults (~/.autoscribe, watching ~/Desktop and ~/Downloads)
//!
//! Config file discovery searches the current directory and parents for
//! .autoscribe/config.yaml.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ingest::watcher;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default detection model (language identification)
pub const DEFAULT_DETECT_MODEL: &str = "iic/SenseVoiceSmall";

/// Default recognition model (ASR with punctuation and diarization support)
pub const DEFAULT_ASR_MODEL: &str =
    "iic/speech_paraformer-large-vad-punc_asr_nat-zh-cn-16k-common-vocab8404-pytorch";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub watcher: Option<WatcherFileConfig>,
    #[serde(default)]
    pub engine: Option<EngineFileConfig>,
    #[serde(default)]
    pub limits: Option<LimitsFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (ledger, update history)
    pub home: Option<String>,
    /// Transcript output directory
    pub transcripts: Option<String>,
    /// Success bucket for processed videos
    pub videos: Option<String>,
    /// Failure bucket
    pub failed: Option<String>,
    /// Folders to watch
    #[serde(default)]
    pub watch: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherFileConfig {
    pub stability_delay_secs: Option<u64>,
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineFileConfig {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub runner: Option<String>,
    pub python: Option<String>,
    pub asr_model: Option<String>,
    pub detect_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsFileConfig {
    pub max_concurrent_transcriptions: Option<usize>,
    pub shutdown_grace_secs: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory (ledger, update history)
    pub home: PathBuf,
    pub transcript_dir: PathBuf,
    pub video_dir: PathBuf,
    pub failed_dir: PathBuf,
    pub watch_paths: Vec<PathBuf>,
    pub stability_delay_secs: u64,
    pub extensions: Vec<String>,
    pub engine: EngineSettings,
    pub limits: LimitSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Subprocess and model settings for the transcription engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub runner_path: String,
    pub python_path: String,
    pub asr_model: String,
    pub detect_model: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            runner_path: "funasr-runner".to_string(),
            python_path: "python3".to_string(),
            asr_model: DEFAULT_ASR_MODEL.to_string(),
            detect_model: DEFAULT_DETECT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitSettings {
    pub max_concurrent_transcriptions: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_concurrent_transcriptions: 2,
            shutdown_grace_secs: 30,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".autoscribe").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path_str)
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".autoscribe");

    let config_file = find_config_file();
    let file: Option<ConfigFile> = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Base for relative paths in the config file: the project root above .autoscribe/
    let base_dir = config_file
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();

    let home = if let Ok(env_home) = std::env::var("AUTOSCRIBE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = paths.home {
        resolve_path(&base_dir, home_path)
    } else {
        default_home
    };

    let transcript_dir = paths
        .transcripts
        .as_deref()
        .map(|p| resolve_path(&base_dir, p))
        .unwrap_or_else(|| home.join("transcripts"));
    let video_dir = paths
        .videos
        .as_deref()
        .map(|p| resolve_path(&base_dir, p))
        .unwrap_or_else(|| home.join("videos"));
    let failed_dir = paths
        .failed
        .as_deref()
        .map(|p| resolve_path(&base_dir, p))
        .unwrap_or_else(|| home.join("failed"));

    let watch_paths = if let Ok(env_watch) = std::env::var("AUTOSCRIBE_WATCH") {
        env_watch.split(':').map(PathBuf::from).collect()
    } else if !paths.watch.is_empty() {
        paths
            .watch
            .iter()
            .map(|p| resolve_path(&base_dir, p))
            .collect()
    } else {
        crate::ingest::WatcherConfig::default_watch_paths()
    };

    let watcher_file = file.as_ref().and_then(|f| f.watcher.clone());
    let stability_delay_secs = watcher_file
        .as_ref()
        .and_then(|w| w.stability_delay_secs)
        .unwrap_or(5);
    let extensions = watcher_file
        .and_then(|w| w.extensions)
        .unwrap_or_else(watcher::default_extensions);

    let engine_file = file.as_ref().and_then(|f| f.engine.clone());
    let engine_defaults = EngineSettings::default();
    let engine = EngineSettings {
        ffmpeg_path: engine_file
            .as_ref()
            .and_then(|e| e.ffmpeg.clone())
            .unwrap_or(engine_defaults.ffmpeg_path),
        ffprobe_path: engine_file
            .as_ref()
            .and_then(|e| e.ffprobe.clone())
            .unwrap_or(engine_defaults.ffprobe_path),
        runner_path: engine_file
            .as_ref()
            .and_then(|e| e.runner.clone())
            .unwrap_or(engine_defaults.runner_path),
        python_path: engine_file
            .as_ref()
            .and_then(|e| e.python.clone())
            .unwrap_or(engine_defaults.python_path),
        asr_model: engine_file
            .as_ref()
            .and_then(|e| e.asr_model.clone())
            .unwrap_or(engine_defaults.asr_model),
        detect_model: engine_file
            .and_then(|e| e.detect_model)
            .unwrap_or(engine_defaults.detect_model),
    };

    let limits_file = file.as_ref().and_then(|f| f.limits.clone());
    let limit_defaults = LimitSettings::default();
    let limits = LimitSettings {
        max_concurrent_transcriptions: limits_file
            .as_ref()
            .and_then(|l| l.max_concurrent_transcriptions)
            .unwrap_or(limit_defaults.max_concurrent_transcriptions),
        shutdown_grace_secs: limits_file
            .and_then(|l| l.shutdown_grace_secs)
            .unwrap_or(limit_defaults.shutdown_grace_secs),
    };

    Ok(ResolvedConfig {
        home,
        transcript_dir,
        video_dir,
        failed_dir,
        watch_paths,
        stability_delay_secs,
        extensions,
        engine,
        limits,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the ledger path ($AUTOSCRIBE_HOME/ledger.jsonl)
pub fn ledger_path() -> Result<PathBuf> {
    Ok(config()?.home.join("ledger.jsonl"))
}

/// Get the update history path ($AUTOSCRIBE_HOME/update_history.json)
pub fn update_history_path() -> Result<PathBuf> {
    Ok(config()?.home.join("update_history.json"))
}
