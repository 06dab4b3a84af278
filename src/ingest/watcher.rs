//! Video file watcher.
//!
//! Watches the configured folders for new video files and emits an event
//! once a file's size has stopped changing across the stability window
//! (i.e. the copy or download finished).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No watch directories configured")]
    NoWatchPaths,

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Folders to watch (non-recursive)
    pub watch_paths: Vec<PathBuf>,

    /// How long a file's size must be unchanged before it counts as stable
    pub stability_delay_secs: u64,

    /// Video extension allow-list
    pub extensions: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_paths: Self::default_watch_paths(),
            stability_delay_secs: 5,
            extensions: default_extensions(),
        }
    }
}

pub(crate) fn default_extensions() -> Vec<String> {
    ["mp4", "mov", "mkv", "avi", "webm", "m4v"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl WatcherConfig {
    /// Default watch folders: where saved videos usually land
    pub fn default_watch_paths() -> Vec<PathBuf> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        vec![home.join("Desktop"), home.join("Downloads")]
    }

    /// Check that every watch path exists
    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.watch_paths.is_empty() {
            return Err(WatcherError::NoWatchPaths);
        }
        for path in &self.watch_paths {
            if !path.exists() {
                return Err(WatcherError::DirectoryNotFound(path.clone()));
            }
        }
        Ok(())
    }

    /// Check if a path carries an allow-listed video extension
    pub fn is_video_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Event emitted when a video file is detected and stable
#[derive(Debug, Clone)]
pub struct VideoFileEvent {
    /// Path to the video file
    pub path: PathBuf,

    /// File size in bytes at stabilization
    pub size: u64,

    /// When the file was judged stable
    pub detected_at: DateTime<Utc>,
}

/// Video watcher with size-stability checking
pub struct VideoWatcher {
    config: WatcherConfig,
}

impl VideoWatcher {
    pub fn new() -> Self {
        Self {
            config: WatcherConfig::default(),
        }
    }

    pub fn with_config(config: WatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Watch the configured folders and emit events for new stable files.
    /// Runs until stopped via the returned handle.
    pub async fn watch(&self) -> Result<(mpsc::Receiver<VideoFileEvent>, WatchHandle)> {
        self.config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

        let (event_tx, event_rx) = mpsc::channel::<VideoFileEvent>(100);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let config = self.config.clone();

        let handle = tokio::task::spawn_blocking(move || {
            if let Err(e) = run_watcher(config, event_tx, &mut stop_rx) {
                tracing::error!("Watcher error: {}", e);
            }
        });

        Ok((
            event_rx,
            WatchHandle {
                stop_tx,
                task: handle,
            },
        ))
    }
}

impl Default for VideoWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to control the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watcher and wait for its loop to exit
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.try_send(());
        self.task.await?;
        Ok(())
    }
}

/// Internal watcher loop (runs on a blocking thread; the debouncer channel
/// is synchronous)
fn run_watcher(
    config: WatcherConfig,
    event_tx: mpsc::Sender<VideoFileEvent>,
    stop_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    // Files being stabilized: path -> (last size, last change seen)
    let mut pending: HashMap<PathBuf, (u64, Instant)> = HashMap::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_secs(2), tx)?;

    for path in &config.watch_paths {
        debouncer
            .watcher()
            .watch(path, RecursiveMode::NonRecursive)?;
        tracing::info!("Watching {} for video files", path.display());
    }

    let stability_delay = Duration::from_secs(config.stability_delay_secs);

    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::info!("Watcher stopping...");
            break;
        }

        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(events)) => {
                for event in events {
                    let path = event.path;

                    if !config.is_video_file(&path) {
                        continue;
                    }

                    if let Ok(metadata) = std::fs::metadata(&path) {
                        if metadata.is_file() {
                            pending.insert(path, (metadata.len(), Instant::now()));
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watcher error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // Expected - continue to stability check
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("Watcher channel disconnected");
                break;
            }
        }

        // Promote files whose size survived the stability window
        let now = Instant::now();
        let mut stable = Vec::new();
        let mut grew = Vec::new();
        let mut vanished = Vec::new();

        for (path, (last_size, last_seen)) in pending.iter() {
            if now.duration_since(*last_seen) < stability_delay {
                continue;
            }
            match std::fs::metadata(path) {
                Ok(metadata) => {
                    let current_size = metadata.len();
                    if current_size == *last_size && current_size > 0 {
                        stable.push((path.clone(), current_size));
                    } else {
                        grew.push((path.clone(), current_size));
                    }
                }
                Err(_) => vanished.push(path.clone()),
            }
        }

        for (path, size) in grew {
            pending.insert(path, (size, Instant::now()));
        }
        for path in vanished {
            pending.remove(&path);
        }

        for (path, size) in stable {
            pending.remove(&path);

            tracing::info!(size, "Stable video file: {}", path.display());
            let event = VideoFileEvent {
                path,
                size,
                detected_at: Utc::now(),
            };
            if event_tx.blocking_send(event).is_err() {
                tracing::warn!("Event receiver dropped, stopping watcher");
                return Ok(());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = WatcherConfig::default();
        assert_eq!(config.watch_paths.len(), 2);
        assert!(config.extensions.contains(&"mp4".to_string()));
        assert_eq!(config.stability_delay_secs, 5);
    }

    #[test]
    fn test_extension_filter() {
        let config = WatcherConfig::default();
        assert!(config.is_video_file(Path::new("/a/clip.mp4")));
        assert!(config.is_video_file(Path::new("/a/CLIP.MOV")));
        assert!(!config.is_video_file(Path::new("/a/notes.txt")));
        assert!(!config.is_video_file(Path::new("/a/noext")));
    }

    #[test]
    fn test_validate_missing_dir() {
        let config = WatcherConfig {
            watch_paths: vec![PathBuf::from("/definitely/not/here")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WatcherError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_validate_empty_paths() {
        let config = WatcherConfig {
            watch_paths: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WatcherError::NoWatchPaths)));
    }

    #[tokio::test]
    async fn test_watch_emits_stable_file() {
        let temp = TempDir::new().unwrap();
        let config = WatcherConfig {
            watch_paths: vec![temp.path().to_path_buf()],
            stability_delay_secs: 1,
            extensions: default_extensions(),
        };
        let watcher = VideoWatcher::with_config(config);

        let (mut event_rx, handle) = watcher.watch().await.unwrap();

        // Give the debouncer a moment to arm before writing
        tokio::time::sleep(Duration::from_millis(300)).await;
        let video = temp.path().join("clip.mp4");
        tokio::fs::write(&video, b"fake video bytes").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(15), event_rx.recv())
            .await
            .expect("timed out waiting for watcher event")
            .expect("watcher channel closed");

        assert_eq!(event.path, video);
        assert_eq!(event.size, 16);

        handle.stop().await.unwrap();
    }
}
