//! Process supervisor.
//!
//! Owns the watcher lifecycle: spawns one worker task per stabilized file,
//! maps SIGINT/SIGTERM to a cooperative shutdown that stops the watcher and
//! gives in-flight pipelines a bounded grace period. Workers are never
//! aborted mid-stage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::Orchestrator;
use crate::domain::SourceFile;
use crate::ingest::VideoWatcher;

/// Supervises the watcher and the per-file worker pool
pub struct Supervisor {
    watcher: VideoWatcher,
    orchestrator: Arc<Orchestrator>,
    grace_period: Duration,
}

impl Supervisor {
    pub fn new(watcher: VideoWatcher, orchestrator: Arc<Orchestrator>, grace_period: Duration) -> Self {
        Self {
            watcher,
            orchestrator,
            grace_period,
        }
    }

    /// Run until a termination signal arrives. Watcher failures are fatal.
    pub async fn run(&self) -> Result<()> {
        let (mut event_rx, handle) = self
            .watcher
            .watch()
            .await
            .context("Failed to start watcher")?;

        let mut workers: JoinSet<()> = JoinSet::new();
        info!("supervisor running, waiting for video files");

        loop {
            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            let orchestrator = Arc::clone(&self.orchestrator);
                            workers.spawn(async move {
                                let source = SourceFile {
                                    path: event.path,
                                    size: event.size,
                                    detected_at: event.detected_at,
                                };
                                if let Err(e) = orchestrator.on_new_file(&source).await {
                                    error!(
                                        error = %e,
                                        file = %source.path.display(),
                                        "pipeline entry failed"
                                    );
                                }
                            });
                        }
                        None => {
                            anyhow::bail!("watcher channel closed unexpectedly");
                        }
                    }
                }
                _ = shutdown_signal() => {
                    info!("shutdown requested");
                    break;
                }
            }

            // Reap finished workers so the set doesn't grow unbounded
            while let Some(result) = workers.try_join_next() {
                if let Err(e) = result {
                    error!(error = %e, "worker task panicked");
                }
            }
        }

        handle.stop().await.context("Failed to stop watcher")?;

        if workers.is_empty() {
            info!("no in-flight work, exiting");
            return Ok(());
        }

        info!(
            in_flight = workers.len(),
            grace_secs = self.grace_period.as_secs(),
            "waiting for in-flight pipelines"
        );
        let drained = tokio::time::timeout(self.grace_period, async {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "worker task panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                in_flight = workers.len(),
                "grace period expired, exiting with pipelines still running"
            );
        } else {
            info!("all pipelines finished, exiting");
        }

        Ok(())
    }
}

/// Resolves when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
