//! Durable processing ledger.
//!
//! Append-only JSONL keyed by path string: one line per dispatched file,
//! replayed into memory on open. A path is marked before any stage with an
//! observable side effect runs, so a crash mid-pipeline never reprocesses a
//! file on restart. There is no unmark.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Errors raised by the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a path was marked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerDecision {
    /// Operator accepted; the pipeline ran (or was running)
    Confirmed,

    /// Operator declined; nothing else happened
    Rejected,
}

/// One appended ledger line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub decision: LedgerDecision,
}

/// JSONL-backed set of already-dispatched source paths
pub struct ProcessingLedger {
    ledger_path: PathBuf,

    /// Replayed keys; the lock is held across check-and-append so marking
    /// is atomic under concurrent duplicate notifications
    marked: Mutex<HashSet<String>>,
}

impl ProcessingLedger {
    /// Open a ledger, replaying any existing entries
    pub async fn open(ledger_path: PathBuf) -> Result<Self, LedgerError> {
        if let Some(parent) = ledger_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut marked = HashSet::new();
        if ledger_path.exists() {
            let file = File::open(&ledger_path).await?;
            let reader = BufReader::new(file);
            let mut lines = reader.lines();

            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let entry: LedgerEntry = serde_json::from_str(&line)?;
                marked.insert(entry.path);
            }
        }

        Ok(Self {
            ledger_path,
            marked: Mutex::new(marked),
        })
    }

    /// Whether this path has already been dispatched
    pub async fn is_marked(&self, path: &Path) -> bool {
        self.marked
            .lock()
            .await
            .contains(&path.to_string_lossy().to_string())
    }

    /// Mark a path, ignoring whether it was already present
    pub async fn mark(&self, path: &Path, decision: LedgerDecision) -> Result<(), LedgerError> {
        self.mark_if_absent(path, decision).await?;
        Ok(())
    }

    /// Atomically mark a path; returns true when this caller won the mark.
    ///
    /// Concurrent callers for the same unmarked path see exactly one true.
    pub async fn mark_if_absent(
        &self,
        path: &Path,
        decision: LedgerDecision,
    ) -> Result<bool, LedgerError> {
        let key = path.to_string_lossy().to_string();

        let mut marked = self.marked.lock().await;
        if marked.contains(&key) {
            return Ok(false);
        }

        let entry = LedgerEntry {
            timestamp: Utc::now(),
            path: key.clone(),
            decision,
        };
        self.append(&entry).await?;
        marked.insert(key);

        Ok(true)
    }

    /// All recorded entries, oldest first (re-reads the file)
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        // Serialize against writers so a partial line is never observed
        let _guard = self.marked.lock().await;

        let mut entries = Vec::new();
        if !self.ledger_path.exists() {
            return Ok(entries);
        }

        let file = File::open(&self.ledger_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .await?;

        let json = serde_json::to_string(entry)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
