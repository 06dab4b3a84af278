//! Ledger Durability Tests
//!
//! The at-most-once guarantee has to hold across process restarts, which
//! the unit tests cannot show. These reopen the same ledger file with
//! fresh instances and race real tasks at the mark.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use autoscribe::ingest::{LedgerDecision, ProcessingLedger};

#[tokio::test]
async fn test_marks_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let ledger_path = temp.path().join("ledger.jsonl");

    {
        let ledger = ProcessingLedger::open(ledger_path.clone()).await.unwrap();
        ledger
            .mark(Path::new("/videos/a.mp4"), LedgerDecision::Confirmed)
            .await
            .unwrap();
        ledger
            .mark(Path::new("/videos/b.mp4"), LedgerDecision::Rejected)
            .await
            .unwrap();
    }

    // A fresh instance over the same file replays both marks
    let reopened = ProcessingLedger::open(ledger_path).await.unwrap();
    assert!(reopened.is_marked(Path::new("/videos/a.mp4")).await);
    assert!(reopened.is_marked(Path::new("/videos/b.mp4")).await);
    assert!(!reopened.is_marked(Path::new("/videos/c.mp4")).await);

    let entries = reopened.entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].decision, LedgerDecision::Confirmed);
    assert_eq!(entries[1].decision, LedgerDecision::Rejected);
}

#[tokio::test]
async fn test_reopen_after_rejection_still_blocks() {
    let temp = TempDir::new().unwrap();
    let ledger_path = temp.path().join("ledger.jsonl");

    {
        let ledger = ProcessingLedger::open(ledger_path.clone()).await.unwrap();
        ledger
            .mark(Path::new("/videos/no.mp4"), LedgerDecision::Rejected)
            .await
            .unwrap();
    }

    // A declined file must not be offered again after a restart
    let reopened = ProcessingLedger::open(ledger_path).await.unwrap();
    assert!(
        !reopened
            .mark_if_absent(Path::new("/videos/no.mp4"), LedgerDecision::Confirmed)
            .await
            .unwrap()
    );
    assert_eq!(reopened.entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_tasks_single_winner() {
    let temp = TempDir::new().unwrap();
    let ledger = Arc::new(
        ProcessingLedger::open(temp.path().join("ledger.jsonl"))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .mark_if_absent(Path::new("/videos/clip.mp4"), LedgerDecision::Confirmed)
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(ledger.entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_lines_are_tolerated() {
    let temp = TempDir::new().unwrap();
    let ledger_path = temp.path().join("ledger.jsonl");

    {
        let ledger = ProcessingLedger::open(ledger_path.clone()).await.unwrap();
        ledger
            .mark(Path::new("/videos/a.mp4"), LedgerDecision::Confirmed)
            .await
            .unwrap();
    }

    // A trailing blank line (editor touch, partial flush) must not poison replay
    let mut content = tokio::fs::read_to_string(&ledger_path).await.unwrap();
    content.push('\n');
    tokio::fs::write(&ledger_path, content).await.unwrap();

    let reopened = ProcessingLedger::open(ledger_path).await.unwrap();
    assert!(reopened.is_marked(Path::new("/videos/a.mp4")).await);
    assert_eq!(reopened.entries().await.unwrap().len(), 1);
}
