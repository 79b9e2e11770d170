//! Orchestrator table persistence (spec §6.4, §4.4 "Persistence").
//!
//! A single JSON array file, rewritten whole on every flush. Grounded on
//! the teacher's `EventStore`: writes are debounced and coalesced rather
//! than flushed synchronously on every mutation, and a dirty flag plus a
//! timer decide when the next flush actually hits disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::Orchestrator;

pub struct PersistenceHandle {
    tx: mpsc::Sender<Op>,
}

enum Op {
    Save(HashMap<String, Orchestrator>),
    Flush(tokio::sync::oneshot::Sender<()>),
}

impl PersistenceHandle {
    pub fn spawn(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(writer_loop(path.into(), debounce, rx));
        Self { tx }
    }

    /// Schedule a write of the full table; coalesced with any pending
    /// write within the debounce window.
    pub async fn save(&self, table: HashMap<String, Orchestrator>) {
        let _ = self.tx.send(Op::Save(table)).await;
    }

    /// Block until any pending write has hit disk. Used on shutdown.
    pub async fn flush(&self) {
        let (reply, rx) = tokio::sync::oneshot::channel();
        if self.tx.send(Op::Flush(reply)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

async fn writer_loop(path: PathBuf, debounce: Duration, mut rx: mpsc::Receiver<Op>) {
    let mut pending: Option<HashMap<String, Orchestrator>> = None;
    let mut timer = tokio::time::interval(debounce);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer.reset();

    loop {
        tokio::select! {
            op = rx.recv() => {
                match op {
                    Some(Op::Save(table)) => {
                        pending = Some(table);
                        timer.reset();
                    }
                    Some(Op::Flush(reply)) => {
                        if let Some(table) = pending.take() {
                            write_table(&path, &table).await;
                        }
                        let _ = reply.send(());
                    }
                    None => {
                        if let Some(table) = pending.take() {
                            write_table(&path, &table).await;
                        }
                        break;
                    }
                }
            }
            _ = timer.tick() => {
                if let Some(table) = pending.take() {
                    write_table(&path, &table).await;
                }
            }
        }
    }
}

async fn write_table(path: &Path, table: &HashMap<String, Orchestrator>) {
    debug!(path = %path.display(), count = table.len(), "write_table: flushing orchestrator table");
    let records: Vec<&Orchestrator> = table.values().collect();
    let encoded = match serde_json::to_vec_pretty(&records) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "write_table: serialize failed, skipping flush");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!(error = %e, "write_table: create_dir_all failed");
            return;
        }
    }
    let tmp = path.with_extension("json.tmp");
    if let Err(e) = tokio::fs::write(&tmp, &encoded).await {
        warn!(error = %e, "write_table: write to temp file failed");
        return;
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        warn!(error = %e, "write_table: rename into place failed");
    }
}

/// Load the persisted table from disk, if present. Used by
/// `OrchestratorManager::rehydrate`.
pub async fn load_table(path: &Path) -> std::io::Result<HashMap<String, Orchestrator>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e),
    };
    let records: Vec<Orchestrator> = serde_json::from_slice(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(records.into_iter().map(|o| (o.id.clone(), o)).collect())
}
