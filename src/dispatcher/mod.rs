//! Dispatcher (spec §2, §4 "Dispatcher", §6.5) — a process-wide event bus
//! fanning engine events out to the excluded UI layer. Purely pub/sub, no
//! retention, best-effort, FIFO per subscriber (spec §5 "Event emission
//! is FIFO per subscriber").
//!
//! Grounded on the teacher's coordinator actor (one task owns the
//! subscriber table; callers talk to it over a channel) but trimmed down
//! to the pub/sub-only shape the spec calls for — no Query/Share
//! request/reply traffic, no persistence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Engine event payloads (spec §6.5). Carries just enough identity for a
/// subscriber to look up the full record through the owning component;
/// the Dispatcher itself never materializes full records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrchestratorCreated { orchestrator_id: String },
    OrchestratorStarted { orchestrator_id: String },
    OrchestratorPhaseChanged { orchestrator_id: String, phase: String },
    OrchestratorAnalysisComplete { orchestrator_id: String },
    OrchestratorTasksReady { orchestrator_id: String, task_count: usize },
    OrchestratorProgress { orchestrator_id: String, data: Value },
    OrchestratorCompleted { orchestrator_id: String },
    OrchestratorCancelled { orchestrator_id: String },
    OrchestratorPaused { orchestrator_id: String },
    OrchestratorResumed { orchestrator_id: String },
    OrchestratorError { orchestrator_id: String, reason: String },

    WorkerSpawned { orchestrator_id: String, worker_id: String, task_id: String },
    WorkerProgress { orchestrator_id: String, worker_id: String, progress_pct: Option<u8> },
    WorkerCompleted { orchestrator_id: String, worker_id: String },
    WorkerFailed { orchestrator_id: String, worker_id: String, reason: String },
    WorkerTimeout { orchestrator_id: String, worker_id: String },
    WorkerCancelled { orchestrator_id: String, worker_id: String },

    SubsessionRegistered { child_session_id: String, parent_session_id: String },
    SubsessionStatusChanged { child_session_id: String, status: String },
    SubsessionResultReturned { child_session_id: String },
    SubsessionOrphaned { child_session_id: String },

    ProtocolError { orchestrator_id: String, reason: String },
}

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// A subscription handle; drop it (or call `unsubscribe`) to stop
/// receiving events.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Event>,
    dispatcher: Dispatcher,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub async fn unsubscribe(self) {
        self.dispatcher.unsubscribe(self.id).await;
    }
}

enum Command {
    Subscribe { tx: mpsc::Sender<Event>, reply: tokio::sync::oneshot::Sender<u64> },
    Unsubscribe { id: u64 },
    Emit { event: Event },
}

#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Command>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(actor_loop(rx));
        Self { tx }
    }

    pub async fn subscribe(&self) -> Subscription {
        let (sub_tx, sub_rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let _ = self.tx.send(Command::Subscribe { tx: sub_tx, reply: reply_tx }).await;
        let id = reply_rx.await.unwrap_or(0);
        Subscription {
            id,
            rx: sub_rx,
            dispatcher: self.clone(),
        }
    }

    async fn unsubscribe(&self, id: u64) {
        let _ = self.tx.send(Command::Unsubscribe { id }).await;
    }

    /// Best-effort emit: a subscriber whose channel is full is skipped
    /// rather than blocking the emitter (spec §6.5 "Delivery is
    /// best-effort").
    pub async fn emit(&self, event: Event) {
        debug!(?event, "Dispatcher::emit: called");
        let _ = self.tx.send(Command::Emit { event }).await;
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn actor_loop(mut rx: mpsc::Receiver<Command>) {
    let mut subscribers: Vec<(u64, mpsc::Sender<Event>)> = Vec::new();
    let mut next_id: u64 = 1;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Subscribe { tx, reply } => {
                let id = next_id;
                next_id += 1;
                subscribers.push((id, tx));
                let _ = reply.send(id);
            }
            Command::Unsubscribe { id } => {
                subscribers.retain(|(sub_id, _)| *sub_id != id);
            }
            Command::Emit { event } => {
                for (_, tx) in &subscribers {
                    let _ = tx.try_send(event.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.subscribe().await;
        dispatcher
            .emit(Event::OrchestratorCreated { orchestrator_id: "o1".into() })
            .await;
        let event = sub.recv().await.expect("expected an event");
        assert!(matches!(event, Event::OrchestratorCreated { orchestrator_id } if orchestrator_id == "o1"));
    }

    #[tokio::test]
    async fn events_are_fifo_per_subscriber() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.subscribe().await;
        for i in 0..3 {
            dispatcher
                .emit(Event::WorkerSpawned {
                    orchestrator_id: "o1".into(),
                    worker_id: format!("w{i}"),
                    task_id: format!("t{i}"),
                })
                .await;
        }
        for i in 0..3 {
            let event = sub.recv().await.unwrap();
            assert!(matches!(event, Event::WorkerSpawned { worker_id, .. } if worker_id == format!("w{i}")));
        }
    }

    #[tokio::test]
    async fn unsubscribed_receiver_gets_no_more_events() {
        let dispatcher = Dispatcher::new();
        let sub = dispatcher.subscribe().await;
        sub.unsubscribe().await;
        dispatcher
            .emit(Event::OrchestratorCreated { orchestrator_id: "o1".into() })
            .await;
        // No assertion beyond "doesn't panic": the unsubscribed receiver
        // is gone, so there's nothing left to observe.
    }
}
