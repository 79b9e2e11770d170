//! WorkerPool (spec §4.5) — bounded concurrency of worker sessions with
//! poll-driven progress tracking.
//!
//! Structured as a single actor owning all worker and queue state,
//! exactly the shape of the teacher's `StateManager`/`LoopManager`: one
//! task processes commands off an mpsc channel plus a periodic tick,
//! callers never touch worker state directly.

mod error;
mod messages;

pub use error::PoolError;
pub use messages::CleanupMode;

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::adapter::{RemoteRuntimeAdapter, StartSessionOptions, TranscriptEntryKind};
use crate::dispatcher::{Dispatcher, Event};
use crate::domain::{worker_session_name, ResolvedTemplate, Task, Worker, WorkerOutput, WorkerStatus};
use crate::parser::{self, CompletionStatus, PhasePayload};
use crate::templates::substitute;

use messages::{PoolCommand, PoolResult};

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;
const INTERRUPT_MESSAGE: &str = "[Request interrupted by user]";

struct OrchestratorQueue {
    pending: VecDeque<Task>,
    template: ResolvedTemplate,
    variables: HashMap<String, Value>,
    cwd: String,
    spawn_failures: HashMap<String, u32>,
}

struct WorkerEntry {
    worker: Worker,
    task: Task,
    template: ResolvedTemplate,
    next_poll_at: Instant,
}

/// Handle to the pool actor. Cheap to clone.
#[derive(Clone)]
pub struct WorkerPool {
    tx: mpsc::Sender<PoolCommand>,
}

impl WorkerPool {
    pub fn spawn(adapter: RemoteRuntimeAdapter, dispatcher: Dispatcher) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(adapter, dispatcher, rx));
        Self { tx }
    }

    pub async fn spawn_batch(
        &self,
        orchestrator_id: impl Into<String>,
        cwd: impl Into<String>,
        tasks: Vec<Task>,
        template: ResolvedTemplate,
        variables: HashMap<String, Value>,
    ) -> PoolResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PoolCommand::SpawnBatch {
                orchestrator_id: orchestrator_id.into(),
                cwd: cwd.into(),
                tasks,
                template,
                variables,
                reply,
            })
            .await
            .map_err(|_| PoolError::ChannelClosed)?;
        rx.await.map_err(|_| PoolError::ChannelClosed)?
    }

    pub async fn pause_worker(&self, worker_id: impl Into<String>) -> PoolResult<()> {
        self.round_trip(|reply| PoolCommand::PauseWorker { worker_id: worker_id.into(), reply }).await
    }

    pub async fn resume_worker(&self, worker_id: impl Into<String>) -> PoolResult<()> {
        self.round_trip(|reply| PoolCommand::ResumeWorker { worker_id: worker_id.into(), reply }).await
    }

    pub async fn cancel_worker(&self, worker_id: impl Into<String>) -> PoolResult<()> {
        self.round_trip(|reply| PoolCommand::CancelWorker { worker_id: worker_id.into(), reply }).await
    }

    pub async fn cancel_all_for_orchestrator(&self, orchestrator_id: impl Into<String>) -> PoolResult<()> {
        self.round_trip(|reply| PoolCommand::CancelAllForOrchestrator { orchestrator_id: orchestrator_id.into(), reply })
            .await
    }

    pub async fn retry_worker(&self, worker_id: impl Into<String>) -> PoolResult<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PoolCommand::RetryWorker { worker_id: worker_id.into(), reply })
            .await
            .map_err(|_| PoolError::ChannelClosed)?;
        rx.await.map_err(|_| PoolError::ChannelClosed)?
    }

    pub async fn get_workers(&self, orchestrator_id: impl Into<String>) -> Vec<Worker> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(PoolCommand::GetWorkers { orchestrator_id: orchestrator_id.into(), reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn cleanup(&self, orchestrator_id: impl Into<String>, mode: CleanupMode) -> PoolResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PoolCommand::Cleanup { orchestrator_id: orchestrator_id.into(), mode, reply })
            .await
            .map_err(|_| PoolError::ChannelClosed)?;
        rx.await.map_err(|_| PoolError::ChannelClosed)?
    }

    async fn round_trip(&self, build: impl FnOnce(oneshot::Sender<PoolResult<()>>) -> PoolCommand) -> PoolResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| PoolError::ChannelClosed)?;
        rx.await.map_err(|_| PoolError::ChannelClosed)?
    }
}

struct PoolState {
    adapter: RemoteRuntimeAdapter,
    dispatcher: Dispatcher,
    workers: HashMap<String, WorkerEntry>,
    queues: HashMap<String, OrchestratorQueue>,
}

async fn actor_loop(adapter: RemoteRuntimeAdapter, dispatcher: Dispatcher, mut rx: mpsc::Receiver<PoolCommand>) {
    let mut state = PoolState {
        adapter,
        dispatcher,
        workers: HashMap::new(),
        queues: HashMap::new(),
    };
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(&mut state, cmd).await;
            }
            _ = tick.tick() => {
                poll_due_workers(&mut state).await;
            }
        }
    }
}

async fn handle_command(state: &mut PoolState, cmd: PoolCommand) {
    match cmd {
        PoolCommand::SpawnBatch { orchestrator_id, cwd, tasks, template, variables, reply } => {
            debug!(%orchestrator_id, task_count = tasks.len(), "WorkerPool::spawn_batch: called");
            let queue = state.queues.entry(orchestrator_id.clone()).or_insert_with(|| OrchestratorQueue {
                pending: VecDeque::new(),
                template: template.clone(),
                variables: variables.clone(),
                cwd: cwd.clone(),
                spawn_failures: HashMap::new(),
            });
            queue.template = template;
            queue.variables = variables;
            queue.cwd = cwd;
            queue.pending.extend(tasks);
            drain_queue(state, &orchestrator_id).await;
            let _ = reply.send(Ok(()));
        }
        PoolCommand::PauseWorker { worker_id, reply } => {
            let result = transition(state, &worker_id, WorkerStatus::Paused);
            let _ = reply.send(result);
        }
        PoolCommand::ResumeWorker { worker_id, reply } => {
            let result = transition(state, &worker_id, WorkerStatus::Running);
            let _ = reply.send(result);
        }
        PoolCommand::CancelWorker { worker_id, reply } => {
            let result = cancel_worker(state, &worker_id).await;
            let _ = reply.send(result);
        }
        PoolCommand::CancelAllForOrchestrator { orchestrator_id, reply } => {
            let ids: Vec<String> = state
                .workers
                .values()
                .filter(|e| e.worker.orchestrator_id == orchestrator_id && !e.worker.status.is_terminal())
                .map(|e| e.worker.worker_id.clone())
                .collect();
            for id in ids {
                let _ = cancel_worker(state, &id).await;
            }
            let _ = reply.send(Ok(()));
        }
        PoolCommand::RetryWorker { worker_id, reply } => {
            let result = retry_worker(state, &worker_id).await;
            let _ = reply.send(result);
        }
        PoolCommand::GetWorkers { orchestrator_id, reply } => {
            let workers = state
                .workers
                .values()
                .filter(|e| e.worker.orchestrator_id == orchestrator_id)
                .map(|e| e.worker.clone())
                .collect();
            let _ = reply.send(workers);
        }
        PoolCommand::Cleanup { orchestrator_id, mode, reply } => {
            let result = cleanup(state, &orchestrator_id, mode).await;
            let _ = reply.send(result);
        }
    }
}

fn running_count(workers: &HashMap<String, WorkerEntry>, orchestrator_id: &str) -> u32 {
    workers
        .values()
        .filter(|e| {
            e.worker.orchestrator_id == orchestrator_id
                && matches!(e.worker.status, WorkerStatus::Spawning | WorkerStatus::Running | WorkerStatus::Paused)
        })
        .count() as u32
}

async fn drain_queue(state: &mut PoolState, orchestrator_id: &str) {
    loop {
        let Some(queue) = state.queues.get(orchestrator_id) else { return };
        if running_count(&state.workers, orchestrator_id) >= queue.template.config.max_workers {
            return;
        }
        let Some(queue) = state.queues.get_mut(orchestrator_id) else { return };
        let Some(task) = queue.pending.pop_front() else { return };
        let template = queue.template.clone();
        let variables = queue.variables.clone();
        let cwd = queue.cwd.clone();
        spawn_worker(state, orchestrator_id, task, template, variables, cwd).await;
    }
}

/// Spawns a worker session for `task`. Returns the new worker's id on
/// success; on adapter failure the task is pushed back onto its
/// orchestrator's queue (up to `retry_max` spawn attempts) and `None` is
/// returned.
async fn spawn_worker(
    state: &mut PoolState,
    orchestrator_id: &str,
    task: Task,
    template: ResolvedTemplate,
    variables: HashMap<String, Value>,
    cwd: String,
) -> Option<String> {
    let mut worker = Worker::new(orchestrator_id, &task.id);
    worker.status = WorkerStatus::Spawning;

    let mut bindings = variables.clone();
    bindings.insert("TASK_ID".into(), Value::String(task.id.clone()));
    bindings.insert("TASK_TITLE".into(), Value::String(task.title.clone()));
    bindings.insert("TASK_DESCRIPTION".into(), Value::String(task.description.clone()));
    bindings.insert(
        "TASK_SCOPE".into(),
        task.scope.clone().map(Value::String).unwrap_or(Value::String(String::new())),
    );
    let prompt = substitute(&template.prompts.worker, &bindings);
    let session_name = worker_session_name(orchestrator_id, &task.id);

    match state
        .adapter
        .start_session_with_message(&cwd, &prompt, StartSessionOptions { name: Some(session_name) })
        .await
    {
        Ok(started) => {
            let worker_id = worker.worker_id.clone();
            worker.session_id = Some(started.session_id);
            worker.status = WorkerStatus::Running;
            worker.started_at = Some(chrono::Utc::now());
            info!(%worker_id, task_id = %task.id, "spawn_worker: worker running");
            state
                .dispatcher
                .emit(Event::WorkerSpawned {
                    orchestrator_id: orchestrator_id.to_string(),
                    worker_id: worker_id.clone(),
                    task_id: task.id.clone(),
                })
                .await;
            state.workers.insert(
                worker_id.clone(),
                WorkerEntry {
                    worker,
                    task,
                    template,
                    next_poll_at: Instant::now(),
                },
            );
            Some(worker_id)
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "spawn_worker: adapter call failed");
            state
                .dispatcher
                .emit(Event::WorkerFailed {
                    orchestrator_id: orchestrator_id.to_string(),
                    worker_id: worker.worker_id.clone(),
                    reason: e.to_string(),
                })
                .await;

            if let Some(queue) = state.queues.get_mut(orchestrator_id) {
                let failures = queue.spawn_failures.entry(task.id.clone()).or_insert(0);
                *failures += 1;
                if *failures <= queue.template.config.retry_max {
                    queue.pending.push_back(task);
                }
            }
            None
        }
    }
}

fn transition(state: &mut PoolState, worker_id: &str, next: WorkerStatus) -> PoolResult<()> {
    let entry = state.workers.get_mut(worker_id).ok_or_else(|| PoolError::WorkerNotFound(worker_id.to_string()))?;
    if !entry.worker.status.can_transition_to(next) {
        return Err(PoolError::TerminalWorker(worker_id.to_string()));
    }
    entry.worker.status = next;
    Ok(())
}

async fn cancel_worker(state: &mut PoolState, worker_id: &str) -> PoolResult<()> {
    let Some(entry) = state.workers.get(worker_id) else {
        return Err(PoolError::WorkerNotFound(worker_id.to_string()));
    };
    if entry.worker.status.is_terminal() {
        return Err(PoolError::TerminalWorker(worker_id.to_string()));
    }
    let orchestrator_id = entry.worker.orchestrator_id.clone();
    if let Some(session_id) = entry.worker.session_id.clone() {
        let _ = state.adapter.send_message(&session_id, INTERRUPT_MESSAGE).await;
    }
    if let Some(entry) = state.workers.get_mut(worker_id) {
        entry.worker.status = WorkerStatus::Cancelled;
        entry.worker.completed_at = Some(chrono::Utc::now());
    }
    state
        .dispatcher
        .emit(Event::WorkerCancelled { orchestrator_id: orchestrator_id.clone(), worker_id: worker_id.to_string() })
        .await;
    drain_queue(state, &orchestrator_id).await;
    Ok(())
}

async fn retry_worker(state: &mut PoolState, worker_id: &str) -> PoolResult<String> {
    let entry = state.workers.get(worker_id).ok_or_else(|| PoolError::WorkerNotFound(worker_id.to_string()))?;
    if !matches!(entry.worker.status, WorkerStatus::Failed | WorkerStatus::Timeout) {
        return Err(PoolError::TerminalWorker(worker_id.to_string()));
    }
    if entry.worker.retry_count >= entry.template.config.retry_max {
        return Err(PoolError::RetryExhausted(worker_id.to_string()));
    }

    let orchestrator_id = entry.worker.orchestrator_id.clone();
    let task = entry.task.clone();
    let retry_count = entry.worker.retry_count + 1;
    let template = entry.template.clone();

    // Preserve the old record under a `.retryN` suffix (spec §4.5).
    let mut old = state.workers.remove(worker_id).expect("entry existed above");
    let archived_id = format!("{}.retry{}", old.worker.worker_id, old.worker.retry_count);
    old.worker.worker_id = archived_id.clone();
    state.workers.insert(archived_id, old);

    let Some(queue) = state.queues.get(&orchestrator_id) else {
        return Err(PoolError::WorkerNotFound(worker_id.to_string()));
    };
    let variables = queue.variables.clone();
    let cwd = queue.cwd.clone();

    let Some(new_worker_id) = spawn_worker(state, &orchestrator_id, task, template, variables, cwd).await else {
        return Err(PoolError::SpawnFailed(worker_id.to_string()));
    };
    if let Some(entry) = state.workers.get_mut(&new_worker_id) {
        entry.worker.retry_count = retry_count;
    }
    Ok(new_worker_id)
}

async fn cleanup(state: &mut PoolState, orchestrator_id: &str, mode: CleanupMode) -> PoolResult<()> {
    let ids: Vec<(String, Option<String>)> = state
        .workers
        .values()
        .filter(|e| e.worker.orchestrator_id == orchestrator_id)
        .map(|e| (e.worker.worker_id.clone(), e.worker.session_id.clone()))
        .collect();

    for (worker_id, session_id) in ids {
        if let Some(session_id) = session_id {
            let outcome = match mode {
                CleanupMode::Archive => state.adapter.archive_session(&session_id).await,
                CleanupMode::Delete => state.adapter.delete_session(&session_id).await,
            };
            if let Err(e) = outcome {
                warn!(%worker_id, error = %e, "cleanup: best-effort session cleanup failed");
            }
        }
        state.workers.remove(&worker_id);
    }
    state.queues.remove(orchestrator_id);
    Ok(())
}

async fn poll_due_workers(state: &mut PoolState) {
    let now = Instant::now();
    let due: Vec<String> = state
        .workers
        .iter()
        .filter(|(_, e)| {
            !e.worker.status.is_terminal() && e.worker.status != WorkerStatus::Paused && e.next_poll_at <= now
        })
        .map(|(id, _)| id.clone())
        .collect();

    for worker_id in due {
        poll_worker(state, &worker_id).await;
    }
}

async fn poll_worker(state: &mut PoolState, worker_id: &str) {
    let Some(entry) = state.workers.get(worker_id) else { return };
    let orchestrator_id = entry.worker.orchestrator_id.clone();
    let Some(session_id) = entry.worker.session_id.clone() else { return };
    let poll_interval = Duration::from_millis(entry.template.config.poll_interval_ms);
    let worker_timeout = Duration::from_millis(entry.template.config.worker_timeout_ms);
    let started_at = entry.worker.started_at;
    let cursor = entry.worker.transcript_cursor;

    let transcript = match state.adapter.get_transcript(&session_id).await {
        Ok(t) => t,
        Err(e) => {
            let Some(entry) = state.workers.get_mut(worker_id) else { return };
            entry.worker.consecutive_poll_failures += 1;
            entry.next_poll_at = Instant::now() + poll_interval;
            warn!(%worker_id, error = %e, failures = entry.worker.consecutive_poll_failures, "poll_worker: transcript fetch failed");
            if entry.worker.consecutive_poll_failures >= MAX_CONSECUTIVE_POLL_FAILURES {
                entry.worker.status = WorkerStatus::Failed;
                entry.worker.completed_at = Some(chrono::Utc::now());
                state
                    .dispatcher
                    .emit(Event::WorkerFailed {
                        orchestrator_id: orchestrator_id.clone(),
                        worker_id: worker_id.to_string(),
                        reason: "repeated poll failures".into(),
                    })
                    .await;
                drain_queue(state, &orchestrator_id).await;
            }
            return;
        }
    };

    let new_entries = transcript.get(cursor..).unwrap_or_default();
    for entry_item in new_entries {
        if entry_item.kind != TranscriptEntryKind::Assistant {
            continue;
        }
        for tool_name in entry_item.content.tool_uses() {
            if let Some(e) = state.workers.get_mut(worker_id) {
                e.worker.record_tool_use(&tool_name);
            }
        }
        let text = entry_item.content.as_text();
        let parsed = parser::parse_multiple(&text);
        for result in parsed.results {
            match result.payload {
                Some(PhasePayload::Progress(p)) => {
                    if let Some(e) = state.workers.get_mut(worker_id) {
                        e.worker.progress_pct = p.progress_percent;
                        e.worker.current_action = p.current_action.clone();
                    }
                    state
                        .dispatcher
                        .emit(Event::WorkerProgress {
                            orchestrator_id: orchestrator_id.clone(),
                            worker_id: worker_id.to_string(),
                            progress_pct: p.progress_percent,
                        })
                        .await;
                }
                Some(PhasePayload::Completion(c)) => {
                    let status = match c.status {
                        CompletionStatus::Success | CompletionStatus::Partial => WorkerStatus::Completed,
                        CompletionStatus::Failed => WorkerStatus::Failed,
                        CompletionStatus::Timeout => WorkerStatus::Timeout,
                    };
                    if let Some(e) = state.workers.get_mut(worker_id) {
                        e.worker.output = Some(WorkerOutput {
                            summary: c.summary.clone(),
                            output: c.output.clone(),
                            error: c.error.clone(),
                            warnings: c.warnings.clone(),
                        });
                        e.worker.output_files = c.output_files.clone();
                        e.worker.status = status;
                        e.worker.completed_at = Some(chrono::Utc::now());
                    }
                    let event = if status == WorkerStatus::Failed {
                        Event::WorkerFailed {
                            orchestrator_id: orchestrator_id.clone(),
                            worker_id: worker_id.to_string(),
                            reason: c.error.clone().unwrap_or_default(),
                        }
                    } else {
                        Event::WorkerCompleted {
                            orchestrator_id: orchestrator_id.clone(),
                            worker_id: worker_id.to_string(),
                        }
                    };
                    state.dispatcher.emit(event).await;
                    drain_queue(state, &orchestrator_id).await;
                }
                _ => {
                    if let Some(err) = result.error {
                        debug!(%worker_id, %err, "poll_worker: response block parse fault, continuing");
                    }
                }
            }
        }
    }

    if let Some(e) = state.workers.get_mut(worker_id) {
        e.worker.transcript_cursor = transcript.len();
        e.worker.last_polled_at = Some(chrono::Utc::now());
        e.worker.consecutive_poll_failures = 0;
        e.next_poll_at = Instant::now() + poll_interval;
    }

    if let Some(started_at) = started_at {
        let elapsed = chrono::Utc::now().signed_duration_since(started_at);
        if elapsed.to_std().unwrap_or_default() > worker_timeout {
            if let Some(e) = state.workers.get_mut(worker_id) {
                if !e.worker.status.is_terminal() {
                    e.worker.status = WorkerStatus::Timeout;
                    e.worker.completed_at = Some(chrono::Utc::now());
                }
            }
            state
                .dispatcher
                .emit(Event::WorkerTimeout { orchestrator_id: orchestrator_id.clone(), worker_id: worker_id.to_string() })
                .await;
            if let Some(session_id) = state.workers.get(worker_id).and_then(|e| e.worker.session_id.clone()) {
                let _ = state.adapter.send_message(&session_id, INTERRUPT_MESSAGE).await;
            }
            drain_queue(state, &orchestrator_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_count_counts_only_active_statuses() {
        let mut workers = HashMap::new();
        let mut w1 = Worker::new("o1", "t1");
        w1.status = WorkerStatus::Running;
        let mut w2 = Worker::new("o1", "t2");
        w2.status = WorkerStatus::Completed;
        let mut w3 = Worker::new("o1", "t3");
        w3.status = WorkerStatus::Paused;
        workers.insert(
            w1.worker_id.clone(),
            WorkerEntry { worker: w1, task: stub_task("t1"), template: stub_template(), next_poll_at: Instant::now() },
        );
        workers.insert(
            w2.worker_id.clone(),
            WorkerEntry { worker: w2, task: stub_task("t2"), template: stub_template(), next_poll_at: Instant::now() },
        );
        workers.insert(
            w3.worker_id.clone(),
            WorkerEntry { worker: w3, task: stub_task("t3"), template: stub_template(), next_poll_at: Instant::now() },
        );
        assert_eq!(running_count(&workers, "o1"), 2);
        assert_eq!(running_count(&workers, "o2"), 0);
    }

    fn stub_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: "t".into(),
            description: "d".into(),
            scope: None,
            priority: None,
            dependencies: vec![],
            estimated_tokens: None,
        }
    }

    fn stub_template() -> ResolvedTemplate {
        ResolvedTemplate {
            id: "_default".into(),
            name: "Default".into(),
            config: Default::default(),
            prompts: Default::default(),
            variables: HashMap::new(),
            phases: crate::domain::default_phases(),
        }
    }
}
