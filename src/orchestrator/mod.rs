//! OrchestratorManager (spec §4.4) — the phase state machine driving a
//! single orchestration run from `analysis` through `aggregation`.
//!
//! Structured like the other actors in this crate: a single task owns
//! `HashMap<String, Orchestrator>` and talks to the adapter, template
//! store, worker pool, and dispatcher on the state's behalf. It also
//! subscribes to the dispatcher itself, to learn when a worker pool
//! finishes a task without the pool calling back into this module
//! directly (the "events via an explicit Dispatcher" redesign).

mod error;
mod messages;
mod persistence;

pub use error::OrchestratorError;
pub use messages::{CreateArgs, OrchestratorMetrics, TaskModifications};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::adapter::RemoteRuntimeAdapter;
use crate::dispatcher::{Dispatcher, Event};
use crate::domain::{AggregationResult, AnalysisResult, Orchestrator, OrchestratorStatus, Phase, Task};
use crate::parser::{self, PhasePayload};
use crate::pool::{CleanupMode, WorkerPool};
use crate::templates::{substitute, TemplateStore};

use messages::{OrchestratorCommand, OrchResult};
use persistence::PersistenceHandle;

fn channel_closed(_: oneshot::error::RecvError) -> OrchestratorError {
    OrchestratorError::NotFound("manager actor shut down".into())
}

/// Handle to the manager actor. Cheap to clone.
#[derive(Clone)]
pub struct OrchestratorManager {
    tx: mpsc::Sender<OrchestratorCommand>,
}

impl OrchestratorManager {
    pub fn spawn(
        adapter: RemoteRuntimeAdapter,
        templates: Arc<TemplateStore>,
        pool: WorkerPool,
        dispatcher: Dispatcher,
        data_path: impl Into<PathBuf>,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let data_path = data_path.into();
        let persistence = PersistenceHandle::spawn(data_path.clone(), debounce);
        tokio::spawn(actor_loop(
            ManagerState {
                adapter,
                templates,
                pool,
                dispatcher: dispatcher.clone(),
                persistence,
                data_path,
                orchestrators: HashMap::new(),
                poll_interval,
            },
            dispatcher,
            rx,
        ));
        Self { tx }
    }

    pub async fn create(&self, args: CreateArgs) -> OrchResult<Orchestrator> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Create { args, reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn start(&self, orchestrator_id: impl Into<String>) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Start { orchestrator_id: orchestrator_id.into(), reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn confirm_tasks_and_spawn(
        &self,
        orchestrator_id: impl Into<String>,
        modifications: TaskModifications,
    ) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::ConfirmTasksAndSpawn {
            orchestrator_id: orchestrator_id.into(),
            modifications,
            reply,
        })
        .await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn pause(&self, orchestrator_id: impl Into<String>) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Pause { orchestrator_id: orchestrator_id.into(), reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn resume(&self, orchestrator_id: impl Into<String>) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Resume { orchestrator_id: orchestrator_id.into(), reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn cancel(&self, orchestrator_id: impl Into<String>, cleanup: CleanupMode) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Cancel { orchestrator_id: orchestrator_id.into(), cleanup, reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn get(&self, orchestrator_id: impl Into<String>) -> OrchResult<Orchestrator> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Get { orchestrator_id: orchestrator_id.into(), reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    pub async fn list(&self) -> Vec<Orchestrator> {
        let (reply, rx) = oneshot::channel();
        if self.send(OrchestratorCommand::List { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn metrics(&self) -> OrchestratorMetrics {
        let (reply, rx) = oneshot::channel();
        if self.send(OrchestratorCommand::Metrics { reply }).await.is_err() {
            return OrchestratorMetrics::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Load the persisted table from disk without resuming polling on any
    /// non-terminal orchestrator (spec §4.4 "Persistence"; SPEC_FULL §G).
    pub async fn rehydrate(&self) -> OrchResult<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Rehydrate { reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    /// Explicit operator action: resume transcript polling for a
    /// non-terminal orchestrator loaded by `rehydrate` (SPEC_FULL §G).
    pub async fn rearm(&self, orchestrator_id: impl Into<String>) -> OrchResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Rearm { orchestrator_id: orchestrator_id.into(), reply }).await?;
        rx.await.map_err(channel_closed)?
    }

    async fn send(&self, cmd: OrchestratorCommand) -> OrchResult<()> {
        self.tx.send(cmd).await.map_err(|_| OrchestratorError::NotFound("manager actor shut down".into()))
    }
}

struct ManagerState {
    adapter: RemoteRuntimeAdapter,
    templates: Arc<TemplateStore>,
    pool: WorkerPool,
    dispatcher: Dispatcher,
    persistence: PersistenceHandle,
    data_path: PathBuf,
    orchestrators: HashMap<String, Orchestrator>,
    poll_interval: Duration,
}

async fn actor_loop(mut state: ManagerState, dispatcher: Dispatcher, mut rx: mpsc::Receiver<OrchestratorCommand>) {
    let mut sub = dispatcher.subscribe().await;
    let mut tick = tokio::time::interval(state.poll_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(&mut state, cmd).await;
            }
            event = sub.recv() => {
                let Some(event) = event else { continue };
                handle_event(&mut state, event).await;
            }
            _ = tick.tick() => {
                poll_active_orchestrators(&mut state).await;
            }
        }
    }
}

async fn handle_command(state: &mut ManagerState, cmd: OrchestratorCommand) {
    match cmd {
        OrchestratorCommand::Create { args, reply } => {
            let result = create(state, args).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Start { orchestrator_id, reply } => {
            let result = start(state, &orchestrator_id).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::ConfirmTasksAndSpawn { orchestrator_id, modifications, reply } => {
            let result = confirm_tasks_and_spawn(state, &orchestrator_id, modifications).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Pause { orchestrator_id, reply } => {
            let result = pause(state, &orchestrator_id).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Resume { orchestrator_id, reply } => {
            let result = resume(state, &orchestrator_id).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Cancel { orchestrator_id, cleanup, reply } => {
            let result = cancel(state, &orchestrator_id, cleanup).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Get { orchestrator_id, reply } => {
            let result = state
                .orchestrators
                .get(&orchestrator_id)
                .cloned()
                .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.clone()));
            let _ = reply.send(result);
        }
        OrchestratorCommand::List { reply } => {
            let _ = reply.send(state.orchestrators.values().cloned().collect());
        }
        OrchestratorCommand::Metrics { reply } => {
            let _ = reply.send(compute_metrics(state));
        }
        OrchestratorCommand::Rehydrate { reply } => {
            let result = rehydrate(state).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::Rearm { orchestrator_id, reply } => {
            let result = rearm(state, &orchestrator_id).await;
            let _ = reply.send(result);
        }
        OrchestratorCommand::PollTick => {
            poll_active_orchestrators(state).await;
        }
    }
}

fn compute_metrics(state: &ManagerState) -> OrchestratorMetrics {
    let mut m = OrchestratorMetrics::default();
    for o in state.orchestrators.values() {
        m.total += 1;
        match o.status {
            OrchestratorStatus::Completed => m.completed += 1,
            OrchestratorStatus::Cancelled => m.cancelled += 1,
            OrchestratorStatus::Error => m.errored += 1,
            OrchestratorStatus::Running | OrchestratorStatus::Paused | OrchestratorStatus::Created => {
                m.running += 1
            }
        }
    }
    m
}

async fn persist(state: &ManagerState) {
    state.persistence.save(state.orchestrators.clone()).await;
}

async fn create(state: &mut ManagerState, args: CreateArgs) -> OrchResult<Orchestrator> {
    debug!(template_id = %args.template_id, "OrchestratorManager::create: called");
    let resolved = state.templates.get_template(&args.template_id).await?;

    let mut variables = resolved.variables.clone();
    variables.extend(args.custom_variables);
    variables.insert("USER_REQUEST".into(), Value::String(args.message.clone()));

    let orch = Orchestrator::new(args.template_id.clone(), resolved, args.cwd.clone(), variables);
    state.orchestrators.insert(orch.id.clone(), orch.clone());
    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorCreated { orchestrator_id: orch.id.clone() }).await;
    info!(orchestrator_id = %orch.id, "create: new orchestrator recorded");
    Ok(orch)
}

async fn start(state: &mut ManagerState, orchestrator_id: &str) -> OrchResult<()> {
    let orch = state
        .orchestrators
        .get(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?
        .clone();

    let mut bindings = orch.variables.clone();
    bindings.insert("USER_REQUEST".into(), bindings.get("USER_REQUEST").cloned().unwrap_or(Value::String(String::new())));
    let prompt = substitute(&orch.resolved_template.prompts.analysis, &bindings);

    let started = state.adapter.start_session_with_message(&orch.cwd, &prompt, Default::default()).await?;

    let entry = state
        .orchestrators
        .get_mut(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
    entry.main_session_id = Some(started.session_id);
    entry.status = OrchestratorStatus::Running;
    entry.started_at = Some(chrono::Utc::now());

    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorStarted { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

async fn poll_active_orchestrators(state: &mut ManagerState) {
    let ids: Vec<String> = state
        .orchestrators
        .values()
        .filter(|o| {
            o.status == OrchestratorStatus::Running
                && matches!(
                    o.current_phase,
                    Phase::Analysis | Phase::AwaitingConfirmation | Phase::WorkerExecution | Phase::Aggregation
                )
                && o.main_session_id.is_some()
        })
        .map(|o| o.id.clone())
        .collect();

    for id in ids {
        if let Err(e) = process_phase(state, &id).await {
            warn!(orchestrator_id = %id, error = %e, "poll_active_orchestrators: process_phase failed");
            if let Some(entry) = state.orchestrators.get_mut(&id) {
                entry.mark_terminal(OrchestratorStatus::Error);
                entry.error_reason = Some(e.to_string());
            }
            persist(state).await;
            state.dispatcher.emit(Event::OrchestratorError { orchestrator_id: id.clone(), reason: e.to_string() }).await;
        }
    }
}

async fn process_phase(state: &mut ManagerState, orchestrator_id: &str) -> OrchResult<()> {
    let orch = state
        .orchestrators
        .get(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?
        .clone();
    let Some(session_id) = orch.main_session_id.clone() else { return Ok(()) };

    let transcript = state.adapter.get_transcript(&session_id).await?;
    let new_entries = transcript.get(orch.last_processed_transcript_offset..).unwrap_or_default().to_vec();
    if new_entries.is_empty() {
        return Ok(());
    }

    for entry_item in &new_entries {
        if entry_item.kind != crate::adapter::TranscriptEntryKind::Assistant {
            continue;
        }
        let text = entry_item.content.as_text();
        let parsed = parser::parse_multiple(&text);
        for result in parsed.results {
            match result.payload {
                Some(PhasePayload::Analysis(a)) => handle_analysis(state, orchestrator_id, a).await?,
                Some(PhasePayload::TaskList(t)) => {
                    handle_task_list(state, orchestrator_id, t.tasks).await?
                }
                Some(PhasePayload::Progress(p)) => {
                    debug!(orchestrator_id, task_id = %p.task_id, "process_phase: progress on main channel");
                }
                Some(PhasePayload::Completion(c)) => {
                    debug!(orchestrator_id, task_id = %c.task_id, "process_phase: completion on main channel");
                }
                Some(PhasePayload::Aggregation(a)) => handle_aggregation(state, orchestrator_id, a).await?,
                None => {
                    if let Some(err) = result.error {
                        debug!(orchestrator_id, %err, "process_phase: response block parse fault, continuing");
                    }
                }
            }
        }
    }

    if let Some(entry) = state.orchestrators.get_mut(orchestrator_id) {
        entry.last_processed_transcript_offset = transcript.len();
    }
    persist(state).await;
    Ok(())
}

async fn handle_analysis(state: &mut ManagerState, orchestrator_id: &str, data: crate::parser::AnalysisData) -> OrchResult<()> {
    let result = AnalysisResult {
        summary: data.summary,
        recommended_splits: data.recommended_splits,
        key_files: data.key_files,
        estimated_complexity: data.estimated_complexity,
        components: data.components,
        notes: data.notes,
        warnings: data.warnings,
    };

    let (session_id, prompt) = {
        let entry = state
            .orchestrators
            .get_mut(orchestrator_id)
            .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        entry.analysis = Some(result);
        entry.advance_phase(Phase::AwaitingConfirmation);
        let prompt = substitute(&entry.resolved_template.prompts.task_planning, &entry.variables);
        let session_id = entry.main_session_id.clone().ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        (session_id, prompt)
    };

    state.adapter.send_message(&session_id, &prompt).await?;
    state.dispatcher.emit(Event::OrchestratorAnalysisComplete { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

async fn handle_task_list(state: &mut ManagerState, orchestrator_id: &str, tasks: Vec<Task>) -> OrchResult<()> {
    let (task_count, auto_spawn) = {
        let entry = state
            .orchestrators
            .get_mut(orchestrator_id)
            .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        // Phase was already `awaitingConfirmation` once analysis advanced it;
        // advancing again here is a no-op if so, and a forward move if the
        // template skipped a formal analysis step.
        entry.advance_phase(Phase::AwaitingConfirmation);
        entry.tasks = Some(tasks.clone());
        (tasks.len(), entry.resolved_template.config.auto_spawn_workers)
    };

    state
        .dispatcher
        .emit(Event::OrchestratorTasksReady { orchestrator_id: orchestrator_id.to_string(), task_count })
        .await;

    if auto_spawn {
        confirm_tasks_and_spawn(state, orchestrator_id, TaskModifications::default()).await?;
    }
    Ok(())
}

async fn confirm_tasks_and_spawn(
    state: &mut ManagerState,
    orchestrator_id: &str,
    modifications: TaskModifications,
) -> OrchResult<()> {
    let (cwd, template, variables, tasks) = {
        let entry = state
            .orchestrators
            .get_mut(orchestrator_id)
            .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        let mut tasks = entry.tasks.clone().unwrap_or_default();
        if !modifications.drop_task_ids.is_empty() {
            tasks.retain(|t| !modifications.drop_task_ids.contains(&t.id));
        }
        for edited in modifications.edited_tasks {
            if let Some(existing) = tasks.iter_mut().find(|t| t.id == edited.id) {
                *existing = edited;
            }
        }
        entry.tasks = Some(tasks.clone());
        entry.advance_phase(Phase::WorkerExecution);
        (entry.cwd.clone(), entry.resolved_template.clone(), entry.variables.clone(), tasks)
    };

    state.pool.spawn_batch(orchestrator_id, cwd, tasks, template, variables).await?;
    persist(state).await;
    Ok(())
}

async fn pause(state: &mut ManagerState, orchestrator_id: &str) -> OrchResult<()> {
    let entry = state
        .orchestrators
        .get_mut(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
    if entry.status.is_terminal() {
        return Err(OrchestratorError::TerminalOrchestrator(orchestrator_id.to_string()));
    }
    entry.status = OrchestratorStatus::Paused;
    let worker_ids = state.pool.get_workers(orchestrator_id).await;
    for w in worker_ids {
        if !w.status.is_terminal() {
            let _ = state.pool.pause_worker(w.worker_id).await;
        }
    }
    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorPaused { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

async fn resume(state: &mut ManagerState, orchestrator_id: &str) -> OrchResult<()> {
    let entry = state
        .orchestrators
        .get_mut(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
    if entry.status != OrchestratorStatus::Paused {
        return Err(OrchestratorError::TerminalOrchestrator(orchestrator_id.to_string()));
    }
    entry.status = OrchestratorStatus::Running;
    let worker_ids = state.pool.get_workers(orchestrator_id).await;
    for w in worker_ids {
        if w.status == crate::domain::WorkerStatus::Paused {
            let _ = state.pool.resume_worker(w.worker_id).await;
        }
    }
    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorResumed { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

async fn cancel(state: &mut ManagerState, orchestrator_id: &str, cleanup: CleanupMode) -> OrchResult<()> {
    {
        let entry = state
            .orchestrators
            .get_mut(orchestrator_id)
            .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        if entry.status.is_terminal() {
            return Err(OrchestratorError::TerminalOrchestrator(orchestrator_id.to_string()));
        }
        entry.mark_terminal(OrchestratorStatus::Cancelled);
    }
    state.pool.cancel_all_for_orchestrator(orchestrator_id).await?;
    state.pool.cleanup(orchestrator_id, cleanup).await?;
    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorCancelled { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

/// Triggered by worker-terminal events (spec §4.4 "Aggregation trigger").
async fn handle_event(state: &mut ManagerState, event: Event) {
    let orchestrator_id = match &event {
        Event::WorkerCompleted { orchestrator_id, .. }
        | Event::WorkerFailed { orchestrator_id, .. }
        | Event::WorkerTimeout { orchestrator_id, .. }
        | Event::WorkerCancelled { orchestrator_id, .. } => orchestrator_id.clone(),
        _ => return,
    };

    let Some(orch) = state.orchestrators.get(&orchestrator_id) else { return };
    if orch.current_phase != Phase::WorkerExecution {
        return;
    }

    let workers = state.pool.get_workers(&orchestrator_id).await;
    if workers.is_empty() || !workers.iter().all(|w| w.status.is_terminal()) {
        return;
    }

    if let Err(e) = trigger_aggregation(state, &orchestrator_id, &workers).await {
        warn!(%orchestrator_id, error = %e, "handle_event: failed to trigger aggregation");
    }
}

async fn trigger_aggregation(
    state: &mut ManagerState,
    orchestrator_id: &str,
    workers: &[crate::domain::Worker],
) -> OrchResult<()> {
    let summaries: Vec<String> = workers
        .iter()
        .map(|w| {
            let summary = w.output.as_ref().and_then(|o| o.summary.clone()).unwrap_or_else(|| "(no summary)".into());
            format!("- task {}: {:?} — {}", w.task_id, w.status, summary)
        })
        .collect();

    let (session_id, prompt) = {
        let entry = state
            .orchestrators
            .get_mut(orchestrator_id)
            .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        let mut bindings = entry.variables.clone();
        bindings.insert("WORKER_SUMMARIES".into(), Value::String(summaries.join("\n")));
        let prompt = substitute(&entry.resolved_template.prompts.aggregation, &bindings);
        entry.advance_phase(Phase::Aggregation);
        let session_id = entry.main_session_id.clone().ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
        (session_id, prompt)
    };

    state.adapter.send_message(&session_id, &prompt).await?;
    persist(state).await;
    Ok(())
}

async fn handle_aggregation(
    state: &mut ManagerState,
    orchestrator_id: &str,
    data: crate::parser::AggregationData,
) -> OrchResult<()> {
    let result = AggregationResult {
        status: data.status,
        summary: data.summary,
        conflicts: data.conflicts,
        merged_output: data.merged_output,
        output_files: data.output_files,
    };

    let entry = state
        .orchestrators
        .get_mut(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
    entry.aggregation = Some(result);
    entry.mark_terminal(OrchestratorStatus::Completed);
    persist(state).await;
    state.dispatcher.emit(Event::OrchestratorCompleted { orchestrator_id: orchestrator_id.to_string() }).await;
    Ok(())
}

/// Loads the persisted table, but leaves every non-terminal orchestrator
/// parked: `poll_active_orchestrators` only considers orchestrators whose
/// status is `Running`, so a rehydrated `Running` record is demoted to
/// `Paused` until an operator calls `rearm` (SPEC_FULL §G decision: no
/// auto-restart on load).
async fn rehydrate(state: &mut ManagerState) -> OrchResult<usize> {
    let table = persistence::load_table(&state.data_path).await?;
    let count = table.len();
    for (id, mut orch) in table {
        if orch.status == OrchestratorStatus::Running {
            orch.status = OrchestratorStatus::Paused;
        }
        state.orchestrators.insert(id, orch);
    }
    info!(count, "rehydrate: loaded persisted orchestrator table");
    Ok(count)
}

async fn rearm(state: &mut ManagerState, orchestrator_id: &str) -> OrchResult<()> {
    let entry = state
        .orchestrators
        .get_mut(orchestrator_id)
        .ok_or_else(|| OrchestratorError::NotFound(orchestrator_id.to_string()))?;
    if entry.status.is_terminal() {
        return Err(OrchestratorError::TerminalOrchestrator(orchestrator_id.to_string()));
    }
    entry.status = OrchestratorStatus::Running;
    info!(orchestrator_id, "rearm: resuming transcript polling for rehydrated orchestrator");
    Ok(())
}
