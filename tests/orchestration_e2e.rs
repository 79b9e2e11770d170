//! End-to-end run of a full orchestration: analysis, task planning,
//! bounded-concurrency worker execution, and aggregation, all driven
//! against a fake host runtime instead of a live AI session.

mod support;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::{sleep, timeout};

use swarmhost::adapter::RemoteRuntimeAdapter;
use swarmhost::dispatcher::Dispatcher;
use swarmhost::domain::{worker_session_name, OrchestratorStatus, Phase, Task, Template, TemplateConfig, TemplatePrompts};
use swarmhost::orchestrator::{CreateArgs, OrchestratorManager, TaskModifications};
use swarmhost::pool::WorkerPool;
use swarmhost::templates::TemplateStore;

const SENTINEL_PROMPT: &str = "placeholder <<<ORCHESTRATOR_RESPONSE>>> <<<END_ORCHESTRATOR_RESPONSE>>>";

fn response_block(phase: &str, data: serde_json::Value) -> String {
    format!(
        "<<<ORCHESTRATOR_RESPONSE>>>\n{}\n<<<END_ORCHESTRATOR_RESPONSE>>>",
        json!({ "phase": phase, "data": data })
    )
}

/// Poll a synchronous predicate until it's true or 5s pass.
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        loop {
            if predicate() {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition did not become true in time");
}

/// Poll an async predicate until it's true or 5s pass. Needed wherever the
/// check itself awaits (e.g. a round trip to the manager actor) so the
/// wait never blocks the runtime thread the actor is scheduled on.
async fn wait_for_async<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    timeout(Duration::from_secs(5), async {
        loop {
            if predicate().await {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition did not become true in time");
}

fn stub_task(id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("work for {title}"),
        scope: None,
        priority: None,
        dependencies: vec![],
        estimated_tokens: None,
    }
}

#[tokio::test]
async fn three_tasks_with_max_workers_two_reach_aggregation() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect to fake host");

    let templates_dir = tempfile::tempdir().expect("tempdir");
    let templates = Arc::new(TemplateStore::load(templates_dir.path()).await.expect("load templates"));
    templates
        .create_template(Template {
            id: "fast-split".to_string(),
            name: "Fast split".to_string(),
            extends: None,
            config: TemplateConfig {
                max_workers: 2,
                poll_interval_ms: 100,
                worker_timeout_ms: 600_000,
                auto_spawn_workers: false,
                retry_max: 1,
            },
            prompts: TemplatePrompts {
                analysis: SENTINEL_PROMPT.to_string(),
                task_planning: SENTINEL_PROMPT.to_string(),
                worker: SENTINEL_PROMPT.to_string(),
                aggregation: SENTINEL_PROMPT.to_string(),
            },
            variables: HashMap::new(),
            phases: swarmhost::domain::default_phases(),
        })
        .await
        .expect("register template");

    let dispatcher = Dispatcher::new();
    let pool = WorkerPool::spawn(adapter.clone(), dispatcher.clone());
    let data_dir = tempfile::tempdir().expect("tempdir");
    let manager = OrchestratorManager::spawn(
        adapter.clone(),
        templates.clone(),
        pool,
        dispatcher.clone(),
        data_dir.path().join("orchestrators.json"),
        Duration::from_millis(50),
        Duration::from_millis(50),
    );

    let orch = manager
        .create(CreateArgs {
            template_id: "fast-split".to_string(),
            cwd: "/tmp/project".to_string(),
            message: "split this work into three tasks".to_string(),
            custom_variables: HashMap::new(),
        })
        .await
        .expect("create orchestrator");
    let orchestrator_id = orch.id.clone();

    manager.start(&orchestrator_id).await.expect("start orchestrator");
    let main_session_id = manager.get(&orchestrator_id).await.unwrap().main_session_id.expect("main session assigned");

    host.push_assistant(
        &main_session_id,
        &response_block(
            "analysis",
            json!({
                "summary": "three independent modules",
                "recommended_splits": 3,
                "key_files": ["a.rs", "b.rs", "c.rs"],
            }),
        ),
    );
    wait_for_async(|| {
        let manager = manager.clone();
        let orchestrator_id = orchestrator_id.clone();
        async move { manager.get(&orchestrator_id).await.map(|o| o.analysis.is_some()).unwrap_or(false) }
    })
    .await;

    let tasks = vec![stub_task("t1", "Module A"), stub_task("t2", "Module B"), stub_task("t3", "Module C")];
    host.push_assistant(
        &main_session_id,
        &response_block("task_list", json!({ "tasks": tasks, "total_tasks": 3 })),
    );
    wait_for_async(|| {
        let manager = manager.clone();
        let orchestrator_id = orchestrator_id.clone();
        async move { manager.get(&orchestrator_id).await.map(|o| o.tasks.is_some()).unwrap_or(false) }
    })
    .await;

    manager.confirm_tasks_and_spawn(&orchestrator_id, TaskModifications::default()).await.expect("confirm tasks");

    // maxWorkers=2 over 3 tasks: the third session only appears once a
    // worker finishes and the pool drains the next task off the queue.
    let session_for = |task_id: &str| worker_session_name(&orchestrator_id, task_id);
    wait_for(|| {
        let ids = host.session_ids();
        ids.contains(&session_for("t1")) && ids.contains(&session_for("t2"))
    })
    .await;

    host.push_assistant(
        &session_for("t1"),
        &response_block("completion", json!({ "task_id": "t1", "status": "success", "summary": "module a done" })),
    );
    wait_for(|| host.session_ids().contains(&session_for("t3"))).await;

    host.push_assistant(
        &session_for("t2"),
        &response_block("completion", json!({ "task_id": "t2", "status": "success", "summary": "module b done" })),
    );
    host.push_assistant(
        &session_for("t3"),
        &response_block("completion", json!({ "task_id": "t3", "status": "success", "summary": "module c done" })),
    );

    wait_for_async(|| {
        let manager = manager.clone();
        let orchestrator_id = orchestrator_id.clone();
        async move {
            manager.get(&orchestrator_id).await.map(|o| o.current_phase == Phase::Aggregation).unwrap_or(false)
        }
    })
    .await;

    host.push_assistant(
        &main_session_id,
        &response_block(
            "aggregation",
            json!({
                "status": "success",
                "summary": "all three modules merged cleanly",
                "merged_output": { "files_touched": 3 },
            }),
        ),
    );

    wait_for_async(|| {
        let manager = manager.clone();
        let orchestrator_id = orchestrator_id.clone();
        async move {
            manager.get(&orchestrator_id).await.map(|o| o.status == OrchestratorStatus::Completed).unwrap_or(false)
        }
    })
    .await;

    let final_state = manager.get(&orchestrator_id).await.expect("final get");
    assert_eq!(final_state.current_phase, Phase::Done);
    let aggregation = final_state.aggregation.expect("aggregation result recorded");
    assert_eq!(aggregation.status, "success");
    assert_eq!(aggregation.summary.as_deref(), Some("all three modules merged cleanly"));
}
