//! swarmhostd - CLI entry point wiring the engine components together for
//! local operation and inspection (SPEC_FULL §F.2a, §F.3).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use swarmhost::adapter::RemoteRuntimeAdapter;
use swarmhost::cli::{Cli, Command};
use swarmhost::config::Config;
use swarmhost::dispatcher::Dispatcher;
use swarmhost::orchestrator::{CreateArgs, OrchestratorManager, TaskModifications};
use swarmhost::pool::{CleanupMode, WorkerPool};
use swarmhost::subsession::SubSessionTracker;
use swarmhost::templates::TemplateStore;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("swarmhost").join("logs");

    fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("failed to load configuration")?;

    info!(
        discovery_url = %config.adapter.discovery_url,
        max_workers = config.concurrency.max_workers,
        "swarmhostd starting"
    );

    let adapter = RemoteRuntimeAdapter::connect(&config.adapter.discovery_url, &config.adapter.product_marker)
        .await
        .context("failed to connect to host runtime")?;

    let templates =
        Arc::new(TemplateStore::load(config.storage.templates_dir.clone()).await.context("failed to load templates")?);

    let dispatcher = Dispatcher::new();
    let pool = WorkerPool::spawn(adapter.clone(), dispatcher.clone());
    let manager = OrchestratorManager::spawn(
        adapter.clone(),
        templates.clone(),
        pool,
        dispatcher.clone(),
        config.storage.orchestrator_state_path.clone(),
        Duration::from_millis(config.storage.persistence_debounce_ms),
        Duration::from_millis(config.concurrency.poll_interval_ms),
    );
    let _subsessions = SubSessionTracker::spawn(
        adapter.clone(),
        dispatcher.clone(),
        Duration::from_millis(config.subsession.poll_interval_ms),
        Duration::from_millis(config.subsession.idle_threshold_ms),
        Duration::from_millis(config.subsession.orphan_threshold_ms),
        config.subsession.forward_results,
    );

    if let Err(e) = manager.rehydrate().await {
        tracing::warn!(error = %e, "failed to rehydrate persisted orchestrator state");
    }

    match cli.command {
        None | Some(Command::Status { orchestrator_id: None }) => {
            let metrics = manager.metrics().await;
            println!("swarmhostd v{}", env!("GIT_DESCRIBE"));
            println!(
                "  orchestrators: {} total, {} running, {} completed, {} cancelled, {} errored",
                metrics.total, metrics.running, metrics.completed, metrics.cancelled, metrics.errored
            );
        }
        Some(Command::Status { orchestrator_id: Some(id) }) => {
            let orch = manager.get(id).await?;
            println!("{}", serde_json::to_string_pretty(&orch)?);
        }
        Some(Command::Templates) => {
            for t in templates.list_templates().await {
                println!("{}\t{}{}", t.id, t.name, if t.is_system { " (system)" } else { "" });
            }
        }
        Some(Command::Create { template, cwd, message }) => {
            let orch = manager
                .create(CreateArgs {
                    template_id: template,
                    cwd: cwd.to_string_lossy().to_string(),
                    message,
                    custom_variables: Default::default(),
                })
                .await?;
            println!("created orchestrator {}", orch.id);
        }
        Some(Command::Start { orchestrator_id }) => {
            manager.start(&orchestrator_id).await?;
            println!("started orchestrator {orchestrator_id}");
        }
        Some(Command::Confirm { orchestrator_id, drop_task }) => {
            manager
                .confirm_tasks_and_spawn(
                    &orchestrator_id,
                    TaskModifications { drop_task_ids: drop_task, edited_tasks: Vec::new() },
                )
                .await?;
            println!("confirmed tasks for orchestrator {orchestrator_id}, spawning workers");
        }
        Some(Command::Pause { orchestrator_id }) => {
            manager.pause(&orchestrator_id).await?;
            println!("paused orchestrator {orchestrator_id}");
        }
        Some(Command::Resume { orchestrator_id }) => {
            manager.resume(&orchestrator_id).await?;
            println!("resumed orchestrator {orchestrator_id}");
        }
        Some(Command::Cancel { orchestrator_id, delete }) => {
            let mode = if delete { CleanupMode::Delete } else { CleanupMode::Archive };
            manager.cancel(&orchestrator_id, mode).await?;
            println!("cancelled orchestrator {orchestrator_id}");
        }
        Some(Command::Logs { follow, lines }) => {
            print_logs(follow, lines).await?;
        }
    }

    Ok(())
}

async fn print_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path =
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("swarmhost").join("logs").join("swarmhost.log");

    let content = fs::read_to_string(&log_path).unwrap_or_default();
    for line in content.lines().rev().take(lines).collect::<Vec<_>>().into_iter().rev() {
        println!("{line}");
    }

    if follow {
        tracing::warn!("log following is not implemented for this local inspection tool");
    }
    Ok(())
}
