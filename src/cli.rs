//! CLI command definitions (SPEC_FULL §F.2a). An operator tool over the
//! engine's public API, not a substitute for the excluded HTTP/WebSocket
//! surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "swarmhostd",
    about = "Orchestration engine for concurrent AI coding sessions",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/swarmhost/logs/swarmhost.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show orchestrator status and metrics
    Status {
        /// Show a specific orchestrator by id instead of the summary list
        #[arg(long)]
        orchestrator_id: Option<String>,
    },

    /// List available templates
    Templates,

    /// Create a new orchestrator from a template
    Create {
        /// Template id to instantiate
        #[arg(long)]
        template: String,

        /// Working directory for the main session
        #[arg(long)]
        cwd: PathBuf,

        /// Initial user request text
        message: String,
    },

    /// Start an orchestrator's analysis phase
    Start {
        orchestrator_id: String,
    },

    /// Confirm the parsed task list and spawn workers
    Confirm {
        orchestrator_id: String,

        /// Task ids to drop before spawning
        #[arg(long)]
        drop_task: Vec<String>,
    },

    /// Pause an orchestrator and its workers
    Pause {
        orchestrator_id: String,
    },

    /// Resume a paused orchestrator
    Resume {
        orchestrator_id: String,
    },

    /// Cancel an orchestrator
    Cancel {
        orchestrator_id: String,

        /// Delete worker sessions instead of archiving them
        #[arg(long)]
        delete: bool,
    },

    /// Show engine logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_no_command() {
        let cli = Cli::parse_from(["swarmhostd"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_create() {
        let cli = Cli::parse_from(["swarmhostd", "create", "--template", "_default", "--cwd", "/tmp", "fix the bug"]);
        match cli.command {
            Some(Command::Create { template, cwd, message }) => {
                assert_eq!(template, "_default");
                assert_eq!(cwd, PathBuf::from("/tmp"));
                assert_eq!(message, "fix the bug");
            }
            _ => panic!("expected Create command"),
        }
    }

    #[test]
    fn parses_confirm_with_drops() {
        let cli = Cli::parse_from(["swarmhostd", "confirm", "orch-1", "--drop-task", "t1", "--drop-task", "t2"]);
        match cli.command {
            Some(Command::Confirm { orchestrator_id, drop_task }) => {
                assert_eq!(orchestrator_id, "orch-1");
                assert_eq!(drop_task, vec!["t1".to_string(), "t2".to_string()]);
            }
            _ => panic!("expected Confirm command"),
        }
    }

    #[test]
    fn parses_cancel_with_delete() {
        let cli = Cli::parse_from(["swarmhostd", "cancel", "orch-1", "--delete"]);
        assert!(matches!(cli.command, Some(Command::Cancel { delete: true, .. })));
    }

    #[test]
    fn parses_status_with_id() {
        let cli = Cli::parse_from(["swarmhostd", "status", "--orchestrator-id", "orch-1"]);
        match cli.command {
            Some(Command::Status { orchestrator_id }) => assert_eq!(orchestrator_id, Some("orch-1".to_string())),
            _ => panic!("expected Status command"),
        }
    }
}
