//! swarmhost - Orchestration engine for concurrent AI coding sessions
//!
//! Drives multi-task AI coding work through a host app's remote debug
//! protocol: an adapter talks to the host, templates shape the prompts,
//! an orchestrator walks a session through analysis/planning/execution/
//! aggregation phases, and a worker pool fans the execution phase out
//! across bounded concurrent sub-sessions.
//!
//! # Modules
//!
//! - [`adapter`] - `RemoteRuntimeAdapter`, the sole channel into the host
//! - [`templates`] - `TemplateStore`, prompt template resolution
//! - [`parser`] - `ResponseParser`, tagged response block parsing
//! - [`orchestrator`] - `OrchestratorManager`, the phase state machine
//! - [`pool`] - `WorkerPool`, bounded concurrent worker execution
//! - [`subsession`] - `SubSessionTracker`, parent/child session relations
//! - [`dispatcher`] - `Dispatcher`, the engine-wide event bus
//! - [`domain`] - shared record types
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod adapter;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod pool;
pub mod subsession;
pub mod templates;

pub use adapter::{AdapterError, RemoteRuntimeAdapter};
pub use config::Config;
pub use dispatcher::{Dispatcher, Event};
pub use error::EngineError;
pub use orchestrator::{OrchestratorError, OrchestratorManager};
pub use pool::{PoolError, WorkerPool};
pub use subsession::{SubSessionError, SubSessionTracker};
pub use templates::{TemplateError, TemplateStore};
