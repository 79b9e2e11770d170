//! Crate-wide error taxonomy (spec §7).
//!
//! Each component owns its own `thiserror` enum at its seam
//! (`adapter::AdapterError`, `templates::TemplateError`,
//! `parser::ParseError`, `orchestrator::OrchestratorError`,
//! `pool::PoolError`); `EngineError` aggregates them for call sites that
//! return a heterogeneous outcome across components, namely the CLI.

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::orchestrator::OrchestratorError;
use crate::parser::ParseError;
use crate::pool::PoolError;
use crate::templates::TemplateError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
