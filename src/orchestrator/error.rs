//! OrchestratorManager error taxonomy (spec §7 `StateError`).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OrchestratorError {
    #[error("orchestrator not found: {0}")]
    NotFound(String),

    #[error("illegal phase transition for orchestrator {id}: {from:?} -> {to:?}")]
    IllegalPhaseTransition { id: String, from: String, to: String },

    #[error("operation not valid on a terminal orchestrator: {0}")]
    TerminalOrchestrator(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("pool error: {0}")]
    Pool(String),

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<crate::templates::TemplateError> for OrchestratorError {
    fn from(e: crate::templates::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<crate::pool::PoolError> for OrchestratorError {
    fn from(e: crate::pool::PoolError) -> Self {
        Self::Pool(e.to_string())
    }
}

impl From<crate::adapter::AdapterError> for OrchestratorError {
    fn from(e: crate::adapter::AdapterError) -> Self {
        Self::Adapter(e.to_string())
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
