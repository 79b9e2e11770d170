//! SubSessionTracker error taxonomy (spec §4.6).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SubSessionError {
    #[error("subsession not found: {0}")]
    NotFound(String),

    #[error("adapter error: {0}")]
    Adapter(String),
}

impl From<crate::adapter::AdapterError> for SubSessionError {
    fn from(e: crate::adapter::AdapterError) -> Self {
        Self::Adapter(e.to_string())
    }
}
