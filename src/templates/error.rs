//! TemplateStore error taxonomy (spec §4.2, §7 `ConfigError`).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("cyclic extends chain starting at {0}")]
    CyclicExtends(String),

    #[error("system template is immutable: {0}")]
    SystemTemplateImmutable(String),

    #[error("template {id} failed validation: {reason}")]
    Invalid { id: String, reason: String },

    #[error("io error loading templates: {0}")]
    Io(String),
}
