//! ResponseParser error taxonomy (spec §7 `ProtocolError`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("response block is missing its end delimiter")]
    MissingEnd,

    #[error("response block is missing required field: {0}")]
    MissingField(String),

    #[error("response block has an unrecognized phase: {0}")]
    UnknownPhase(String),

    #[error("json payload could not be parsed even after tolerant recovery: {0}")]
    Malformed(String),
}
