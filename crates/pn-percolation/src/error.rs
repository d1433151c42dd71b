//! Error types for percolation runs.

use pn_core::CoreError;
use thiserror::Error;

/// Errors raised by the percolation engines.
///
/// Degenerate inputs (empty inlet set, disconnected regions, no outlets)
/// are valid configurations that produce trivial results, never errors.
#[derive(Error, Debug)]
pub enum PercolationError {
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Invalid state: {what}")]
    InvalidState { what: &'static str },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type PercResult<T> = Result<T, PercolationError>;
