//! Error types for kvlog
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvlog operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("no such key")]
    NotFound,

    #[error("invalid field: {0}")]
    InvalidField(String),

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    #[error("error opening transaction log file {}: {source}", .path.display())]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write to transaction log (sequence {sequence}): {source}")]
    LogWrite {
        sequence: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error reading transaction log at line {line}: {reason}")]
    LogParse { line: u64, reason: String },

    #[error("transaction sequence out of order at line {line}: {found} does not follow {last}")]
    OutOfOrder { line: u64, last: u64, found: u64 },

    #[error("transaction logger not started")]
    LoggerNotStarted,

    #[error("transaction logger already started")]
    LoggerAlreadyStarted,

    #[error("transaction logger closed")]
    LoggerClosed,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True for errors that mean the log cannot be replayed as written
    pub fn is_corruption(&self) -> bool {
        matches!(self, KvError::LogParse { .. } | KvError::OutOfOrder { .. })
    }
}
