//! Error types for ledger operations

use thiserror::Error;

use crate::records::{BookId, MemberId, RowId};

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors reported by the ledger, its store and its configuration.
///
/// The first four variants are the caller-correctable domain errors; the rest
/// describe missing rows, corrupted data or plumbing failures.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{member} already holds {limit} active loans")]
    Capacity { member: MemberId, limit: u32 },

    #[error("no copies of {book} are available")]
    Unavailable { book: BookId },

    #[error("cannot {action} {entity} while it is {state}")]
    InvalidState { entity: String, state: &'static str, action: String },

    #[error("{reason}")]
    State { reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("ledger data is inconsistent: {0}")]
    Inconsistent(String),

    #[error("invalid setting {name} = {value:?}: {reason}")]
    InvalidSetting { name: String, value: String, reason: String },

    #[error("unknown {kind} status: {value:?}")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// Build a `NotFound` error for any row identifier
    pub fn not_found(id: impl RowId) -> Self {
        Self::NotFound { entity: id.entity(), id: id.raw() }
    }

    /// Build a `State` error from a message
    pub fn state(reason: impl Into<String>) -> Self {
        Self::State { reason: reason.into() }
    }
}
