//! Error types for the Notary.

use chainsign_core::{CoreError, JournalError, RegisterError, SignError};
use chainsign_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Notary operations.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Registration was rejected.
    #[error("registration rejected: {0}")]
    Register(#[from] RegisterError),

    /// Signing was rejected.
    #[error("signing rejected: {0}")]
    Sign(#[from] SignError),

    /// Invalid input value.
    #[error("invalid value: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The journal failed verification or replay.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// The journal replays cleanly but disagrees with stored state.
    #[error("audit mismatch: {0}")]
    AuditMismatch(String),
}

impl NotaryError {
    /// Whether this is a rule rejection rather than an infrastructure fault.
    ///
    /// Rejections leave state untouched and retrying them never helps.
    pub fn is_rejection(&self) -> bool {
        matches!(self, NotaryError::Register(_) | NotaryError::Sign(_))
    }
}

/// Result type for Notary operations.
pub type Result<T> = std::result::Result<T, NotaryError>;
