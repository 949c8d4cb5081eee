//! Error types for Chainsign Core.

use thiserror::Error;

use crate::journal::EntryId;
use crate::types::{DocumentHash, Identity};

/// Errors from constructing or decoding core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cid must not be empty")]
    EmptyCid,

    #[error("invalid document hash: {0}")]
    InvalidHash(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Rejection of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The identity already holds a record. Permanent.
    #[error("identity {0} is already registered")]
    AlreadyRegistered(Identity),
}

/// Rejection of a signing call.
///
/// Variants are listed in the order the checks run; the first failing
/// check wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("signatory {0} is not registered")]
    SignatoryNotRegistered(Identity),

    #[error("document {0} is already linked to a parent")]
    ChildAlreadyLinked(DocumentHash),

    #[error("signatory {signer} has already signed the chain rooted at {root}")]
    AlreadySigned {
        signer: Identity,
        root: DocumentHash,
    },
}

/// Journal verification and replay failures.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("invalid sequence number: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    #[error("broken link at seq {seq}: expected prev {expected:?}, got {got:?}")]
    BrokenLink {
        seq: u64,
        expected: Option<EntryId>,
        got: Option<EntryId>,
    },

    #[error("entry id mismatch at seq {seq}")]
    IdMismatch { seq: u64 },

    #[error("entry at seq {seq} does not replay: {reason}")]
    Replay { seq: u64, reason: String },

    #[error("malformed entry: {0}")]
    Malformed(String),
}

impl From<CoreError> for JournalError {
    fn from(e: CoreError) -> Self {
        JournalError::Malformed(e.to_string())
    }
}
