//! # Chainsign Core
//!
//! Pure primitives for Chainsign: a registry of signatories and a ledger of
//! document chains whose endorsements accumulate at the chain root.
//!
//! This crate contains no I/O and no storage. Backends implement
//! [`ChainView`] and reuse [`check_signature`] so every store applies the
//! same rules in the same order.
//!
//! ## Key Types
//!
//! - [`DocumentHash`] - Opaque 32-byte identifier of one document version
//! - [`Identity`] - 20-byte caller address
//! - [`Cid`] - Non-empty content identifier bound at registration
//! - [`Ledger`] - In-memory reference state machine
//! - [`JournalEntry`] - Hash-chained record of an accepted operation
//!
//! ## Canonicalization
//!
//! Journal entries are encoded using deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod chain;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod types;

pub use chain::{check_signature, resolve_root, ChainView, Endorsement, SignOutcome, SignRequest};
pub use error::{CoreError, JournalError, RegisterError, SignError};
pub use journal::{verify_journal, EntryId, JournalEntry, JournalEvent};
pub use ledger::{Ledger, LedgerStats};
pub use types::{Cid, DocumentHash, Identity, Signatory};
