//! # Chainsign
//!
//! The unified API for the Chainsign system - a signatory registry and a
//! tamper-evident ledger of document signing chains.
//!
//! ## Overview
//!
//! Chainsign provides a portable library for:
//!
//! - **Registry**: Binding each identity to one content identifier, forever
//! - **Chains**: Linking document versions to the chain they were derived from
//! - **Endorsements**: One signature per identity per chain, in order
//! - **Journal**: A hash-chained log of every accepted operation
//!
//! ## Key Concepts
//!
//! - **Signatory**: An identity with a registered cid. Never updated.
//! - **Chain**: Document hashes sharing a root and an endorser list.
//! - **Root**: The hash a chain resolves to. Children are linked straight to it.
//! - **Audit**: Replaying the journal and comparing it to stored state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chainsign::{Notary, NotaryConfig};
//! use chainsign::core::{Cid, DocumentHash, Identity};
//! use chainsign::store::SqliteStore;
//!
//! async fn example() {
//!     // Open storage
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Create the notary, auditing whatever is already stored
//!     let notary = Notary::open(store, NotaryConfig::default()).await.unwrap();
//!
//!     // Register a signatory
//!     let alice = Identity::random();
//!     notary.register(alice, Cid::try_from("Qm-alice").unwrap()).await.unwrap();
//!
//!     // Sign a new version of a document
//!     let draft = DocumentHash::digest(b"draft");
//!     let revision = DocumentHash::digest(b"revision");
//!     notary.sign(revision, draft, alice).await.unwrap();
//!
//!     let endorsers = notary.endorsers_of(&revision).await.unwrap();
//!     assert_eq!(endorsers, vec![alice]);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `chainsign::core` - Core primitives (DocumentHash, Identity, Ledger, etc.)
//! - `chainsign::store` - Storage abstraction and SQLite

pub mod error;
pub mod notary;

// Re-export component crates
pub use chainsign_core as core;
pub use chainsign_store as store;

// Re-export main types for convenience
pub use error::{NotaryError, Result};
pub use notary::{AuditReport, Notary, NotaryConfig};

// Re-export commonly used core types
pub use chainsign_core::{
    Cid, DocumentHash, Endorsement, EntryId, Identity, JournalEntry, JournalEvent, RegisterError,
    SignError, Signatory,
};
