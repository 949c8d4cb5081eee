//! # Chainsign Store
//!
//! Storage abstraction for Chainsign. Provides a trait-based interface for
//! registry, chain and journal persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts ledger storage behind the [`Store`] trait,
//! allowing the notary to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of registering a signatory
//! - [`StoreSnapshot`] - Journal and state read at one instant, for audits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chainsign_store::{SqliteStore, Store, InsertResult};
//! use chainsign_core::{Cid, Identity, Signatory};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let alice = Signatory::new(Identity::random(), Cid::try_from("Qm-alice").unwrap());
//!     let result = store.register_signatory(&alice).await.unwrap();
//!     assert_eq!(result, InsertResult::Inserted);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **First write wins**: Registering an identity twice returns `AlreadyExists`
//! - **Checked writes**: `apply_signature` runs the signing rules and the
//!   write under one lock or transaction
//! - **Journaled**: Every accepted mutation appends a hash-chained entry

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store, StoreExt, StoreSnapshot};
