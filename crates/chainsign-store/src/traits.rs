//! Store trait: the abstract interface for ledger persistence.
//!
//! This trait allows the notary to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use chainsign_core::{
    DocumentHash, Identity, JournalEntry, SignOutcome, SignRequest, Signatory,
};

use crate::error::Result;

/// Result of registering a signatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was created.
    Inserted,
    /// The identity already holds a record; nothing changed.
    AlreadyExists,
}

/// The journal together with the state it accounts for, read at one
/// instant.
///
/// Rows come in no particular order, except that `journal` is ordered by
/// seq and each endorser list is in acceptance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub journal: Vec<JournalEntry>,
    pub signatories: Vec<Signatory>,
    /// Stored links as `(child, parent)`.
    pub links: Vec<(DocumentHash, DocumentHash)>,
    /// Stored endorser lists as `(root, endorsers)`.
    pub endorsements: Vec<(DocumentHash, Vec<Identity>)>,
}

/// The Store trait: async interface for ledger persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic mutations**: `register_signatory` and `apply_signature` run
///   their checks, their writes and their journal append under one
///   exclusive lock. A rejected call changes nothing.
/// - **Consistent reads**: `resolve_root`, `endorsers_of` and `snapshot`
///   read under one lock, so a reader never sees a link without its
///   endorsement or the reverse.
/// - **Append-only**: nothing is ever updated or deleted.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a signatory record unless the identity already has one.
    async fn register_signatory(&self, signatory: &Signatory) -> Result<InsertResult>;

    /// Get the record for an identity.
    async fn get_signatory(&self, identity: &Identity) -> Result<Option<Signatory>>;

    /// Number of registered signatories.
    async fn count_signatories(&self) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Chains
    // ─────────────────────────────────────────────────────────────────────────

    /// The stored parent of `hash`, if it was ever used as a child.
    async fn get_link(&self, hash: &DocumentHash) -> Result<Option<DocumentHash>>;

    /// Root of the chain containing `hash`.
    async fn resolve_root(&self, hash: &DocumentHash) -> Result<DocumentHash>;

    /// Endorsers of the chain containing `hash`, in acceptance order.
    async fn endorsers_of(&self, hash: &DocumentHash) -> Result<Vec<Identity>>;

    /// Check a signing request and, if accepted, record the link and the
    /// endorsement.
    ///
    /// # Returns
    /// - `Accepted` with the stored endorsement.
    /// - `Rejected` with the first failing rule; nothing was written.
    async fn apply_signature(&self, request: &SignRequest) -> Result<SignOutcome>;

    // ─────────────────────────────────────────────────────────────────────────
    // Journal
    // ─────────────────────────────────────────────────────────────────────────

    /// The most recent journal entry.
    async fn journal_head(&self) -> Result<Option<JournalEntry>>;

    /// Journal entries with `seq > after_seq`, ordered by seq.
    async fn journal_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>>;

    /// The whole journal and all stored state, with no write in between.
    async fn snapshot(&self) -> Result<StoreSnapshot>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Whether `identity` endorsed the chain containing `hash`.
    fn has_signed(
        &self,
        identity: &Identity,
        hash: &DocumentHash,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// The whole journal, in order.
    fn load_journal(&self) -> impl std::future::Future<Output = Result<Vec<JournalEntry>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn has_signed(&self, identity: &Identity, hash: &DocumentHash) -> Result<bool> {
        let endorsers = self.endorsers_of(hash).await?;
        Ok(endorsers.contains(identity))
    }

    async fn load_journal(&self) -> Result<Vec<JournalEntry>> {
        self.journal_since(0).await
    }
}
