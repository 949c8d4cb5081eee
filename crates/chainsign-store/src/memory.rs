//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use chainsign_core::{
    DocumentHash, Identity, JournalEntry, JournalEvent, Ledger, SignOutcome, SignRequest,
    Signatory,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store, StoreSnapshot};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock:
/// mutations hold the write side for check, write and journal append.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Registry and chain state.
    ledger: Ledger,

    /// Accepted operations, in order.
    journal: Vec<JournalEntry>,
}

impl MemoryStoreInner {
    /// Journal `event` and apply it to the ledger.
    ///
    /// The entry is built before anything changes, so an encoding failure
    /// leaves both untouched.
    fn commit(&mut self, event: JournalEvent) -> Result<()> {
        let entry = JournalEntry::next(self.journal.last(), event)?;
        self.ledger.apply_event(entry.seq, &entry.event)?;
        self.journal.push(entry);
        Ok(())
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                ledger: Ledger::new(),
                journal: Vec::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn register_signatory(&self, signatory: &Signatory) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.ledger.lookup_cid(&signatory.identity).is_some() {
            return Ok(InsertResult::AlreadyExists);
        }

        inner.commit(JournalEvent::Registered(signatory.clone()))?;
        Ok(InsertResult::Inserted)
    }

    async fn get_signatory(&self, identity: &Identity) -> Result<Option<Signatory>> {
        let inner = self.read()?;
        Ok(inner.ledger.signatory(identity))
    }

    async fn count_signatories(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.ledger.stats().signatories)
    }

    async fn get_link(&self, hash: &DocumentHash) -> Result<Option<DocumentHash>> {
        let inner = self.read()?;
        Ok(inner.ledger.parent_of(hash))
    }

    async fn resolve_root(&self, hash: &DocumentHash) -> Result<DocumentHash> {
        let inner = self.read()?;
        Ok(inner.ledger.root_of(hash))
    }

    async fn endorsers_of(&self, hash: &DocumentHash) -> Result<Vec<Identity>> {
        let inner = self.read()?;
        Ok(inner.ledger.endorsers_of(hash).to_vec())
    }

    async fn apply_signature(&self, request: &SignRequest) -> Result<SignOutcome> {
        let mut inner = self.write()?;

        let outcome = inner.ledger.check(request);
        if let SignOutcome::Accepted(endorsement) = &outcome {
            inner.commit(JournalEvent::Signed(*endorsement))?;
        }

        Ok(outcome)
    }

    async fn journal_head(&self) -> Result<Option<JournalEntry>> {
        let inner = self.read()?;
        Ok(inner.journal.last().cloned())
    }

    async fn journal_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        let inner = self.read()?;
        Ok(inner
            .journal
            .iter()
            .filter(|entry| entry.seq > after_seq)
            .cloned()
            .collect())
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        let inner = self.read()?;
        Ok(StoreSnapshot {
            journal: inner.journal.clone(),
            signatories: inner.ledger.signatories().collect(),
            links: inner.ledger.links().collect(),
            endorsements: inner
                .ledger
                .endorsements()
                .map(|(root, endorsers)| (root, endorsers.to_vec()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsign_core::{verify_journal, Cid, SignError};

    fn h(b: u8) -> DocumentHash {
        DocumentHash::from_bytes([b; 32])
    }

    fn id(b: u8) -> Identity {
        Identity::from_bytes([b; 20])
    }

    fn signatory(b: u8, cid: &str) -> Signatory {
        Signatory::new(id(b), Cid::try_from(cid).unwrap())
    }

    #[tokio::test]
    async fn test_memory_store_register() {
        let store = MemoryStore::new();

        let r1 = store.register_signatory(&signatory(1, "first")).await.unwrap();
        assert_eq!(r1, InsertResult::Inserted);

        let r2 = store.register_signatory(&signatory(1, "second")).await.unwrap();
        assert_eq!(r2, InsertResult::AlreadyExists);

        let stored = store.get_signatory(&id(1)).await.unwrap().unwrap();
        assert_eq!(stored.cid.as_str(), Some("first"));
        assert_eq!(store.count_signatories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_sign_and_read() {
        let store = MemoryStore::new();
        store.register_signatory(&signatory(1, "a")).await.unwrap();
        store.register_signatory(&signatory(2, "b")).await.unwrap();

        let outcome = store
            .apply_signature(&SignRequest::new(h(10), h(0), id(1)))
            .await
            .unwrap();
        assert!(matches!(outcome, SignOutcome::Accepted(e) if e.root == h(0)));

        store
            .apply_signature(&SignRequest::new(h(11), h(10), id(2)))
            .await
            .unwrap();

        assert_eq!(store.endorsers_of(&h(11)).await.unwrap(), vec![id(1), id(2)]);
        assert_eq!(store.get_link(&h(11)).await.unwrap(), Some(h(0)));
        assert_eq!(store.resolve_root(&h(11)).await.unwrap(), h(0));
    }

    #[tokio::test]
    async fn test_memory_store_rejection_not_journaled() {
        let store = MemoryStore::new();
        store.register_signatory(&signatory(1, "a")).await.unwrap();
        store
            .apply_signature(&SignRequest::new(h(10), h(0), id(1)))
            .await
            .unwrap();

        let outcome = store
            .apply_signature(&SignRequest::new(h(10), h(0), id(1)))
            .await
            .unwrap();
        assert_eq!(outcome, SignOutcome::Rejected(SignError::ChildAlreadyLinked(h(10))));

        let journal = store.journal_since(0).await.unwrap();
        assert_eq!(journal.len(), 2);
        verify_journal(&journal).unwrap();
        assert_eq!(store.journal_head().await.unwrap().map(|e| e.seq), Some(2));
    }

    #[tokio::test]
    async fn test_memory_store_snapshot() {
        let store = MemoryStore::new();
        store.register_signatory(&signatory(1, "a")).await.unwrap();
        store
            .apply_signature(&SignRequest::new(h(10), h(0), id(1)))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.journal, store.journal_since(0).await.unwrap());
        assert_eq!(snapshot.signatories, vec![signatory(1, "a")]);
        assert_eq!(snapshot.links, vec![(h(10), h(0))]);
        assert_eq!(snapshot.endorsements, vec![(h(0), vec![id(1)])]);
    }
}
