//! The Notary: unified API for the Chainsign system.
//!
//! The Notary puts the registry and chain rules in front of a storage
//! backend and adds journal auditing on top.

use std::sync::Arc;

use tracing::{debug, info, warn};

use chainsign_core::{
    verify_journal, Cid, DocumentHash, Endorsement, EntryId, Identity, JournalEntry, Ledger,
    RegisterError, SignOutcome, SignRequest, Signatory,
};
use chainsign_store::{InsertResult, Store, StoreExt, StoreSnapshot};

use crate::error::{NotaryError, Result};

/// Configuration for the Notary.
#[derive(Debug, Clone)]
pub struct NotaryConfig {
    /// Whether `Notary::open` audits the journal before returning.
    pub audit_on_open: bool,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            audit_on_open: true,
        }
    }
}

/// Summary of a successful journal audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Number of journal entries checked.
    pub entries: usize,
    /// Id of the last entry, `None` for an empty journal.
    pub head: Option<EntryId>,
    /// Registered signatories after replay.
    pub signatories: usize,
    /// Stored parent links after replay.
    pub links: usize,
    /// Roots holding at least one endorsement.
    pub roots: usize,
}

/// The main Notary struct.
///
/// Provides a unified API for:
/// - Registering signatories and looking up their cids
/// - Signing documents into chains
/// - Querying chain roots and endorsers
/// - Auditing the journal against stored state
pub struct Notary<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: NotaryConfig,
}

impl<S: Store> Notary<S> {
    /// Create a notary without touching the store.
    pub fn new(store: S, config: NotaryConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    /// Create a notary, auditing the store first if configured to.
    pub async fn open(store: S, config: NotaryConfig) -> Result<Self> {
        let notary = Self::new(store, config);
        if notary.config.audit_on_open {
            let report = notary.audit().await?;
            info!(
                entries = report.entries,
                signatories = report.signatories,
                roots = report.roots,
                "opened notary"
            );
        }
        Ok(notary)
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind `cid` to `identity`, once and for all.
    ///
    /// Fails with `RegisterError::AlreadyRegistered` if the identity already
    /// holds a record; the stored cid is left as it was.
    pub async fn register(&self, identity: Identity, cid: Cid) -> Result<Signatory> {
        let signatory = Signatory::new(identity, cid);

        match self.store.register_signatory(&signatory).await? {
            InsertResult::Inserted => {
                debug!(identity = %identity, cid = %signatory.cid, "registered signatory");
                Ok(signatory)
            }
            InsertResult::AlreadyExists => {
                warn!(identity = %identity, "rejected duplicate registration");
                Err(RegisterError::AlreadyRegistered(identity).into())
            }
        }
    }

    /// The cid registered by `identity`, if any.
    pub async fn lookup_cid(&self, identity: &Identity) -> Result<Option<Cid>> {
        let signatory = self.store.get_signatory(identity).await?;
        Ok(signatory.map(|s| s.cid))
    }

    /// The full record for `identity`, if any.
    pub async fn signatory(&self, identity: &Identity) -> Result<Option<Signatory>> {
        Ok(self.store.get_signatory(identity).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Endorse `child`, stamped from `parent`, as `signer`.
    ///
    /// Checks run in order: signer registered, child not yet linked, signer
    /// not yet an endorser of the parent's chain. On success `child` is
    /// linked straight to the chain's root and `signer` is appended to its
    /// endorser list.
    pub async fn sign(
        &self,
        child: DocumentHash,
        parent: DocumentHash,
        signer: Identity,
    ) -> Result<Endorsement> {
        let request = SignRequest::new(child, parent, signer);

        match self.store.apply_signature(&request).await? {
            SignOutcome::Accepted(endorsement) => {
                debug!(
                    child = %endorsement.child,
                    root = %endorsement.root,
                    signer = %endorsement.signer,
                    "signed document"
                );
                Ok(endorsement)
            }
            SignOutcome::Rejected(err) => {
                warn!(child = %child, parent = %parent, signer = %signer, error = %err, "rejected signature");
                Err(err.into())
            }
        }
    }

    /// Endorsers of the chain containing `hash`, in signing order.
    ///
    /// Empty for hashes nobody has signed into. Only the current root's list
    /// is returned; see [`Ledger::endorsers_of`] for former roots.
    pub async fn endorsers_of(&self, hash: &DocumentHash) -> Result<Vec<Identity>> {
        Ok(self.store.endorsers_of(hash).await?)
    }

    /// Root of the chain containing `hash`.
    pub async fn root_of(&self, hash: &DocumentHash) -> Result<DocumentHash> {
        Ok(self.store.resolve_root(hash).await?)
    }

    /// Whether `identity` endorsed the chain containing `hash`.
    pub async fn has_signed(&self, identity: &Identity, hash: &DocumentHash) -> Result<bool> {
        Ok(self.store.has_signed(identity, hash).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Journal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every journal entry, in order.
    pub async fn journal(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.store.load_journal().await?)
    }

    /// Verify the journal and check it against stored state.
    ///
    /// Works on one store snapshot, so writes running alongside the audit
    /// are either fully in it or fully out of it. The hash chain is
    /// verified, the journal is replayed through the signing rules, and the
    /// replayed ledger must match every stored signatory, link and endorser
    /// list exactly.
    pub async fn audit(&self) -> Result<AuditReport> {
        let snapshot = self.store.snapshot().await?;
        verify_journal(&snapshot.journal)?;
        let ledger = Ledger::replay(&snapshot.journal)?;
        compare_snapshot(&ledger, &snapshot)?;

        let stats = ledger.stats();
        let head = snapshot.journal.last().map(|e| e.id);
        info!(entries = snapshot.journal.len(), "journal audit passed");
        Ok(AuditReport {
            entries: snapshot.journal.len(),
            head,
            signatories: stats.signatories,
            links: stats.links,
            roots: stats.roots,
        })
    }
}

/// Check that stored rows are exactly what replaying the journal produced.
fn compare_snapshot(ledger: &Ledger, snapshot: &StoreSnapshot) -> Result<()> {
    let stats = ledger.stats();
    let mismatch = |msg: String| Err(NotaryError::AuditMismatch(msg));

    if snapshot.signatories.len() != stats.signatories {
        return mismatch(format!(
            "store holds {} signatories, journal replays {}",
            snapshot.signatories.len(),
            stats.signatories
        ));
    }
    for stored in &snapshot.signatories {
        if ledger.signatory(&stored.identity).as_ref() != Some(stored) {
            return mismatch(format!(
                "signatory {} differs from journal replay",
                stored.identity
            ));
        }
    }

    if snapshot.links.len() != stats.links {
        return mismatch(format!(
            "store holds {} links, journal replays {}",
            snapshot.links.len(),
            stats.links
        ));
    }
    for (child, parent) in &snapshot.links {
        if ledger.parent_of(child) != Some(*parent) {
            return mismatch(format!(
                "{} links to {} but journal replays {:?}",
                child,
                parent,
                ledger.parent_of(child)
            ));
        }
    }

    if snapshot.endorsements.len() != stats.roots {
        return mismatch(format!(
            "store holds {} endorser lists, journal replays {}",
            snapshot.endorsements.len(),
            stats.roots
        ));
    }
    for (root, endorsers) in &snapshot.endorsements {
        if ledger.endorsements_at(root) != endorsers.as_slice() {
            return mismatch(format!("endorsers at {} differ from journal replay", root));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsign_core::SignError;
    use chainsign_store::MemoryStore;

    fn h(b: u8) -> DocumentHash {
        DocumentHash::from_bytes([b; 32])
    }

    fn id(b: u8) -> Identity {
        Identity::from_bytes([b; 20])
    }

    fn cid(s: &str) -> Cid {
        Cid::try_from(s).unwrap()
    }

    fn notary() -> Notary<MemoryStore> {
        Notary::new(MemoryStore::new(), NotaryConfig::default())
    }

    #[tokio::test]
    async fn test_register_then_lookup() {
        let notary = notary();

        let signatory = notary.register(id(1), cid("Qm-one")).await.unwrap();
        assert_eq!(signatory.identity, id(1));
        assert_eq!(notary.lookup_cid(&id(1)).await.unwrap(), Some(cid("Qm-one")));
        assert_eq!(notary.lookup_cid(&id(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_twice_keeps_first() {
        let notary = notary();
        notary.register(id(1), cid("first")).await.unwrap();

        let err = notary.register(id(1), cid("second")).await.unwrap_err();
        assert!(matches!(
            err,
            NotaryError::Register(RegisterError::AlreadyRegistered(i)) if i == id(1)
        ));
        assert!(err.is_rejection());
        assert_eq!(notary.lookup_cid(&id(1)).await.unwrap(), Some(cid("first")));
    }

    #[tokio::test]
    async fn test_sign_requires_registration() {
        let notary = notary();

        let err = notary.sign(h(1), h(0), id(9)).await.unwrap_err();
        assert!(matches!(
            err,
            NotaryError::Sign(SignError::SignatoryNotRegistered(i)) if i == id(9)
        ));
        assert!(notary.endorsers_of(&h(0)).await.unwrap().is_empty());
        assert!(notary.journal().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_and_query() {
        let notary = notary();
        notary.register(id(1), cid("a")).await.unwrap();
        notary.register(id(2), cid("b")).await.unwrap();

        let first = notary.sign(h(1), h(0), id(1)).await.unwrap();
        assert_eq!(first.root, h(0));
        let second = notary.sign(h(2), h(1), id(2)).await.unwrap();
        assert_eq!(second.root, h(0));

        assert_eq!(notary.root_of(&h(2)).await.unwrap(), h(0));
        assert_eq!(notary.endorsers_of(&h(2)).await.unwrap(), vec![id(1), id(2)]);
        assert!(notary.has_signed(&id(2), &h(0)).await.unwrap());
        assert!(!notary.has_signed(&id(2), &h(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_audit_report() {
        let notary = notary();
        notary.register(id(1), cid("a")).await.unwrap();
        notary.register(id(2), cid("b")).await.unwrap();
        notary.sign(h(1), h(0), id(1)).await.unwrap();
        notary.sign(h(2), h(1), id(2)).await.unwrap();
        let _ = notary.sign(h(3), h(2), id(1)).await.unwrap_err();

        let report = notary.audit().await.unwrap();
        assert_eq!(report.entries, 4);
        assert_eq!(report.signatories, 2);
        assert_eq!(report.links, 2);
        assert_eq!(report.roots, 1);

        let head = notary.journal().await.unwrap().last().map(|e| e.id);
        assert_eq!(report.head, head);
    }

    #[tokio::test]
    async fn test_open_audits_empty_store() {
        let notary = Notary::open(MemoryStore::new(), NotaryConfig::default())
            .await
            .unwrap();
        assert!(notary.config().audit_on_open);
        assert_eq!(notary.audit().await.unwrap().head, None);
    }
}
