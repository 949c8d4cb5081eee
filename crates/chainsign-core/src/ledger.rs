//! In-memory ledger: signatory registry plus document chains.
//!
//! This is the reference state machine. The memory store keeps one behind
//! a lock, journal replay rebuilds one, and the property tests compare
//! every backend against it.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use crate::chain::{check_signature, resolve_root, ChainView, Endorsement, SignOutcome, SignRequest};
use crate::error::{JournalError, RegisterError, SignError};
use crate::journal::{JournalEntry, JournalEvent};
use crate::types::{Cid, DocumentHash, Identity, Signatory};

/// Counts describing ledger contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub signatories: usize,
    pub links: usize,
    /// Hashes holding an endorser list.
    pub roots: usize,
}

/// Registry and chain state, append-only.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    signatories: HashMap<Identity, Cid>,
    links: HashMap<DocumentHash, DocumentHash>,
    endorsers: HashMap<DocumentHash, Vec<Identity>>,
    endorsed: HashSet<(DocumentHash, Identity)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind `cid` to `identity`. Fails if the identity already has a record.
    pub fn register(&mut self, identity: Identity, cid: Cid) -> Result<Signatory, RegisterError> {
        if self.signatories.contains_key(&identity) {
            return Err(RegisterError::AlreadyRegistered(identity));
        }
        self.signatories.insert(identity, cid.clone());
        Ok(Signatory { identity, cid })
    }

    pub fn signatory(&self, identity: &Identity) -> Option<Signatory> {
        self.signatories.get(identity).map(|cid| Signatory {
            identity: *identity,
            cid: cid.clone(),
        })
    }

    pub fn lookup_cid(&self, identity: &Identity) -> Option<&Cid> {
        self.signatories.get(identity)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chains
    // ─────────────────────────────────────────────────────────────────────────

    /// Check a request without changing anything.
    pub fn check(&self, request: &SignRequest) -> SignOutcome {
        match check_signature(self, request) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Check and, if accepted, apply a signing request.
    pub fn sign(&mut self, request: &SignRequest) -> Result<Endorsement, SignError> {
        let endorsement = self.check(request).into_result()?;
        self.apply(&endorsement);
        Ok(endorsement)
    }

    /// Record an endorsement produced by [`Ledger::check`].
    fn apply(&mut self, endorsement: &Endorsement) {
        self.links.insert(endorsement.child, endorsement.root);
        self.endorsers
            .entry(endorsement.root)
            .or_default()
            .push(endorsement.signer);
        self.endorsed.insert((endorsement.root, endorsement.signer));
    }

    pub fn root_of(&self, hash: &DocumentHash) -> DocumentHash {
        match resolve_root(self, hash) {
            Ok(root) => root,
            Err(never) => match never {},
        }
    }

    /// The stored parent of `hash`. A self-link reads as the hash itself.
    pub fn parent_of(&self, hash: &DocumentHash) -> Option<DocumentHash> {
        self.links.get(hash).copied()
    }

    /// Whether `hash` was ever used as a child.
    pub fn is_linked(&self, hash: &DocumentHash) -> bool {
        self.links.contains_key(hash)
    }

    /// Endorsers of the chain containing `hash`, in acceptance order.
    ///
    /// This is the list stored at the current root. When a former root `R`
    /// is later signed under another chain, the list stored at `R` stays
    /// where it is and is no longer reachable from any member: queries
    /// return the new root's list, and an identity that endorsed `R` may
    /// endorse the new root as well.
    pub fn endorsers_of(&self, hash: &DocumentHash) -> &[Identity] {
        let root = self.root_of(hash);
        self.endorsements_at(&root)
    }

    /// The endorser list stored at `root` itself, without resolving.
    pub fn endorsements_at(&self, root: &DocumentHash) -> &[Identity] {
        self.endorsers.get(root).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every registered signatory, in no particular order.
    pub fn signatories(&self) -> impl Iterator<Item = Signatory> + '_ {
        self.signatories.iter().map(|(identity, cid)| Signatory {
            identity: *identity,
            cid: cid.clone(),
        })
    }

    /// Every stored link as `(child, parent)`, in no particular order.
    pub fn links(&self) -> impl Iterator<Item = (DocumentHash, DocumentHash)> + '_ {
        self.links.iter().map(|(child, parent)| (*child, *parent))
    }

    /// Every stored endorser list as `(root, endorsers)`, in no particular
    /// order. Includes lists stranded at former roots.
    pub fn endorsements(&self) -> impl Iterator<Item = (DocumentHash, &[Identity])> + '_ {
        self.endorsers
            .iter()
            .map(|(root, endorsers)| (*root, endorsers.as_slice()))
    }

    /// Whether `identity` endorsed the chain containing `hash`.
    pub fn has_signed(&self, identity: &Identity, hash: &DocumentHash) -> bool {
        self.endorsed.contains(&(self.root_of(hash), *identity))
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            signatories: self.signatories.len(),
            links: self.links.len(),
            roots: self.endorsers.len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Journal
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply one journaled event, enforcing the same rules as live calls.
    ///
    /// A `Signed` event must also resolve to the root it recorded.
    pub fn apply_event(&mut self, seq: u64, event: &JournalEvent) -> Result<(), JournalError> {
        match event {
            JournalEvent::Registered(s) => {
                self.register(s.identity, s.cid.clone())
                    .map_err(|e| JournalError::Replay {
                        seq,
                        reason: e.to_string(),
                    })?;
            }
            JournalEvent::Signed(recorded) => {
                let request = SignRequest::new(recorded.child, recorded.parent, recorded.signer);
                let endorsement = self.check(&request).into_result().map_err(|e| {
                    JournalError::Replay {
                        seq,
                        reason: e.to_string(),
                    }
                })?;
                if endorsement.root != recorded.root {
                    return Err(JournalError::Replay {
                        seq,
                        reason: format!(
                            "resolved root {} but journal recorded {}",
                            endorsement.root, recorded.root
                        ),
                    });
                }
                self.apply(&endorsement);
            }
        }
        Ok(())
    }

    /// Rebuild a ledger from journal entries, in order.
    ///
    /// Does not check the hash chain; run `verify_journal` first.
    pub fn replay<'a>(
        entries: impl IntoIterator<Item = &'a JournalEntry>,
    ) -> Result<Self, JournalError> {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.apply_event(entry.seq, &entry.event)?;
        }
        Ok(ledger)
    }
}

impl ChainView for Ledger {
    type Error = Infallible;

    fn is_registered(&self, identity: &Identity) -> Result<bool, Infallible> {
        Ok(self.signatories.contains_key(identity))
    }

    fn link(&self, hash: &DocumentHash) -> Result<Option<DocumentHash>, Infallible> {
        Ok(self.links.get(hash).copied())
    }

    fn has_endorsed(&self, root: &DocumentHash, signer: &Identity) -> Result<bool, Infallible> {
        Ok(self.endorsed.contains(&(*root, *signer)))
    }
}
