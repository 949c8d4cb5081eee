//! Chain resolution and the signing rules.
//!
//! Links form a forest: every hash has at most one parent, and the parent
//! stored for a new link is always the root resolved at write time. Finding
//! a root is the "find" half of union-find, done with an explicit loop so
//! deep chains never grow the stack.
//!
//! The functions here only read. Backends expose their state through
//! [`ChainView`] and apply an accepted [`Endorsement`] themselves, inside
//! whatever lock or transaction they use for the check.

use serde::{Deserialize, Serialize};

use crate::error::SignError;
use crate::types::{DocumentHash, Identity};

/// A request to endorse `child`, stamped from `parent`, as `signer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub child: DocumentHash,
    pub parent: DocumentHash,
    pub signer: Identity,
}

impl SignRequest {
    pub fn new(child: DocumentHash, parent: DocumentHash, signer: Identity) -> Self {
        Self {
            child,
            parent,
            signer,
        }
    }
}

/// A signing request that passed every check.
///
/// `root` is what gets stored as the child's parent and where `signer`
/// is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub child: DocumentHash,
    pub parent: DocumentHash,
    pub root: DocumentHash,
    pub signer: Identity,
}

/// Result of checking a signing request against current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// All checks passed; the endorsement is ready to apply.
    Accepted(Endorsement),
    /// A check failed; nothing may change.
    Rejected(SignError),
}

impl SignOutcome {
    /// Convert into a plain `Result`.
    pub fn into_result(self) -> Result<Endorsement, SignError> {
        match self {
            SignOutcome::Accepted(e) => Ok(e),
            SignOutcome::Rejected(e) => Err(e),
        }
    }
}

/// Read access to ledger state, as needed by the signing rules.
pub trait ChainView {
    type Error;

    /// Whether `identity` holds a signatory record.
    fn is_registered(&self, identity: &Identity) -> Result<bool, Self::Error>;

    /// The stored parent of `hash`, if it was ever used as a child.
    fn link(&self, hash: &DocumentHash) -> Result<Option<DocumentHash>, Self::Error>;

    /// Whether `signer` is already in the endorser list of `root`.
    fn has_endorsed(&self, root: &DocumentHash, signer: &Identity) -> Result<bool, Self::Error>;
}

/// Follow parent links from `hash` until a hash with no parent is reached.
///
/// A self-link (`h -> h`, written by `sign(h, h, _)`) counts as no parent.
pub fn resolve_root<V: ChainView + ?Sized>(
    view: &V,
    hash: &DocumentHash,
) -> Result<DocumentHash, V::Error> {
    let mut current = *hash;
    while let Some(parent) = view.link(&current)? {
        if parent == current {
            break;
        }
        current = parent;
    }
    Ok(current)
}

/// Run the signing checks in order. First failure wins.
///
/// 1. signer is registered
/// 2. child has never been used as a child
/// 3. resolve the parent's root
/// 4. signer has not endorsed that root yet
pub fn check_signature<V: ChainView + ?Sized>(
    view: &V,
    request: &SignRequest,
) -> Result<SignOutcome, V::Error> {
    if !view.is_registered(&request.signer)? {
        return Ok(SignOutcome::Rejected(SignError::SignatoryNotRegistered(
            request.signer,
        )));
    }

    if view.link(&request.child)?.is_some() {
        return Ok(SignOutcome::Rejected(SignError::ChildAlreadyLinked(
            request.child,
        )));
    }

    let root = resolve_root(view, &request.parent)?;

    if view.has_endorsed(&root, &request.signer)? {
        return Ok(SignOutcome::Rejected(SignError::AlreadySigned {
            signer: request.signer,
            root,
        }));
    }

    Ok(SignOutcome::Accepted(Endorsement {
        child: request.child,
        parent: request.parent,
        root,
        signer: request.signer,
    }))
}
