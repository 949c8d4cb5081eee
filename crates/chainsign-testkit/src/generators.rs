//! Proptest generators for property-based testing.

use proptest::prelude::*;

use chainsign_core::{Cid, DocumentHash, Identity, Ledger, SignRequest};

/// Generate a non-empty cid of at most `max_len` bytes.
pub fn cid(max_len: usize) -> impl Strategy<Value = Cid> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
        .prop_filter_map("cid must be non-empty", |bytes| Cid::new(bytes).ok())
}

/// Identity number `i` of a small shared pool.
///
/// Operation sequences draw from small pools so that collisions (repeat
/// registrations, reused children, repeat signers) actually happen.
pub fn pool_identity(i: u8) -> Identity {
    Identity::from_bytes([i; 20])
}

/// Document number `i` of a small shared pool.
pub fn pool_document(i: u8) -> DocumentHash {
    DocumentHash::from_bytes([i; 32])
}

/// A single registry or chain call, over pooled identities and documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Register { party: u8, cid: Cid },
    Sign { child: u8, parent: u8, signer: u8 },
}

impl Op {
    /// The signing request for a `Sign` op.
    pub fn sign_request(&self) -> Option<SignRequest> {
        match *self {
            Op::Sign {
                child,
                parent,
                signer,
            } => Some(SignRequest::new(
                pool_document(child),
                pool_document(parent),
                pool_identity(signer),
            )),
            Op::Register { .. } => None,
        }
    }

    /// Apply to `ledger`, returning whether the call was accepted.
    pub fn apply(&self, ledger: &mut Ledger) -> bool {
        match self {
            Op::Register { party, cid } => ledger.register(pool_identity(*party), cid.clone()).is_ok(),
            Op::Sign { .. } => match self.sign_request() {
                Some(request) => ledger.sign(&request).is_ok(),
                None => false,
            },
        }
    }
}

/// Generate one op over `parties` identities and `documents` hashes.
pub fn op(parties: u8, documents: u8) -> impl Strategy<Value = Op> {
    let parties = parties.max(1);
    let documents = documents.max(1);
    prop_oneof![
        1 => (0..parties, cid(8)).prop_map(|(party, cid)| Op::Register { party, cid }),
        3 => (0..documents, 0..documents, 0..parties).prop_map(|(child, parent, signer)| {
            Op::Sign {
                child,
                parent,
                signer,
            }
        }),
    ]
}

/// Generate up to `max_len` ops over 4 identities and 12 documents.
pub fn ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(4, 12), 0..=max_len)
}

impl Arbitrary for Op {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        op(4, 12).boxed()
    }
}
