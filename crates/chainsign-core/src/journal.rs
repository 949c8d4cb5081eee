//! The journal: a hash-chained log of accepted operations.
//!
//! Every successful registration and signature appends one entry. Each
//! entry commits to its predecessor's id, so rewriting any past entry
//! changes every id after it.
//!
//! ```text
//! id = Blake3(JOURNAL_DOMAIN || content_bytes)
//! content_bytes = canonical CBOR of {0: version, 1: seq, 2: prev, 3: kind, 4: body}
//! ```

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{
    as_array, as_bytes, as_u64, decode_canonical, encode_canonical, int_map, map_get,
};
use crate::chain::Endorsement;
use crate::error::{CoreError, JournalError};
use crate::types::{Cid, DocumentHash, Identity, Signatory};

/// Domain prefix for entry ids.
pub const JOURNAL_DOMAIN: &[u8] = b"chainsign-journal-v0:";

/// Current entry format version.
pub const JOURNAL_VERSION: u8 = 0;

mod keys {
    pub const VERSION: u64 = 0;
    pub const SEQ: u64 = 1;
    pub const PREV: u64 = 2;
    pub const KIND: u64 = 3;
    pub const BODY: u64 = 4;

    pub const IDENTITY: u64 = 0;
    pub const CID: u64 = 1;

    pub const CHILD: u64 = 0;
    pub const PARENT: u64 = 1;
    pub const ROOT: u64 = 2;
    pub const SIGNER: u64 = 3;
}

const KIND_REGISTERED: u64 = 0;
const KIND_SIGNED: u64 = 1;

/// A 32-byte journal entry id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub [u8; 32]);

impl EntryId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for EntryId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// An accepted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEvent {
    Registered(Signatory),
    Signed(Endorsement),
}

impl JournalEvent {
    fn kind(&self) -> u64 {
        match self {
            JournalEvent::Registered(_) => KIND_REGISTERED,
            JournalEvent::Signed(_) => KIND_SIGNED,
        }
    }

    fn body(&self) -> Value {
        match self {
            JournalEvent::Registered(s) => int_map(vec![
                (keys::IDENTITY, Value::Bytes(s.identity.0.to_vec())),
                (keys::CID, Value::Bytes(s.cid.as_bytes().to_vec())),
            ]),
            JournalEvent::Signed(e) => int_map(vec![
                (keys::CHILD, Value::Bytes(e.child.0.to_vec())),
                (keys::PARENT, Value::Bytes(e.parent.0.to_vec())),
                (keys::ROOT, Value::Bytes(e.root.0.to_vec())),
                (keys::SIGNER, Value::Bytes(e.signer.0.to_vec())),
            ]),
        }
    }

    fn from_body(kind: u64, body: &Value) -> Result<Self, CoreError> {
        let Value::Map(map) = body else {
            return Err(CoreError::DecodingError("body must be a map".into()));
        };
        match kind {
            KIND_REGISTERED => {
                let identity = Identity(as_array(map_get(map, keys::IDENTITY), "identity")?);
                let cid = Cid::new(as_bytes(map_get(map, keys::CID), "cid")?.to_vec())?;
                Ok(JournalEvent::Registered(Signatory { identity, cid }))
            }
            KIND_SIGNED => Ok(JournalEvent::Signed(Endorsement {
                child: DocumentHash(as_array(map_get(map, keys::CHILD), "child")?),
                parent: DocumentHash(as_array(map_get(map, keys::PARENT), "parent")?),
                root: DocumentHash(as_array(map_get(map, keys::ROOT), "root")?),
                signer: Identity(as_array(map_get(map, keys::SIGNER), "signer")?),
            })),
            other => Err(CoreError::DecodingError(format!(
                "unknown event kind {}",
                other
            ))),
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// 1-based position in the journal.
    pub seq: u64,
    /// Id of the previous entry; `None` only for seq 1.
    pub prev: Option<EntryId>,
    pub event: JournalEvent,
    /// Stored id. Recompute with [`JournalEntry::compute_id`] to check it.
    pub id: EntryId,
}

impl JournalEntry {
    /// Build the entry that follows `prev` (or the first entry).
    pub fn next(prev: Option<&JournalEntry>, event: JournalEvent) -> Result<Self, CoreError> {
        let seq = prev.map_or(1, |p| p.seq + 1);
        let prev_id = prev.map(|p| p.id);
        let content = content_bytes(seq, prev_id.as_ref(), &event)?;
        Ok(Self {
            seq,
            prev: prev_id,
            event,
            id: id_of(&content),
        })
    }

    /// Canonical content bytes (everything but the id).
    pub fn content_bytes(&self) -> Result<Vec<u8>, CoreError> {
        content_bytes(self.seq, self.prev.as_ref(), &self.event)
    }

    /// Recompute the id from content.
    pub fn compute_id(&self) -> Result<EntryId, CoreError> {
        Ok(id_of(&self.content_bytes()?))
    }

    /// Rebuild an entry from stored content bytes and its stored id.
    ///
    /// The stored id is kept as-is; [`verify_journal`] catches a mismatch.
    pub fn from_parts(content: &[u8], id: EntryId) -> Result<Self, CoreError> {
        let value = decode_canonical(content)?;
        let Value::Map(map) = &value else {
            return Err(CoreError::DecodingError("entry must be a map".into()));
        };

        let version = as_u64(map_get(map, keys::VERSION), "version")?;
        if version != u64::from(JOURNAL_VERSION) {
            return Err(CoreError::DecodingError(format!(
                "unsupported journal version {}",
                version
            )));
        }

        let seq = as_u64(map_get(map, keys::SEQ), "seq")?;
        let prev = match map_get(map, keys::PREV) {
            Some(Value::Null) => None,
            Some(Value::Bytes(b)) => Some(
                EntryId::try_from(b.as_slice())
                    .map_err(|_| CoreError::DecodingError("invalid prev".into()))?,
            ),
            _ => return Err(CoreError::DecodingError("missing prev".into())),
        };
        let kind = as_u64(map_get(map, keys::KIND), "kind")?;
        let body = map_get(map, keys::BODY)
            .ok_or_else(|| CoreError::DecodingError("missing body".into()))?;
        let event = JournalEvent::from_body(kind, body)?;

        Ok(Self {
            seq,
            prev,
            event,
            id,
        })
    }
}

fn content_bytes(
    seq: u64,
    prev: Option<&EntryId>,
    event: &JournalEvent,
) -> Result<Vec<u8>, CoreError> {
    let prev_value = match prev {
        Some(id) => Value::Bytes(id.0.to_vec()),
        None => Value::Null,
    };
    encode_canonical(&int_map(vec![
        (keys::VERSION, Value::Integer(JOURNAL_VERSION.into())),
        (keys::SEQ, Value::Integer(seq.into())),
        (keys::PREV, prev_value),
        (keys::KIND, Value::Integer(event.kind().into())),
        (keys::BODY, event.body()),
    ]))
}

fn id_of(content: &[u8]) -> EntryId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(JOURNAL_DOMAIN);
    hasher.update(content);
    EntryId(*hasher.finalize().as_bytes())
}

/// Check sequence continuity, prev links and ids, front to back.
///
/// Returns the first problem found.
pub fn verify_journal(entries: &[JournalEntry]) -> Result<(), JournalError> {
    let mut expected_prev: Option<EntryId> = None;

    for (index, entry) in entries.iter().enumerate() {
        let expected_seq = index as u64 + 1;
        if entry.seq != expected_seq {
            return Err(JournalError::InvalidSequence {
                expected: expected_seq,
                got: entry.seq,
            });
        }

        if entry.prev != expected_prev {
            return Err(JournalError::BrokenLink {
                seq: entry.seq,
                expected: expected_prev,
                got: entry.prev,
            });
        }

        if entry.compute_id()? != entry.id {
            return Err(JournalError::IdMismatch { seq: entry.seq });
        }

        expected_prev = Some(entry.id);
    }

    Ok(())
}
