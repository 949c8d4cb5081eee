//! Strong type definitions for Chainsign.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Domain prefix for [`DocumentHash::digest`].
pub const DOCUMENT_DOMAIN: &[u8] = b"chainsign-document-v0:";

/// A 32-byte document hash naming one version of a document.
///
/// The ledger treats it as opaque: it never checks that the hash
/// corresponds to any particular content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentHash(pub [u8; 32]);

impl DocumentHash {
    /// Create a new DocumentHash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a document hash from document content.
    ///
    /// Blake3 over `DOCUMENT_DOMAIN || content`.
    pub fn digest(content: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOCUMENT_DOMAIN);
        hasher.update(content);
        Self(*hasher.finalize().as_bytes())
    }

    /// Generate a random hash.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(e.to_string()))?;
        Self::try_from(bytes.as_slice())
            .map_err(|_| CoreError::InvalidHash(format!("expected 32 bytes, got {}", bytes.len())))
    }
}

impl fmt::Debug for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for DocumentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for DocumentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for DocumentHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A 20-byte caller identity (an account address).
///
/// Supplied by the host environment on every call; never minted by the
/// ledger itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub [u8; 20]);

impl Identity {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive an identity from arbitrary key material.
    ///
    /// Takes the last 20 bytes of a Blake3 digest, the way account
    /// addresses are cut from a public key hash.
    pub fn derive(key_material: &[u8]) -> Self {
        let digest = blake3::hash(key_material);
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&digest.as_bytes()[12..]);
        Self(arr)
    }

    /// Generate a random identity.
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Convert to `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidIdentity(e.to_string()))?;
        Self::try_from(bytes.as_slice()).map_err(|_| {
            CoreError::InvalidIdentity(format!("expected 20 bytes, got {}", bytes.len()))
        })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Identity {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Identity {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// An opaque content identifier bound to an identity at registration.
///
/// Never empty.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Bytes", into = "Bytes")]
pub struct Cid(Bytes);

impl Cid {
    /// Create a cid, rejecting empty input.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, CoreError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CoreError::EmptyCid);
        }
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The UTF-8 view of the cid, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed cid; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Cid({:?})", s),
            None => write!(f, "Cid(0x{})", hex::encode(&self.0)),
        }
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

impl AsRef<[u8]> for Cid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<Bytes> for Cid {
    type Error = CoreError;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<Cid> for Bytes {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl TryFrom<&str> for Cid {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl TryFrom<Vec<u8>> for Cid {
    type Error = CoreError;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

/// A registered signatory: an identity bound to its cid, once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub identity: Identity,
    pub cid: Cid,
}

impl Signatory {
    pub fn new(identity: Identity, cid: Cid) -> Self {
        Self { identity, cid }
    }
}
