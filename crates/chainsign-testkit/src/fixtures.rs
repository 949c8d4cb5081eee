//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chainsign::{Notary, NotaryConfig};
use chainsign_core::{Cid, DocumentHash, Identity, Signatory};
use chainsign_store::MemoryStore;

/// A test party: an identity and the cid it will register.
#[derive(Debug, Clone)]
pub struct TestFixture {
    pub identity: Identity,
    pub cid: Cid,
}

impl TestFixture {
    /// Create a new test fixture with a random identity and cid.
    pub fn new() -> Self {
        Self {
            identity: Identity::random(),
            cid: random_cid(),
        }
    }

    /// Create with a deterministic identity and cid from a seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            identity: Identity::derive(&seed),
            cid: prefixed_cid(&seed[..16]),
        }
    }

    /// The signatory record this fixture registers.
    pub fn signatory(&self) -> Signatory {
        Signatory::new(self.identity, self.cid.clone())
    }

    /// Register this fixture on `notary`.
    pub async fn register<S: chainsign_store::Store>(
        &self,
        notary: &Notary<S>,
    ) -> chainsign::Result<Signatory> {
        notary.register(self.identity, self.cid.clone()).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_le_bytes());
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A notary over a fresh in-memory store.
pub fn memory_notary() -> Notary<MemoryStore> {
    Notary::new(MemoryStore::new(), NotaryConfig::default())
}

/// A document hash derived from a label.
pub fn doc(label: &str) -> DocumentHash {
    DocumentHash::digest(label.as_bytes())
}

/// A random, printable cid.
pub fn random_cid() -> Cid {
    let bytes: [u8; 16] = rand::random();
    prefixed_cid(&bytes)
}

fn prefixed_cid(bytes: &[u8]) -> Cid {
    match Cid::new(format!("Qm{}", hex::encode(bytes)).into_bytes()) {
        Ok(cid) => cid,
        Err(_) => unreachable!("prefixed cid is never empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_register() {
        let notary = memory_notary();
        let fixture = TestFixture::new();

        let signatory = fixture.register(&notary).await.unwrap();
        assert_eq!(signatory, fixture.signatory());
        assert_eq!(
            notary.lookup_cid(&fixture.identity).await.unwrap(),
            Some(fixture.cid.clone())
        );
    }

    #[test]
    fn test_seeded_fixture_is_deterministic() {
        let a = TestFixture::with_seed([7; 32]);
        let b = TestFixture::with_seed([7; 32]);
        assert_eq!(a.identity, b.identity);
        assert_eq!(a.cid, b.cid);
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        // Each party has a unique identity
        let ids: Vec<_> = parties.iter().map(|p| p.identity).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn test_doc_labels() {
        assert_eq!(doc("draft"), doc("draft"));
        assert_ne!(doc("draft"), doc("final"));
    }
}
