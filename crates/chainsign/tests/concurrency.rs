//! Concurrent callers are serialized: racing on one child or one chain
//! admits exactly one winner.

use std::sync::Arc;

use chainsign::store::{MemoryStore, SqliteStore, Store};
use chainsign::{Notary, NotaryConfig, NotaryError, SignError};
use chainsign_testkit::fixtures::{doc, multi_party_fixtures};

const RACERS: usize = 16;

async fn race_for_child<S: Store + 'static>(store: S) {
    let notary = Arc::new(Notary::new(store, NotaryConfig::default()));
    let parties = multi_party_fixtures(RACERS);
    for party in &parties {
        party.register(&*notary).await.unwrap();
    }

    let mut handles = Vec::new();
    for party in parties.clone() {
        let notary = Arc::clone(&notary);
        handles.push(tokio::spawn(async move {
            notary.sign(doc("child"), doc("root"), party.identity).await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(endorsement) => winners.push(endorsement.signer),
            Err(NotaryError::Sign(SignError::ChildAlreadyLinked(hash))) => {
                assert_eq!(hash, doc("child"))
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(notary.endorsers_of(&doc("root")).await.unwrap(), winners);
    notary.audit().await.unwrap();
}

async fn race_for_chain<S: Store + 'static>(store: S) {
    let notary = Arc::new(Notary::new(store, NotaryConfig::default()));
    let party = multi_party_fixtures(1).remove(0);
    party.register(&*notary).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let notary = Arc::clone(&notary);
        let signer = party.identity;
        handles.push(tokio::spawn(async move {
            notary
                .sign(doc(&format!("child-{}", i)), doc("root"), signer)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(NotaryError::Sign(SignError::AlreadySigned { signer, root })) => {
                assert_eq!(signer, party.identity);
                assert_eq!(root, doc("root"));
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(
        notary.endorsers_of(&doc("root")).await.unwrap(),
        vec![party.identity]
    );
    assert_eq!(notary.audit().await.unwrap().links, 1);
}

/// Audit in a loop while another task keeps signing.
async fn audit_during_writes<S: Store + 'static>(store: S) {
    const WRITES: usize = 64;

    let notary = Arc::new(Notary::new(store, NotaryConfig::default()));
    let party = multi_party_fixtures(1).remove(0);
    party.register(&*notary).await.unwrap();

    let writer = {
        let notary = Arc::clone(&notary);
        let signer = party.identity;
        tokio::spawn(async move {
            for i in 0..WRITES {
                let child = doc(&format!("child-{}", i));
                let root = doc(&format!("root-{}", i));
                notary.sign(child, root, signer).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    // every audit sees some prefix of the writes, never a mix
    loop {
        let done = writer.is_finished();
        let report = notary.audit().await.unwrap();
        assert_eq!(report.links, report.entries - 1);
        assert_eq!(report.roots, report.links);
        if done {
            break;
        }
    }
    writer.await.unwrap();

    let report = notary.audit().await.unwrap();
    assert_eq!(report.entries, WRITES + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_audit_during_writes() {
    audit_during_writes(MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_audit_during_writes() {
    audit_during_writes(SqliteStore::open_memory().unwrap()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_child_race() {
    race_for_child(MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_child_race() {
    race_for_child(SqliteStore::open_memory().unwrap()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_chain_race() {
    race_for_chain(MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_chain_race() {
    race_for_chain(SqliteStore::open_memory().unwrap()).await;
}
