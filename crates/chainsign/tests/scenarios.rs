//! Scenario vectors against every storage backend.
//!
//! Each vector runs on a fresh notary; the outcome of every step and every
//! query must match the reference ledger.

use chainsign::store::{MemoryStore, SqliteStore, Store};
use chainsign::{Notary, NotaryConfig};
use chainsign_testkit::vectors::{all_vectors, run_on_ledger, run_on_notary, ScenarioVector};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

async fn run_and_audit<S: Store>(store: S, vector: &ScenarioVector) -> anyhow::Result<()> {
    let notary = Notary::open(store, NotaryConfig::default()).await?;
    run_on_notary(&notary, vector).await?;

    // The journal must replay to the same state the vector reached.
    let expected = run_on_ledger(vector)?.stats();
    let report = notary.audit().await?;
    anyhow::ensure!(
        (report.signatories, report.links, report.roots)
            == (expected.signatories, expected.links, expected.roots),
        "{}: audit report {:?} disagrees with {:?}",
        vector.name,
        report,
        expected
    );
    Ok(())
}

#[tokio::test]
async fn test_vectors_on_memory_store() {
    init_tracing();
    for vector in all_vectors() {
        run_and_audit(MemoryStore::new(), &vector).await.unwrap();
    }
}

#[tokio::test]
async fn test_vectors_on_sqlite_store() {
    init_tracing();
    for vector in all_vectors() {
        run_and_audit(SqliteStore::open_memory().unwrap(), &vector)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_vectors_on_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();

    for (i, vector) in all_vectors().iter().enumerate() {
        let path = dir.path().join(format!("vector-{}.db", i));
        run_and_audit(SqliteStore::open(&path).unwrap(), vector)
            .await
            .unwrap();

        // Reopening audits again and keeps every answer.
        let notary = Notary::open(SqliteStore::open(&path).unwrap(), NotaryConfig::default())
            .await
            .unwrap();
        let replayed = run_on_ledger(vector).unwrap();
        assert_eq!(
            notary.audit().await.unwrap().signatories,
            replayed.stats().signatories
        );
    }
}
