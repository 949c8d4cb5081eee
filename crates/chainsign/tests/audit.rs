//! Tamper detection: edits made behind the notary's back fail the audit.

use std::path::Path;

use chainsign::core::JournalError;
use chainsign::store::SqliteStore;
use chainsign::{Notary, NotaryConfig, NotaryError};
use chainsign_testkit::fixtures::{doc, multi_party_fixtures};

/// Two signatories, one chain `draft <- v1 <- v2`, one rejected call.
async fn populate(path: &Path) {
    let notary = Notary::open(SqliteStore::open(path).unwrap(), NotaryConfig::default())
        .await
        .unwrap();
    let parties = multi_party_fixtures(2);
    for party in &parties {
        party.register(&notary).await.unwrap();
    }

    notary
        .sign(doc("v1"), doc("draft"), parties[0].identity)
        .await
        .unwrap();
    notary
        .sign(doc("v2"), doc("v1"), parties[1].identity)
        .await
        .unwrap();
    let rejected = notary
        .sign(doc("v3"), doc("v2"), parties[0].identity)
        .await
        .unwrap_err();
    assert!(rejected.is_rejection());
}

fn tamper(path: &Path, sql: &str) {
    let conn = rusqlite::Connection::open(path).unwrap();
    let changed = conn.execute(sql, []).unwrap();
    assert!(changed > 0, "tamper statement changed nothing: {}", sql);
}

async fn audit(path: &Path) -> chainsign::Result<chainsign::AuditReport> {
    let notary = Notary::new(SqliteStore::open(path).unwrap(), NotaryConfig::default());
    notary.audit().await
}

#[tokio::test]
async fn test_untouched_store_passes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    let report = audit(&path).await.unwrap();
    assert_eq!(report.entries, 4);
    assert_eq!(report.signatories, 2);
    assert_eq!(report.links, 2);
    assert_eq!(report.roots, 1);
    assert!(report.head.is_some());
}

#[tokio::test]
async fn test_rewritten_cid_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    tamper(&path, "UPDATE signatories SET cid = X'ff'");

    let err = audit(&path).await.unwrap_err();
    assert!(matches!(err, NotaryError::AuditMismatch(_)), "{:?}", err);
}

#[tokio::test]
async fn test_dropped_endorsement_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    tamper(
        &path,
        "DELETE FROM endorsements WHERE position = (SELECT MAX(position) FROM endorsements)",
    );

    let err = audit(&path).await.unwrap_err();
    assert!(matches!(err, NotaryError::AuditMismatch(_)), "{:?}", err);
}

#[tokio::test]
async fn test_forged_entry_id_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    tamper(&path, "UPDATE journal SET entry_id = zeroblob(32) WHERE seq = 1");

    let err = audit(&path).await.unwrap_err();
    assert!(
        matches!(err, NotaryError::Journal(JournalError::IdMismatch { seq: 1 })),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_removed_journal_entry_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    tamper(&path, "DELETE FROM journal WHERE seq = 2");

    let err = audit(&path).await.unwrap_err();
    assert!(
        matches!(
            err,
            NotaryError::Journal(JournalError::InvalidSequence {
                expected: 2,
                got: 3
            })
        ),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_open_refuses_tampered_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    populate(&path).await;

    tamper(&path, "DELETE FROM links WHERE child = (SELECT MIN(child) FROM links)");

    let strict = Notary::open(SqliteStore::open(&path).unwrap(), NotaryConfig::default()).await;
    assert!(matches!(strict, Err(NotaryError::AuditMismatch(_))));

    let lenient = Notary::open(
        SqliteStore::open(&path).unwrap(),
        NotaryConfig {
            audit_on_open: false,
        },
    )
    .await;
    assert!(lenient.is_ok());
}
