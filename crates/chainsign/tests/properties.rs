//! Property tests: every backend behaves exactly like the reference ledger.

use proptest::prelude::*;

use chainsign::core::{verify_journal, Ledger};
use chainsign::store::{MemoryStore, SqliteStore, Store};
use chainsign::{Notary, NotaryConfig};
use chainsign_testkit::generators::{ops, pool_document, pool_identity, Op};

/// Apply `op` to the notary, returning whether it was accepted.
async fn apply<S: Store>(notary: &Notary<S>, op: &Op) -> bool {
    let result = match op {
        Op::Register { party, cid } => notary
            .register(pool_identity(*party), cid.clone())
            .await
            .map(|_| ()),
        Op::Sign {
            child,
            parent,
            signer,
        } => notary
            .sign(
                pool_document(*child),
                pool_document(*parent),
                pool_identity(*signer),
            )
            .await
            .map(|_| ()),
    };

    match result {
        Ok(()) => true,
        Err(e) if e.is_rejection() => false,
        Err(e) => panic!("infrastructure failure: {}", e),
    }
}

async fn check_against_ledger<S: Store>(store: S, ops: &[Op]) -> Result<(), TestCaseError> {
    let notary = Notary::new(store, NotaryConfig::default());
    let mut ledger = Ledger::new();
    let mut accepted = 0;

    for op in ops {
        let expected = op.apply(&mut ledger);
        prop_assert_eq!(apply(&notary, op).await, expected, "op {:?}", op);
        accepted += usize::from(expected);
    }

    for i in 0..12 {
        let hash = pool_document(i);
        let endorsers = notary.endorsers_of(&hash).await.unwrap();
        prop_assert_eq!(endorsers.as_slice(), ledger.endorsers_of(&hash));
        prop_assert_eq!(notary.root_of(&hash).await.unwrap(), ledger.root_of(&hash));
    }

    for i in 0..4 {
        let identity = pool_identity(i);
        prop_assert_eq!(
            notary.lookup_cid(&identity).await.unwrap(),
            ledger.lookup_cid(&identity).cloned()
        );
    }

    let journal = notary.journal().await.unwrap();
    prop_assert!(verify_journal(&journal).is_ok());
    prop_assert_eq!(journal.len(), accepted);

    let report = notary.audit().await.unwrap();
    let stats = ledger.stats();
    prop_assert_eq!(report.signatories, stats.signatories);
    prop_assert_eq!(report.links, stats.links);
    prop_assert_eq!(report.roots, stats.roots);
    Ok(())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn memory_store_matches_ledger(ops in ops(64)) {
        runtime().block_on(check_against_ledger(MemoryStore::new(), &ops))?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn sqlite_store_matches_ledger(ops in ops(48)) {
        let store = SqliteStore::open_memory().unwrap();
        runtime().block_on(check_against_ledger(store, &ops))?;
    }
}
