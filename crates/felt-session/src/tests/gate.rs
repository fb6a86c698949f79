//! The persistence gate resolves once, for everyone.

use std::sync::Arc;

use felt_identity::codes;
use felt_storage::StorageScope;

use super::support::{backend_error, Call, StubBackend};
use crate::PersistenceGate;

#[tokio::test]
async fn concurrent_callers_share_one_application() {
    let stub = StubBackend::new();
    let gate = Arc::new(PersistenceGate::new(stub.clone(), StorageScope::Durable));
    assert!(!gate.is_resolved());

    let mut waiters = Vec::new();
    for _ in 0..16 {
        let gate = Arc::clone(&gate);
        waiters.push(tokio::spawn(async move { gate.ready().await }));
    }
    for waiter in waiters {
        waiter.await.unwrap();
    }

    assert!(gate.is_resolved());
    assert_eq!(
        stub.count_of(&Call::ApplyPersistence(StorageScope::Durable)),
        1
    );
}

#[tokio::test]
async fn later_callers_observe_the_gate_resolved() {
    let stub = StubBackend::new();
    let gate = PersistenceGate::new(stub.clone(), StorageScope::SessionOnly);

    gate.ready().await;
    gate.ready().await;
    gate.ready().await;

    assert_eq!(
        stub.count_of(&Call::ApplyPersistence(StorageScope::SessionOnly)),
        1
    );
}

/// A failed application still resolves the gate; sessions run with the
/// backend's default durability instead of hanging forever.
#[tokio::test]
async fn failed_application_resolves_anyway() {
    let stub = StubBackend::new();
    *stub.apply_outcome.lock().unwrap() =
        Err(backend_error(codes::NETWORK_REQUEST_FAILED));

    let gate = PersistenceGate::new(stub.clone(), StorageScope::Durable);
    gate.ready().await;
    assert!(gate.is_resolved());

    // Not retried either; the one shot was it.
    gate.ready().await;
    assert_eq!(
        stub.count_of(&Call::ApplyPersistence(StorageScope::Durable)),
        1
    );
}
