//! Reconciliation of a pending redirect on a fresh launch.

use felt_identity::codes;
use tempfile::TempDir;

use super::support::{
    backend_error, open_vault, start_context, user, wait_until, Call, StubBackend, DESKTOP_UA,
};
use crate::AuthError;

/// The listener's first callback clears the marker, even when it only
/// reflects a pre-existing session.
#[tokio::test]
async fn first_listener_callback_clears_a_stale_marker() {
    let dir = TempDir::new().unwrap();
    let vault = open_vault(dir.path());
    vault.mark_redirect_pending().unwrap();

    let stub = StubBackend::new();
    *stub.restore_emits.lock().unwrap() = Some(Some(user("u-durable")));

    let ctx = start_context(&stub, dir.path(), DESKTOP_UA).await;
    wait_until(|| !ctx.is_loading(), "context to settle").await;

    assert!(!vault.redirect_pending().unwrap());
    assert_eq!(ctx.current_user().unwrap().id, "u-durable");
}

/// Listener fires, then a late result-check failure lands: the second
/// clear is a no-op, the error still surfaces, nothing panics.
#[tokio::test]
async fn late_result_check_after_listener_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let vault = open_vault(dir.path());
    vault.mark_redirect_pending().unwrap();

    let stub = StubBackend::new();
    *stub.restore_emits.lock().unwrap() = Some(Some(user("u-1")));
    *stub.redirect_result.lock().unwrap() =
        Some(Err(backend_error(codes::ACCOUNT_CONFLICT)));

    let ctx = start_context(&stub, dir.path(), DESKTOP_UA).await;
    wait_until(|| !ctx.is_loading(), "context to settle").await;
    wait_until(
        || stub.called(&Call::TakeRedirectResult),
        "the redirect-result check",
    )
    .await;

    assert!(!vault.redirect_pending().unwrap());
    wait_until(
        || flow_error_waiting(&ctx),
        "the redirect failure to surface",
    )
    .await;
}

fn flow_error_waiting(ctx: &crate::SessionContext) -> bool {
    match ctx.take_flow_error() {
        Some(err) => {
            assert_eq!(err, AuthError::AccountConflict);
            true
        }
        None => false,
    }
}

/// A failed result check clears the marker on its own; it never waits for
/// a listener that may not be coming.
#[tokio::test]
async fn failed_result_check_clears_the_marker_without_the_listener() {
    let dir = TempDir::new().unwrap();
    let vault = open_vault(dir.path());
    vault.mark_redirect_pending().unwrap();

    let stub = StubBackend::new();
    // The listener never settles; only the result check answers.
    *stub.restore_emits.lock().unwrap() = None;
    *stub.redirect_result.lock().unwrap() = Some(Err(backend_error(codes::USER_CANCELLED)));

    let ctx = start_context(&stub, dir.path(), DESKTOP_UA).await;
    wait_until(
        || !vault.redirect_pending().unwrap(),
        "the result check to clear the marker",
    )
    .await;

    wait_until(
        || match ctx.take_flow_error() {
            Some(err) => {
                assert_eq!(err, AuthError::Cancelled);
                true
            }
            None => false,
        },
        "the translated failure to surface",
    )
    .await;
    // Loading keeps holding for the listener; the failure is already out.
    assert!(ctx.is_loading());
}

/// A completed redirect arrives through the result check and then the
/// session flows in like any other change.
#[tokio::test]
async fn completed_redirect_result_restores_the_session() {
    let dir = TempDir::new().unwrap();
    let vault = open_vault(dir.path());
    vault.mark_redirect_pending().unwrap();

    let stub = StubBackend::new();
    *stub.restore_emits.lock().unwrap() = Some(None);
    *stub.redirect_result.lock().unwrap() = Some(Ok(Some(user("u-returned"))));

    let ctx = start_context(&stub, dir.path(), DESKTOP_UA).await;
    wait_until(
        || ctx.current_user().map(|u| u.id) == Some("u-returned".to_string()),
        "the redirect session to land",
    )
    .await;

    assert!(!vault.redirect_pending().unwrap());
    assert!(!ctx.is_loading());
    assert!(ctx.take_flow_error().is_none());
}

/// The flow error is reported once, then gone.
#[tokio::test]
async fn flow_error_is_consumed_on_first_read() {
    let dir = TempDir::new().unwrap();
    let stub = StubBackend::new();
    *stub.redirect_result.lock().unwrap() =
        Some(Err(backend_error(codes::PROVIDER_DISABLED)));

    let ctx = start_context(&stub, dir.path(), DESKTOP_UA).await;
    wait_until(
        || stub.called(&Call::TakeRedirectResult),
        "the redirect-result check",
    )
    .await;
    wait_until(
        || match ctx.take_flow_error() {
            Some(err) => {
                assert_eq!(err, AuthError::ProviderDisabled);
                true
            }
            None => false,
        },
        "the failure to surface",
    )
    .await;

    assert!(ctx.take_flow_error().is_none());
}
