//! End-to-end tests for the session runtime.
//!
//! Each test wires a real `SessionContext` over a scripted identity
//! backend and a temp-dir durable store, then drives it the way the app
//! would across one or more "page loads".
//!
//! - `support.rs`   - scriptable backend, marker vault access, startup helpers
//! - `loading.rs`   - loading-state invariants across startup
//! - `password.rs`  - credential sign-in/sign-up and verification sends
//! - `federated.rs` - popup/redirect selection, fallback, marker lifecycle
//! - `reconcile.rs` - post-redirect reconciliation on a fresh launch
//! - `gate.rs`      - one-shot persistence gate

mod gate;
mod reconcile;
pub(crate) mod support;
