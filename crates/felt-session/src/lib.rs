//! Session runtime for the Felt client.
//!
//! Sits between the UI layer and the identity backend and owns the whole
//! session lifecycle:
//!
//! - **[`SessionContext`]**: the app-facing handle; current user, loading
//!   flag, change stream, and the sign-in operations
//! - **[`SessionListener`]**: single authority over "who is signed in",
//!   fed by the backend's event stream
//! - **[`SignInOrchestrator`]**: popup-or-redirect decision for federated
//!   sign-in, with fallback, over an explicit per-attempt state machine
//! - **[`PersistenceGate`]**: applies session durability exactly once
//!   before first use
//! - **[`AuthError`]**: the closed, user-facing failure taxonomy
//!
//! The one non-obvious piece is the redirect-intent marker: a durable
//! boolean written just before a redirect sign-in leaves the app, so the
//! next launch can hold its loading state until the result is
//! reconciled. See [`SessionListener`] for how it gets cleared.

mod context;
mod environment;
mod error;
mod gate;
mod listener;
mod machine;
mod orchestrator;
mod translate;

#[cfg(test)]
mod tests;

pub use context::{SessionContext, SessionSnapshot};
pub use environment::prefers_redirect;
pub use error::{AuthError, AuthResult};
pub use gate::PersistenceGate;
pub use listener::{SessionChanged, SessionListener};
pub use machine::{AttemptInput, AttemptMachine, AttemptMachineState, AttemptState};
pub use orchestrator::{FederatedSignIn, SignInOrchestrator};
pub use translate::classify;
