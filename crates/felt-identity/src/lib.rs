//! Identity backend for the Felt client.
//!
//! This crate provides:
//! - The [`IdentityBackend`] contract the session runtime drives
//! - An HTTP implementation against the hosted Felt identity service
//! - Interactive sign-in plumbing (popup via a loopback callback server,
//!   redirect via the app's launch URL)
//! - The closed set of failure [`codes`] the service emits

mod backend;
mod browser;
pub mod codes;
mod error;
mod flows;
mod http;
mod types;

pub use backend::{IdentityBackend, SessionEvents};
pub use browser::{
    parse_launch_reply, CallbackServer, SystemBrowserFlows, DEFAULT_CALLBACK_TIMEOUT_SECS,
};
pub use error::{
    BackendError, IdentityResult, STATE_MISMATCH, STORAGE_FAILED, UNEXPECTED_RESPONSE,
};
pub use flows::{AuthorizeRequest, CallbackReply, FlowDriver};
pub use http::HttpIdentityBackend;
pub use types::{AuthUser, FederatedProvider};
