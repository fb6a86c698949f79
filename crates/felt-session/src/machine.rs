//! State machine for a single federated sign-in attempt.
//!
//! Each call to sign in with a provider gets its own machine, so an
//! attempt can only move forward:
//!
//! ```text
//! ┌──────┐  Begin   ┌──────────────┐  PickPopup   ┌──────────────┐
//! │ Idle │ ───────► │ ChoosingFlow │ ───────────► │ PopupPending │
//! └──────┘          └──────┬───────┘              └──────┬───────┘
//!    ▲                     │ PickRedirect                │
//!    │                     ▼                             │ PopupDone /
//!    │             ┌────────────────┐   PopupRejected    │ PopupFailed
//!    │             │ NavigatingAway │ ◄──── (back to     │
//!    │             └────────────────┘   ChoosingFlow) ◄──┘
//!    └────────────────────────────────────────────────────┘
//! ```
//!
//! `NavigatingAway` is terminal: once the surface is handed to the
//! provider, nothing else may happen in this attempt. `PopupRejected`
//! (blocked or abandoned popup) routes back through `ChoosingFlow` so the
//! attempt can pick the redirect flow instead.

use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub signin_attempt(Idle)

    Idle => {
        Begin => ChoosingFlow
    },
    ChoosingFlow => {
        PickPopup => PopupPending,
        PickRedirect => NavigatingAway
    },
    PopupPending => {
        // Flow finished in place, for better or worse
        PopupDone => Idle,
        PopupFailed => Idle,
        // Popup could not run; choose again
        PopupRejected => ChoosingFlow
    }
}

pub use signin_attempt::Input as AttemptInput;
pub use signin_attempt::State as AttemptMachineState;
pub use signin_attempt::StateMachine as AttemptMachine;

/// Simplified view of the machine state, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    ChoosingFlow,
    PopupPending,
    NavigatingAway,
}

impl AttemptState {
    /// Whether the primary surface has been handed to the provider.
    pub fn is_navigating_away(&self) -> bool {
        matches!(self, AttemptState::NavigatingAway)
    }
}

impl From<&AttemptMachineState> for AttemptState {
    fn from(state: &AttemptMachineState) -> Self {
        match state {
            AttemptMachineState::Idle => AttemptState::Idle,
            AttemptMachineState::ChoosingFlow => AttemptState::ChoosingFlow,
            AttemptMachineState::PopupPending => AttemptState::PopupPending,
            AttemptMachineState::NavigatingAway => AttemptState::NavigatingAway,
        }
    }
}
