//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 LoginAttempt / RestoreAttempt / RefreshAttempt
//! ┌─────────────────┐ ─────────────────────────► ┌─────────────────┐
//! │ Unauthenticated │                            │ Authenticating  │ ⟲ TokenRefreshed
//! └─────────────────┘ ◄───────────────────────── └────────┬────────┘
//!          ▲           AttemptFailed / RefreshFailed       │ SessionEstablished
//!          │                                               ▼
//!          │          RefreshFailed                ┌─────────────────┐
//!          └────────────────────────────────────── │  Authenticated  │ ⟲ TokenRefreshed / UserReloaded
//!                                                  └─────────────────┘
//!                                                    LoginAttempt ──► Authenticating
//! ```
//!
//! `Logout` is accepted in every state so ending a session never fails.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates `session_machine::{State, Input, StateMachine, Impl}`.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unauthenticated)

    Unauthenticated => {
        LoginAttempt => Authenticating,
        RestoreAttempt => Authenticating,
        RefreshAttempt => Authenticating,
        Logout => Unauthenticated
    },
    Authenticating => {
        // Token minted while the user is still being loaded
        TokenRefreshed => Authenticating,
        SessionEstablished => Authenticated,
        AttemptFailed => Unauthenticated,
        RefreshFailed => Unauthenticated,
        Logout => Unauthenticated
    },
    Authenticated => {
        // A new login replaces the current session
        LoginAttempt => Authenticating,
        TokenRefreshed => Authenticated,
        UserReloaded => Authenticated,
        RefreshFailed => Unauthenticated,
        Logout => Unauthenticated
    }
}

pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session status as seen by view layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No usable credentials.
    Unauthenticated,
    /// Credentials obtained or restored, current user not yet confirmed.
    Authenticating,
    /// Access token and current user both present.
    Authenticated,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Authenticated => "authenticated",
        };
        f.write_str(label)
    }
}

impl From<&SessionMachineState> for SessionStatus {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionMachineState::Authenticating => SessionStatus::Authenticating,
            SessionMachineState::Authenticated => SessionStatus::Authenticated,
        }
    }
}

/// Payload delivered to the status callback on every status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedPayload {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
