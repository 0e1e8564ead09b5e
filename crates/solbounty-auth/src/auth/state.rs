/*
[INPUT]:  Current negotiator state and flow events
[OUTPUT]: Validated state transitions for an authentication attempt
[POS]:    Auth layer - finite state machine behind the session negotiator
[UPDATE]: When flow states or allowed transitions change
*/

use serde::Serialize;
use thiserror::Error;

use crate::http::FailureKind;

/// Which server operation an attempt targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// First-time or returning sign-in with the wallet
    Register,
    /// Rebind the wallet of an already signed-in account
    UpdateWallet,
}

impl Intent {
    pub fn endpoint(self) -> &'static str {
        match self {
            Intent::Register => "/v1/auth/register",
            Intent::UpdateWallet => "/v1/user/update",
        }
    }

    /// Where the UI should go after success, if anywhere
    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Intent::Register => Some("/dashboard"),
            Intent::UpdateWallet => None,
        }
    }
}

/// Negotiator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NegotiatorState {
    Idle,
    AwaitingWalletConnect,
    AwaitingSignature,
    AwaitingServerVerification,
    Authenticated { intent: Intent },
    Failed { reason: FailureKind },
}

impl NegotiatorState {
    /// True while parked on a suspension point
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            NegotiatorState::AwaitingWalletConnect
                | NegotiatorState::AwaitingSignature
                | NegotiatorState::AwaitingServerVerification
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiatorState::Authenticated { .. } | NegotiatorState::Failed { .. }
        )
    }
}

/// Events that drive an attempt forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// User started an attempt with no wallet connected
    RequestConnect,
    /// Wallet exposed a public key
    WalletReady,
    /// Wallet produced a signature
    SignatureReady,
    /// Server accepted the credentials
    Verified(Intent),
    Fail(FailureKind),
    Reset,
}

/// Errors occurring during state transitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid transition: {from:?} -> {event:?}")]
    InvalidTransition {
        from: NegotiatorState,
        event: FlowEvent,
    },
}

/// State machine for one negotiator
#[derive(Debug, Clone)]
pub struct FlowStateMachine {
    current_state: NegotiatorState,
}

impl Default for FlowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: NegotiatorState::Idle,
        }
    }

    fn next_state(&self, event: FlowEvent) -> Option<NegotiatorState> {
        use NegotiatorState as S;

        match (self.current_state, event) {
            (S::Idle, FlowEvent::RequestConnect) => Some(S::AwaitingWalletConnect),
            (S::Idle | S::AwaitingWalletConnect, FlowEvent::WalletReady) => {
                Some(S::AwaitingSignature)
            }
            (S::AwaitingSignature, FlowEvent::SignatureReady) => {
                Some(S::AwaitingServerVerification)
            }
            (S::AwaitingServerVerification, FlowEvent::Verified(intent)) => {
                Some(S::Authenticated { intent })
            }
            (S::Failed { .. }, FlowEvent::Fail(_)) => None,
            (_, FlowEvent::Fail(reason)) => Some(S::Failed { reason }),
            (_, FlowEvent::Reset) => Some(S::Idle),
            _ => None,
        }
    }

    /// Check if `event` is valid from the current state
    pub fn can_transition(&self, event: FlowEvent) -> bool {
        self.next_state(event).is_some()
    }

    /// Perform a state transition
    pub fn transition(&mut self, event: FlowEvent) -> Result<NegotiatorState, StateError> {
        let next = self
            .next_state(event)
            .ok_or(StateError::InvalidTransition {
                from: self.current_state,
                event,
            })?;
        self.current_state = next;
        Ok(next)
    }

    /// Get the current state
    pub fn state(&self) -> NegotiatorState {
        self.current_state
    }
}
