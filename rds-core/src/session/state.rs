//! Session lifecycle state machine.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::RdsError;

/// Where the session is in its lifecycle.
///
/// ```text
///  Idle ──accept──► Connected ──capabilities──► Active
///   ▲                   │                          │
///   └──── disconnect / transport error ◄───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Listening for a client.
    #[default]
    Idle,

    /// Transport handshake done, waiting for capabilities.
    Connected {
        since: Instant,
    },

    /// Capabilities received; frames and input flow.
    Active {
        since: Instant,
    },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Active { .. } => write!(f, "Active"),
        }
    }
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// `true` while a client is attached, active or not.
    pub fn is_connected(&self) -> bool {
        !self.is_idle()
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// How long the session has been active. `None` in other states.
    pub fn active_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Active { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Idle`.
    pub fn accept(&mut self) -> Result<(), RdsError> {
        match self {
            Self::Idle => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(RdsError::ProtocolViolation(
                "cannot accept: a client is already connected",
            )),
        }
    }

    /// Valid from: `Connected`.
    pub fn activate(&mut self) -> Result<(), RdsError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Active {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(RdsError::ProtocolViolation(
                "cannot activate: not in Connected state",
            )),
        }
    }

    /// Back to `Idle` from any state.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle() {
        let mut state = SessionState::default();
        assert!(state.is_idle());

        state.accept().unwrap();
        assert!(state.is_connected());
        assert!(!state.is_active());

        state.activate().unwrap();
        assert!(state.is_active());
        assert!(state.active_duration().is_some());

        state.reset();
        assert!(state.is_idle());
    }

    #[test]
    fn invalid_transitions() {
        let mut state = SessionState::Idle;
        assert!(state.activate().is_err());

        state.accept().unwrap();
        assert!(state.accept().is_err());

        state.activate().unwrap();
        assert!(state.activate().is_err());
        assert_eq!(state.to_string(), "Active");
    }
}
