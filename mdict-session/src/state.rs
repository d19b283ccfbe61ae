/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Request session state machine.
//!
//! Sessions only ever move forward:
//!
//! ```text
//! Created -> CheckCache -> Delivered                 (cache hit)
//! CheckCache -> AwaitInfo -> AwaitFull -> Delivered -> Closed
//! AwaitInfo -> Delivered                             (identity already cached)
//! (any non-terminal state) -> Delivered(status) -> Closed
//! ```
//!
//! A session may also be closed by its consumer from any non-terminal state.

use mdict_core::error::SessionError;
use std::fmt;

/// State of one consumer request session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Session created, nothing checked yet.
    #[default]
    Created,
    /// Looking for a cached identity and payload.
    CheckCache,
    /// INFO request sent, waiting for the identity.
    AwaitInfo,
    /// Identity known, waiting for the shared FULL fetch.
    AwaitFull,
    /// A response (refresh or status) has been delivered.
    Delivered,
    /// Session closed; terminal.
    Closed,
}

impl SessionState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::CheckCache => "CHECK_CACHE",
            Self::AwaitInfo => "AWAIT_INFO",
            Self::AwaitFull => "AWAIT_FULL",
            Self::Delivered => "DELIVERED",
            Self::Closed => "CLOSED",
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true while the session waits on upstream.
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::AwaitInfo | Self::AwaitFull)
    }

    /// Returns true if the state machine allows moving from `self` to `next`.
    ///
    /// `Delivered -> Delivered` covers a status arriving on a streaming
    /// session that already received its refresh.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{AwaitFull, AwaitInfo, CheckCache, Closed, Created, Delivered};
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (_, Delivered) => true,
            (Created, CheckCache) => true,
            (CheckCache, AwaitInfo) => true,
            (AwaitInfo, AwaitFull) => true,
            _ => false,
        }
    }

    /// Validates a transition and returns the new state.
    ///
    /// # Errors
    /// Returns `SessionError::InvalidTransition` if the move is not allowed.
    pub fn transition(self, next: Self) -> Result<Self, SessionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SessionError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_path() {
        let state = SessionState::Created;
        let state = state.transition(SessionState::CheckCache).unwrap();
        let state = state.transition(SessionState::AwaitInfo).unwrap();
        let state = state.transition(SessionState::AwaitFull).unwrap();
        let state = state.transition(SessionState::Delivered).unwrap();
        let state = state.transition(SessionState::Closed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_cache_hit_paths() {
        assert!(SessionState::CheckCache.can_transition_to(SessionState::Delivered));
        assert!(SessionState::AwaitInfo.can_transition_to(SessionState::Delivered));
    }

    #[test]
    fn test_status_branch_from_every_live_state() {
        for state in [
            SessionState::Created,
            SessionState::CheckCache,
            SessionState::AwaitInfo,
            SessionState::AwaitFull,
            SessionState::Delivered,
        ] {
            assert!(state.can_transition_to(SessionState::Delivered), "{state}");
            assert!(state.can_transition_to(SessionState::Closed), "{state}");
        }
    }

    #[test]
    fn test_no_backward_moves() {
        assert_eq!(
            SessionState::AwaitFull.transition(SessionState::AwaitInfo),
            Err(SessionError::InvalidTransition {
                from: "AWAIT_FULL".to_string(),
                to: "AWAIT_INFO".to_string(),
            })
        );
        assert!(!SessionState::Delivered.can_transition_to(SessionState::AwaitFull));
        assert!(!SessionState::Created.can_transition_to(SessionState::AwaitInfo));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Closed));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Delivered));
    }

    #[test]
    fn test_waiting_states() {
        assert!(SessionState::AwaitInfo.is_waiting());
        assert!(SessionState::AwaitFull.is_waiting());
        assert!(!SessionState::Delivered.is_waiting());
        assert_eq!(SessionState::default(), SessionState::Created);
    }
}
