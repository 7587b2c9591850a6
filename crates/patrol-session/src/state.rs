//! Observable session state.

use patrol_client::Identity;

/// Where the session stands, as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No identity; the user must sign in.
    Unauthenticated,
    /// Startup recovery has not finished; identity is not yet known.
    Bootstrapping,
    /// Signed in.
    Authenticated(Identity),
    /// Was signed in, but a request ended the session and cleared the
    /// credentials. Treat as signed out.
    Expired,
}

impl SessionState {
    /// The signed-in identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// Whether the identity question has been settled either way.
    pub fn is_known(&self) -> bool {
        !matches!(self, SessionState::Bootstrapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_accessors() {
        let identity: Identity = serde_json::from_value(serde_json::json!({"id": 7})).unwrap();
        let state = SessionState::Authenticated(identity);
        assert!(state.is_authenticated());
        assert!(state.is_known());
        assert_eq!(state.identity().map(|i| i.id), Some(7));

        assert!(!SessionState::Bootstrapping.is_known());
        assert!(SessionState::Expired.is_known());
        assert!(SessionState::Expired.identity().is_none());
    }
}
