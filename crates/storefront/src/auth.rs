//! Authentication session state.
//!
//! Token issuance lives on the backend (OAuth and password flows are
//! not this crate's concern); this module only holds the issued bearer
//! token plus user id, and broadcasts transitions so the cart subsystem
//! can react to sign-in and sign-out.

use std::sync::Arc;

use gobi_eats_core::UserId;
use secrecy::SecretString;
use tokio::sync::watch;

/// Credentials of an authenticated user.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Backend user id.
    pub user_id: UserId,
    /// Bearer token sent with every authenticated call.
    pub token: SecretString,
}

impl Credentials {
    /// Create credentials from a user id and bearer token.
    #[must_use]
    pub fn new(user_id: UserId, token: SecretString) -> Self {
        Self { user_id, token }
    }
}

/// Observable authentication session.
///
/// Holds `Some(Credentials)` when signed in. Subscribers observe every
/// transition, including sign-out.
#[derive(Debug, Clone)]
pub struct AuthSession {
    tx: Arc<watch::Sender<Option<Credentials>>>,
}

impl AuthSession {
    /// Create a signed-out session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record a sign-in. Both token and user id must be known.
    pub fn sign_in(&self, user_id: UserId, token: SecretString) {
        self.tx.send_replace(Some(Credentials::new(user_id, token)));
    }

    /// Record a sign-out.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Current credentials, if signed in.
    #[must_use]
    pub fn current(&self) -> Option<Credentials> {
        self.tx.borrow().clone()
    }

    /// True when a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Observe session transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.tx.subscribe()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_are_observable() {
        let session = AuthSession::new();
        let mut rx = session.subscribe();
        assert!(session.current().is_none());

        session.sign_in(UserId::new("u-1"), SecretString::from("token"));
        rx.changed().await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(
            session.current().unwrap().user_id,
            UserId::new("u-1")
        );

        session.sign_out();
        rx.changed().await.unwrap();
        assert!(!session.is_authenticated());
    }
}
