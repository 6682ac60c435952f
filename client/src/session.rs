//! Session Store: single-user login state, never persisted.

use std::sync::Arc;

use async_trait::async_trait;
use domain::Profile;
use tokio::sync::watch;
use tracing::{debug, info};

/// Decides whether a credential pair belongs to a known user.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> Option<Profile>;
}

/// Accepts exactly one hardcoded profile.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    profile: Profile,
}

impl StaticCredentials {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// The demo account (`test@example.com` / `qwerty`).
    pub fn demo() -> Self {
        Self::new(Profile {
            name: "Farhan".into(),
            email: "test@example.com".into(),
            password: "qwerty".into(),
            avatar_url: "https://yt3.ggpht.com/yti/ANjgQV-EwZPxbL-mYuL6FusOirnujxXnxTXEB3DJhNXKYBBHJdc=s88-c-k-c0x00ffffff-no-rj".into(),
        })
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::demo()
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, email: &str, password: &str) -> Option<Profile> {
        (email == self.profile.email && password == self.profile.password)
            .then(|| self.profile.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<Profile>,
    pub is_authenticated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    Login(Profile),
    Logout,
}

pub fn reduce(state: &mut SessionState, action: SessionAction) {
    match action {
        SessionAction::Login(profile) => {
            state.user = Some(profile);
            state.is_authenticated = true;
        }
        SessionAction::Logout => {
            state.user = None;
            state.is_authenticated = false;
        }
    }
}

/// Handle to a Session Store. Clones share the same state.
pub struct SessionStore<V: CredentialVerifier> {
    verifier: Arc<V>,
    state: Arc<watch::Sender<SessionState>>,
}

impl<V: CredentialVerifier> Clone for SessionStore<V> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            state: Arc::clone(&self.state),
        }
    }
}

impl<V: CredentialVerifier> SessionStore<V> {
    pub fn new(verifier: V) -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            verifier: Arc::new(verifier),
            state: Arc::new(tx),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Sign in when the verifier accepts the pair. Rejected credentials leave
    /// the state untouched and report nothing to the caller.
    pub async fn login(&self, email: &str, password: &str) {
        match self.verifier.verify(email, password).await {
            Some(profile) => {
                info!(email = %profile.email, "login");
                self.state
                    .send_modify(|s| reduce(s, SessionAction::Login(profile)));
            }
            None => debug!(email, "login rejected"),
        }
    }

    pub fn logout(&self) {
        self.state.send_modify(|s| reduce(s, SessionAction::Logout));
    }
}

impl Default for SessionStore<StaticCredentials> {
    fn default() -> Self {
        Self::new(StaticCredentials::demo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_store() -> SessionStore<StaticCredentials> {
        SessionStore::default()
    }

    #[tokio::test]
    async fn demo_credentials_log_in() {
        let store = demo_store();
        store.login("test@example.com", "qwerty").await;
        let state = store.snapshot();
        assert!(state.is_authenticated);
        assert_eq!(state.user.map(|u| u.name), Some("Farhan".to_string()));
    }

    #[tokio::test]
    async fn wrong_credentials_change_nothing() {
        let store = demo_store();
        for (email, password) in [
            ("test@example.com", "wrong"),
            ("other@example.com", "qwerty"),
            ("TEST@example.com", "qwerty"),
            ("", ""),
        ] {
            store.login(email, password).await;
            assert_eq!(store.snapshot(), SessionState::default());
        }
    }

    #[tokio::test]
    async fn failed_login_keeps_existing_session() {
        let store = demo_store();
        store.login("test@example.com", "qwerty").await;
        let before = store.snapshot();
        store.login("test@example.com", "nope").await;
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn logout_always_resets() {
        let store = demo_store();
        store.logout();
        assert_eq!(store.snapshot(), SessionState::default());

        store.login("test@example.com", "qwerty").await;
        store.logout();
        let state = store.snapshot();
        assert!(state.user.is_none());
        assert!(!state.is_authenticated);
    }

    struct AnyPassword;

    #[async_trait]
    impl CredentialVerifier for AnyPassword {
        async fn verify(&self, email: &str, _password: &str) -> Option<Profile> {
            Some(Profile {
                name: email.to_string(),
                email: email.to_string(),
                password: String::new(),
                avatar_url: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn verifier_is_injectable() {
        let store = SessionStore::new(AnyPassword);
        let mut rx = store.subscribe();
        store.login("someone@example.com", "x").await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().user.as_ref().map(|u| u.email.as_str()),
            Some("someone@example.com")
        );
        assert!(store.is_authenticated());
    }
}
