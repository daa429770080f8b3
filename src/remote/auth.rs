use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use url::Url;

use super::{RemoteError, RemoteResult};

/// Whatever the identity provider told us about the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub user_metadata: ProviderMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn get_session(&self) -> RemoteResult<Option<Session>>;

    /// Session changes reported by the provider, in order.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Returns the provider URL the user must visit to sign in.
    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> RemoteResult<Url>;

    async fn sign_out(&self) -> RemoteResult<()>;
}

pub type DynAuthClient = Arc<dyn AuthClient>;

const SESSION_HOURS: i64 = 24 * 7;

/// In-process identity provider.
pub struct LocalAuth {
    authorize_url: Url,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl LocalAuth {
    pub fn new(authorize_url: Url) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            authorize_url,
            session: Mutex::new(None),
            events,
        }
    }

    /// Start with an already-established session (no change event).
    pub fn with_session(authorize_url: Url, user: SessionUser) -> Self {
        let auth = Self::new(authorize_url);
        *auth.lock() = Some(new_session(user));
        auth
    }

    /// Complete a sign-in for `user` and notify subscribers.
    pub fn sign_in_as(&self, user: SessionUser) -> Session {
        let session = new_session(user);
        *self.lock() = Some(session.clone());
        tracing::info!("Signed in {}", session.user.id);
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        session
    }

    /// Drop the current session as if it expired.
    pub fn expire(&self) {
        if self.lock().take().is_some() {
            let _ = self.events.send(AuthEvent::SignedOut);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_session(user: SessionUser) -> Session {
    Session {
        access_token: generate_token(),
        expires_at: Utc::now() + Duration::hours(SESSION_HOURS),
        user,
    }
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl AuthClient for LocalAuth {
    async fn get_session(&self) -> RemoteResult<Option<Session>> {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(|s| s.expires_at <= Utc::now()) {
            *guard = None;
        }
        Ok(guard.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> RemoteResult<Url> {
        if provider.trim().is_empty() {
            return Err(RemoteError::Auth("provider is required".into()));
        }
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        self.expire();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> LocalAuth {
        LocalAuth::new(Url::parse("http://127.0.0.1:3000/auth/v1/authorize").unwrap())
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".into(),
            email: Some("asha@college.edu".into()),
            user_metadata: ProviderMetadata::default(),
        }
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn sign_in_publishes_event_and_session() {
        let auth = auth();
        let mut events = auth.subscribe();

        let session = auth.sign_in_as(user());
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(session.clone()));
        assert_eq!(auth.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn sign_out_clears_session_once() {
        let auth = auth();
        auth.sign_in_as(user());
        let mut events = auth.subscribe();

        auth.sign_out().await.unwrap();
        auth.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
        assert!(events.try_recv().is_err());
        assert!(auth.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_url_carries_provider_and_redirect() {
        let url = auth()
            .sign_in_with_oauth("google", "http://localhost/app")
            .await
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&("redirect_to".into(), "http://localhost/app".into())));
    }
}
