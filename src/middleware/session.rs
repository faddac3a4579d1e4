//! Server-side sessions on top of `actix-session`.
//!
//! The signed `sid` cookie only carries a random session key; the data lives
//! in a [`MemorySessionStore`]. `actix-session` persists a session only when
//! a handler modified it, so anonymous traffic never grows the store.

use crate::utils::AppError;
use actix_session::{
    config::{CookieContentSecurity, PersistentSession},
    storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError},
    Session, SessionMiddleware,
};
use actix_web::{
    cookie::{time::Duration as CookieDuration, Key, SameSite},
    dev::Payload,
    FromRequest, HttpRequest,
};
use chrono::{DateTime, Duration, Utc};
use futures::future::LocalBoxFuture;
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "sid";
pub const USER_ID_KEY: &str = "user_id";

/// Session state as `actix-session` hands it to a store: JSON-encoded values.
pub type SessionState = HashMap<String, String>;

#[derive(Debug, Clone)]
struct SessionEntry {
    state: SessionState,
    expires_at: DateTime<Utc>,
}

/// In-process session storage shared by every worker.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    async fn put(&self, key: &str, state: SessionState, ttl: &CookieDuration) {
        let entry = SessionEntry {
            state,
            expires_at: Utc::now() + Duration::seconds(ttl.whole_seconds()),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<SessionState>, LoadError> {
        let key = session_key.as_ref();
        let entry = self.entries.read().await.get(key).cloned();
        match entry {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.state)),
            Some(_) => {
                self.entries.write().await.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_state: SessionState,
        ttl: &CookieDuration,
    ) -> Result<SessionKey, SaveError> {
        let key = new_session_key();
        self.put(&key, session_state, ttl).await;
        SessionKey::try_from(key).map_err(|e| SaveError::Other(anyhow::anyhow!("{}", e)))
    }

    async fn update(
        &self,
        session_key: SessionKey,
        session_state: SessionState,
        ttl: &CookieDuration,
    ) -> Result<SessionKey, UpdateError> {
        if !self.contains(session_key.as_ref()).await {
            // Expired or swept in the meantime: start over under a fresh key
            return self.save(session_state, ttl).await.map_err(|e| match e {
                SaveError::Serialization(e) => UpdateError::Serialization(e),
                SaveError::Other(e) => UpdateError::Other(e),
            });
        }
        self.put(session_key.as_ref(), session_state, ttl).await;
        Ok(session_key)
    }

    async fn update_ttl(
        &self,
        session_key: &SessionKey,
        ttl: &CookieDuration,
    ) -> Result<(), anyhow::Error> {
        let expires_at = Utc::now() + Duration::seconds(ttl.whole_seconds());
        if let Some(entry) = self.entries.write().await.get_mut(session_key.as_ref()) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<(), anyhow::Error> {
        self.entries.write().await.remove(session_key.as_ref());
        Ok(())
    }
}

fn new_session_key() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Derives the cookie signing key from the configured secret of any length.
pub fn derive_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Settings shared by every worker's session middleware.
#[derive(Clone)]
pub struct SessionSettings {
    pub store: MemorySessionStore,
    pub key: Key,
    pub ttl_secs: u64,
    pub cookie_secure: bool,
}

impl SessionSettings {
    pub fn new(store: MemorySessionStore, secret: &str, ttl_secs: u64, cookie_secure: bool) -> Self {
        Self {
            store,
            key: derive_key(secret),
            ttl_secs,
            cookie_secure,
        }
    }

    pub fn middleware(&self) -> SessionMiddleware<MemorySessionStore> {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX / 1000);

        SessionMiddleware::builder(self.store.clone(), self.key.clone())
            .cookie_name(SESSION_COOKIE.to_string())
            .cookie_path("/".to_string())
            .cookie_secure(self.cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .cookie_content_security(CookieContentSecurity::Signed)
            .session_lifecycle(PersistentSession::default().session_ttl(CookieDuration::seconds(ttl)))
            .build()
    }
}

/// Handler-facing view of the session, limited to what the routes need.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn user_id(&self) -> Result<Option<String>, AppError> {
        self.0
            .get::<String>(USER_ID_KEY)
            .map_err(|e| AppError::Internal(format!("Failed to read session: {}", e)))
    }

    pub fn set_user_id(&self, user_id: &str) -> Result<(), AppError> {
        self.0
            .insert(USER_ID_KEY, user_id)
            .map_err(|e| AppError::Internal(format!("Failed to persist session: {}", e)))
    }

    pub fn require_user_id(&self) -> Result<String, AppError> {
        self.user_id()?.ok_or(AppError::Unauthorized)
    }

    /// Keeps the data but moves it under a fresh key, e.g. after login.
    pub fn renew(&self) {
        self.0.renew();
    }

    /// Discards the session both server-side and in the browser.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
