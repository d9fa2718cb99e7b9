//! In-memory session store.
//!
//! A login creates a random 32-character token that the client carries in the
//! `clubms.sid` cookie. Expired sessions are purged when they are looked up
//! and whenever a new session starts.

use crate::core::guard::Identity;
use axum::http::{HeaderMap, header};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "clubms.sid";
const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone)]
struct Entry {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Sessions keyed by token.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

impl SessionStore {
    /// Creates an empty store whose sessions live for `ttl_hours`.
    #[must_use]
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a session and returns its token. Sessions that expired without
    /// being looked up again are dropped here.
    pub async fn create(&self, identity: Identity) -> String {
        self.create_at(identity, Utc::now()).await
    }

    async fn create_at(&self, identity: Identity, now: DateTime<Utc>) -> String {
        let token = generate_token();
        let entry = Entry {
            identity,
            expires_at: now + self.ttl,
        };
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.expires_at > now);
        if sessions.len() < before {
            debug!(purged = before - sessions.len(), "Expired sessions purged");
        }
        sessions.insert(token.clone(), entry);
        token
    }

    /// Resolves a token, dropping it if it has expired.
    pub async fn get(&self, token: &str) -> Option<Identity> {
        self.get_at(token, Utc::now()).await
    }

    async fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Identity> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some(entry) if entry.expires_at > now => Some(entry.identity.clone()),
            Some(_) => {
                sessions.remove(token);
                debug!("Expired session purged");
                None
            }
            None => None,
        }
    }

    /// Ends a session. Returns whether it existed.
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }

    /// `Set-Cookie` value delivering `token`.
    #[must_use]
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl.num_seconds()
        )
    }

    /// `Set-Cookie` value clearing the session cookie.
    #[must_use]
    pub fn cleared_cookie() -> String {
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

/// Extracts the session token from the `Cookie` headers.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::Role;
    use axum::http::HeaderValue;

    fn admin() -> Identity {
        Identity {
            user_id: 1,
            username: "admin".to_string(),
            role: Role::Admin,
            linked_id: None,
            display_name: Some("Administrator".to_string()),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::new(24);
        let token = store.create(admin()).await;
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(store.get(&token).await.unwrap().username, "admin");
        assert!(store.remove(&token).await);
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_purged() {
        let store = SessionStore::new(1);
        let token = store.create(admin()).await;
        let later = Utc::now() + Duration::hours(2);
        assert!(store.get_at(&token, later).await.is_none());
        assert!(!store.remove(&token).await);
    }

    #[tokio::test]
    async fn test_new_session_sweeps_abandoned_ones() {
        let store = SessionStore::new(1);
        let abandoned = store.create(admin()).await;
        let fresh = store
            .create_at(admin(), Utc::now() + Duration::hours(2))
            .await;

        let sessions = store.sessions.lock().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&fresh));
        assert!(!sessions.contains_key(&abandoned));
    }

    #[test]
    fn test_cookie_round_trip() {
        let store = SessionStore::new(24);
        let cookie = store.cookie("abc123");
        assert!(cookie.starts_with("clubms.sid=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; clubms.sid=abc123"),
        );
        assert_eq!(token_from_headers(&headers), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("clubms.sid="));
        assert_eq!(token_from_headers(&headers), None);
    }
}
