//! HTTP surface.
//!
//! Handlers are thin: they resolve the caller from the session cookie, apply
//! the role gate of their namespace and hand over to [`crate::core`]. Every
//! request borrows a connection from the shared pool for its duration only.

mod admin;
mod auth;
mod coordinator;
/// Mapping of errors onto responses
pub mod error;
mod feedback;
mod member;
mod participant;
mod resources;
/// Cookie sessions
pub mod session;
mod sponsor;

use crate::{
    config::settings::ServerSettings,
    core::{credentials::CredentialStore, feedback::FeedbackDocuments, guard::{self, Identity}},
    entities::Role,
    errors::Result,
};
use axum::{Router, async_trait, extract::FromRequestParts, http::request::Parts};
use sea_orm::DatabaseConnection;
use session::{SessionStore, token_from_headers};
use std::{convert::Infallible, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Relational connection pool
    pub db: DatabaseConnection,
    /// Password hashing and login checks
    pub credentials: Arc<CredentialStore>,
    /// Feedback document store
    pub documents: Arc<dyn FeedbackDocuments>,
    /// Logged-in sessions by cookie token
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Bundles the collaborators every handler needs.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        credentials: CredentialStore,
        documents: Arc<dyn FeedbackDocuments>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            db,
            credentials: Arc::new(credentials),
            documents,
            sessions: Arc::new(sessions),
        }
    }
}

/// The caller behind the request's session cookie, if any.
///
/// Extraction never fails; handlers decide through [`CurrentUser::require`]
/// whether a missing session means a redirect to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Identity>);

impl CurrentUser {
    /// Requires a session of one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<&Identity> {
        guard::require_role(self.0.as_ref(), roles)
    }

    /// Requires any session.
    pub fn authenticated(&self) -> Result<&Identity> {
        guard::authenticated(self.0.as_ref())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let identity = match token_from_headers(&parts.headers) {
            Some(token) => state.sessions.get(token).await,
            None => None,
        };
        Ok(Self(identity))
    }
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth::router())
        .nest("/admin", admin::router())
        .nest("/coordinator", coordinator::router())
        .nest("/members", member::router())
        .nest("/sponsors", sponsor::router())
        .nest("/participants", participant::router())
        .nest("/feedback", feedback::submission_router())
        .nest("/feedback-analysis", feedback::analysis_router())
        .merge(resources::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the application until the listener fails.
pub async fn run_server(settings: &ServerSettings, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!(address = %settings.bind_address, "HTTP server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::documents::MemoryDocuments;
    use crate::test_utils::*;
    use reqwest::{Client, StatusCode, header, redirect::Policy};
    use serde_json::{Value, json};

    async fn spawn_app() -> Result<String> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        credentials
            .ensure_admin(&db, "admin", Some("secret"), "Administrator")
            .await?;
        let state = AppState::new(
            db,
            credentials,
            Arc::new(MemoryDocuments::default()),
            SessionStore::new(24),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, router(state)).await });
        Ok(format!("http://{address}"))
    }

    fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_redirects_without_session() -> Result<()> {
        let base = spawn_app().await?;
        let response = client()
            .get(format!("{base}/admin/dashboard"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        Ok(())
    }

    #[tokio::test]
    async fn test_login_session_and_role_gates() -> Result<()> {
        let base = spawn_app().await?;
        let client = client();

        let wrong_role = client
            .post(format!("{base}/login"))
            .json(&json!({"username": "admin", "password": "secret", "role": "member"}))
            .send()
            .await
            .unwrap();
        assert_eq!(wrong_role.status(), StatusCode::UNAUTHORIZED);

        let login = client
            .post(format!("{base}/login"))
            .json(&json!({"username": "admin", "password": "secret", "role": " Admin "}))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);
        let cookie = login.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("clubms.sid="));
        assert!(cookie.contains("HttpOnly"));
        let body: Value = login.json().await.unwrap();
        assert_eq!(body["redirect"], "/admin/dashboard");

        let me: Value = client
            .get(format!("{base}/me"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(me["role"], "admin");

        let created = client
            .post(format!("{base}/events"))
            .json(&json!({"name": "Fest", "eventDate": "2025-09-01", "venue": "Hall"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let dashboard = client
            .get(format!("{base}/admin/dashboard"))
            .send()
            .await
            .unwrap();
        assert_eq!(dashboard.status(), StatusCode::OK);
        let rows: Vec<Value> = dashboard.json().await.unwrap();
        assert_eq!(rows.len(), 1);

        let forbidden = client
            .get(format!("{base}/members/dashboard"))
            .send()
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        client.post(format!("{base}/logout")).send().await.unwrap();
        let after = client.get(format!("{base}/me")).send().await.unwrap();
        assert_eq!(after.status(), StatusCode::SEE_OTHER);
        Ok(())
    }

    #[tokio::test]
    async fn test_public_signup_and_feedback() -> Result<()> {
        let base = spawn_app().await?;
        let admin = client();
        admin
            .post(format!("{base}/login"))
            .json(&json!({"username": "admin", "password": "secret", "role": "admin"}))
            .send()
            .await
            .unwrap();
        let event: Value = admin
            .post(format!("{base}/events"))
            .json(&json!({"name": "Fest", "eventDate": "2030-09-01", "venue": "Hall"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let event_id = event["id"].as_i64().unwrap();

        let visitor = client();
        let signup = visitor
            .post(format!("{base}/participants/signup"))
            .json(&json!({
                "name": "Lee",
                "email": "lee@example.com",
                "eventId": event_id,
                "password": "hunter22",
                "confirmPassword": "hunter22"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(signup.status(), StatusCode::CREATED);
        let signup: Value = signup.json().await.unwrap();
        let participant_id = signup["participant"]["id"].as_i64().unwrap();

        let submitted = visitor
            .post(format!("{base}/feedback"))
            .json(&json!({
                "eventId": event_id,
                "participantId": participant_id,
                "rating": 5,
                "comment": "great venue"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(submitted.status(), StatusCode::CREATED);

        let bad_rating = visitor
            .post(format!("{base}/feedback"))
            .json(&json!({"eventId": event_id, "participantId": participant_id, "rating": 9}))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_rating.status(), StatusCode::BAD_REQUEST);

        let analysis: Value = admin
            .get(format!("{base}/feedback-analysis/{event_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(analysis["analysis"]["totalFeedback"], 1);
        Ok(())
    }
}
