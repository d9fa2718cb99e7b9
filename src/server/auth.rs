//! Login, logout and the current identity.

use super::{AppState, CurrentUser, session::SessionStore};
use crate::{core::guard::Identity, errors::Result};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout).get(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
    role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    redirect: &'static str,
    user: Identity,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse> {
    let user = state
        .credentials
        .authenticate(&state.db, &body.username, &body.password, &body.role)
        .await?;
    let identity = Identity::from_user(&user);
    let token = state.sessions.create(identity.clone()).await;
    info!(username = %identity.username, role = %identity.role, "Logged in");

    let response = LoginResponse {
        redirect: identity.role.home_path(),
        user: identity,
    };
    Ok((
        [(header::SET_COOKIE, state.sessions.cookie(&token))],
        Json(response),
    ))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = super::session::token_from_headers(&headers) {
        state.sessions.remove(token).await;
    }
    (
        [(header::SET_COOKIE, SessionStore::cleared_cookie())],
        Redirect::to("/login"),
    )
}

async fn me(user: CurrentUser) -> Result<Json<Identity>> {
    user.authenticated().cloned().map(Json)
}
