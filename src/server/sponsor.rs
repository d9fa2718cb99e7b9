//! Sponsor namespace.

use super::{AppState, CurrentUser};
use crate::{
    core::sponsor::{self, SponsorDashboard, SponsorEventView},
    entities::Role,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

const SPONSOR: &[Role] = &[Role::Sponsor];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/events/:event_id", get(event_view))
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SponsorDashboard>> {
    let sponsor_id = user.require(SPONSOR)?.require_linked()?;
    sponsor::sponsor_dashboard(&state.db, sponsor_id)
        .await
        .map(Json)
}

async fn event_view(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<SponsorEventView>> {
    let sponsor_id = user.require(SPONSOR)?.require_linked()?;
    sponsor::sponsor_event_view(&state.db, sponsor_id, event_id)
        .await
        .map(Json)
}
