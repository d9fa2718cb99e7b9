//! Public feedback submission and the staff analysis pages.

use super::{AppState, CurrentUser};
use crate::{
    core::feedback::{
        self, EventFeedbackAnalysis, FeedbackEventSummary, FeedbackForm, FeedbackReceipt,
        NewFeedback,
    },
    entities::Role,
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

const STAFF: &[Role] = &[Role::Admin, Role::Coordinator];

pub fn submission_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit))
        .route("/:event_id/:participant_id", get(form))
}

pub fn analysis_router() -> Router<AppState> {
    Router::new()
        .route("/", get(overview))
        .route("/:event_id", get(event_analysis))
}

async fn form(
    State(state): State<AppState>,
    Path((event_id, participant_id)): Path<(i64, i64)>,
) -> Result<Json<FeedbackForm>> {
    feedback::feedback_form(&state.db, event_id, participant_id)
        .await
        .map(Json)
}

async fn submit(
    State(state): State<AppState>,
    Json(input): Json<NewFeedback>,
) -> Result<(StatusCode, Json<FeedbackReceipt>)> {
    let receipt = feedback::submit_feedback(&state.db, state.documents.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn overview(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<FeedbackEventSummary>>> {
    let identity = user.require(STAFF)?;
    feedback::feedback_overview(&state.db, state.documents.as_ref(), identity)
        .await
        .map(Json)
}

async fn event_analysis(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventFeedbackAnalysis>> {
    let identity = user.require(STAFF)?;
    feedback::event_feedback_analysis(&state.db, state.documents.as_ref(), identity, event_id)
        .await
        .map(Json)
}
