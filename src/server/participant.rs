//! Participant namespace.
//!
//! Staff (admins and coordinators) list, register and edit participants;
//! signup is public; the dashboard belongs to the participant.

use super::{AppState, CurrentUser};
use crate::{
    core::{
        guard,
        participant::{
            self, EventTiming, ParticipantDashboard, ParticipantFilter, ParticipantInput,
            ParticipantListing, SignupEvent, SignupInput,
        },
    },
    entities::{AttendanceStatus, ParticipantModel, Role},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const STAFF: &[Role] = &[Role::Admin, Role::Coordinator];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(register))
        .route("/dashboard", get(dashboard))
        .route("/signup", post(signup))
        .route("/signup/events", get(signup_events))
        .route("/:participant_id", put(edit).delete(remove))
        .route("/:participant_id/attendance", put(attendance))
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ParticipantFilter>,
) -> Result<Json<Vec<ParticipantListing>>> {
    let identity = user.require(STAFF)?;
    if let Some(event_id) = filter.event_id {
        guard::authorize_event(&state.db, identity, event_id).await?;
    }
    let mut rows = participant::list_participants(&state.db, &filter).await?;
    if identity.role == Role::Coordinator && filter.event_id.is_none() {
        let member_id = identity.require_linked()?;
        let assigned: HashSet<i64> = guard::assigned_event_ids(&state.db, member_id)
            .await?
            .into_iter()
            .collect();
        rows.retain(|row| assigned.contains(&row.participant.event_id));
    }
    Ok(Json(rows))
}

async fn register(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ParticipantInput>,
) -> Result<(StatusCode, Json<ParticipantModel>)> {
    let identity = user.require(STAFF)?;
    guard::authorize_event(&state.db, identity, input.event_id).await?;
    let created = participant::register_participant(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(participant_id): Path<i64>,
    Json(input): Json<ParticipantInput>,
) -> Result<Json<ParticipantModel>> {
    let identity = user.require(STAFF)?;
    participant::edit_participant(&state.db, identity, participant_id, input)
        .await
        .map(Json)
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(participant_id): Path<i64>,
) -> Result<StatusCode> {
    let identity = user.require(STAFF)?;
    participant::delete_participant(&state.db, identity, participant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AttendanceBody {
    attendance: AttendanceStatus,
}

async fn attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(participant_id): Path<i64>,
    Json(body): Json<AttendanceBody>,
) -> Result<Json<ParticipantModel>> {
    let identity = user.require(STAFF)?;
    participant::set_attendance(&state.db, identity, participant_id, body.attendance)
        .await
        .map(Json)
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ParticipantDashboard>> {
    let participant_id = user.require(&[Role::Participant])?.require_linked()?;
    participant::participant_dashboard(&state.db, participant_id)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct TimingQuery {
    timing: Option<EventTiming>,
}

async fn signup_events(
    State(state): State<AppState>,
    Query(query): Query<TimingQuery>,
) -> Result<Json<Vec<SignupEvent>>> {
    let today = Utc::now().date_naive();
    participant::signup_events(&state.db, query.timing, today)
        .await
        .map(Json)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupResponse {
    participant: ParticipantModel,
    username: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let created = participant::signup_participant(&state.db, &state.credentials, input).await?;
    let response = SignupResponse {
        participant: created.entity,
        username: created.account.username,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
