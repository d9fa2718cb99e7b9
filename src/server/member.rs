//! Member namespace: own tasks only.

use super::{AppState, CurrentUser};
use crate::{
    core::task::{self, MemberTasks},
    entities::{Role, TaskModel},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;

const MEMBER: &[Role] = &[Role::Member];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/tasks/:task_id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> Result<Json<MemberTasks>> {
    let member_id = user.require(MEMBER)?.require_linked()?;
    task::member_tasks(&state.db, member_id).await.map(Json)
}

async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<Json<TaskModel>> {
    let member_id = user.require(MEMBER)?.require_linked()?;
    task::update_task_status_as_member(&state.db, member_id, task_id, &body.status)
        .await
        .map(Json)
}
