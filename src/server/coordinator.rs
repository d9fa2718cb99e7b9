//! Coordinator namespace. Every event route checks the coordinator's
//! assignment before touching the event.

use super::{AppState, CurrentUser};
use crate::{
    core::{
        budget::{self, EventBudgetView},
        expenditure::{self, ExpenditureInput},
        guard,
        member::{self, EventMember},
        report::{self, EventOverview, EventSummary},
        task::{self, EventTask, TaskInput},
    },
    entities::{ExpenditureModel, Role, TaskModel},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};

const COORDINATOR: &[Role] = &[Role::Coordinator];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route(
            "/events/:event_id/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/events/:event_id/tasks/:task_id",
            put(update_task).delete(delete_task),
        )
        .route("/events/:event_id/budget", get(budget_view))
        .route("/events/:event_id/expenditures", post(add_expenditure))
        .route("/events/:event_id/members", get(event_members))
        .route("/events/:event_id/summary", get(event_summary))
}

/// Resolves the caller and checks their assignment to `event_id`.
async fn authorize(state: &AppState, user: &CurrentUser, event_id: i64) -> Result<()> {
    let identity = user.require(COORDINATOR)?;
    guard::authorize_event(&state.db, identity, event_id).await?;
    Ok(())
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<EventOverview>>> {
    let member_id = user.require(COORDINATOR)?.require_linked()?;
    report::coordinator_dashboard(&state.db, member_id)
        .await
        .map(Json)
}

async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<EventTask>>> {
    authorize(&state, &user, event_id).await?;
    task::list_event_tasks(&state.db, event_id).await.map(Json)
}

async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<TaskModel>)> {
    authorize(&state, &user, event_id).await?;
    let created = task::create_task(&state.db, event_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((event_id, task_id)): Path<(i64, i64)>,
    Json(input): Json<TaskInput>,
) -> Result<Json<TaskModel>> {
    authorize(&state, &user, event_id).await?;
    task::update_task(&state.db, event_id, task_id, input)
        .await
        .map(Json)
}

async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((event_id, task_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    authorize(&state, &user, event_id).await?;
    task::delete_task(&state.db, event_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn budget_view(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventBudgetView>> {
    authorize(&state, &user, event_id).await?;
    budget::event_budget_view(&state.db, event_id)
        .await
        .map(Json)
}

async fn add_expenditure(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
    Json(input): Json<ExpenditureInput>,
) -> Result<(StatusCode, Json<ExpenditureModel>)> {
    authorize(&state, &user, event_id).await?;
    let created = expenditure::add_expenditure(&state.db, event_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn event_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<EventMember>>> {
    authorize(&state, &user, event_id).await?;
    member::event_members(&state.db, event_id).await.map(Json)
}

async fn event_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventSummary>> {
    authorize(&state, &user, event_id).await?;
    report::event_summary(&state.db, state.documents.as_ref(), event_id)
        .await
        .map(Json)
}
