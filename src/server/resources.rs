//! Admin CRUD for clubs, events and income.

use super::{AppState, CurrentUser};
use crate::{
    core::{
        club::{self, ClubInput},
        event::{self, EventInput},
        income::{self, IncomeEntry, IncomeInput},
    },
    entities::{ClubModel, EventModel, IncomeModel, Role},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

const ADMIN: &[Role] = &[Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clubs", get(list_clubs).post(create_club))
        .route(
            "/clubs/:club_id",
            get(get_club).put(update_club).delete(delete_club),
        )
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:event_id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/income", get(list_income).post(create_income))
        .route(
            "/income/:income_id",
            get(get_income).put(update_income).delete(delete_income),
        )
}

async fn list_clubs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ClubModel>>> {
    user.require(ADMIN)?;
    club::list_clubs(&state.db).await.map(Json)
}

async fn get_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<i64>,
) -> Result<Json<ClubModel>> {
    user.require(ADMIN)?;
    club::get_club_by_id(&state.db, club_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("club", club_id))
}

async fn create_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ClubInput>,
) -> Result<(StatusCode, Json<ClubModel>)> {
    user.require(ADMIN)?;
    let created = club::create_club(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<i64>,
    Json(input): Json<ClubInput>,
) -> Result<Json<ClubModel>> {
    user.require(ADMIN)?;
    club::update_club(&state.db, club_id, input).await.map(Json)
}

async fn delete_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(club_id): Path<i64>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    club::delete_club(&state.db, club_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<EventModel>>> {
    user.require(ADMIN)?;
    event::list_events(&state.db).await.map(Json)
}

async fn get_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventModel>> {
    user.require(ADMIN)?;
    event::require_event(&state.db, event_id).await.map(Json)
}

async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<EventInput>,
) -> Result<(StatusCode, Json<EventModel>)> {
    user.require(ADMIN)?;
    let created = event::create_event(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
    Json(input): Json<EventInput>,
) -> Result<Json<EventModel>> {
    user.require(ADMIN)?;
    event::update_event(&state.db, event_id, input)
        .await
        .map(Json)
}

async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    event::delete_event(&state.db, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_income(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<IncomeEntry>>> {
    user.require(ADMIN)?;
    income::list_income(&state.db).await.map(Json)
}

async fn get_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i64>,
) -> Result<Json<IncomeModel>> {
    user.require(ADMIN)?;
    income::get_income_by_id(&state.db, income_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("income", income_id))
}

async fn create_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<IncomeInput>,
) -> Result<(StatusCode, Json<IncomeModel>)> {
    user.require(ADMIN)?;
    let created = income::create_income(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i64>,
    Json(input): Json<IncomeInput>,
) -> Result<Json<IncomeModel>> {
    user.require(ADMIN)?;
    income::update_income(&state.db, income_id, input)
        .await
        .map(Json)
}

async fn delete_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i64>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    income::delete_income(&state.db, income_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
