//! Admin namespace: people, budgets, sponsors and organisation reports.

use super::{AppState, CurrentUser};
use crate::{
    core::{
        account::Provisioned,
        budget::{self, BudgetInput},
        expenditure::{self, ExpenditureReview},
        member::{self, CoordinatorSummary, MemberInput},
        report::{self, Analytics, EventOverview, EventSummary, EventUtilization},
        sponsor::{self, SponsorInput, SponsorListing},
    },
    entities::{BudgetModel, MemberModel, Role, SponsorModel},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};

const ADMIN: &[Role] = &[Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/members", get(list_members).post(create_member))
        .route("/members/:member_id", delete(delete_member))
        .route("/coordinators", get(list_coordinators).post(create_coordinator))
        .route(
            "/coordinators/:member_id",
            delete(delete_member),
        )
        .route(
            "/coordinators/:member_id/events/:event_id",
            post(assign_coordinator).delete(unassign_coordinator),
        )
        .route(
            "/events/:event_id/budgets",
            get(list_budgets).post(create_budget),
        )
        .route(
            "/events/:event_id/budgets/:budget_id",
            put(update_budget).delete(delete_budget),
        )
        .route("/events/:event_id/summary", get(event_summary))
        .route("/expenditures", get(review_expenditures))
        .route("/sponsors", get(list_sponsors).post(create_sponsor))
        .route(
            "/sponsors/:sponsor_id",
            put(update_sponsor).delete(delete_sponsor),
        )
        .route("/budget-utilization", get(budget_utilization))
        .route("/analytics", get(analytics))
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<EventOverview>>> {
    user.require(ADMIN)?;
    report::admin_dashboard(&state.db).await.map(Json)
}

async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<MemberModel>>> {
    user.require(ADMIN)?;
    member::list_members(&state.db).await.map(Json)
}

async fn create_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<MemberInput>,
) -> Result<(StatusCode, Json<Provisioned<MemberModel>>)> {
    user.require(ADMIN)?;
    let created = member::create_member(&state.db, &state.credentials, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(member_id): Path<i64>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    member::delete_member(&state.db, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_coordinators(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<CoordinatorSummary>>> {
    user.require(ADMIN)?;
    member::list_coordinators(&state.db).await.map(Json)
}

async fn create_coordinator(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<MemberInput>,
) -> Result<(StatusCode, Json<Provisioned<MemberModel>>)> {
    user.require(ADMIN)?;
    let created = member::create_coordinator(&state.db, &state.credentials, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn assign_coordinator(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((member_id, event_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    member::assign_coordinator(&state.db, member_id, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unassign_coordinator(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((member_id, event_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    member::unassign_coordinator(&state.db, member_id, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_budgets(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<BudgetModel>>> {
    user.require(ADMIN)?;
    budget::list_budgets(&state.db, event_id).await.map(Json)
}

async fn create_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
    Json(input): Json<BudgetInput>,
) -> Result<(StatusCode, Json<BudgetModel>)> {
    let admin = user.require(ADMIN)?;
    let created = budget::create_budget(&state.db, event_id, input, admin.actor_name()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((event_id, budget_id)): Path<(i64, i64)>,
    Json(input): Json<BudgetInput>,
) -> Result<Json<BudgetModel>> {
    let admin = user.require(ADMIN)?;
    budget::update_budget(&state.db, event_id, budget_id, input, admin.actor_name())
        .await
        .map(Json)
}

async fn delete_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((event_id, budget_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    budget::delete_budget(&state.db, event_id, budget_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn event_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventSummary>> {
    user.require(ADMIN)?;
    report::event_summary(&state.db, state.documents.as_ref(), event_id)
        .await
        .map(Json)
}

async fn review_expenditures(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ExpenditureReview>>> {
    user.require(ADMIN)?;
    expenditure::review_expenditures(&state.db).await.map(Json)
}

async fn list_sponsors(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SponsorListing>>> {
    user.require(ADMIN)?;
    sponsor::list_sponsors(&state.db).await.map(Json)
}

async fn create_sponsor(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<SponsorInput>,
) -> Result<(StatusCode, Json<Provisioned<SponsorModel>>)> {
    user.require(ADMIN)?;
    let created = sponsor::create_sponsor(&state.db, &state.credentials, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_sponsor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sponsor_id): Path<i64>,
    Json(input): Json<SponsorInput>,
) -> Result<Json<SponsorModel>> {
    user.require(ADMIN)?;
    sponsor::update_sponsor(&state.db, sponsor_id, input)
        .await
        .map(Json)
}

async fn delete_sponsor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sponsor_id): Path<i64>,
) -> Result<StatusCode> {
    user.require(ADMIN)?;
    sponsor::delete_sponsor(&state.db, sponsor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn budget_utilization(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<EventUtilization>>> {
    user.require(ADMIN)?;
    report::budget_utilization(&state.db).await.map(Json)
}

async fn analytics(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Analytics>> {
    user.require(ADMIN)?;
    report::analytics(&state.db).await.map(Json)
}
