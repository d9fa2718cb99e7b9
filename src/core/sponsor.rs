//! Sponsor business logic.
//!
//! A sponsor gets a `sponsor_` login when created. A positive contribution is
//! mirrored into exactly one income row; recording that row is best effort and
//! never fails the sponsor write.

use crate::{
    core::{
        account::{self, AccountRequest, Compensation, Provisioned, UndoStep},
        budget::{self, BudgetLine},
        credentials::CredentialStore,
        event::get_event_by_id,
        expenditure, income,
    },
    entities::{Event, EventModel, ExpenditureModel, Role, Sponsor, User, sponsor, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Mutable sponsor fields, supplied in full on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorInput {
    pub name: String,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub contribution: f64,
}

impl SponsorInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Sponsor name is required"));
        }
        if !self.contribution.is_finite() || self.contribution < 0.0 {
            return Err(Error::validation(
                "Contribution must be a non-negative number",
            ));
        }
        Ok(Self { name, ..self })
    }
}

/// A sponsor with the name of the sponsored event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorListing {
    #[serde(flatten)]
    pub sponsor: sponsor::Model,
    pub event_name: Option<String>,
}

/// One budget category seen through a sponsor's share of the event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorCategory {
    pub category: String,
    pub total_allocated: f64,
    pub total_spent: f64,
    /// `total_allocated` scaled by the sponsor percentage
    pub sponsor_share: f64,
    /// `total_spent` scaled by the sponsor percentage
    pub sponsor_spent: f64,
    pub explanation: Option<String>,
}

/// The sponsored event with totals and the sponsor's proportional view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredEvent {
    pub event: EventModel,
    pub contribution: f64,
    pub total_budget: f64,
    pub total_spent: f64,
    /// Contribution as a percentage of the event's total budget
    pub sponsor_percentage: f64,
    pub categories: Vec<SponsorCategory>,
    /// Newest first
    pub expenditures: Vec<ExpenditureModel>,
}

/// Sponsor landing page data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorDashboard {
    pub sponsor: Option<sponsor::Model>,
    pub events: Vec<SponsoredEvent>,
}

/// Read-only budget view of the sponsored event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorEventView {
    pub budgets: Vec<BudgetLine>,
    pub expenditures: Vec<ExpenditureModel>,
    pub sponsors: Vec<sponsor::Model>,
}

/// Lists every sponsor by name with its event name.
pub async fn list_sponsors(db: &DatabaseConnection) -> Result<Vec<SponsorListing>> {
    let rows = Sponsor::find()
        .find_also_related(Event)
        .order_by_asc(sponsor::Column::Name)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(sponsor, event)| SponsorListing {
            sponsor,
            event_name: event.map(|e| e.name),
        })
        .collect())
}

/// Finds a sponsor by id.
pub async fn get_sponsor_by_id<C>(db: &C, sponsor_id: i64) -> Result<Option<sponsor::Model>>
where
    C: ConnectionTrait,
{
    Sponsor::find_by_id(sponsor_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Sponsors of one event, by name.
pub async fn sponsors_for_event<C>(db: &C, event_id: i64) -> Result<Vec<sponsor::Model>>
where
    C: ConnectionTrait,
{
    Sponsor::find()
        .filter(sponsor::Column::EventId.eq(event_id))
        .order_by_asc(sponsor::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records the contribution in the income ledger, logging instead of failing.
async fn reconcile_best_effort(db: &DatabaseConnection, sponsor: &sponsor::Model) {
    if let Err(e) = income::reconcile_sponsor_income(db, sponsor).await {
        warn!(sponsor_id = sponsor.id, error = %e, "Failed to record sponsor income");
    }
}

/// Creates a sponsor, its `sponsor_` login and its income row.
///
/// # Errors
/// [`Error::AccountProvisioning`] when the login cannot be created; the sponsor
/// row is removed again before returning.
#[instrument(skip(db, credentials, input), fields(name = %input.name))]
pub async fn create_sponsor(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    input: SponsorInput,
) -> Result<Provisioned<sponsor::Model>> {
    let input = input.validated()?;
    let sponsor = sponsor::ActiveModel {
        name: Set(input.name),
        event_id: Set(input.event_id),
        contribution: Set(input.contribution),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut undo = Compensation::new();
    undo.record(UndoStep::DeleteSponsor(sponsor.id));
    let account = account::provision_account(
        db,
        credentials,
        AccountRequest {
            role: Role::Sponsor,
            linked_id: sponsor.id,
            display_name: &sponsor.name,
            suffix: None,
            password: None,
        },
        undo,
    )
    .await?;

    reconcile_best_effort(db, &sponsor).await;
    info!(sponsor_id = sponsor.id, username = %account.username, "Sponsor provisioned");
    Ok(Provisioned {
        entity: sponsor,
        account,
    })
}

/// Replaces a sponsor's fields and re-syncs its income row.
#[instrument(skip(db, input))]
pub async fn update_sponsor(
    db: &DatabaseConnection,
    sponsor_id: i64,
    input: SponsorInput,
) -> Result<sponsor::Model> {
    let input = input.validated()?;
    let existing = get_sponsor_by_id(db, sponsor_id)
        .await?
        .ok_or_else(|| Error::not_found("sponsor", sponsor_id))?;

    let mut active: sponsor::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.event_id = Set(input.event_id);
    active.contribution = Set(input.contribution);
    let sponsor = active.update(db).await?;

    reconcile_best_effort(db, &sponsor).await;
    Ok(sponsor)
}

/// Deletes a sponsor with its income rows and login.
#[instrument(skip(db))]
pub async fn delete_sponsor(db: &DatabaseConnection, sponsor_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    income::delete_sponsor_income(&txn, sponsor_id).await?;
    let result = Sponsor::delete_by_id(sponsor_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("sponsor", sponsor_id));
    }
    User::delete_many()
        .filter(user::Column::Role.eq(Role::Sponsor))
        .filter(user::Column::LinkedId.eq(sponsor_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(sponsor_id, "Sponsor deleted");
    Ok(())
}

/// Percentage of `total_budget` covered by `contribution`; zero without a budget.
#[must_use]
pub fn sponsor_percentage(contribution: f64, total_budget: f64) -> f64 {
    if total_budget > 0.0 {
        contribution / total_budget * 100.0
    } else {
        0.0
    }
}

/// Scales each budget line by the sponsor's percentage.
#[must_use]
pub fn sponsor_categories(lines: &[BudgetLine], percentage: f64) -> Vec<SponsorCategory> {
    lines
        .iter()
        .map(|line| SponsorCategory {
            category: line.budget.category.clone(),
            total_allocated: line.budget.allocated_amount,
            total_spent: line.spent,
            sponsor_share: line.budget.allocated_amount * percentage / 100.0,
            sponsor_spent: line.spent * percentage / 100.0,
            explanation: line.budget.explanation.clone(),
        })
        .collect()
}

/// Dashboard of the sponsor linked to the session.
///
/// A missing sponsor row or a sponsor without an event yields an empty
/// dashboard rather than an error.
pub async fn sponsor_dashboard(
    db: &DatabaseConnection,
    sponsor_id: i64,
) -> Result<SponsorDashboard> {
    let Some(sponsor) = get_sponsor_by_id(db, sponsor_id).await? else {
        return Ok(SponsorDashboard {
            sponsor: None,
            events: Vec::new(),
        });
    };

    let mut events = Vec::new();
    if let Some(event) = match sponsor.event_id {
        Some(event_id) => get_event_by_id(db, event_id).await?,
        None => None,
    } {
        let budgets = budget::list_budgets(db, event.id).await?;
        let expenditures = expenditure::list_expenditures(db, event.id).await?;
        let total_budget: f64 = budgets.iter().map(|b| b.allocated_amount).sum();
        let total_spent: f64 = expenditures.iter().map(|e| e.amount).sum();
        let percentage = sponsor_percentage(sponsor.contribution, total_budget);
        let lines = budget::with_spending(budgets, &expenditures);

        events.push(SponsoredEvent {
            event,
            contribution: sponsor.contribution,
            total_budget,
            total_spent,
            sponsor_percentage: percentage,
            categories: sponsor_categories(&lines, percentage),
            expenditures,
        });
    }

    Ok(SponsorDashboard {
        sponsor: Some(sponsor),
        events,
    })
}

/// Read-only budget view of an event for the sponsor who sponsors it.
///
/// # Errors
/// [`Error::Forbidden`] when the sponsor does not sponsor `event_id`.
pub async fn sponsor_event_view(
    db: &DatabaseConnection,
    sponsor_id: i64,
    event_id: i64,
) -> Result<SponsorEventView> {
    let sponsor = get_sponsor_by_id(db, sponsor_id)
        .await?
        .ok_or(Error::Forbidden)?;
    if sponsor.event_id != Some(event_id) {
        return Err(Error::Forbidden);
    }

    let budgets = budget::list_budgets(db, event_id).await?;
    let expenditures = expenditure::list_expenditures(db, event_id).await?;
    Ok(SponsorEventView {
        budgets: budget::with_spending(budgets, &expenditures),
        expenditures,
        sponsors: sponsors_for_event(db, event_id).await?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::credentials::find_user_by_username;
    use crate::test_utils::*;

    fn input(name: &str, event_id: Option<i64>, contribution: f64) -> SponsorInput {
        SponsorInput {
            name: name.to_string(),
            event_id,
            contribution,
        }
    }

    #[tokio::test]
    async fn test_create_sponsor_provisions_login_and_income() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Gala").await?;

        let created = create_sponsor(&db, &credentials, input("Acme Corp", Some(event.id), 400.0))
            .await?;
        assert_eq!(created.account.username, "sponsor_acme_corp");
        assert!(created.account.password.starts_with("Sponsor@"));

        let user = find_user_by_username(&db, "sponsor_acme_corp").await?.unwrap();
        assert_eq!(user.role, Role::Sponsor);
        assert_eq!(user.linked_id, Some(created.entity.id));

        let rows = income::sponsor_income(&db, created.entity.id).await?;
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 400.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_sponsor_replaces_income_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Gala").await?;
        let created = create_sponsor(&db, &credentials, input("Acme", Some(event.id), 100.0))
            .await?;

        update_sponsor(&db, created.entity.id, input("Acme", Some(event.id), 250.0)).await?;
        update_sponsor(&db, created.entity.id, input("Acme", Some(event.id), 300.0)).await?;

        let rows = income::sponsor_income(&db, created.entity.id).await?;
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 300.0).abs() < f64::EPSILON);

        let missing = update_sponsor(&db, 999, input("X", None, 1.0)).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_sponsor_name_is_rolled_back() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        create_sponsor(&db, &credentials, input("Acme", None, 0.0)).await?;

        let second = create_sponsor(&db, &credentials, input("Acme", None, 50.0)).await;
        assert!(matches!(second, Err(Error::AccountProvisioning { .. })));
        assert_eq!(list_sponsors(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_sponsor_removes_income_and_login() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Gala").await?;
        let created = create_sponsor(&db, &credentials, input("Acme", Some(event.id), 100.0))
            .await?;

        delete_sponsor(&db, created.entity.id).await?;
        assert!(get_sponsor_by_id(&db, created.entity.id).await?.is_none());
        assert!(income::sponsor_income(&db, created.entity.id).await?.is_empty());
        assert!(find_user_by_username(&db, "sponsor_acme").await?.is_none());

        assert!(matches!(
            delete_sponsor(&db, created.entity.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_sponsor_dashboard_scales_categories() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        create_test_budget(&db, event.id, "Food", 600.0).await?;
        create_test_budget(&db, event.id, "Venue", 400.0).await?;
        create_test_expenditure(&db, event.id, "Food", 200.0).await?;
        let sponsor = create_test_sponsor(&db, event.id, "Acme", 250.0).await?;

        let dashboard = sponsor_dashboard(&db, sponsor.id).await?;
        assert_eq!(dashboard.events.len(), 1);
        let view = &dashboard.events[0];
        assert!((view.total_budget - 1000.0).abs() < 1e-9);
        assert!((view.total_spent - 200.0).abs() < 1e-9);
        assert!((view.sponsor_percentage - 25.0).abs() < 1e-9);

        let food = &view.categories[0];
        assert_eq!(food.category, "Food");
        assert!((food.sponsor_share - 150.0).abs() < 1e-9);
        assert!((food.sponsor_spent - 50.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_sponsor_dashboard_without_budget_or_row() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let sponsor = create_test_sponsor(&db, event.id, "Acme", 250.0).await?;

        let dashboard = sponsor_dashboard(&db, sponsor.id).await?;
        assert!(dashboard.events[0].sponsor_percentage.abs() < f64::EPSILON);

        let empty = sponsor_dashboard(&db, 4242).await?;
        assert!(empty.sponsor.is_none());
        assert!(empty.events.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sponsor_event_view_is_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let other = create_test_event(&db, "Fair").await?;
        let sponsor = create_test_sponsor(&db, event.id, "Acme", 10.0).await?;

        let view = sponsor_event_view(&db, sponsor.id, event.id).await?;
        assert_eq!(view.sponsors.len(), 1);
        assert!(matches!(
            sponsor_event_view(&db, sponsor.id, other.id).await,
            Err(Error::Forbidden)
        ));
        Ok(())
    }
}
