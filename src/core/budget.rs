//! Budget business logic - per-event, per-category allocations.
//!
//! A category appears at most once per event; the unique index turns a second
//! allocation for the same category into a constraint error.

use crate::{
    core::{event::require_event, expenditure, non_blank},
    entities::{Budget, EventModel, ExpenditureModel, budget},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Mutable budget fields. Approver and approval date come from the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    pub category: String,
    pub allocated_amount: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl BudgetInput {
    fn validated(self) -> Result<Self> {
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(Error::validation("Budget category is required"));
        }
        if !self.allocated_amount.is_finite() || self.allocated_amount < 0.0 {
            return Err(Error::validation(
                "Allocated amount must be a non-negative number",
            ));
        }
        Ok(Self {
            category,
            allocated_amount: self.allocated_amount,
            explanation: non_blank(self.explanation),
        })
    }
}

/// A budget row with what has been spent against its category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    #[serde(flatten)]
    pub budget: budget::Model,
    pub spent: f64,
    pub remaining: f64,
}

/// Budget page for one event as seen by its coordinators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBudgetView {
    pub event: EventModel,
    pub budgets: Vec<BudgetLine>,
    /// Newest first
    pub expenditures: Vec<ExpenditureModel>,
}

/// Lists an event's budget rows ordered by category.
pub async fn list_budgets<C>(db: &C, event_id: i64) -> Result<Vec<budget::Model>>
where
    C: ConnectionTrait,
{
    Budget::find()
        .filter(budget::Column::EventId.eq(event_id))
        .order_by_asc(budget::Column::Category)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds the budget row of an event for a category.
pub async fn find_budget_for_category<C>(
    db: &C,
    event_id: i64,
    category: &str,
) -> Result<Option<budget::Model>>
where
    C: ConnectionTrait,
{
    Budget::find()
        .filter(budget::Column::EventId.eq(event_id))
        .filter(budget::Column::Category.eq(category))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_event_budget(
    db: &DatabaseConnection,
    event_id: i64,
    budget_id: i64,
) -> Result<budget::Model> {
    Budget::find_by_id(budget_id)
        .filter(budget::Column::EventId.eq(event_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("budget", budget_id))
}

/// Allocates a budget category for an event, approved today by `approved_by`.
#[instrument(skip(db, input))]
pub async fn create_budget(
    db: &DatabaseConnection,
    event_id: i64,
    input: BudgetInput,
    approved_by: &str,
) -> Result<budget::Model> {
    let input = input.validated()?;
    let budget = budget::ActiveModel {
        event_id: Set(event_id),
        category: Set(input.category),
        allocated_amount: Set(input.allocated_amount),
        approved_by: Set(approved_by.to_string()),
        approval_date: Set(chrono::Utc::now().date_naive()),
        explanation: Set(input.explanation),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(budget_id = budget.id, category = %budget.category, "Budget allocated");
    Ok(budget)
}

/// Replaces a budget row, re-stamping the approver and approval date.
#[instrument(skip(db, input))]
pub async fn update_budget(
    db: &DatabaseConnection,
    event_id: i64,
    budget_id: i64,
    input: BudgetInput,
    approved_by: &str,
) -> Result<budget::Model> {
    let input = input.validated()?;
    let existing = find_event_budget(db, event_id, budget_id).await?;

    let mut active: budget::ActiveModel = existing.into();
    active.category = Set(input.category);
    active.allocated_amount = Set(input.allocated_amount);
    active.approved_by = Set(approved_by.to_string());
    active.approval_date = Set(chrono::Utc::now().date_naive());
    active.explanation = Set(input.explanation);
    active.update(db).await.map_err(Into::into)
}

/// Deletes one budget row of an event.
#[instrument(skip(db))]
pub async fn delete_budget(db: &DatabaseConnection, event_id: i64, budget_id: i64) -> Result<()> {
    let result = Budget::delete_many()
        .filter(budget::Column::Id.eq(budget_id))
        .filter(budget::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("budget", budget_id));
    }
    Ok(())
}

/// Pairs budget rows with the sum of expenditures in the same category.
#[must_use]
pub fn with_spending(
    budgets: Vec<budget::Model>,
    expenditures: &[ExpenditureModel],
) -> Vec<BudgetLine> {
    let mut spent_by_category: HashMap<&str, f64> = HashMap::new();
    for expense in expenditures {
        *spent_by_category.entry(expense.category.as_str()).or_default() += expense.amount;
    }

    budgets
        .into_iter()
        .map(|budget| {
            let spent = spent_by_category
                .get(budget.category.as_str())
                .copied()
                .unwrap_or(0.0);
            BudgetLine {
                remaining: budget.allocated_amount - spent,
                spent,
                budget,
            }
        })
        .collect()
}

/// Budget rows with spending, plus every expenditure of the event.
pub async fn event_budget_view(db: &DatabaseConnection, event_id: i64) -> Result<EventBudgetView> {
    let event = require_event(db, event_id).await?;
    let budgets = list_budgets(db, event_id).await?;
    let expenditures = expenditure::list_expenditures(db, event_id).await?;

    Ok(EventBudgetView {
        event,
        budgets: with_spending(budgets, &expenditures),
        expenditures,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn input(category: &str, amount: f64) -> BudgetInput {
        BudgetInput {
            category: category.to_string(),
            allocated_amount: amount,
            explanation: Some("Approved at meeting".to_string()),
        }
    }

    #[tokio::test]
    async fn test_budget_crud() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;

        let venue = create_budget(&db, event.id, input("Venue", 800.0), "Priya").await?;
        create_budget(&db, event.id, input("Food", 300.0), "Priya").await?;
        assert_eq!(venue.approved_by, "Priya");
        assert_eq!(venue.approval_date, chrono::Utc::now().date_naive());

        let categories: Vec<_> = list_budgets(&db, event.id)
            .await?
            .into_iter()
            .map(|b| b.category)
            .collect();
        assert_eq!(categories, ["Food", "Venue"]);

        let updated = update_budget(&db, event.id, venue.id, input("Venue", 900.0), "root").await?;
        assert!((updated.allocated_amount - 900.0).abs() < f64::EPSILON);
        assert_eq!(updated.approved_by, "root");

        delete_budget(&db, event.id, venue.id).await?;
        assert_eq!(list_budgets(&db, event.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_category_is_constraint_error() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        create_budget(&db, event.id, input("Food", 100.0), "a").await?;

        let duplicate = create_budget(&db, event.id, input("Food", 50.0), "a").await;
        assert!(matches!(duplicate, Err(Error::Constraint { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_scoped_to_event() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let other = create_test_event(&db, "Fair").await?;
        let budget = create_budget(&db, event.id, input("Food", 100.0), "a").await?;

        let wrong_event = update_budget(&db, other.id, budget.id, input("Food", 1.0), "a").await;
        assert!(matches!(wrong_event, Err(Error::NotFound { .. })));
        assert!(matches!(
            delete_budget(&db, other.id, budget.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        for bad in [input("", 10.0), input("Food", -1.0), input("Food", f64::NAN)] {
            let result = create_budget(&db, event.id, bad, "a").await;
            assert!(matches!(result, Err(Error::Validation { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_event_budget_view_sums_spending_per_category() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        create_test_budget(&db, event.id, "Food", 300.0).await?;
        create_test_budget(&db, event.id, "Venue", 800.0).await?;
        create_test_expenditure(&db, event.id, "Food", 100.0).await?;
        create_test_expenditure(&db, event.id, "Food", 50.0).await?;

        let view = event_budget_view(&db, event.id).await?;
        assert_eq!(view.expenditures.len(), 2);
        let food = &view.budgets[0];
        assert_eq!(food.budget.category, "Food");
        assert!((food.spent - 150.0).abs() < 1e-9);
        assert!((food.remaining - 150.0).abs() < 1e-9);
        assert!(view.budgets[1].spent.abs() < 1e-9);
        Ok(())
    }
}
