//! Expenditure business logic.
//!
//! Coordinators record spending against categories that already have a budget
//! row for the event; admins review all spending with the matching allocation.

use crate::{
    core::{budget::find_budget_for_category, non_blank},
    entities::{Budget, Event, Expenditure, budget, expenditure},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// A new expenditure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureInput {
    pub category: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

/// An expenditure with its event and the budget of its category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureReview {
    #[serde(flatten)]
    pub expenditure: expenditure::Model,
    pub event_name: String,
    pub event_date: NaiveDate,
    /// Allocation of the (event, category) pair
    pub category_budget: f64,
    /// Total spent on the (event, category) pair
    pub category_spent: f64,
}

/// Lists the expenditures of an event, newest first.
pub async fn list_expenditures<C>(db: &C, event_id: i64) -> Result<Vec<expenditure::Model>>
where
    C: ConnectionTrait,
{
    Expenditure::find()
        .filter(expenditure::Column::EventId.eq(event_id))
        .order_by_desc(expenditure::Column::ExpenseDate)
        .order_by_desc(expenditure::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records an expenditure for an event.
///
/// # Errors
/// [`Error::Validation`] when the category is blank or has no budget row for
/// the event, or the amount is not a positive number.
#[instrument(skip(db, input), fields(category = %input.category))]
pub async fn add_expenditure(
    db: &DatabaseConnection,
    event_id: i64,
    input: ExpenditureInput,
) -> Result<expenditure::Model> {
    let category = input.category.trim();
    if category.is_empty() {
        return Err(Error::validation("Category, amount, and date are required"));
    }
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(Error::validation("Amount must be a positive number"));
    }
    if find_budget_for_category(db, event_id, category)
        .await?
        .is_none()
    {
        return Err(Error::validation("Invalid category for this event"));
    }

    let expense = expenditure::ActiveModel {
        event_id: Set(event_id),
        category: Set(category.to_string()),
        amount: Set(input.amount),
        expense_date: Set(input.expense_date),
        description: Set(non_blank(input.description)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(expenditure_id = expense.id, amount = expense.amount, "Expenditure recorded");
    Ok(expense)
}

/// Every expenditure, newest first, with its event and category budget.
pub async fn review_expenditures(db: &DatabaseConnection) -> Result<Vec<ExpenditureReview>> {
    let rows = Expenditure::find()
        .find_also_related(Event)
        .order_by_desc(expenditure::Column::ExpenseDate)
        .order_by_desc(expenditure::Column::Id)
        .all(db)
        .await?;

    let allocations: HashMap<(i64, String), f64> = Budget::find()
        .all(db)
        .await?
        .into_iter()
        .map(|b: budget::Model| ((b.event_id, b.category), b.allocated_amount))
        .collect();

    let mut spent: HashMap<(i64, String), f64> = HashMap::new();
    for (expense, _) in &rows {
        *spent
            .entry((expense.event_id, expense.category.clone()))
            .or_default() += expense.amount;
    }

    Ok(rows
        .into_iter()
        .filter_map(|(expense, event)| {
            let event = event?;
            let key = (expense.event_id, expense.category.clone());
            Some(ExpenditureReview {
                event_name: event.name,
                event_date: event.event_date,
                category_budget: allocations.get(&key).copied().unwrap_or(0.0),
                category_spent: spent.get(&key).copied().unwrap_or(0.0),
                expenditure: expense,
            })
        })
        .collect())
}
