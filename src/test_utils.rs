//! Shared test utilities for the club manager.
//!
//! Provides an in-memory database with every table created, a cheap credential
//! store, and entity factories. Factories insert rows directly and never
//! provision logins; tests that need accounts go through the core functions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::{
    core::{credentials::CredentialStore, guard::Identity},
    entities::{
        AttendanceStatus, MemberRole, PayStatus, Role, budget, event, expenditure, member,
        participant, sponsor, task,
    },
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Credential store with the cheapest Argon2 parameters, so tests stay fast.
pub fn test_credentials() -> CredentialStore {
    CredentialStore::with_cost(8, 1).expect("minimal argon2 parameters are valid")
}

/// A session identity for guard checks.
pub fn identity(role: Role, linked_id: Option<i64>) -> Identity {
    Identity {
        user_id: 1,
        username: format!("test_{role}"),
        role,
        linked_id,
        display_name: Some(format!("Test {role}")),
    }
}

/// Creates an event dated 2025-06-15 at "Main Hall".
pub async fn create_test_event(db: &DatabaseConnection, name: &str) -> Result<event::Model> {
    create_custom_event(db, name, "2025-06-15", None).await
}

/// Creates an event on a given `YYYY-MM-DD` date.
pub async fn create_custom_event(
    db: &DatabaseConnection,
    name: &str,
    date: &str,
    club_id: Option<i64>,
) -> Result<event::Model> {
    event::ActiveModel {
        name: Set(name.to_string()),
        event_date: Set(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        venue: Set("Main Hall".to_string()),
        club_id: Set(club_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn insert_member(
    db: &DatabaseConnection,
    name: &str,
    role: MemberRole,
) -> Result<member::Model> {
    member::ActiveModel {
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@club.test", name.to_lowercase()))),
        phone: Set(None),
        club_id: Set(None),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a regular member without a login.
pub async fn create_test_member(db: &DatabaseConnection, name: &str) -> Result<member::Model> {
    insert_member(db, name, MemberRole::Member).await
}

/// Creates a coordinator without a login or event assignments.
pub async fn create_test_coordinator(
    db: &DatabaseConnection,
    name: &str,
) -> Result<member::Model> {
    insert_member(db, name, MemberRole::Coordinator).await
}

/// Creates a budget row approved by "Test Admin".
pub async fn create_test_budget(
    db: &DatabaseConnection,
    event_id: i64,
    category: &str,
    amount: f64,
) -> Result<budget::Model> {
    budget::ActiveModel {
        event_id: Set(event_id),
        category: Set(category.to_string()),
        allocated_amount: Set(amount),
        approved_by: Set("Test Admin".to_string()),
        approval_date: Set(Utc::now().date_naive()),
        explanation: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an expenditure dated today. The category is not checked against
/// the event's budgets.
pub async fn create_test_expenditure(
    db: &DatabaseConnection,
    event_id: i64,
    category: &str,
    amount: f64,
) -> Result<expenditure::Model> {
    expenditure::ActiveModel {
        event_id: Set(event_id),
        category: Set(category.to_string()),
        amount: Set(amount),
        expense_date: Set(Utc::now().date_naive()),
        description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an unpaid, pending participant without a login or income.
pub async fn create_test_participant(
    db: &DatabaseConnection,
    event_id: i64,
    name: &str,
) -> Result<participant::Model> {
    participant::ActiveModel {
        event_id: Set(event_id),
        name: Set(name.to_string()),
        email: Set(None),
        phone: Set(None),
        team_id: Set(None),
        team_name: Set(None),
        pay_status: Set(PayStatus::Unpaid),
        amount_paid: Set(0.0),
        registration_date: Set(Utc::now().date_naive()),
        attendance: Set(AttendanceStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a sponsor of an event without a login or income.
pub async fn create_test_sponsor(
    db: &DatabaseConnection,
    event_id: i64,
    name: &str,
    contribution: f64,
) -> Result<sponsor::Model> {
    sponsor::ActiveModel {
        name: Set(name.to_string()),
        event_id: Set(Some(event_id)),
        contribution: Set(contribution),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a pending task without a deadline.
pub async fn create_test_task(
    db: &DatabaseConnection,
    event_id: i64,
    name: &str,
    assigned_to: Option<i64>,
) -> Result<task::Model> {
    task::ActiveModel {
        event_id: Set(event_id),
        name: Set(name.to_string()),
        description: Set(None),
        deadline: Set(None),
        assigned_to: Set(assigned_to),
        status: Set(task::STATUS_PENDING.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
