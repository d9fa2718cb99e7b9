//! Income ledger.
//!
//! Besides manual entries by admins, income is derived from two sources:
//! sponsor contributions, reconciled so each sponsor has at most one row, and
//! participant registration fees, appended on every registration or edit that
//! carries a payment.

use crate::{
    core::non_blank,
    entities::{Event, Income, Participant, SourceType, Sponsor, income, sponsor},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Category used for sponsor contributions.
pub const SPONSORSHIP_CATEGORY: &str = "Sponsorship";
/// Category used for participant fees.
pub const REGISTRATION_FEE_CATEGORY: &str = "Registration Fee";

/// Mutable income fields, supplied in full on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeInput {
    #[serde(default)]
    pub event_id: Option<i64>,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_id: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    pub income_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

impl IncomeInput {
    fn validated(self) -> Result<Self> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::validation("Amount must be a non-negative number"));
        }
        Ok(Self {
            category: non_blank(self.category),
            description: non_blank(self.description),
            ..self
        })
    }
}

/// An income row with display names resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEntry {
    #[serde(flatten)]
    pub income: income::Model,
    pub event_name: Option<String>,
    /// Participant or sponsor name, or `"Other"`
    pub source_name: Option<String>,
}

/// Lists all income, newest first, with event and source names.
pub async fn list_income(db: &DatabaseConnection) -> Result<Vec<IncomeEntry>> {
    let rows = Income::find()
        .order_by_desc(income::Column::IncomeDate)
        .order_by_desc(income::Column::Id)
        .all(db)
        .await?;

    let events: HashMap<i64, String> = Event::find()
        .all(db)
        .await?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();
    let participants: HashMap<i64, String> = Participant::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let sponsors: HashMap<i64, String> = Sponsor::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    Ok(rows
        .into_iter()
        .map(|income| {
            let source_name = match income.source_type {
                SourceType::Participant => income
                    .source_id
                    .and_then(|id| participants.get(&id).cloned()),
                SourceType::Sponsor => income.source_id.and_then(|id| sponsors.get(&id).cloned()),
                SourceType::Other => Some("Other".to_string()),
            };
            IncomeEntry {
                event_name: income.event_id.and_then(|id| events.get(&id).cloned()),
                source_name,
                income,
            }
        })
        .collect())
}

/// Finds an income row by id.
pub async fn get_income_by_id(
    db: &DatabaseConnection,
    income_id: i64,
) -> Result<Option<income::Model>> {
    Income::find_by_id(income_id).one(db).await.map_err(Into::into)
}

/// Income rows booked for a sponsor.
pub async fn sponsor_income<C>(db: &C, sponsor_id: i64) -> Result<Vec<income::Model>>
where
    C: ConnectionTrait,
{
    Income::find()
        .filter(income::Column::SourceType.eq(SourceType::Sponsor))
        .filter(income::Column::SourceId.eq(sponsor_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Income rows booked for a participant.
pub async fn participant_income<C>(db: &C, participant_id: i64) -> Result<Vec<income::Model>>
where
    C: ConnectionTrait,
{
    Income::find()
        .filter(income::Column::SourceType.eq(SourceType::Participant))
        .filter(income::Column::SourceId.eq(participant_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a manual income entry.
#[instrument(skip(db, input))]
pub async fn create_income(db: &DatabaseConnection, input: IncomeInput) -> Result<income::Model> {
    let input = input.validated()?;
    let income = income::ActiveModel {
        event_id: Set(input.event_id),
        source_type: Set(input.source_type),
        source_id: Set(input.source_id),
        category: Set(input.category),
        amount: Set(input.amount),
        income_date: Set(input.income_date),
        description: Set(input.description),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(income_id = income.id, amount = income.amount, "Income recorded");
    Ok(income)
}

/// Replaces every mutable field of an income entry.
#[instrument(skip(db, input))]
pub async fn update_income(
    db: &DatabaseConnection,
    income_id: i64,
    input: IncomeInput,
) -> Result<income::Model> {
    let input = input.validated()?;
    let existing = get_income_by_id(db, income_id)
        .await?
        .ok_or_else(|| Error::not_found("income", income_id))?;

    let mut active: income::ActiveModel = existing.into();
    active.event_id = Set(input.event_id);
    active.source_type = Set(input.source_type);
    active.source_id = Set(input.source_id);
    active.category = Set(input.category);
    active.amount = Set(input.amount);
    active.income_date = Set(input.income_date);
    active.description = Set(input.description);
    active.update(db).await.map_err(Into::into)
}

/// Deletes an income entry.
#[instrument(skip(db))]
pub async fn delete_income(db: &DatabaseConnection, income_id: i64) -> Result<()> {
    let result = Income::delete_by_id(income_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("income", income_id));
    }
    Ok(())
}

/// Keeps exactly one income row in step with a sponsor's contribution.
///
/// Updates the existing row when there is one and inserts otherwise. A zero
/// contribution leaves the ledger untouched.
#[instrument(skip(db, sponsor), fields(sponsor_id = sponsor.id))]
pub async fn reconcile_sponsor_income<C>(db: &C, sponsor: &sponsor::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    if sponsor.contribution <= 0.0 {
        debug!("No contribution to record");
        return Ok(());
    }

    let description = format!("Sponsor contribution from {}", sponsor.name);
    let existing = Income::find()
        .filter(income::Column::SourceType.eq(SourceType::Sponsor))
        .filter(income::Column::SourceId.eq(sponsor.id))
        .one(db)
        .await?;

    if let Some(row) = existing {
        let mut active: income::ActiveModel = row.into();
        active.event_id = Set(sponsor.event_id);
        active.amount = Set(sponsor.contribution);
        active.description = Set(Some(description));
        active.update(db).await?;
        debug!("Sponsor income updated");
    } else {
        income::ActiveModel {
            event_id: Set(sponsor.event_id),
            source_type: Set(SourceType::Sponsor),
            source_id: Set(Some(sponsor.id)),
            category: Set(Some(SPONSORSHIP_CATEGORY.to_string())),
            amount: Set(sponsor.contribution),
            income_date: Set(chrono::Utc::now().date_naive()),
            description: Set(Some(description)),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        debug!("Sponsor income inserted");
    }
    Ok(())
}

/// Removes every income row booked for a sponsor.
pub async fn delete_sponsor_income<C>(db: &C, sponsor_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = Income::delete_many()
        .filter(income::Column::SourceType.eq(SourceType::Sponsor))
        .filter(income::Column::SourceId.eq(sponsor_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// A registration fee paid by a participant.
#[derive(Debug, Clone)]
pub struct ParticipantFee<'a> {
    pub event_id: i64,
    pub participant_id: i64,
    pub participant_name: &'a str,
    pub amount: f64,
    pub paid_on: NaiveDate,
}

/// Appends a registration-fee row. Every call inserts a new row.
#[instrument(skip(db, fee), fields(participant_id = fee.participant_id))]
pub async fn record_participant_fee<C>(db: &C, fee: ParticipantFee<'_>) -> Result<income::Model>
where
    C: ConnectionTrait,
{
    income::ActiveModel {
        event_id: Set(Some(fee.event_id)),
        source_type: Set(SourceType::Participant),
        source_id: Set(Some(fee.participant_id)),
        category: Set(Some(REGISTRATION_FEE_CATEGORY.to_string())),
        amount: Set(fee.amount),
        income_date: Set(fee.paid_on),
        description: Set(Some(format!(
            "Registration fee from {}",
            fee.participant_name
        ))),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn other_income(amount: f64, day: u32) -> IncomeInput {
        IncomeInput {
            event_id: None,
            source_type: SourceType::Other,
            source_id: None,
            category: Some("Donation".to_string()),
            amount,
            income_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            description: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_income_crud_and_listing() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let sponsor = create_test_sponsor(&db, event.id, "Acme", 0.0).await?;

        let donation = create_income(&db, other_income(25.0, 1)).await?;
        assert_eq!(donation.description, None);

        create_income(
            &db,
            IncomeInput {
                event_id: Some(event.id),
                source_type: SourceType::Sponsor,
                source_id: Some(sponsor.id),
                ..other_income(100.0, 9)
            },
        )
        .await?;

        let listed = list_income(&db).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].source_name.as_deref(), Some("Acme"));
        assert_eq!(listed[0].event_name.as_deref(), Some("Gala"));
        assert_eq!(listed[1].source_name.as_deref(), Some("Other"));

        let updated = update_income(&db, donation.id, other_income(30.0, 2)).await?;
        assert!((updated.amount - 30.0).abs() < f64::EPSILON);

        delete_income(&db, donation.id).await?;
        assert!(get_income_by_id(&db, donation.id).await?.is_none());
        assert!(matches!(
            update_income(&db, donation.id, other_income(1.0, 1)).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_income_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_income(&db, other_income(-5.0, 1)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_sponsor_income_upserts() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let mut sponsor = create_test_sponsor(&db, event.id, "Acme", 500.0).await?;

        reconcile_sponsor_income(&db, &sponsor).await?;
        reconcile_sponsor_income(&db, &sponsor).await?;
        let rows = sponsor_income(&db, sponsor.id).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category.as_deref(), Some(SPONSORSHIP_CATEGORY));

        sponsor.contribution = 750.0;
        reconcile_sponsor_income(&db, &sponsor).await?;
        let rows = sponsor_income(&db, sponsor.id).await?;
        assert_eq!(rows.len(), 1);
        assert!((rows[0].amount - 750.0).abs() < f64::EPSILON);

        assert_eq!(delete_sponsor_income(&db, sponsor.id).await?, 1);
        assert!(sponsor_income(&db, sponsor.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_contribution_records_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let sponsor = create_test_sponsor(&db, event.id, "Acme", 0.0).await?;
        reconcile_sponsor_income(&db, &sponsor).await?;
        assert!(sponsor_income(&db, sponsor.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_participant_fee_appends_each_time() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Gala").await?;
        let participant = create_test_participant(&db, event.id, "Kim").await?;
        let fee = ParticipantFee {
            event_id: event.id,
            participant_id: participant.id,
            participant_name: "Kim",
            amount: 20.0,
            paid_on: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        };

        record_participant_fee(&db, fee.clone()).await?;
        record_participant_fee(&db, fee).await?;

        let rows = participant_income(&db, participant.id).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].description.as_deref(),
            Some("Registration fee from Kim")
        );
        Ok(())
    }
}
