//! Income entity - money received by an event.
//!
//! Income rows are a ledger: `source_id` is a polymorphic reference interpreted
//! through `source_type`, and `event_id` carries no foreign key so ledger rows
//! survive the deletion of the event they were booked against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where an income row came from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Registration fee paid by a participant
    #[sea_orm(string_value = "participant")]
    Participant,
    /// Sponsor contribution
    #[sea_orm(string_value = "sponsor")]
    Sponsor,
    /// Anything else, entered by an admin
    #[sea_orm(string_value = "other")]
    Other,
}

/// Income database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "income")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event the income is booked against
    pub event_id: Option<i64>,
    /// Kind of source
    pub source_type: SourceType,
    /// Participant or sponsor id, depending on `source_type`
    pub source_id: Option<i64>,
    /// Income category, e.g. "Sponsorship"
    pub category: Option<String>,
    pub amount: f64,
    pub income_date: Date,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
