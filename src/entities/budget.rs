//! Budget entity - per-event, per-category allocation.
//!
//! `(event_id, category)` is unique; the index is created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event the allocation belongs to
    pub event_id: i64,
    /// Spending category, e.g. "Food"
    pub category: String,
    /// Allocated amount
    pub allocated_amount: f64,
    /// Display name of the approving admin
    pub approved_by: String,
    /// Day the allocation was (re)approved
    pub approval_date: Date,
    /// Why the money is needed
    pub explanation: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each budget line belongs to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
