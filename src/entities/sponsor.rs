//! Sponsor entity - an organisation contributing money to one event.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sponsor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sponsors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Sponsor display name
    pub name: String,
    /// Sponsored event
    pub event_id: Option<i64>,
    /// Pledged contribution, mirrored into a single income row when positive
    pub contribution: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
