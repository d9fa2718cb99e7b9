//! Event entity - the aggregate root for budgets, expenditures, participants,
//! sponsors, tasks and coordinator assignments.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event name
    pub name: String,
    /// Day the event takes place
    pub event_date: Date,
    /// Where the event takes place
    pub venue: String,
    /// Hosting club, if any
    pub club_id: Option<i64>,
}

/// Defines relationships between Event and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event may belong to one club
    #[sea_orm(
        belongs_to = "super::club::Entity",
        from = "Column::ClubId",
        to = "super::club::Column::Id"
    )]
    Club,
    /// Budget lines of the event
    #[sea_orm(has_many = "super::budget::Entity")]
    Budgets,
    /// Recorded spending of the event
    #[sea_orm(has_many = "super::expenditure::Entity")]
    Expenditures,
    /// Registrations for the event
    #[sea_orm(has_many = "super::participant::Entity")]
    Participants,
    /// Sponsors of the event
    #[sea_orm(has_many = "super::sponsor::Entity")]
    Sponsors,
    /// Tasks of the event
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
    /// Coordinator assignments
    #[sea_orm(has_many = "super::coordinates::Entity")]
    Coordinates,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl Related<super::expenditure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenditures.def()
    }
}

impl Related<super::participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::sponsor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sponsors.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::coordinates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coordinates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
