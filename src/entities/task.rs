//! Task entity - work items of an event, optionally assigned to a member.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status given to newly created tasks.
pub const STATUS_PENDING: &str = "Pending";

/// Task database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event the task belongs to
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<Date>,
    /// Member responsible for the task
    pub assigned_to: Option<i64>,
    /// Free-form status; new tasks start as [`STATUS_PENDING`]
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::AssignedTo",
        to = "super::member::Column::Id"
    )]
    Member,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
