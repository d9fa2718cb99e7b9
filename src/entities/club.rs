//! Club entity - the organisation events and members belong to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Club database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clubs")]
pub struct Model {
    /// Unique identifier for the club
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Club name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
}

/// Defines relationships between Club and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One club hosts many events
    #[sea_orm(has_many = "super::event::Entity")]
    Events,
    /// One club has many members
    #[sea_orm(has_many = "super::member::Entity")]
    Members,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
