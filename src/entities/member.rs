//! Member entity - club members, some of whom are flagged as coordinators.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role flag stored on the member row.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MemberRole {
    /// Regular member
    #[sea_orm(string_value = "Member")]
    Member,
    /// Member who can be assigned to coordinate events
    #[sea_orm(string_value = "Coordinator")]
    Coordinator,
}

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Club the member belongs to
    pub club_id: Option<i64>,
    /// Member or Coordinator
    pub role: MemberRole,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member may belong to one club
    #[sea_orm(
        belongs_to = "super::club::Entity",
        from = "Column::ClubId",
        to = "super::club::Column::Id"
    )]
    Club,
    /// Events this member coordinates
    #[sea_orm(has_many = "super::coordinates::Entity")]
    Coordinates,
    /// Tasks assigned to this member
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
}

impl Related<super::coordinates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coordinates.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
