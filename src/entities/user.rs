//! User entity - login accounts for every role.
//!
//! A user row is provisioned alongside the role entity it represents; `linked_id`
//! points at that entity (member, sponsor or participant) and is `None` for admins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of roles a session can carry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, bypasses event scoping
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Member assigned to manage specific events
    #[sea_orm(string_value = "coordinator")]
    Coordinator,
    /// Regular club member
    #[sea_orm(string_value = "member")]
    Member,
    /// Event sponsor
    #[sea_orm(string_value = "sponsor")]
    Sponsor,
    /// Registered event participant
    #[sea_orm(string_value = "participant")]
    Participant,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all roles
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role the account authenticates as
    pub role: Role,
    /// Id of the member, sponsor or participant row this account belongs to
    pub linked_id: Option<i64>,
    /// Display name shown in the UI
    pub full_name: Option<String>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
