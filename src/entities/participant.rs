//! Participant entity - a registration for one event.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the registration fee was paid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PayStatus {
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
}

/// Attendance as recorded by coordinators. The stored spellings are historical.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[sea_orm(string_value = "Present")]
    #[serde(rename = "Present", alias = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    #[serde(rename = "absent")]
    Absent,
}

/// Participant database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event registered for
    pub event_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Team identifier for team events
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub pay_status: PayStatus,
    pub amount_paid: f64,
    /// Day of registration
    pub registration_date: Date,
    pub attendance: AttendanceStatus,
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
