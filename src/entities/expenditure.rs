//! Expenditure entity - money spent by an event against a budget category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expenditure database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenditures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event that spent the money
    pub event_id: i64,
    /// Budget category the spending is booked against
    pub category: String,
    /// Amount spent
    pub amount: f64,
    /// Day of the expense
    pub expense_date: Date,
    pub description: Option<String>,
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
