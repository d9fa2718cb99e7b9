//! Feedback document entity - backing table of the SQL document store.
//!
//! This table lives in the feedback database, never in the relational store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored feedback document
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback_documents")]
pub struct Model {
    /// 24-hex document identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Optional opaque key assigned by older writers
    pub feedback_key: Option<String>,
    pub event_id: i64,
    pub participant_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    /// Free-form suggestions captured by the form
    pub suggestions: Json,
    pub submitted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
