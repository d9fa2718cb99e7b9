//! Feedback mapping entity - correlates an event/participant pair with a
//! document-store key. This is a weak reference: nothing cascades from it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Feedback mapping database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback_mappings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: i64,
    pub participant_id: i64,
    /// Opaque key of the feedback document
    pub document_key: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
