//! SQL-backed document store.
//!
//! Documents live in their own database, reached through a separate URL. Every
//! call opens a connection, ensures the table exists, does its work and closes
//! the connection again. Any failure on this path is reported as
//! [`Error::Upstream`].

use crate::{
    config::{database::create_table, settings::DocumentSettings},
    core::feedback::{DocumentKey, Feedback, FeedbackDocuments, NewFeedback, generate_document_id},
    entities::{FeedbackDocument, feedback_document},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    Condition, ConnectionTrait, Database, DatabaseConnection, QuerySelect, Schema, Set,
    prelude::*,
    sea_query::{Expr, Func},
};
use std::fmt::Display;
use tracing::{debug, instrument, warn};

fn upstream(err: impl Display) -> Error {
    Error::Upstream {
        message: err.to_string(),
    }
}

impl From<feedback_document::Model> for Feedback {
    fn from(row: feedback_document::Model) -> Self {
        let suggestions = serde_json::from_value(row.suggestions).unwrap_or_else(|e| {
            warn!(id = %row.id, error = %e, "Unreadable suggestions, treating as empty");
            Vec::new()
        });
        Self {
            id: row.id,
            feedback_key: row.feedback_key,
            event_id: row.event_id,
            participant_id: row.participant_id,
            rating: row.rating,
            comment: row.comment,
            suggestions,
            submitted_at: row.submitted_at,
        }
    }
}

/// Document store in a separate SQL database.
#[derive(Debug, Clone)]
pub struct SqlDocuments {
    url: String,
}

impl SqlDocuments {
    /// Creates a store for the configured database. No connection is opened yet.
    #[must_use]
    pub fn new(settings: &DocumentSettings) -> Self {
        Self {
            url: settings.url.clone(),
        }
    }

    async fn connect(&self) -> Result<DatabaseConnection> {
        let db = Database::connect(&self.url).await.map_err(upstream)?;
        let schema = Schema::new(db.get_database_backend());
        create_table(&db, &schema, FeedbackDocument)
            .await
            .map_err(upstream)?;
        Ok(db)
    }

    async fn close(db: DatabaseConnection) {
        if let Err(e) = db.close().await {
            warn!(error = %e, "Failed to close document store connection");
        }
    }
}

#[async_trait]
impl FeedbackDocuments for SqlDocuments {
    #[instrument(skip(self, feedback), fields(event_id = feedback.event_id))]
    async fn insert(&self, feedback: NewFeedback) -> Result<String> {
        let db = self.connect().await?;
        let id = generate_document_id();
        let row = feedback_document::ActiveModel {
            id: Set(id.clone()),
            feedback_key: Set(None),
            event_id: Set(feedback.event_id),
            participant_id: Set(feedback.participant_id),
            rating: Set(feedback.rating),
            comment: Set(feedback.comment),
            suggestions: Set(serde_json::Value::from(feedback.suggestions)),
            submitted_at: Set(Utc::now()),
        };
        let result = FeedbackDocument::insert(row).exec_without_returning(&db).await;
        Self::close(db).await;
        result.map_err(upstream)?;
        debug!(%id, "Feedback document stored");
        Ok(id)
    }

    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<Feedback>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut hex = Vec::new();
        let mut opaque = Vec::new();
        for key in keys {
            match key {
                DocumentKey::Hex(id) => hex.push(id.clone()),
                DocumentKey::Opaque(raw) => opaque.push(raw.clone()),
            }
        }
        let condition = Condition::any()
            .add(Expr::expr(Func::lower(Expr::col(feedback_document::Column::Id))).is_in(hex))
            .add(feedback_document::Column::Id.is_in(opaque.clone()))
            .add(feedback_document::Column::FeedbackKey.is_in(opaque));

        let db = self.connect().await?;
        let result = FeedbackDocument::find().filter(condition).all(&db).await;
        Self::close(db).await;

        Ok(result
            .map_err(upstream)?
            .into_iter()
            .map(Feedback::from)
            .filter(|doc| keys.iter().any(|key| key.matches(doc)))
            .collect())
    }

    async fn distinct_event_ids(&self) -> Result<Vec<i64>> {
        let db = self.connect().await?;
        let result: std::result::Result<Vec<i64>, DbErr> = FeedbackDocument::find()
            .select_only()
            .column(feedback_document::Column::EventId)
            .distinct()
            .into_tuple()
            .all(&db)
            .await;
        Self::close(db).await;
        result.map_err(upstream)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::path::PathBuf;

    struct TempStore {
        path: PathBuf,
        store: SqlDocuments,
    }

    impl TempStore {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "club_feedback_{name}_{}.sqlite",
                generate_document_id()
            ));
            let store = SqlDocuments::new(&DocumentSettings {
                url: format!("sqlite://{}?mode=rwc", path.display()),
            });
            Self { path, store }
        }
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn feedback(event_id: i64, comment: &str) -> NewFeedback {
        NewFeedback {
            event_id,
            participant_id: 7,
            rating: 5,
            comment: Some(comment.to_string()),
            suggestions: vec!["bigger hall".to_string()],
        }
    }

    #[tokio::test]
    async fn test_documents_persist_across_connections() -> Result<()> {
        let temp = TempStore::new("persist");
        let id = temp.store.insert(feedback(2, "great")).await?;
        temp.store.insert(feedback(4, "fine")).await?;

        let found = temp
            .store
            .find_by_keys(&[DocumentKey::parse(&id.to_uppercase())])
            .await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].comment.as_deref(), Some("great"));
        assert_eq!(found[0].suggestions, ["bigger hall"]);

        let mut events = temp.store.distinct_event_ids().await?;
        events.sort_unstable();
        assert_eq!(events, [2, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_keys_are_skipped() -> Result<()> {
        let temp = TempStore::new("unknown");
        temp.store.insert(feedback(2, "great")).await?;
        let found = temp
            .store
            .find_by_keys(&[
                DocumentKey::parse("000000000000000000000000"),
                DocumentKey::parse("legacy-key"),
            ])
            .await?;
        assert!(found.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_store_is_upstream_error() {
        let store = SqlDocuments::new(&DocumentSettings {
            url: "sqlite:///nonexistent-dir/for/sure/feedback.sqlite?mode=ro".to_string(),
        });
        assert!(matches!(
            store.distinct_event_ids().await,
            Err(Error::Upstream { .. })
        ));
    }
}
