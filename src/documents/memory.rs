//! In-process document store.

use crate::{
    core::feedback::{DocumentKey, Feedback, FeedbackDocuments, NewFeedback, generate_document_id},
    errors::Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::debug;

/// Documents held in a vector behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    docs: RwLock<Vec<Feedback>>,
}

impl MemoryDocuments {
    /// Stores a fully formed document, keeping its id and feedback key.
    pub async fn put(&self, doc: Feedback) {
        self.docs.write().await.push(doc);
    }

    /// Removes a document by id, leaving any mapping rows dangling.
    pub async fn remove(&self, id: &str) -> bool {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        docs.len() < before
    }
}

#[async_trait]
impl FeedbackDocuments for MemoryDocuments {
    async fn insert(&self, feedback: NewFeedback) -> Result<String> {
        let id = generate_document_id();
        self.put(Feedback {
            id: id.clone(),
            feedback_key: None,
            event_id: feedback.event_id,
            participant_id: feedback.participant_id,
            rating: feedback.rating,
            comment: feedback.comment,
            suggestions: feedback.suggestions,
            submitted_at: Utc::now(),
        })
        .await;
        debug!(%id, "Feedback document stored in memory");
        Ok(id)
    }

    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<Feedback>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|doc| keys.iter().any(|key| key.matches(doc)))
            .cloned()
            .collect())
    }

    async fn distinct_event_ids(&self) -> Result<Vec<i64>> {
        let docs = self.docs.read().await;
        let ids: BTreeSet<i64> = docs.iter().map(|doc| doc.event_id).collect();
        Ok(ids.into_iter().collect())
    }
}
