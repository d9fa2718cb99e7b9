//! Feedback submission and retrieval.
//!
//! Feedback documents live in a separate document store behind the
//! [`FeedbackDocuments`] trait. The relational store only keeps a
//! `feedback_mappings` row per submission holding the document key, so the two
//! are correlated by an opaque string and nothing cascades between them.

use crate::{
    core::{
        analysis::{self, FeedbackAnalysis},
        guard::{self, Identity},
        non_blank,
    },
    entities::{Event, FeedbackMapping, Participant, Role, event, feedback_mapping},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Length of generated document identifiers, in hex characters.
pub const DOCUMENT_ID_LEN: usize = 24;

/// A stored feedback document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 24-hex identifier assigned by the store
    pub id: String,
    /// Opaque key some writers attach instead of relying on `id`
    pub feedback_key: Option<String>,
    pub event_id: i64,
    pub participant_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub suggestions: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A document about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub event_id: i64,
    pub participant_id: i64,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// A mapping key as stored in `feedback_mappings`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// 24 hex characters, compared against document ids ignoring case
    Hex(String),
    /// Anything else, compared verbatim against ids and feedback keys
    Opaque(String),
}

impl DocumentKey {
    /// Classifies a raw key.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.len() == DOCUMENT_ID_LEN && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::Hex(raw.to_ascii_lowercase())
        } else {
            Self::Opaque(raw.to_string())
        }
    }

    /// Returns whether this key resolves to `doc`.
    #[must_use]
    pub fn matches(&self, doc: &Feedback) -> bool {
        match self {
            Self::Hex(hex) => doc.id.eq_ignore_ascii_case(hex),
            Self::Opaque(raw) => doc.id == *raw || doc.feedback_key.as_deref() == Some(raw),
        }
    }
}

/// Generates a 24-hex document id: a 4-byte big-endian timestamp followed by
/// 8 random bytes.
#[must_use]
pub fn generate_document_id() -> String {
    let seconds = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
    let random: u64 = rand::thread_rng().r#gen();
    format!("{seconds:08x}{random:016x}")
}

/// Access to the feedback document store.
///
/// Implementations report store failures as [`Error::Upstream`].
#[async_trait]
pub trait FeedbackDocuments: Send + Sync {
    /// Writes a document and returns its key.
    async fn insert(&self, feedback: NewFeedback) -> Result<String>;

    /// Returns the documents matching any of `keys`; unresolved keys are skipped.
    async fn find_by_keys(&self, keys: &[DocumentKey]) -> Result<Vec<Feedback>>;

    /// Event ids that have at least one document.
    async fn distinct_event_ids(&self) -> Result<Vec<i64>>;
}

/// What the public feedback form shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackForm {
    pub event_id: i64,
    pub event_name: String,
    pub participant_id: i64,
    pub participant_name: String,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub mapping_id: i64,
    pub document_key: String,
}

/// An event row in the feedback analysis overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEventSummary {
    pub event_id: i64,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub total_feedback: usize,
}

/// Event header of a feedback analysis; a placeholder once the event is gone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedEvent {
    pub event_id: i64,
    pub name: String,
    pub event_date: NaiveDate,
    pub venue: String,
    pub deleted: bool,
}

impl AnalyzedEvent {
    fn from_event(event: event::Model) -> Self {
        Self {
            event_id: event.id,
            name: event.name,
            event_date: event.event_date,
            venue: event.venue,
            deleted: false,
        }
    }

    fn deleted(event_id: i64) -> Self {
        Self {
            event_id,
            name: format!("Event #{event_id} (Deleted)"),
            event_date: Utc::now().date_naive(),
            venue: "Unknown".to_string(),
            deleted: true,
        }
    }
}

/// Analysis of one event's feedback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFeedbackAnalysis {
    pub event: AnalyzedEvent,
    pub analysis: FeedbackAnalysis,
}

/// Loads the participant and event names for the feedback form.
///
/// # Errors
/// [`Error::NotFound`] unless the participant is registered for the event.
pub async fn feedback_form(
    db: &DatabaseConnection,
    event_id: i64,
    participant_id: i64,
) -> Result<FeedbackForm> {
    let (participant, event) = Participant::find_by_id(participant_id)
        .find_also_related(Event)
        .one(db)
        .await?
        .filter(|(p, _)| p.event_id == event_id)
        .ok_or_else(|| Error::not_found("participant", participant_id))?;
    let event = event.ok_or_else(|| Error::not_found("event", event_id))?;

    Ok(FeedbackForm {
        event_id,
        event_name: event.name,
        participant_id,
        participant_name: participant.name,
    })
}

/// Stores feedback and records its mapping row.
///
/// The document is written first. If the mapping insert then fails the
/// document stays in the store unreferenced; this is logged, not undone.
#[instrument(skip(db, documents, feedback), fields(event_id = feedback.event_id))]
pub async fn submit_feedback(
    db: &DatabaseConnection,
    documents: &dyn FeedbackDocuments,
    feedback: NewFeedback,
) -> Result<FeedbackReceipt> {
    if !(1..=5).contains(&feedback.rating) {
        return Err(Error::validation("Rating must be between 1 and 5"));
    }
    feedback_form(db, feedback.event_id, feedback.participant_id).await?;

    let feedback = NewFeedback {
        comment: non_blank(feedback.comment),
        ..feedback
    };
    let (event_id, participant_id) = (feedback.event_id, feedback.participant_id);
    let document_key = documents.insert(feedback).await?;

    let mapping = feedback_mapping::ActiveModel {
        event_id: Set(event_id),
        participant_id: Set(participant_id),
        document_key: Set(document_key.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        warn!(%document_key, error = %e, "Feedback mapping failed, document left orphaned");
        Error::from(e)
    })?;

    info!(mapping_id = mapping.id, "Feedback submitted");
    Ok(FeedbackReceipt {
        mapping_id: mapping.id,
        document_key,
    })
}

/// Resolves every mapped document of an event.
///
/// Keys whose documents are gone are skipped, so the result may be shorter
/// than the mapping list.
pub async fn fetch_feedback_for_event(
    db: &DatabaseConnection,
    documents: &dyn FeedbackDocuments,
    event_id: i64,
) -> Result<Vec<Feedback>> {
    let keys: Vec<DocumentKey> = FeedbackMapping::find()
        .filter(feedback_mapping::Column::EventId.eq(event_id))
        .all(db)
        .await?
        .iter()
        .map(|row| DocumentKey::parse(&row.document_key))
        .collect();

    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let found = documents.find_by_keys(&keys).await?;
    if found.len() < keys.len() {
        debug!(
            event_id,
            mapped = keys.len(),
            found = found.len(),
            "Some feedback keys did not resolve"
        );
    }
    Ok(found)
}

/// Mapping row counts per event.
pub async fn feedback_counts(db: &DatabaseConnection) -> Result<HashMap<i64, usize>> {
    let mut counts = HashMap::new();
    for row in FeedbackMapping::find().all(db).await? {
        *counts.entry(row.event_id).or_default() += 1;
    }
    Ok(counts)
}

/// Events offered on the feedback analysis page.
///
/// Admins see every event. Coordinators see their own events that have at
/// least one stored document.
pub async fn feedback_overview(
    db: &DatabaseConnection,
    documents: &dyn FeedbackDocuments,
    identity: &Identity,
) -> Result<Vec<FeedbackEventSummary>> {
    let mut query = Event::find().order_by_desc(event::Column::EventDate);
    match identity.role {
        Role::Admin => {}
        Role::Coordinator => {
            let member_id = identity.require_linked()?;
            let with_feedback: HashSet<i64> =
                documents.distinct_event_ids().await?.into_iter().collect();
            let visible: Vec<i64> = guard::assigned_event_ids(db, member_id)
                .await?
                .into_iter()
                .filter(|id| with_feedback.contains(id))
                .collect();
            if visible.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(event::Column::Id.is_in(visible));
        }
        Role::Member | Role::Sponsor | Role::Participant => return Err(Error::Forbidden),
    }

    let counts = feedback_counts(db).await?;
    Ok(query
        .all(db)
        .await?
        .into_iter()
        .map(|event| FeedbackEventSummary {
            total_feedback: counts.get(&event.id).copied().unwrap_or(0),
            event_id: event.id,
            event_name: event.name,
            event_date: event.event_date,
        })
        .collect())
}

/// Analyzes the feedback of one event for an admin or its coordinator.
///
/// # Errors
/// [`Error::NotFound`] when the event has no resolvable feedback.
pub async fn event_feedback_analysis(
    db: &DatabaseConnection,
    documents: &dyn FeedbackDocuments,
    identity: &Identity,
    event_id: i64,
) -> Result<EventFeedbackAnalysis> {
    guard::authorize_event(db, identity, event_id).await?;

    let docs = fetch_feedback_for_event(db, documents, event_id).await?;
    if docs.is_empty() {
        return Err(Error::not_found("feedback for event", event_id));
    }

    let event = match Event::find_by_id(event_id).one(db).await? {
        Some(event) => AnalyzedEvent::from_event(event),
        None => AnalyzedEvent::deleted(event_id),
    };
    Ok(EventFeedbackAnalysis {
        event,
        analysis: analysis::analyze_feedback(&docs),
    })
}
