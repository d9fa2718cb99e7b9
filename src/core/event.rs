//! Event business logic.
//!
//! Events own budgets, expenditures, participants, sponsors, tasks and
//! coordinator assignments. Deleting an event removes all of them in foreign-key
//! order inside a single transaction, so either everything goes or nothing does.

use crate::{
    entities::{
        Budget, Coordinates, Event, Expenditure, Participant, Sponsor, Task, budget, coordinates,
        event, expenditure, participant, sponsor, task,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

/// Mutable event fields, supplied in full on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub name: String,
    pub event_date: NaiveDate,
    pub venue: String,
    #[serde(default)]
    pub club_id: Option<i64>,
}

impl EventInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        let venue = self.venue.trim().to_string();
        if name.is_empty() || venue.is_empty() {
            return Err(Error::validation("Event name, date and venue are required"));
        }
        Ok(Self {
            name,
            venue,
            ..self
        })
    }
}

/// Lists all events, newest first.
pub async fn list_events(db: &DatabaseConnection) -> Result<Vec<event::Model>> {
    Event::find()
        .order_by_desc(event::Column::EventDate)
        .order_by_asc(event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an event by id.
pub async fn get_event_by_id<C>(db: &C, event_id: i64) -> Result<Option<event::Model>>
where
    C: ConnectionTrait,
{
    Event::find_by_id(event_id).one(db).await.map_err(Into::into)
}

/// Finds an event by id, failing with [`Error::NotFound`] when absent.
pub async fn require_event<C>(db: &C, event_id: i64) -> Result<event::Model>
where
    C: ConnectionTrait,
{
    get_event_by_id(db, event_id)
        .await?
        .ok_or_else(|| Error::not_found("event", event_id))
}

/// Creates an event.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_event(db: &DatabaseConnection, input: EventInput) -> Result<event::Model> {
    let input = input.validated()?;
    let event = event::ActiveModel {
        name: Set(input.name),
        event_date: Set(input.event_date),
        venue: Set(input.venue),
        club_id: Set(input.club_id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(event_id = event.id, "Event created");
    Ok(event)
}

/// Replaces every mutable field of an event.
#[instrument(skip(db, input))]
pub async fn update_event(
    db: &DatabaseConnection,
    event_id: i64,
    input: EventInput,
) -> Result<event::Model> {
    let input = input.validated()?;
    let existing = require_event(db, event_id).await?;

    let mut active: event::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.event_date = Set(input.event_date);
    active.venue = Set(input.venue);
    active.club_id = Set(input.club_id);
    active.update(db).await.map_err(Into::into)
}

/// Deletes an event and every row it owns.
///
/// Children are removed in the order tasks, coordinator assignments,
/// participants, sponsors, expenditures, budgets, then the event itself. Any
/// failure rolls the whole transaction back. Income rows are a ledger and are
/// kept.
#[instrument(skip(db))]
pub async fn delete_event(db: &DatabaseConnection, event_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    match delete_event_cascade(&txn, event_id).await {
        Ok(()) => {
            txn.commit().await?;
            info!(event_id, "Event deleted with dependents");
            Ok(())
        }
        Err(e) => {
            warn!(event_id, error = %e, "Event delete failed, rolling back");
            if let Err(rollback) = txn.rollback().await {
                error!(event_id, error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn delete_event_cascade<C>(db: &C, event_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Task::delete_many()
        .filter(task::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    Coordinates::delete_many()
        .filter(coordinates::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    Participant::delete_many()
        .filter(participant::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    Sponsor::delete_many()
        .filter(sponsor::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    Expenditure::delete_many()
        .filter(expenditure::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    Budget::delete_many()
        .filter(budget::Column::EventId.eq(event_id))
        .exec(db)
        .await?;

    let result = Event::delete_by_id(event_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("event", event_id));
    }
    Ok(())
}
