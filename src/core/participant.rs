//! Participant business logic.
//!
//! Participants are registered by staff (no login) or sign themselves up
//! publicly (with a `participant_` login). Edits, deletes and attendance
//! updates are authorized against the participant's current event.

use crate::{
    core::{
        account::{self, AccountRequest, Compensation, Provisioned, UndoStep},
        credentials::CredentialStore,
        guard::{self, Identity},
        income::{self, ParticipantFee},
        non_blank,
    },
    entities::{
        AttendanceStatus, Event, EventModel, Participant, PayStatus, Role, User, event,
        participant, user,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Optional list filters; unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantFilter {
    pub event_id: Option<i64>,
    pub team_id: Option<String>,
    pub pay_status: Option<PayStatus>,
    pub attendance: Option<AttendanceStatus>,
}

/// Participant fields written by staff on register and edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInput {
    pub name: String,
    pub event_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    /// Defaults to unpaid
    #[serde(default)]
    pub pay_status: Option<PayStatus>,
    #[serde(default)]
    pub amount_paid: f64,
    /// Defaults to today
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    /// Defaults to pending
    #[serde(default)]
    pub attendance: Option<AttendanceStatus>,
}

impl ParticipantInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Participant name and event are required"));
        }
        validate_amount(self.amount_paid)?;
        Ok(Self {
            name,
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            team_id: non_blank(self.team_id),
            team_name: non_blank(self.team_name),
            ..self
        })
    }
}

/// Public self-registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub event_id: Option<i64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub amount_paid: f64,
    pub password: String,
    pub confirm_password: String,
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::validation("Amount paid must be a non-negative number"))
    }
}

/// A participant with the name of its event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantListing {
    #[serde(flatten)]
    pub participant: participant::Model,
    pub event_name: String,
}

/// Whether an event is still ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTiming {
    Upcoming,
    Past,
}

impl EventTiming {
    /// Events dated today count as upcoming.
    #[must_use]
    pub fn of(event_date: NaiveDate, today: NaiveDate) -> Self {
        if event_date >= today {
            Self::Upcoming
        } else {
            Self::Past
        }
    }
}

/// An event offered on the signup page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupEvent {
    #[serde(flatten)]
    pub event: EventModel,
    pub registered_count: usize,
    pub timing: EventTiming,
}

/// A participant's own registration with its event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(flatten)]
    pub participant: participant::Model,
    pub event: EventModel,
}

/// Participant landing page data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDashboard {
    pub registrations: Vec<Registration>,
}

/// Lists participants matching `filter`, ordered by event, team and name.
pub async fn list_participants(
    db: &DatabaseConnection,
    filter: &ParticipantFilter,
) -> Result<Vec<ParticipantListing>> {
    let mut query = Participant::find().find_also_related(Event);
    if let Some(event_id) = filter.event_id {
        query = query.filter(participant::Column::EventId.eq(event_id));
    }
    if let Some(team_id) = filter.team_id.as_deref().filter(|t| !t.is_empty()) {
        query = query.filter(participant::Column::TeamId.eq(team_id));
    }
    if let Some(pay_status) = filter.pay_status {
        query = query.filter(participant::Column::PayStatus.eq(pay_status));
    }
    if let Some(attendance) = filter.attendance {
        query = query.filter(participant::Column::Attendance.eq(attendance));
    }

    let rows = query
        .order_by_asc(participant::Column::EventId)
        .order_by_asc(participant::Column::TeamId)
        .order_by_asc(participant::Column::Name)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(participant, event)| {
            event.map(|event| ParticipantListing {
                participant,
                event_name: event.name,
            })
        })
        .collect())
}

/// Finds a participant by id.
pub async fn get_participant_by_id<C>(
    db: &C,
    participant_id: i64,
) -> Result<Option<participant::Model>>
where
    C: ConnectionTrait,
{
    Participant::find_by_id(participant_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a participant the caller may manage.
///
/// Non-admins get [`Error::Forbidden`] for missing rows too, so ids of other
/// events' participants cannot be probed.
async fn load_authorized(
    db: &DatabaseConnection,
    identity: &Identity,
    participant_id: i64,
) -> Result<participant::Model> {
    let Some(existing) = get_participant_by_id(db, participant_id).await? else {
        return Err(match identity.role {
            Role::Admin => Error::not_found("participant", participant_id),
            _ => Error::Forbidden,
        });
    };
    guard::authorize_event(db, identity, existing.event_id).await?;
    Ok(existing)
}

/// Books a registration fee, logging instead of failing.
async fn record_fee_best_effort(db: &DatabaseConnection, participant: &participant::Model) {
    if participant.amount_paid <= 0.0 {
        return;
    }
    let fee = ParticipantFee {
        event_id: participant.event_id,
        participant_id: participant.id,
        participant_name: &participant.name,
        amount: participant.amount_paid,
        paid_on: participant.registration_date,
    };
    if let Err(e) = income::record_participant_fee(db, fee).await {
        warn!(participant_id = participant.id, error = %e, "Failed to record registration fee");
    }
}

/// Registers a participant on behalf of staff. No login is created.
#[instrument(skip(db, input), fields(event_id = input.event_id))]
pub async fn register_participant(
    db: &DatabaseConnection,
    input: ParticipantInput,
) -> Result<participant::Model> {
    let input = input.validated()?;
    let participant = participant::ActiveModel {
        event_id: Set(input.event_id),
        name: Set(input.name),
        email: Set(input.email),
        phone: Set(input.phone),
        team_id: Set(input.team_id),
        team_name: Set(input.team_name),
        pay_status: Set(input.pay_status.unwrap_or(PayStatus::Unpaid)),
        amount_paid: Set(input.amount_paid),
        registration_date: Set(input
            .registration_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())),
        attendance: Set(AttendanceStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await?;

    record_fee_best_effort(db, &participant).await;
    info!(participant_id = participant.id, "Participant registered");
    Ok(participant)
}

/// Public signup: registers the caller and creates their login with the
/// password they chose.
///
/// # Errors
/// [`Error::Validation`] when name, email, event or password is missing or the
/// confirmation differs; [`Error::AccountProvisioning`] when the login cannot
/// be created, after the registration has been removed again.
#[instrument(skip(db, credentials, input), fields(event_id = ?input.event_id))]
pub async fn signup_participant(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    input: SignupInput,
) -> Result<Provisioned<participant::Model>> {
    let name = input.name.trim().to_string();
    let email = input.email.trim().to_string();
    let event_id = match input.event_id {
        Some(id) if !name.is_empty() && !email.is_empty() && !input.password.is_empty() => id,
        _ => {
            return Err(Error::validation(
                "Name, Email, Event, and Password are required",
            ));
        }
    };
    if input.password != input.confirm_password {
        return Err(Error::validation("Passwords do not match"));
    }
    validate_amount(input.amount_paid)?;

    let pay_status = if input.amount_paid > 0.0 {
        PayStatus::Paid
    } else {
        PayStatus::Unpaid
    };
    let participant = participant::ActiveModel {
        event_id: Set(event_id),
        name: Set(name),
        email: Set(Some(email)),
        phone: Set(non_blank(input.phone)),
        team_id: Set(non_blank(input.team_id)),
        team_name: Set(non_blank(input.team_name)),
        pay_status: Set(pay_status),
        amount_paid: Set(input.amount_paid),
        registration_date: Set(chrono::Utc::now().date_naive()),
        attendance: Set(AttendanceStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut undo = Compensation::new();
    undo.record(UndoStep::DeleteParticipant(participant.id));
    let account = account::provision_account(
        db,
        credentials,
        AccountRequest {
            role: Role::Participant,
            linked_id: participant.id,
            display_name: &participant.name,
            suffix: Some(participant.id),
            password: Some(input.password),
        },
        undo,
    )
    .await?;

    record_fee_best_effort(db, &participant).await;
    info!(participant_id = participant.id, username = %account.username, "Participant signed up");
    Ok(Provisioned {
        entity: participant,
        account,
    })
}

/// Replaces a participant's fields.
///
/// The caller must be authorized for the participant's current event and, when
/// the participant moves, for the target event too.
#[instrument(skip(db, identity, input), fields(user = %identity.username))]
pub async fn edit_participant(
    db: &DatabaseConnection,
    identity: &Identity,
    participant_id: i64,
    input: ParticipantInput,
) -> Result<participant::Model> {
    let existing = load_authorized(db, identity, participant_id).await?;
    let input = input.validated()?;
    if input.event_id != existing.event_id {
        guard::authorize_event(db, identity, input.event_id).await?;
    }

    let mut active: participant::ActiveModel = existing.into();
    active.event_id = Set(input.event_id);
    active.name = Set(input.name);
    active.email = Set(input.email);
    active.phone = Set(input.phone);
    active.team_id = Set(input.team_id);
    active.team_name = Set(input.team_name);
    active.pay_status = Set(input.pay_status.unwrap_or(PayStatus::Unpaid));
    active.amount_paid = Set(input.amount_paid);
    active.registration_date = Set(input
        .registration_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive()));
    active.attendance = Set(input.attendance.unwrap_or(AttendanceStatus::Pending));
    let participant = active.update(db).await?;

    // Appends another fee row on every paid edit; the sponsor path upserts instead.
    record_fee_best_effort(db, &participant).await;
    Ok(participant)
}

/// Deletes a participant and its login, if any. Income rows are kept.
#[instrument(skip(db, identity), fields(user = %identity.username))]
pub async fn delete_participant(
    db: &DatabaseConnection,
    identity: &Identity,
    participant_id: i64,
) -> Result<()> {
    load_authorized(db, identity, participant_id).await?;

    let txn = db.begin().await?;
    Participant::delete_by_id(participant_id).exec(&txn).await?;
    User::delete_many()
        .filter(user::Column::Role.eq(Role::Participant))
        .filter(user::Column::LinkedId.eq(participant_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(participant_id, "Participant deleted");
    Ok(())
}

/// Records attendance for a participant.
#[instrument(skip(db, identity), fields(user = %identity.username))]
pub async fn set_attendance(
    db: &DatabaseConnection,
    identity: &Identity,
    participant_id: i64,
    attendance: AttendanceStatus,
) -> Result<participant::Model> {
    let existing = load_authorized(db, identity, participant_id).await?;
    let mut active: participant::ActiveModel = existing.into();
    active.attendance = Set(attendance);
    let updated = active.update(db).await?;
    debug!(participant_id, ?attendance, "Attendance recorded");
    Ok(updated)
}

/// Events offered for signup, newest first, optionally restricted to upcoming
/// or past ones relative to `today`.
pub async fn signup_events(
    db: &DatabaseConnection,
    timing: Option<EventTiming>,
    today: NaiveDate,
) -> Result<Vec<SignupEvent>> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for participant in Participant::find().all(db).await? {
        *counts.entry(participant.event_id).or_default() += 1;
    }

    let events = Event::find()
        .order_by_desc(event::Column::EventDate)
        .all(db)
        .await?;

    Ok(events
        .into_iter()
        .map(|event| SignupEvent {
            registered_count: counts.get(&event.id).copied().unwrap_or(0),
            timing: EventTiming::of(event.event_date, today),
            event,
        })
        .filter(|entry| timing.is_none_or(|wanted| entry.timing == wanted))
        .collect())
}

/// The signed-in participant's registrations, by event date.
pub async fn participant_dashboard(
    db: &DatabaseConnection,
    participant_id: i64,
) -> Result<ParticipantDashboard> {
    let rows = Participant::find()
        .filter(participant::Column::Id.eq(participant_id))
        .find_also_related(Event)
        .order_by_asc(event::Column::EventDate)
        .all(db)
        .await?;

    Ok(ParticipantDashboard {
        registrations: rows
            .into_iter()
            .filter_map(|(participant, event)| {
                event.map(|event| Registration { participant, event })
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{credentials::find_user_by_username, member};
    use crate::test_utils::*;

    fn staff_input(event_id: i64, name: &str, amount_paid: f64) -> ParticipantInput {
        ParticipantInput {
            name: name.to_string(),
            event_id,
            email: Some("p@example.com".to_string()),
            phone: None,
            team_id: Some("T1".to_string()),
            team_name: Some("Tigers".to_string()),
            pay_status: None,
            amount_paid,
            registration_date: NaiveDate::from_ymd_opt(2025, 3, 3),
            attendance: None,
        }
    }

    fn signup(event_id: i64, name: &str, amount_paid: f64) -> SignupInput {
        SignupInput {
            name: name.to_string(),
            email: "lee@example.com".to_string(),
            event_id: Some(event_id),
            phone: None,
            team_id: None,
            team_name: None,
            amount_paid,
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_defaults_and_fee() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Hackathon").await?;

        let free = register_participant(&db, staff_input(event.id, "Ann", 0.0)).await?;
        assert_eq!(free.pay_status, PayStatus::Unpaid);
        assert_eq!(free.attendance, AttendanceStatus::Pending);
        assert!(income::participant_income(&db, free.id).await?.is_empty());

        let paid = register_participant(&db, staff_input(event.id, "Bob", 15.0)).await?;
        let fees = income::participant_income(&db, paid.id).await?;
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].income_date, paid.registration_date);
        Ok(())
    }

    #[tokio::test]
    async fn test_signup_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Hackathon").await?;

        let mismatch = SignupInput {
            confirm_password: "other".to_string(),
            ..signup(event.id, "Lee", 0.0)
        };
        let missing_event = SignupInput {
            event_id: None,
            ..signup(event.id, "Lee", 0.0)
        };
        let blank_email = SignupInput {
            email: " ".to_string(),
            ..signup(event.id, "Lee", 0.0)
        };
        for bad in [mismatch, missing_event, blank_email] {
            let result = signup_participant(&db, &credentials, bad).await;
            assert!(matches!(result, Err(Error::Validation { .. })));
        }
        assert!(list_participants(&db, &ParticipantFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_signup_creates_login_with_chosen_password() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Hackathon").await?;

        let created = signup_participant(&db, &credentials, signup(event.id, "Lee Min", 25.0)).await?;
        assert_eq!(created.entity.pay_status, PayStatus::Paid);
        let expected = format!("participant_lee_min_{}", created.entity.id);
        assert_eq!(created.account.username, expected);

        let user = credentials
            .authenticate(&db, &expected, "hunter22", "participant")
            .await?;
        assert_eq!(user.linked_id, Some(created.entity.id));
        assert_eq!(income::participant_income(&db, created.entity.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters_and_order() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_event(&db, "One").await?;
        let second = create_test_event(&db, "Two").await?;
        register_participant(&db, staff_input(second.id, "Zed", 0.0)).await?;
        register_participant(&db, staff_input(first.id, "Mia", 5.0)).await?;
        register_participant(
            &db,
            ParticipantInput {
                pay_status: Some(PayStatus::Paid),
                ..staff_input(first.id, "Ada", 5.0)
            },
        )
        .await?;

        let all = list_participants(&db, &ParticipantFilter::default()).await?;
        let names: Vec<_> = all.iter().map(|p| p.participant.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Mia", "Zed"]);
        assert_eq!(all[0].event_name, "One");

        let paid = list_participants(
            &db,
            &ParticipantFilter {
                pay_status: Some(PayStatus::Paid),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(paid.len(), 1);

        let in_second = list_participants(
            &db,
            &ParticipantFilter {
                event_id: Some(second.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(in_second.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_requires_assignment() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Hackathon").await?;
        let other = create_test_event(&db, "Other").await?;
        let coordinator = create_test_coordinator(&db, "Meera").await?;
        member::assign_coordinator(&db, coordinator.id, event.id).await?;
        let participant = create_test_participant(&db, event.id, "Ann").await?;
        let stranger = create_test_participant(&db, other.id, "Bea").await?;

        let coord = identity(Role::Coordinator, Some(coordinator.id));
        let edited = edit_participant(&db, &coord, participant.id, staff_input(event.id, "Ann B", 0.0))
            .await?;
        assert_eq!(edited.name, "Ann B");

        let denied = edit_participant(&db, &coord, stranger.id, staff_input(other.id, "X", 0.0)).await;
        assert!(matches!(denied, Err(Error::Forbidden)));

        let moved = edit_participant(&db, &coord, participant.id, staff_input(other.id, "Ann", 0.0))
            .await;
        assert!(matches!(moved, Err(Error::Forbidden)));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_participant_hidden_from_coordinators() -> Result<()> {
        let db = setup_test_db().await?;
        let coordinator = create_test_coordinator(&db, "Meera").await?;
        let coord = identity(Role::Coordinator, Some(coordinator.id));
        let admin = identity(Role::Admin, None);

        assert!(matches!(
            delete_participant(&db, &coord, 77).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            delete_participant(&db, &admin, 77).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_paid_edit_appends_fee_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Hackathon").await?;
        let admin = identity(Role::Admin, None);
        let participant = register_participant(&db, staff_input(event.id, "Ann", 10.0)).await?;

        edit_participant(&db, &admin, participant.id, staff_input(event.id, "Ann", 10.0)).await?;
        edit_participant(&db, &admin, participant.id, staff_input(event.id, "Ann", 10.0)).await?;

        assert_eq!(income::participant_income(&db, participant.id).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_attendance_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Hackathon").await?;
        let admin = identity(Role::Admin, None);
        let created = signup_participant(&db, &credentials, signup(event.id, "Lee", 0.0)).await?;

        let present = set_attendance(&db, &admin, created.entity.id, AttendanceStatus::Present).await?;
        assert_eq!(present.attendance, AttendanceStatus::Present);

        delete_participant(&db, &admin, created.entity.id).await?;
        assert!(get_participant_by_id(&db, created.entity.id).await?.is_none());
        assert!(
            find_user_by_username(&db, &created.account.username)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_signup_events_timing() -> Result<()> {
        let db = setup_test_db().await?;
        let past = create_custom_event(&db, "Past", "2024-01-01", None).await?;
        let future = create_custom_event(&db, "Future", "2030-01-01", None).await?;
        create_test_participant(&db, past.id, "Ann").await?;
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let all = signup_events(&db, None, today).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event.id, future.id);
        assert_eq!(all[1].registered_count, 1);

        let upcoming = signup_events(&db, Some(EventTiming::Upcoming), today).await?;
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].timing, EventTiming::Upcoming);
        Ok(())
    }

    #[tokio::test]
    async fn test_participant_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Hackathon").await?;
        let participant = create_test_participant(&db, event.id, "Ann").await?;

        let dashboard = participant_dashboard(&db, participant.id).await?;
        assert_eq!(dashboard.registrations.len(), 1);
        assert_eq!(dashboard.registrations[0].event.name, "Hackathon");
        assert!(participant_dashboard(&db, 999).await?.registrations.is_empty());
        Ok(())
    }
}
