//! Member and coordinator business logic.
//!
//! Coordinators are members flagged with [`MemberRole::Coordinator`] and linked to
//! the events they manage through the `coordinates` table. Both kinds get a login
//! when created.

use crate::{
    core::{
        account::{self, AccountRequest, Compensation, Provisioned, UndoStep},
        credentials::CredentialStore,
        non_blank,
    },
    entities::{
        Club, Coordinates, Member, MemberRole, Role, Task, User, coordinates, member, task, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, Set, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

/// Mutable member fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub club_id: Option<i64>,
}

impl MemberInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Member name is required"));
        }
        Ok(Self {
            name,
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            club_id: self.club_id,
        })
    }
}

#[cfg(test)]
impl MemberInput {
    /// Input with only a name set.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            email: None,
            phone: None,
            club_id: None,
        }
    }
}

/// A coordinator with club name and assigned events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSummary {
    #[serde(flatten)]
    pub member: member::Model,
    pub club_name: Option<String>,
    pub event_count: usize,
    pub event_ids: Vec<i64>,
}

/// A member involved in an event, with the number of its tasks they hold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMember {
    #[serde(flatten)]
    pub member: member::Model,
    pub task_count: usize,
    pub is_coordinator: bool,
}

/// Finds a member by id.
pub async fn get_member_by_id<C>(db: &C, member_id: i64) -> Result<Option<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find_by_id(member_id).one(db).await.map_err(Into::into)
}

/// Lists regular members (not coordinators) ordered by name.
pub async fn list_members(db: &DatabaseConnection) -> Result<Vec<member::Model>> {
    Member::find()
        .filter(member::Column::Role.eq(MemberRole::Member))
        .order_by_asc(member::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists coordinators ordered by name, with their club and event assignments.
pub async fn list_coordinators(db: &DatabaseConnection) -> Result<Vec<CoordinatorSummary>> {
    let coordinators = Member::find()
        .filter(member::Column::Role.eq(MemberRole::Coordinator))
        .order_by_asc(member::Column::Name)
        .all(db)
        .await?;

    let clubs: HashMap<i64, String> = Club::find()
        .all(db)
        .await?
        .into_iter()
        .map(|club| (club.id, club.name))
        .collect();

    let mut assignments: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for row in Coordinates::find()
        .order_by_asc(coordinates::Column::EventId)
        .all(db)
        .await?
    {
        assignments.entry(row.member_id).or_default().push(row.event_id);
    }

    Ok(coordinators
        .into_iter()
        .map(|member| {
            let event_ids = assignments.remove(&member.id).unwrap_or_default();
            CoordinatorSummary {
                club_name: member.club_id.and_then(|id| clubs.get(&id).cloned()),
                event_count: event_ids.len(),
                event_ids,
                member,
            }
        })
        .collect())
}

async fn insert_member<C>(db: &C, input: MemberInput, role: MemberRole) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    let input = input.validated()?;
    member::ActiveModel {
        name: Set(input.name),
        email: Set(input.email),
        phone: Set(input.phone),
        club_id: Set(input.club_id),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn create_with_account(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    input: MemberInput,
    member_role: MemberRole,
    login_role: Role,
) -> Result<Provisioned<member::Model>> {
    let member = insert_member(db, input, member_role).await?;

    let mut undo = Compensation::new();
    undo.record(UndoStep::DeleteMember(member.id));

    let account = account::provision_account(
        db,
        credentials,
        AccountRequest {
            role: login_role,
            linked_id: member.id,
            display_name: &member.name,
            suffix: None,
            password: None,
        },
        undo,
    )
    .await?;

    info!(member_id = member.id, username = %account.username, "Member provisioned");
    Ok(Provisioned {
        entity: member,
        account,
    })
}

/// Creates a regular member and its `member_` login.
#[instrument(skip(db, credentials, input), fields(name = %input.name))]
pub async fn create_member(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    input: MemberInput,
) -> Result<Provisioned<member::Model>> {
    create_with_account(db, credentials, input, MemberRole::Member, Role::Member).await
}

/// Creates a coordinator and its `coord_` login.
#[instrument(skip(db, credentials, input), fields(name = %input.name))]
pub async fn create_coordinator(
    db: &DatabaseConnection,
    credentials: &CredentialStore,
    input: MemberInput,
) -> Result<Provisioned<member::Model>> {
    create_with_account(
        db,
        credentials,
        input,
        MemberRole::Coordinator,
        Role::Coordinator,
    )
    .await
}

/// Assigns a coordinator to an event. Assigning twice is a no-op.
#[instrument(skip(db))]
pub async fn assign_coordinator<C>(db: &C, member_id: i64, event_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Coordinates::insert(coordinates::ActiveModel {
        event_id: Set(event_id),
        member_id: Set(member_id),
    })
    .on_conflict(
        OnConflict::columns([coordinates::Column::EventId, coordinates::Column::MemberId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Removes a coordinator from an event.
#[instrument(skip(db))]
pub async fn unassign_coordinator(
    db: &DatabaseConnection,
    member_id: i64,
    event_id: i64,
) -> Result<()> {
    Coordinates::delete_by_id((event_id, member_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes a member or coordinator.
///
/// Event assignments go first, then the member row, then its login. Tasks still
/// assigned to the member make this a constraint error and nothing is removed.
#[instrument(skip(db))]
pub async fn delete_member(db: &DatabaseConnection, member_id: i64) -> Result<()> {
    let existing = get_member_by_id(db, member_id)
        .await?
        .ok_or_else(|| Error::not_found("member", member_id))?;

    let login_role = match existing.role {
        MemberRole::Member => Role::Member,
        MemberRole::Coordinator => Role::Coordinator,
    };

    let txn = db.begin().await?;
    Coordinates::delete_many()
        .filter(coordinates::Column::MemberId.eq(member_id))
        .exec(&txn)
        .await?;
    Member::delete_by_id(member_id).exec(&txn).await?;
    User::delete_many()
        .filter(user::Column::Role.eq(login_role))
        .filter(user::Column::LinkedId.eq(member_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(member_id, "Member deleted");
    Ok(())
}

/// Members involved in an event: everyone holding one of its tasks, plus the
/// event's coordinators. Ordered by name.
pub async fn event_members(db: &DatabaseConnection, event_id: i64) -> Result<Vec<EventMember>> {
    let mut task_counts: HashMap<i64, usize> = HashMap::new();
    for task in Task::find()
        .filter(task::Column::EventId.eq(event_id))
        .all(db)
        .await?
    {
        if let Some(member_id) = task.assigned_to {
            *task_counts.entry(member_id).or_default() += 1;
        }
    }

    let coordinator_ids: Vec<i64> = Coordinates::find()
        .filter(coordinates::Column::EventId.eq(event_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.member_id)
        .collect();

    let ids: Vec<i64> = task_counts
        .keys()
        .copied()
        .chain(coordinator_ids.iter().copied())
        .collect();

    let members = Member::find()
        .filter(member::Column::Id.is_in(ids))
        .order_by_asc(member::Column::Name)
        .all(db)
        .await?;

    Ok(members
        .into_iter()
        .map(|member| EventMember {
            task_count: task_counts.get(&member.id).copied().unwrap_or(0),
            is_coordinator: coordinator_ids.contains(&member.id),
            member,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::credentials::find_user_by_username;
    use crate::core::guard::is_assigned;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_member_provisions_login() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();

        let created = create_member(&db, &credentials, MemberInput::named("Asha Rao")).await?;
        assert_eq!(created.account.username, "member_asha_rao");
        assert!(created.account.password.starts_with("Member@"));

        let user = find_user_by_username(&db, "member_asha_rao").await?.unwrap();
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.linked_id, Some(created.entity.id));
        assert_eq!(user.full_name.as_deref(), Some("Asha Rao"));
        assert!(credentials.verify_password(&created.account.password, &user.password_hash));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_member_requires_name() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_member(&db, &test_credentials(), MemberInput::named("   ")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_coordinator_assignment_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Fest").await?;
        let other = create_test_event(&db, "Fair").await?;

        let coord = create_coordinator(&db, &credentials, MemberInput::named("Ravi Kumar")).await?;
        assert_eq!(coord.account.username, "coord_ravi_kumar");
        assert_eq!(coord.entity.role, MemberRole::Coordinator);

        assign_coordinator(&db, coord.entity.id, event.id).await?;
        assign_coordinator(&db, coord.entity.id, event.id).await?;
        assign_coordinator(&db, coord.entity.id, other.id).await?;

        let summaries = list_coordinators(&db).await?;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].event_count, 2);

        unassign_coordinator(&db, coord.entity.id, other.id).await?;
        assert!(!is_assigned(&db, coord.entity.id, other.id).await?);
        assert!(is_assigned(&db, coord.entity.id, event.id).await?);

        // Coordinators are not listed as regular members.
        assert!(list_members(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_to_missing_event_is_constraint_error() -> Result<()> {
        let db = setup_test_db().await?;
        let coord = create_test_coordinator(&db, "Nila").await?;
        let result = assign_coordinator(&db, coord.id, 999).await;
        assert!(matches!(result, Err(Error::Constraint { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_coordinator_removes_assignments_and_login() -> Result<()> {
        let db = setup_test_db().await?;
        let credentials = test_credentials();
        let event = create_test_event(&db, "Fest").await?;
        let coord = create_coordinator(&db, &credentials, MemberInput::named("Ravi")).await?;
        assign_coordinator(&db, coord.entity.id, event.id).await?;

        delete_member(&db, coord.entity.id).await?;

        assert!(get_member_by_id(&db, coord.entity.id).await?.is_none());
        assert!(!is_assigned(&db, coord.entity.id, event.id).await?);
        assert!(find_user_by_username(&db, "coord_ravi").await?.is_none());

        // The name can be reused afterwards.
        create_coordinator(&db, &credentials, MemberInput::named("Ravi")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_member_with_tasks_is_constraint_error() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let member = create_test_member(&db, "Tara").await?;
        create_test_task(&db, event.id, "Posters", Some(member.id)).await?;

        let result = delete_member(&db, member.id).await;
        assert!(matches!(result, Err(Error::Constraint { .. })));
        assert!(get_member_by_id(&db, member.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_event_members_combines_tasks_and_coordinators() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let coord = create_test_coordinator(&db, "Anil").await?;
        let worker = create_test_member(&db, "Bea").await?;
        let idle = create_test_member(&db, "Cal").await?;
        assign_coordinator(&db, coord.id, event.id).await?;
        create_test_task(&db, event.id, "Chairs", Some(worker.id)).await?;
        create_test_task(&db, event.id, "Tables", Some(worker.id)).await?;

        let members = event_members(&db, event.id).await?;
        let view: Vec<_> = members
            .iter()
            .map(|m| (m.member.name.as_str(), m.task_count, m.is_coordinator))
            .collect();
        assert_eq!(view, [("Anil", 0, true), ("Bea", 2, false)]);
        assert!(members.iter().all(|m| m.member.id != idle.id));
        Ok(())
    }
}
