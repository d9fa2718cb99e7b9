//! Task business logic.
//!
//! Coordinators manage the tasks of their events; members only see and update
//! the status of tasks assigned to them.

use crate::{
    core::{member::get_member_by_id, non_blank},
    entities::{Event, Member, MemberModel, Task, member, task},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Mutable task fields, supplied in full on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    /// Ignored on create; new tasks are always pending
    #[serde(default)]
    pub status: Option<String>,
}

impl TaskInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Task name is required"));
        }
        Ok(Self {
            name,
            description: non_blank(self.description),
            status: non_blank(self.status),
            ..self
        })
    }
}

/// A task of an event with its assignee's name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTask {
    #[serde(flatten)]
    pub task: task::Model,
    pub assignee_name: Option<String>,
}

/// A task assigned to a member, with where and when it happens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTask {
    #[serde(flatten)]
    pub task: task::Model,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub venue: String,
}

/// Member landing page data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTasks {
    pub member: Option<MemberModel>,
    /// Ordered by deadline
    pub tasks: Vec<MemberTask>,
}

/// Lists an event's tasks by deadline with assignee names.
pub async fn list_event_tasks(db: &DatabaseConnection, event_id: i64) -> Result<Vec<EventTask>> {
    let rows = Task::find()
        .filter(task::Column::EventId.eq(event_id))
        .find_also_related(Member)
        .order_by_asc(task::Column::Deadline)
        .order_by_asc(task::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(task, assignee)| EventTask {
            task,
            assignee_name: assignee.map(|m: member::Model| m.name),
        })
        .collect())
}

async fn find_event_task(
    db: &DatabaseConnection,
    event_id: i64,
    task_id: i64,
) -> Result<task::Model> {
    Task::find_by_id(task_id)
        .filter(task::Column::EventId.eq(event_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("task", task_id))
}

/// Creates a pending task for an event.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_task(
    db: &DatabaseConnection,
    event_id: i64,
    input: TaskInput,
) -> Result<task::Model> {
    let input = input.validated()?;
    let task = task::ActiveModel {
        event_id: Set(event_id),
        name: Set(input.name),
        description: Set(input.description),
        deadline: Set(input.deadline),
        assigned_to: Set(input.assigned_to),
        status: Set(task::STATUS_PENDING.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(task_id = task.id, event_id, "Task created");
    Ok(task)
}

/// Replaces a task of an event. A missing status keeps the current one.
#[instrument(skip(db, input))]
pub async fn update_task(
    db: &DatabaseConnection,
    event_id: i64,
    task_id: i64,
    input: TaskInput,
) -> Result<task::Model> {
    let input = input.validated()?;
    let existing = find_event_task(db, event_id, task_id).await?;

    let mut active: task::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.description = Set(input.description);
    active.deadline = Set(input.deadline);
    active.assigned_to = Set(input.assigned_to);
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes a task of an event.
#[instrument(skip(db))]
pub async fn delete_task(db: &DatabaseConnection, event_id: i64, task_id: i64) -> Result<()> {
    let result = Task::delete_many()
        .filter(task::Column::Id.eq(task_id))
        .filter(task::Column::EventId.eq(event_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("task", task_id));
    }
    Ok(())
}

/// Tasks assigned to a member, by deadline, with their events.
pub async fn member_tasks(db: &DatabaseConnection, member_id: i64) -> Result<MemberTasks> {
    let rows = Task::find()
        .filter(task::Column::AssignedTo.eq(member_id))
        .find_also_related(Event)
        .order_by_asc(task::Column::Deadline)
        .order_by_asc(task::Column::Id)
        .all(db)
        .await?;

    let tasks = rows
        .into_iter()
        .filter_map(|(task, event)| {
            event.map(|event| MemberTask {
                task,
                event_name: event.name,
                event_date: event.event_date,
                venue: event.venue,
            })
        })
        .collect();

    Ok(MemberTasks {
        member: get_member_by_id(db, member_id).await?,
        tasks,
    })
}

/// Sets the status of a task on behalf of the member it is assigned to.
///
/// # Errors
/// [`Error::Forbidden`] when the task is missing or assigned to someone else.
#[instrument(skip(db))]
pub async fn update_task_status_as_member(
    db: &DatabaseConnection,
    member_id: i64,
    task_id: i64,
    status: &str,
) -> Result<task::Model> {
    let status = status.trim();
    if status.is_empty() {
        return Err(Error::validation("Status is required"));
    }
    let task = Task::find_by_id(task_id)
        .one(db)
        .await?
        .filter(|t| t.assigned_to == Some(member_id))
        .ok_or_else(|| {
            debug!(member_id, task_id, "Task not assigned to member");
            Error::Forbidden
        })?;

    let mut active: task::ActiveModel = task.into();
    active.status = Set(status.to_string());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn input(name: &str, day: Option<u32>, assigned_to: Option<i64>) -> TaskInput {
        TaskInput {
            name: name.to_string(),
            description: None,
            deadline: day.map(|d| NaiveDate::from_ymd_opt(2025, 7, d).unwrap()),
            assigned_to,
            status: Some("Done".to_string()),
        }
    }

    #[tokio::test]
    async fn test_task_crud_in_event() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let member = create_test_member(&db, "Ravi").await?;

        let late = create_task(&db, event.id, input("Cleanup", Some(20), None)).await?;
        let early = create_task(&db, event.id, input("Posters", Some(2), Some(member.id))).await?;
        assert_eq!(early.status, task::STATUS_PENDING);

        let listed = list_event_tasks(&db, event.id).await?;
        assert_eq!(listed[0].task.id, early.id);
        assert_eq!(listed[0].assignee_name.as_deref(), Some("Ravi"));
        assert_eq!(listed[1].task.id, late.id);

        let updated = update_task(&db, event.id, late.id, input("Clean up", Some(21), None)).await?;
        assert_eq!(updated.status, "Done");

        delete_task(&db, event.id, late.id).await?;
        assert_eq!(list_event_tasks(&db, event.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_scoped_to_event() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let other = create_test_event(&db, "Fair").await?;
        let task = create_task(&db, event.id, input("Posters", None, None)).await?;

        assert!(matches!(
            update_task(&db, other.id, task.id, input("X", None, None)).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            delete_task(&db, other.id, task.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_member_updates_only_own_tasks() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        let ravi = create_test_member(&db, "Ravi").await?;
        let sita = create_test_member(&db, "Sita").await?;
        let own = create_test_task(&db, event.id, "Posters", Some(ravi.id)).await?;
        let theirs = create_test_task(&db, event.id, "Chairs", Some(sita.id)).await?;

        let done = update_task_status_as_member(&db, ravi.id, own.id, "Completed").await?;
        assert_eq!(done.status, "Completed");

        assert!(matches!(
            update_task_status_as_member(&db, ravi.id, theirs.id, "Completed").await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            update_task_status_as_member(&db, ravi.id, 999, "Completed").await,
            Err(Error::Forbidden)
        ));

        let view = member_tasks(&db, ravi.id).await?;
        assert_eq!(view.member.unwrap().name, "Ravi");
        assert_eq!(view.tasks.len(), 1);
        assert_eq!(view.tasks[0].event_name, "Fest");
        Ok(())
    }
}
