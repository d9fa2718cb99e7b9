//! Report aggregation.
//!
//! Dashboards, the budget utilization report, organisation analytics and the
//! per-event summary used for exports. Per-event figures come from one grouped
//! query per table, merged in memory, so joining several child tables never
//! multiplies sums. Missing data yields zeros rather than errors.

use crate::{
    core::{
        analysis::{FeedbackAnalyzer, Sentiment, SentimentCounts},
        event::require_event,
        feedback::{self, FeedbackDocuments},
        guard,
    },
    entities::{
        AttendanceStatus, Budget, Coordinates, Event, EventModel, Expenditure, FeedbackMapping,
        Income, Member, Participant, Sponsor, Task, budget, coordinates, event, expenditure,
        feedback_mapping, income, member, participant, sponsor, task,
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Rows shown in the analytics turnout and budget tables.
const ANALYTICS_RECENT_EVENTS: usize = 10;
/// Comments quoted in an event summary.
const SAMPLE_COMMENTS: usize = 5;
/// Allowed drift between event totals and summed category totals.
const TOTALS_TOLERANCE: f64 = 0.001;

/// Per-event figures gathered from the child tables.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventTotals {
    pub participants: usize,
    /// Participants marked present
    pub attendees: usize,
    pub tasks: usize,
    pub budget: f64,
    pub spent: f64,
    pub feedback: usize,
}

fn to_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

/// Percentage of `budget` consumed by `spent`; zero without a budget.
#[must_use]
pub fn utilization_percent(spent: f64, budget: f64) -> f64 {
    if budget > 0.0 {
        spent / budget * 100.0
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Loads [`EventTotals`] for every event that has any child rows.
#[instrument(skip(db))]
pub async fn event_totals(db: &DatabaseConnection) -> Result<HashMap<i64, EventTotals>> {
    let mut totals: HashMap<i64, EventTotals> = HashMap::new();

    let attendance: Vec<(i64, AttendanceStatus, i64)> = Participant::find()
        .select_only()
        .column(participant::Column::EventId)
        .column(participant::Column::Attendance)
        .column_as(participant::Column::Id.count(), "n")
        .group_by(participant::Column::EventId)
        .group_by(participant::Column::Attendance)
        .into_tuple()
        .all(db)
        .await?;
    for (event_id, status, n) in attendance {
        let entry = totals.entry(event_id).or_default();
        entry.participants += to_count(n);
        if status == AttendanceStatus::Present {
            entry.attendees += to_count(n);
        }
    }

    let tasks: Vec<(i64, i64)> = Task::find()
        .select_only()
        .column(task::Column::EventId)
        .column_as(task::Column::Id.count(), "n")
        .group_by(task::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;
    for (event_id, n) in tasks {
        totals.entry(event_id).or_default().tasks = to_count(n);
    }

    let budgets: Vec<(i64, f64)> = Budget::find()
        .select_only()
        .column(budget::Column::EventId)
        .column_as(budget::Column::AllocatedAmount.sum(), "total")
        .group_by(budget::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;
    for (event_id, total) in budgets {
        totals.entry(event_id).or_default().budget = total;
    }

    let spending: Vec<(i64, f64)> = Expenditure::find()
        .select_only()
        .column(expenditure::Column::EventId)
        .column_as(expenditure::Column::Amount.sum(), "total")
        .group_by(expenditure::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;
    for (event_id, total) in spending {
        totals.entry(event_id).or_default().spent = total;
    }

    let feedback: Vec<(i64, i64)> = FeedbackMapping::find()
        .select_only()
        .column(feedback_mapping::Column::EventId)
        .column_as(feedback_mapping::Column::Id.count(), "n")
        .group_by(feedback_mapping::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;
    for (event_id, n) in feedback {
        totals.entry(event_id).or_default().feedback = to_count(n);
    }

    Ok(totals)
}

/// One event row on a dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOverview {
    #[serde(flatten)]
    pub event: EventModel,
    pub total_participants: usize,
    pub total_tasks: usize,
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_feedback: usize,
}

impl EventOverview {
    fn new(event: EventModel, totals: EventTotals) -> Self {
        Self {
            event,
            total_participants: totals.participants,
            total_tasks: totals.tasks,
            total_budget: totals.budget,
            total_spent: totals.spent,
            total_feedback: totals.feedback,
        }
    }
}

/// Admin dashboard: every event, newest first.
pub async fn admin_dashboard(db: &DatabaseConnection) -> Result<Vec<EventOverview>> {
    let totals = event_totals(db).await?;
    let events = Event::find()
        .order_by_desc(event::Column::EventDate)
        .all(db)
        .await?;
    Ok(events
        .into_iter()
        .map(|event| {
            let figures = totals.get(&event.id).copied().unwrap_or_default();
            EventOverview::new(event, figures)
        })
        .collect())
}

/// Coordinator dashboard: the member's assigned events, soonest first.
pub async fn coordinator_dashboard(
    db: &DatabaseConnection,
    member_id: i64,
) -> Result<Vec<EventOverview>> {
    let assigned = guard::assigned_event_ids(db, member_id).await?;
    if assigned.is_empty() {
        return Ok(Vec::new());
    }
    let totals = event_totals(db).await?;
    let events = Event::find()
        .filter(event::Column::Id.is_in(assigned))
        .order_by_asc(event::Column::EventDate)
        .all(db)
        .await?;
    Ok(events
        .into_iter()
        .map(|event| {
            let figures = totals.get(&event.id).copied().unwrap_or_default();
            EventOverview::new(event, figures)
        })
        .collect())
}

/// Spending in one budget category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUtilization {
    pub category: String,
    pub allocated: f64,
    pub spent: f64,
    pub remaining: f64,
}

/// Budget use of one event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUtilization {
    pub event_id: i64,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub total_budget: f64,
    pub total_spent: f64,
    pub remaining: f64,
    pub utilization_percent: f64,
    /// Ordered by category
    pub categories: Vec<CategoryUtilization>,
}

impl EventUtilization {
    /// Whether event totals agree with the summed categories.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        let allocated: f64 = self.categories.iter().map(|c| c.allocated).sum();
        let spent: f64 = self.categories.iter().map(|c| c.spent).sum();
        (self.total_budget - allocated).abs() <= TOTALS_TOLERANCE
            && (self.total_spent - spent).abs() <= TOTALS_TOLERANCE
    }
}

/// Budget utilization of every event, newest first.
///
/// Events whose totals disagree with their category breakdown are logged, not
/// rejected. That happens when money was spent in a category without a budget
/// row.
pub async fn budget_utilization(db: &DatabaseConnection) -> Result<Vec<EventUtilization>> {
    let totals = event_totals(db).await?;

    let spent_rows: Vec<(i64, String, f64)> = Expenditure::find()
        .select_only()
        .column(expenditure::Column::EventId)
        .column(expenditure::Column::Category)
        .column_as(expenditure::Column::Amount.sum(), "total")
        .group_by(expenditure::Column::EventId)
        .group_by(expenditure::Column::Category)
        .into_tuple()
        .all(db)
        .await?;
    let spent: HashMap<(i64, String), f64> = spent_rows
        .into_iter()
        .map(|(event_id, category, total)| ((event_id, category), total))
        .collect();

    let mut categories: HashMap<i64, Vec<CategoryUtilization>> = HashMap::new();
    for row in Budget::find()
        .order_by_asc(budget::Column::EventId)
        .order_by_asc(budget::Column::Category)
        .all(db)
        .await?
    {
        let used = spent
            .get(&(row.event_id, row.category.clone()))
            .copied()
            .unwrap_or(0.0);
        categories
            .entry(row.event_id)
            .or_default()
            .push(CategoryUtilization {
                remaining: row.allocated_amount - used,
                allocated: row.allocated_amount,
                spent: used,
                category: row.category,
            });
    }

    let events = Event::find()
        .order_by_desc(event::Column::EventDate)
        .all(db)
        .await?;
    let report: Vec<EventUtilization> = events
        .into_iter()
        .map(|event| {
            let figures = totals.get(&event.id).copied().unwrap_or_default();
            EventUtilization {
                total_budget: figures.budget,
                total_spent: figures.spent,
                remaining: figures.budget - figures.spent,
                utilization_percent: utilization_percent(figures.spent, figures.budget),
                categories: categories.remove(&event.id).unwrap_or_default(),
                event_id: event.id,
                event_name: event.name,
                event_date: event.event_date,
            }
        })
        .collect();

    for row in report.iter().filter(|row| !row.totals_consistent()) {
        warn!(
            event_id = row.event_id,
            event_name = %row.event_name,
            total_budget = row.total_budget,
            total_spent = row.total_spent,
            "Event totals differ from category breakdown"
        );
    }
    Ok(report)
}

/// Organisation-wide totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub total_registrations: usize,
    pub total_attendees: usize,
    pub total_income: f64,
    pub total_expenditure: f64,
    pub total_budget: f64,
    /// Income minus expenditure plus budget
    pub net_position: f64,
}

/// Registrations and attendance of one event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turnout {
    pub event_id: i64,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub venue: String,
    pub registration_count: usize,
    pub attendance_count: usize,
    /// Two decimals
    pub attendance_percentage: f64,
}

/// Budget against spending of one event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUse {
    pub event_id: i64,
    pub event_name: String,
    pub total_budget: f64,
    pub total_expenditure: f64,
    pub remaining_budget: f64,
    /// Two decimals
    pub budget_utilization_percent: f64,
}

/// Analytics page data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub summary: AnalyticsSummary,
    /// Most recent events only
    pub turnout: Vec<Turnout>,
    /// Most recent events only
    pub budget: Vec<BudgetUse>,
    /// Every event, newest first
    pub trend: Vec<Turnout>,
}

/// Builds the analytics page.
pub async fn analytics(db: &DatabaseConnection) -> Result<Analytics> {
    let totals = event_totals(db).await?;
    let events = Event::find()
        .order_by_desc(event::Column::EventDate)
        .all(db)
        .await?;

    let total_income: f64 = Income::find()
        .all(db)
        .await?
        .iter()
        .map(|row: &income::Model| row.amount)
        .sum();
    let figures: Vec<EventTotals> = totals.values().copied().collect();
    let total_budget: f64 = figures.iter().map(|t| t.budget).sum();
    let total_expenditure: f64 = figures.iter().map(|t| t.spent).sum();

    let summary = AnalyticsSummary {
        total_events: events.len(),
        total_registrations: figures.iter().map(|t| t.participants).sum(),
        total_attendees: figures.iter().map(|t| t.attendees).sum(),
        total_income,
        total_expenditure,
        total_budget,
        net_position: total_income - total_expenditure + total_budget,
    };
    debug!(?summary, "Analytics summary computed");

    let trend: Vec<Turnout> = events
        .iter()
        .map(|event| {
            let t = totals.get(&event.id).copied().unwrap_or_default();
            #[allow(clippy::cast_precision_loss)]
            let percentage = if t.participants > 0 {
                round2(t.attendees as f64 * 100.0 / t.participants as f64)
            } else {
                0.0
            };
            Turnout {
                event_id: event.id,
                event_name: event.name.clone(),
                event_date: event.event_date,
                venue: event.venue.clone(),
                registration_count: t.participants,
                attendance_count: t.attendees,
                attendance_percentage: percentage,
            }
        })
        .collect();

    let budget = events
        .iter()
        .take(ANALYTICS_RECENT_EVENTS)
        .map(|event| {
            let t = totals.get(&event.id).copied().unwrap_or_default();
            BudgetUse {
                event_id: event.id,
                event_name: event.name.clone(),
                total_budget: t.budget,
                total_expenditure: t.spent,
                remaining_budget: t.budget - t.spent,
                budget_utilization_percent: round2(utilization_percent(t.spent, t.budget)),
            }
        })
        .collect();

    Ok(Analytics {
        summary,
        turnout: trend.iter().take(ANALYTICS_RECENT_EVENTS).cloned().collect(),
        budget,
        trend,
    })
}

/// Attendance counts of one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceBreakdown {
    pub pending: usize,
    pub present: usize,
    pub absent: usize,
}

/// Contact details of a coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A category amount.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

/// A sponsor and its pledge.
#[derive(Debug, Clone, Serialize)]
pub struct SponsorContribution {
    pub name: String,
    pub contribution: f64,
}

/// A quoted comment.
#[derive(Debug, Clone, Serialize)]
pub struct SampleComment {
    pub rating: i32,
    pub text: String,
}

/// Everything the event export shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub event: EventModel,
    pub total_participants: usize,
    pub attendance: AttendanceBreakdown,
    pub total_budget: f64,
    pub total_spent: f64,
    pub utilization_percent: f64,
    /// Allocations by category
    pub budget_details: Vec<CategoryAmount>,
    /// Spending by category
    pub expenditure_details: Vec<CategoryAmount>,
    pub coordinators: Vec<Contact>,
    pub sponsors: Vec<SponsorContribution>,
    /// Mapping rows, including ones whose documents are gone
    pub total_feedback: usize,
    /// Count of ratings 1 through 5
    pub rating_distribution: [usize; 5],
    pub sentiments: SentimentCounts,
    pub sample_comments: Vec<SampleComment>,
}

/// Gathers the export payload of one event.
///
/// A failing document store degrades to an empty feedback section.
#[instrument(skip(db, documents))]
pub async fn event_summary(
    db: &DatabaseConnection,
    documents: &dyn FeedbackDocuments,
    event_id: i64,
) -> Result<EventSummary> {
    let event = require_event(db, event_id).await?;

    let participants = Participant::find()
        .filter(participant::Column::EventId.eq(event_id))
        .all(db)
        .await?;
    let mut attendance = AttendanceBreakdown::default();
    for p in &participants {
        match p.attendance {
            AttendanceStatus::Pending => attendance.pending += 1,
            AttendanceStatus::Present => attendance.present += 1,
            AttendanceStatus::Absent => attendance.absent += 1,
        }
    }

    let budget_details: Vec<CategoryAmount> = Budget::find()
        .filter(budget::Column::EventId.eq(event_id))
        .order_by_asc(budget::Column::Category)
        .all(db)
        .await?
        .into_iter()
        .map(|b| CategoryAmount {
            category: b.category,
            amount: b.allocated_amount,
        })
        .collect();

    let expenditure_rows: Vec<(String, f64)> = Expenditure::find()
        .select_only()
        .column(expenditure::Column::Category)
        .column_as(expenditure::Column::Amount.sum(), "total")
        .filter(expenditure::Column::EventId.eq(event_id))
        .group_by(expenditure::Column::Category)
        .order_by_asc(expenditure::Column::Category)
        .into_tuple()
        .all(db)
        .await?;
    let expenditure_details: Vec<CategoryAmount> = expenditure_rows
        .into_iter()
        .map(|(category, amount)| CategoryAmount { category, amount })
        .collect();

    let total_budget: f64 = budget_details.iter().map(|b| b.amount).sum();
    let total_spent: f64 = expenditure_details.iter().map(|e| e.amount).sum();

    let coordinators = Coordinates::find()
        .filter(coordinates::Column::EventId.eq(event_id))
        .find_also_related(Member)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(_, m): (_, Option<member::Model>)| m)
        .map(|m| Contact {
            name: m.name,
            email: m.email,
            phone: m.phone,
        })
        .collect();

    let sponsors = Sponsor::find()
        .filter(sponsor::Column::EventId.eq(event_id))
        .order_by_asc(sponsor::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|s| SponsorContribution {
            name: s.name,
            contribution: s.contribution,
        })
        .collect();

    let mappings = FeedbackMapping::find()
        .filter(feedback_mapping::Column::EventId.eq(event_id))
        .count(db)
        .await?;
    let total_feedback = usize::try_from(mappings).unwrap_or(usize::MAX);
    let docs = match feedback::fetch_feedback_for_event(db, documents, event_id).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!(event_id, error = %e, "Feedback unavailable for event summary");
            Vec::new()
        }
    };

    let analyzer = FeedbackAnalyzer::new();
    let mut rating_distribution = [0usize; 5];
    let mut sentiments = SentimentCounts::default();
    for doc in &docs {
        if let Some(slot) = usize::try_from(doc.rating - 1)
            .ok()
            .and_then(|i| rating_distribution.get_mut(i))
        {
            *slot += 1;
        }
        match analyzer.sentiment(doc) {
            Sentiment::Positive => sentiments.positive += 1,
            Sentiment::Negative => sentiments.negative += 1,
            Sentiment::Neutral => sentiments.neutral += 1,
        }
    }
    let sample_comments = docs
        .iter()
        .filter_map(|doc| {
            let text = doc.comment.as_deref()?.trim();
            (!text.is_empty()).then(|| SampleComment {
                rating: doc.rating,
                text: text.to_string(),
            })
        })
        .take(SAMPLE_COMMENTS)
        .collect();

    Ok(EventSummary {
        event,
        total_participants: participants.len(),
        attendance,
        total_budget,
        total_spent,
        utilization_percent: utilization_percent(total_spent, total_budget),
        budget_details,
        expenditure_details,
        coordinators,
        sponsors,
        total_feedback,
        rating_distribution,
        sentiments,
        sample_comments,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        feedback::{NewFeedback, submit_feedback},
        member,
    };
    use crate::documents::MemoryDocuments;
    use crate::entities::SourceType;
    use crate::test_utils::*;
    use sea_orm::Set;

    async fn mark_present(db: &DatabaseConnection, participant: participant::Model) -> Result<()> {
        let mut active: participant::ActiveModel = participant.into();
        active.attendance = Set(AttendanceStatus::Present);
        active.update(db).await?;
        Ok(())
    }

    #[test]
    fn test_utilization_percent() {
        assert!((utilization_percent(50.0, 200.0) - 25.0).abs() < f64::EPSILON);
        assert!(utilization_percent(50.0, 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_totals_do_not_fan_out() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        create_test_budget(&db, event.id, "Food", 300.0).await?;
        create_test_budget(&db, event.id, "Venue", 700.0).await?;
        create_test_expenditure(&db, event.id, "Food", 100.0).await?;
        create_test_expenditure(&db, event.id, "Food", 50.0).await?;
        create_test_expenditure(&db, event.id, "Venue", 25.0).await?;
        create_test_participant(&db, event.id, "Ann").await?;
        create_test_participant(&db, event.id, "Bob").await?;
        create_test_task(&db, event.id, "Posters", None).await?;

        let totals = event_totals(&db).await?;
        let figures = totals[&event.id];
        assert_eq!(figures.participants, 2);
        assert_eq!(figures.tasks, 1);
        assert!((figures.budget - 1000.0).abs() < 1e-9);
        assert!((figures.spent - 175.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboards() -> Result<()> {
        let db = setup_test_db().await?;
        let older = create_custom_event(&db, "Older", "2024-02-01", None).await?;
        let newer = create_custom_event(&db, "Newer", "2025-02-01", None).await?;
        let empty = create_custom_event(&db, "Empty", "2023-02-01", None).await?;
        create_test_budget(&db, older.id, "Food", 100.0).await?;
        create_test_participant(&db, newer.id, "Ann").await?;

        let admin = admin_dashboard(&db).await?;
        let ids: Vec<_> = admin.iter().map(|row| row.event.id).collect();
        assert_eq!(ids, [newer.id, older.id, empty.id]);
        assert_eq!(admin[0].total_participants, 1);
        assert!((admin[1].total_budget - 100.0).abs() < 1e-9);
        assert!(admin[2].total_budget.abs() < f64::EPSILON);

        let coordinator = create_test_coordinator(&db, "Meera").await?;
        member::assign_coordinator(&db, coordinator.id, newer.id).await?;
        member::assign_coordinator(&db, coordinator.id, older.id).await?;
        let own = coordinator_dashboard(&db, coordinator.id).await?;
        let ids: Vec<_> = own.iter().map(|row| row.event.id).collect();
        assert_eq!(ids, [older.id, newer.id]);

        assert!(coordinator_dashboard(&db, 999).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_utilization_flags_unbudgeted_spending() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        create_test_budget(&db, event.id, "Food", 200.0).await?;
        create_test_expenditure(&db, event.id, "Food", 50.0).await?;

        let report = budget_utilization(&db).await?;
        let row = &report[0];
        assert!((row.utilization_percent - 25.0).abs() < 1e-9);
        assert!((row.remaining - 150.0).abs() < 1e-9);
        assert_eq!(row.categories.len(), 1);
        assert!(row.totals_consistent());

        create_test_expenditure(&db, event.id, "Fireworks", 30.0).await?;
        let report = budget_utilization(&db).await?;
        assert!(!report[0].totals_consistent());
        Ok(())
    }

    #[tokio::test]
    async fn test_analytics_summary_and_turnout() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Fest").await?;
        create_test_budget(&db, event.id, "Food", 500.0).await?;
        create_test_expenditure(&db, event.id, "Food", 200.0).await?;
        let ann = create_test_participant(&db, event.id, "Ann").await?;
        create_test_participant(&db, event.id, "Bob").await?;
        create_test_participant(&db, event.id, "Cy").await?;
        mark_present(&db, ann).await?;

        crate::core::income::create_income(
            &db,
            crate::core::income::IncomeInput {
                event_id: Some(event.id),
                source_type: SourceType::Other,
                source_id: None,
                category: None,
                amount: 120.0,
                income_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                description: None,
            },
        )
        .await?;

        let result = analytics(&db).await?;
        assert_eq!(result.summary.total_events, 1);
        assert_eq!(result.summary.total_registrations, 3);
        assert_eq!(result.summary.total_attendees, 1);
        assert!((result.summary.net_position - (120.0 - 200.0 + 500.0)).abs() < 1e-9);
        assert!((result.turnout[0].attendance_percentage - 33.33).abs() < 1e-9);
        assert!((result.budget[0].budget_utilization_percent - 40.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_analytics_limits_recent_tables() -> Result<()> {
        let db = setup_test_db().await?;
        for day in 1..=12 {
            create_custom_event(&db, &format!("E{day}"), &format!("2025-01-{day:02}"), None)
                .await?;
        }
        let result = analytics(&db).await?;
        assert_eq!(result.turnout.len(), ANALYTICS_RECENT_EVENTS);
        assert_eq!(result.budget.len(), ANALYTICS_RECENT_EVENTS);
        assert_eq!(result.trend.len(), 12);
        assert_eq!(result.trend[0].event_name, "E12");
        Ok(())
    }

    #[tokio::test]
    async fn test_event_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let documents = MemoryDocuments::default();
        let event = create_test_event(&db, "Fest").await?;
        create_test_budget(&db, event.id, "Food", 400.0).await?;
        create_test_expenditure(&db, event.id, "Food", 100.0).await?;
        create_test_sponsor(&db, event.id, "Acme", 150.0).await?;
        let coordinator = create_test_coordinator(&db, "Meera").await?;
        member::assign_coordinator(&db, coordinator.id, event.id).await?;
        let ann = create_test_participant(&db, event.id, "Ann").await?;
        let bob = create_test_participant(&db, event.id, "Bob").await?;
        mark_present(&db, bob.clone()).await?;

        for (participant_id, rating, comment) in
            [(ann.id, 5, Some("loved it")), (bob.id, 2, None)]
        {
            submit_feedback(
                &db,
                &documents,
                NewFeedback {
                    event_id: event.id,
                    participant_id,
                    rating,
                    comment: comment.map(str::to_string),
                    suggestions: Vec::new(),
                },
            )
            .await?;
        }

        let summary = event_summary(&db, &documents, event.id).await?;
        assert_eq!(summary.total_participants, 2);
        assert_eq!(summary.attendance.present, 1);
        assert_eq!(summary.attendance.pending, 1);
        assert!((summary.utilization_percent - 25.0).abs() < 1e-9);
        assert_eq!(summary.coordinators[0].name, "Meera");
        assert_eq!(summary.sponsors[0].name, "Acme");
        assert_eq!(summary.total_feedback, 2);
        assert_eq!(summary.rating_distribution, [0, 1, 0, 0, 1]);
        assert_eq!(summary.sentiments.positive, 1);
        assert_eq!(summary.sentiments.negative, 1);
        assert_eq!(summary.sample_comments.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_event_summary_missing_event() -> Result<()> {
        let db = setup_test_db().await?;
        let documents = MemoryDocuments::default();
        assert!(matches!(
            event_summary(&db, &documents, 5).await,
            Err(crate::errors::Error::NotFound { .. })
        ));
        Ok(())
    }
}
