/// Login provisioning and compensating deletes
pub mod account;
/// Feedback analysis over free-text comments and ratings
pub mod analysis;
/// Per-event budget allocations
pub mod budget;
/// Club CRUD
pub mod club;
/// Password hashing and user lookup
pub mod credentials;
/// Event CRUD and cascading delete
pub mod event;
/// Spending against budget categories
pub mod expenditure;
/// Feedback submission and retrieval through the document store
pub mod feedback;
/// Role and event-assignment checks
pub mod guard;
/// Income ledger
pub mod income;
/// Members, coordinators and event assignment
pub mod member;
/// Event registrations
pub mod participant;
/// Dashboards, analytics and event summaries
pub mod report;
/// Sponsors and their contributions
pub mod sponsor;
/// Event tasks
pub mod task;

/// Trims an optional string, mapping blank values to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
