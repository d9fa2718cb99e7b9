//! Feedback document store implementations.
//!
//! Both implement [`crate::core::feedback::FeedbackDocuments`]. The in-memory
//! store backs tests and single-process demos; the SQL store keeps documents in
//! their own database, apart from the relational store.

mod memory;
mod sql;

pub use memory::MemoryDocuments;
pub use sql::SqlDocuments;
