//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod budget;
pub mod club;
pub mod coordinates;
pub mod event;
pub mod expenditure;
pub mod feedback_document;
pub mod feedback_mapping;
pub mod income;
pub mod member;
pub mod participant;
pub mod sponsor;
pub mod task;
pub mod user;

// Re-export specific types to avoid conflicts
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use club::{Column as ClubColumn, Entity as Club, Model as ClubModel};
pub use coordinates::{
    Column as CoordinatesColumn, Entity as Coordinates, Model as CoordinatesModel,
};
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use expenditure::{
    Column as ExpenditureColumn, Entity as Expenditure, Model as ExpenditureModel,
};
pub use feedback_document::{Entity as FeedbackDocument, Model as FeedbackDocumentModel};
pub use feedback_mapping::{
    Column as FeedbackMappingColumn, Entity as FeedbackMapping, Model as FeedbackMappingModel,
};
pub use income::{Column as IncomeColumn, Entity as Income, Model as IncomeModel, SourceType};
pub use member::{Column as MemberColumn, Entity as Member, MemberRole, Model as MemberModel};
pub use participant::{
    AttendanceStatus, Column as ParticipantColumn, Entity as Participant,
    Model as ParticipantModel, PayStatus,
};
pub use sponsor::{Column as SponsorColumn, Entity as Sponsor, Model as SponsorModel};
pub use task::{Column as TaskColumn, Entity as Task, Model as TaskModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
