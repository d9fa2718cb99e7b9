//! Database configuration module.
//!
//! Opens the pooled relational connection and creates every table from the entity
//! definitions using `Schema::create_table_from_entity`, so the schema always
//! matches the Rust structs without hand-written SQL.

use crate::config::settings::DatabaseSettings;
use crate::entities::{
    Budget, BudgetColumn, Club, Coordinates, Event, Expenditure, FeedbackMapping, Income, Member,
    Participant, Sponsor, Task, User,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Opens the relational connection pool.
///
/// The pool is bounded by `max_connections`; requests beyond that wait for a
/// free connection until `acquire_timeout_secs` elapses.
#[instrument(skip(settings), fields(max_connections = settings.max_connections))]
pub async fn create_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .sqlx_logging(false);

    debug!("Connecting to relational store");
    let db = Database::connect(options).await?;
    info!("Relational store connected");
    Ok(db)
}

pub(crate) async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all relational tables (if missing) in foreign-key order.
///
/// Also creates the unique `(event_id, category)` index on budgets that the
/// reports rely on.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Club).await?;
    create_table(db, &schema, Event).await?;
    create_table(db, &schema, Member).await?;
    create_table(db, &schema, Coordinates).await?;
    create_table(db, &schema, Budget).await?;
    create_table(db, &schema, Expenditure).await?;
    create_table(db, &schema, Income).await?;
    create_table(db, &schema, Sponsor).await?;
    create_table(db, &schema, Participant).await?;
    create_table(db, &schema, Task).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, FeedbackMapping).await?;

    let budget_category_index = Index::create()
        .name("idx_budgets_event_category")
        .table(Budget)
        .col(BudgetColumn::EventId)
        .col(BudgetColumn::Category)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&budget_category_index)).await?;

    debug!("Relational tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EventModel, UserModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<EventModel> = Event::find().limit(1).all(&db).await?;
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_connection_with_pool_settings() -> Result<()> {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        };
        let db = create_connection(&settings).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
