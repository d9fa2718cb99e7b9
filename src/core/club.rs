//! Club business logic.

use crate::{
    entities::{Club, club},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Mutable club fields, supplied in full on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ClubInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Club name is required"));
        }
        Ok(Self {
            name,
            description: self.description.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Lists all clubs ordered by name.
pub async fn list_clubs(db: &DatabaseConnection) -> Result<Vec<club::Model>> {
    Club::find()
        .order_by_asc(club::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a club by id.
pub async fn get_club_by_id(db: &DatabaseConnection, club_id: i64) -> Result<Option<club::Model>> {
    Club::find_by_id(club_id).one(db).await.map_err(Into::into)
}

/// Creates a club.
#[instrument(skip(db, input))]
pub async fn create_club(db: &DatabaseConnection, input: ClubInput) -> Result<club::Model> {
    let input = input.validated()?;
    let club = club::ActiveModel {
        name: Set(input.name),
        description: Set(input.description),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(club_id = club.id, "Club created");
    Ok(club)
}

/// Replaces every mutable field of a club.
#[instrument(skip(db, input))]
pub async fn update_club(
    db: &DatabaseConnection,
    club_id: i64,
    input: ClubInput,
) -> Result<club::Model> {
    let input = input.validated()?;
    let existing = get_club_by_id(db, club_id)
        .await?
        .ok_or_else(|| Error::not_found("club", club_id))?;

    let mut active: club::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.description = Set(input.description);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a club. Events or members still referencing it make this a
/// constraint error.
#[instrument(skip(db))]
pub async fn delete_club(db: &DatabaseConnection, club_id: i64) -> Result<()> {
    let result = Club::delete_by_id(club_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("club", club_id));
    }
    info!(club_id, "Club deleted");
    Ok(())
}
