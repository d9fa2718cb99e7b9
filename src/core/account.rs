//! Account provisioning for role entities.
//!
//! Creating a member, coordinator, sponsor or participant also creates a login.
//! The entity row and the user row are written by separate statements, so a
//! failed login write is undone by replaying a [`Compensation`] list of deletes.

use crate::{
    core::credentials::{CredentialStore, NewUser},
    entities::{Member, Participant, Role, Sponsor},
    errors::{Error, Result},
};
use rand::Rng;
use sea_orm::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

/// Credentials handed back once, right after provisioning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedAccount {
    pub user_id: i64,
    pub username: String,
    /// Plain password; shown to the admin once and never stored
    pub password: String,
}

/// An entity row together with the login created for it.
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned<T> {
    pub entity: T,
    pub account: ProvisionedAccount,
}

/// One compensating delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoStep {
    DeleteMember(i64),
    DeleteSponsor(i64),
    DeleteParticipant(i64),
}

impl UndoStep {
    async fn run<C>(self, db: &C) -> std::result::Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        match self {
            Self::DeleteMember(id) => Member::delete_by_id(id).exec(db).await.map(|_| ()),
            Self::DeleteSponsor(id) => Sponsor::delete_by_id(id).exec(db).await.map(|_| ()),
            Self::DeleteParticipant(id) => {
                Participant::delete_by_id(id).exec(db).await.map(|_| ())
            }
        }
    }
}

/// Undo list of writes that must be reverted if a later step fails.
#[derive(Debug, Default)]
pub struct Compensation {
    steps: Vec<UndoStep>,
}

impl Compensation {
    /// Starts an empty undo list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step to run on failure.
    pub fn record(&mut self, step: UndoStep) {
        self.steps.push(step);
    }

    /// Runs every recorded step once, newest first.
    ///
    /// Failures are logged and do not stop the remaining steps.
    pub async fn run<C>(self, db: &C)
    where
        C: ConnectionTrait,
    {
        for step in self.steps.into_iter().rev() {
            match step.run(db).await {
                Ok(()) => info!(?step, "Compensating delete applied"),
                Err(e) => error!(?step, error = %e, "Compensating delete failed"),
            }
        }
    }
}

/// Login request for a freshly inserted role entity.
#[derive(Debug, Clone)]
pub struct AccountRequest<'a> {
    pub role: Role,
    pub linked_id: i64,
    pub display_name: &'a str,
    /// Appended to the username; participants use their id
    pub suffix: Option<i64>,
    /// Caller-chosen password; generated when `None`
    pub password: Option<String>,
}

/// Username prefix for generated accounts.
const fn username_prefix(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Coordinator => "coord",
        Role::Member => "member",
        Role::Sponsor => "sponsor",
        Role::Participant => "participant",
    }
}

/// Password prefix for generated accounts.
const fn password_prefix(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Coordinator => "Coord",
        Role::Member => "Member",
        Role::Sponsor => "Sponsor",
        Role::Participant => "Participant",
    }
}

/// Derives a username from a display name: role prefix, lower-cased name with
/// whitespace runs turned into underscores, and an optional numeric suffix.
///
/// `"Asha Rao"` as a member becomes `member_asha_rao`.
#[must_use]
pub fn generate_username(role: Role, display_name: &str, suffix: Option<i64>) -> String {
    let slug = display_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let prefix = username_prefix(role);
    match suffix {
        Some(suffix) => format!("{prefix}_{slug}_{suffix}"),
        None => format!("{prefix}_{slug}"),
    }
}

/// Generates a role-prefixed password with four random digits, e.g. `Coord@4821`.
#[must_use]
pub fn generate_password(role: Role) -> String {
    let digits: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{}@{digits}", password_prefix(role))
}

/// Creates the login for an entity row that was just inserted.
///
/// On failure the `undo` list is replayed and the original failure is reported
/// as [`Error::AccountProvisioning`].
pub async fn provision_account<C>(
    db: &C,
    credentials: &CredentialStore,
    request: AccountRequest<'_>,
    undo: Compensation,
) -> Result<ProvisionedAccount>
where
    C: ConnectionTrait,
{
    let username = generate_username(request.role, request.display_name, request.suffix);
    let password = request
        .password
        .unwrap_or_else(|| generate_password(request.role));

    let created = credentials
        .create_user(
            db,
            NewUser {
                username: username.clone(),
                password: password.clone(),
                role: request.role,
                linked_id: Some(request.linked_id),
                full_name: Some(request.display_name.to_string()),
            },
        )
        .await;

    match created {
        Ok(user_id) => Ok(ProvisionedAccount {
            user_id,
            username,
            password,
        }),
        Err(e) => {
            warn!(%username, error = %e, "Account creation failed, rolling back entity");
            undo.run(db).await;
            Err(Error::AccountProvisioning {
                message: e.to_string(),
            })
        }
    }
}
