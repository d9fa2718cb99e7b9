//! Authorization guard - decides whether a caller may perform an operation.
//!
//! A request moves through `Unauthenticated -> Authenticated(role) ->
//! Authorized(scope) | Denied`. Role checks are exhaustive matches over [`Role`];
//! event-scoped checks for coordinators consult the `coordinates` table. Admins
//! bypass event scoping.
//!
//! Denials never reveal whether the target resource exists: an unassigned
//! coordinator gets [`Error::Forbidden`] for a missing event as well.

use crate::{
    entities::{Coordinates, Role, coordinates, user},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::debug;

impl Role {
    /// Every role, in display order.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Coordinator,
        Self::Member,
        Self::Sponsor,
        Self::Participant,
    ];

    /// Lower-case wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Coordinator => "coordinator",
            Self::Member => "member",
            Self::Sponsor => "sponsor",
            Self::Participant => "participant",
        }
    }

    /// Landing page after login.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin/dashboard",
            Self::Coordinator => "/coordinator/dashboard",
            Self::Member => "/members/dashboard",
            Self::Sponsor => "/sponsors/dashboard",
            Self::Participant => "/participants/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::validation(format!("Unknown role: {wanted}")))
    }
}

/// The authenticated caller, as carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    /// Member, sponsor or participant id; `None` for admins
    pub linked_id: Option<i64>,
    pub display_name: Option<String>,
}

impl Identity {
    /// Builds the identity for a freshly authenticated user.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            linked_id: user.linked_id,
            display_name: user.full_name.clone(),
        }
    }

    /// Name recorded as the actor of an approval, falling back to the username.
    #[must_use]
    pub fn actor_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }

    /// The linked entity id, required for role-own operations.
    pub fn require_linked(&self) -> Result<i64> {
        self.linked_id.ok_or(Error::Forbidden)
    }
}

/// What an authorized caller may act upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Unrestricted (admin)
    Global,
    /// A single event the caller coordinates
    Event(i64),
    /// Only rows linked to the caller's own entity
    Own(i64),
}

/// Requires an authenticated caller.
pub fn authenticated(identity: Option<&Identity>) -> Result<&Identity> {
    identity.ok_or(Error::Unauthenticated)
}

/// Requires an authenticated caller whose role is in `allowed`.
///
/// # Errors
/// [`Error::Unauthenticated`] without a session, [`Error::Forbidden`] for any
/// other role.
pub fn require_role<'a>(identity: Option<&'a Identity>, allowed: &[Role]) -> Result<&'a Identity> {
    let identity = authenticated(identity)?;
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        debug!(role = %identity.role, ?allowed, "Role not permitted");
        Err(Error::Forbidden)
    }
}

/// Returns whether a member coordinates an event.
pub async fn is_assigned<C>(db: &C, member_id: i64, event_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let row = Coordinates::find_by_id((event_id, member_id)).one(db).await?;
    Ok(row.is_some())
}

/// Authorizes an event-scoped operation (tasks, budgets, participants).
///
/// Admins always pass with [`Scope::Global`]. Coordinators pass with
/// [`Scope::Event`] only when a `coordinates` row links them to the event.
/// Every other role is denied.
pub async fn authorize_event<C>(db: &C, identity: &Identity, event_id: i64) -> Result<Scope>
where
    C: ConnectionTrait,
{
    match identity.role {
        Role::Admin => Ok(Scope::Global),
        Role::Coordinator => {
            let member_id = identity.require_linked()?;
            if is_assigned(db, member_id, event_id).await? {
                Ok(Scope::Event(event_id))
            } else {
                debug!(member_id, event_id, "Coordinator not assigned to event");
                Err(Error::Forbidden)
            }
        }
        Role::Member | Role::Sponsor | Role::Participant => Err(Error::Forbidden),
    }
}

/// Authorizes access to the caller's own rows (member tasks, sponsor dashboard,
/// participant registrations).
pub fn authorize_own(identity: &Identity, role: Role) -> Result<Scope> {
    if identity.role == role {
        identity.require_linked().map(Scope::Own)
    } else {
        Err(Error::Forbidden)
    }
}

/// Ids of the events a member coordinates.
pub async fn assigned_event_ids<C>(db: &C, member_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let rows = Coordinates::find()
        .filter(coordinates::Column::MemberId.eq(member_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.event_id).collect())
}
