//! Credential store - hashes, stores and verifies user passwords.
//!
//! Passwords are hashed with Argon2id and a random salt before they reach the
//! database. Plain passwords are never stored or logged; every instrumented
//! function here skips them.

use crate::{
    entities::{Role, User, user},
    errors::{Error, Result},
};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use sea_orm::{Set, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Data needed to create a login account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Plain password; hashed before storage
    pub password: String,
    pub role: Role,
    /// Member, sponsor or participant id the account acts for
    pub linked_id: Option<i64>,
    pub full_name: Option<String>,
}

/// Hashes and verifies passwords, and writes user rows.
#[derive(Clone)]
pub struct CredentialStore {
    argon: Argon2<'static>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Creates a store using the recommended Argon2id parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon: Argon2::default(),
        }
    }

    /// Creates a store with explicit memory (KiB) and iteration cost.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password with a fresh random salt, returning a PHC string.
    pub fn hash_password(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon.hash_password(plain.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Checks a password against a stored hash.
    ///
    /// The comparison is done by the hashing primitive in constant time. A hash
    /// that cannot be parsed never verifies.
    #[must_use]
    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            self.argon
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Creates a user and returns its id.
    ///
    /// # Errors
    /// [`Error::DuplicateUsername`] if the username is already taken.
    #[instrument(skip(self, db, new_user), fields(username = %new_user.username, role = ?new_user.role))]
    pub async fn create_user<C>(&self, db: &C, new_user: NewUser) -> Result<i64>
    where
        C: ConnectionTrait,
    {
        let username = new_user.username.trim().to_string();
        if username.is_empty() || new_user.password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }

        if find_user_by_username(db, &username).await?.is_some() {
            return Err(Error::DuplicateUsername { username });
        }

        let password_hash = self.hash_password(&new_user.password)?;

        let model = user::ActiveModel {
            username: Set(username.clone()),
            password_hash: Set(password_hash),
            role: Set(new_user.role),
            linked_id: Set(new_user.linked_id),
            full_name: Set(new_user.full_name),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        // The unique index still guards against a concurrent insert of the same name.
        let inserted = model.insert(db).await.map_err(|e| match Error::from(e) {
            Error::Constraint { .. } => Error::DuplicateUsername {
                username: username.clone(),
            },
            other => other,
        })?;

        info!(user_id = inserted.id, "User created");
        Ok(inserted.id)
    }

    /// Authenticates a login attempt.
    ///
    /// The claimed role must equal the stored role (trimmed, case-insensitive).
    /// An unknown username, a wrong password and a role mismatch are all reported
    /// as [`Error::InvalidCredentials`].
    #[instrument(skip(self, db, password))]
    pub async fn authenticate<C>(
        &self,
        db: &C,
        username: &str,
        password: &str,
        claimed_role: &str,
    ) -> Result<user::Model>
    where
        C: ConnectionTrait,
    {
        let Some(user) = find_user_by_username(db, username.trim()).await? else {
            debug!("Login for unknown username");
            return Err(Error::InvalidCredentials);
        };

        if !user.role.as_str().eq_ignore_ascii_case(claimed_role.trim()) {
            debug!("Login with mismatched role");
            return Err(Error::InvalidCredentials);
        }

        if !self.verify_password(password, &user.password_hash) {
            debug!("Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        Ok(user)
    }

    /// Creates the bootstrap admin account if no user with that name exists.
    ///
    /// Returns `true` when an account was created.
    #[instrument(skip(self, db, password))]
    pub async fn ensure_admin<C>(
        &self,
        db: &C,
        username: &str,
        password: Option<&str>,
        full_name: &str,
    ) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        if find_user_by_username(db, username).await?.is_some() {
            return Ok(false);
        }

        let Some(password) = password else {
            warn!("No admin account exists and ADMIN_PASSWORD is not set; skipping seed");
            return Ok(false);
        };

        self.create_user(
            db,
            NewUser {
                username: username.to_string(),
                password: password.to_string(),
                role: Role::Admin,
                linked_id: None,
                full_name: Some(full_name.to_string()),
            },
        )
        .await?;
        Ok(true)
    }
}

/// Finds a user by username.
pub async fn find_user_by_username<C>(db: &C, username: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by id.
pub async fn find_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}
