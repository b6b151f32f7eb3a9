//! Keyed user store.
//!
//! Handlers and services talk to `dyn UserStore`; the in-memory and SeaORM
//! backends are interchangeable. Every call made from a request path goes
//! through [`bounded`] so a stuck backend cannot pin a worker.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::claims::Role;

pub mod memory;
pub mod sea;

pub use memory::MemoryUserStore;
pub use sea::SeaUserStore;

pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A unique field already holds this value.
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },
    #[error("user store timed out")]
    Timeout,
    #[error("user store failure: {0}")]
    Backend(String),
    /// A stored row could not be read back into a `UserRecord`.
    #[error("corrupt user row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [UserStatus::Active, UserStatus::Inactive, UserStatus::Banned];

    pub const fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields for a new record. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub password_hash: String,
}

/// Partial update; `None` leaves the field alone. `username: Some(None)`
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<Option<String>>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.password_hash.is_none()
    }

    pub(crate) fn apply(self, record: &mut UserRecord, now: OffsetDateTime) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(username) = self.username {
            record.username = username;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(password_hash) = self.password_hash {
            record.password_hash = password_hash;
        }
        record.updated_at = now;
    }
}

/// Single-field lookups. Never logged: filters carry emails.
#[derive(Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(String),
    Email(String),
    Username(String),
    Role(Role),
}

impl fmt::Debug for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserFilter::Id(id) => write!(f, "Id({id})"),
            UserFilter::Email(_) => f.write_str("Email(<redacted>)"),
            UserFilter::Username(_) => f.write_str("Username(<redacted>)"),
            UserFilter::Role(role) => write!(f, "Role({role})"),
        }
    }
}

impl UserFilter {
    pub fn matches(&self, record: &UserRecord) -> bool {
        match self {
            UserFilter::Id(id) => record.id == *id,
            UserFilter::Email(email) => record.email == *email,
            UserFilter::Username(username) => record.username.as_deref() == Some(username.as_str()),
            UserFilter::Role(role) => record.role == *role,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, StoreError>;

    /// All users ordered by creation time.
    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Fails with `Duplicate` when email or a non-empty username is taken.
    async fn insert_one(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// `Ok(None)` when no user has `id`.
    async fn update_one(&self, id: &str, patch: UserPatch) -> Result<Option<UserRecord>, StoreError>;

    /// True if a record was removed.
    async fn delete_one(&self, id: &str) -> Result<bool, StoreError>;
}

/// Runs a store call under [`STORE_TIMEOUT`].
pub async fn bounded<T, F>(fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = STORE_TIMEOUT.as_millis() as u64, "user store call timed out");
            Err(StoreError::Timeout)
        }
    }
}

pub(crate) fn new_user_id() -> String {
    ulid::Ulid::new().to_string()
}
