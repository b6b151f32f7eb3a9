//! Success bodies. Errors use `ErrorEnvelope` in `error.rs`.

use serde::Serialize;
use time::OffsetDateTime;

use crate::auth::claims::Role;
use crate::store::{UserRecord, UserStatus};

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRecord> for UserData {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            username: record.username,
            email: record.email,
            role: record.role,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserData,
}

impl UserResponse {
    pub fn new(record: UserRecord) -> Self {
        Self {
            success: true,
            user: record.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserData>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub success: bool,
    pub email: String,
}
