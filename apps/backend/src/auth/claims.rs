//! Claims carried inside every token the backend signs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Merchant,
    Operator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Merchant, Role::Operator];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Merchant => "merchant",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// What a token may be used for. Each purpose has its own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Cookie session, 24h.
    Session,
    Access,
    Otp,
    Reset,
}

impl TokenPurpose {
    pub const fn ttl(&self) -> Duration {
        match self {
            TokenPurpose::Session => Duration::from_secs(24 * 60 * 60),
            TokenPurpose::Access => Duration::from_secs(15 * 60),
            TokenPurpose::Otp => Duration::from_secs(10 * 60),
            TokenPurpose::Reset => Duration::from_secs(15 * 60),
        }
    }

    /// Session and access tokens identify a signed-in user and carry a role.
    pub const fn carries_role(&self) -> bool {
        matches!(self, TokenPurpose::Session | TokenPurpose::Access)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// One-time code, only on `otp` tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    pub pur: TokenPurpose,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}
