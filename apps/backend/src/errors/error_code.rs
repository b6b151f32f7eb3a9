//! Error codes for the API.
//!
//! Every error response carries one of these in its `code` field. Add new
//! codes here; never pass ad-hoc strings as error codes.

use core::fmt;

/// Centralized, stable error codes. Each variant maps to the
/// SCREAMING_SNAKE_CASE string that appears in HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// Missing, invalid or expired session
    Unauthorized,
    /// Unknown account or wrong password
    InvalidCredentials,
    /// Authenticated but not allowed
    Forbidden,

    // Request Validation
    /// One or more request fields failed validation
    ValidationError,
    /// Body could not be read or parsed
    BadRequest,

    // Resource Not Found
    UserNotFound,
    /// No route matched
    NotFound,

    // Conflicts
    /// Email already registered
    UniqueEmail,
    /// Username already taken
    UniqueUsername,

    // System Errors
    /// User store failed
    StoreError,
    /// User store did not answer in time
    StoreTimeout,
    /// Password hashing failed
    HashingError,
    /// Token signing failed
    TokenError,
    /// Outbound mail failed
    MailError,
    /// Unexpected failure, including recovered panics
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden => "FORBIDDEN",

            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",

            Self::UserNotFound => "USER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::UniqueEmail => "UNIQUE_EMAIL",
            Self::UniqueUsername => "UNIQUE_USERNAME",

            Self::StoreError => "STORE_ERROR",
            Self::StoreTimeout => "STORE_TIMEOUT",
            Self::HashingError => "HASHING_ERROR",
            Self::TokenError => "TOKEN_ERROR",
            Self::MailError => "MAIL_ERROR",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
