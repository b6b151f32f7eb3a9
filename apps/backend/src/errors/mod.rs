//! Error codes shared by every error response.

pub mod error_code;

pub use error_code::ErrorCode;
