//! Backend test support utilities
//!
//! Shared helpers for the backend's unit and integration tests: one-time
//! logging setup, response envelope assertions, and unique fixture values.

pub mod envelope;
pub mod logging;
pub mod unique_helpers;
