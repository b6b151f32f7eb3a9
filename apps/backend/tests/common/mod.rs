#![allow(dead_code)]

// tests/common/mod.rs
use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::SET_COOKIE;

pub mod proptest_prelude;

pub use backend_test_support::envelope::{assert_error_envelope, assert_no_keys};
pub use backend_test_support::unique_helpers::{unique_email, unique_str};

// Logging is auto-installed for every integration test binary
#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

/// The `token` cookie set on a response, if any.
pub fn session_cookie(resp: &ServiceResponse<BoxBody>) -> Option<Cookie<'static>> {
    resp.headers()
        .get_all(SET_COOKIE)
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
        .find(|c| c.name() == "token")
}

/// Header value of the trace id attached to every response.
pub fn trace_id(resp: &ServiceResponse<BoxBody>) -> String {
    resp.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
