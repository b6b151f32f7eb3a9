//! Assertions for the API's JSON response envelope.
//!
//! Every error response is `{"success": false, "message": ..., "code": ...}`
//! with an `x-trace-id` header; these helpers check that contract without
//! depending on backend types.

use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ErrorEnvelopeLike {
    success: bool,
    message: String,
    code: String,
}

/// Assert that a response is an error envelope with the given status, code and message.
///
/// Returns the parsed body so callers can make further assertions.
pub async fn assert_error_envelope(
    resp: ServiceResponse<BoxBody>,
    expected_status: u16,
    expected_code: &str,
    expected_message: &str,
) -> Value {
    assert_eq!(resp.status().as_u16(), expected_status);

    let headers = resp.headers().clone();
    let trace_id = headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .expect("x-trace-id header should be present and valid UTF-8");
    assert!(!trace_id.is_empty(), "x-trace-id header should not be empty");

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(
        content_type.starts_with("application/json"),
        "Content-Type must be application/json (got {content_type})"
    );

    if expected_status == 401 {
        assert!(
            headers.get("WWW-Authenticate").is_some(),
            "401 responses must carry WWW-Authenticate"
        );
    } else {
        assert!(
            headers.get("WWW-Authenticate").is_none(),
            "{expected_status} responses must not carry WWW-Authenticate"
        );
    }

    let body = actix_web::test::read_body(resp).await;
    let value: Value =
        serde_json::from_slice(&body).expect("error body should be valid JSON");
    let envelope: ErrorEnvelopeLike =
        serde_json::from_value(value.clone()).expect("error body should match the envelope");

    assert!(!envelope.success, "error envelope must have success=false");
    assert_eq!(envelope.code, expected_code);
    assert_eq!(envelope.message, expected_message);

    value
}

/// Recursively check that no object in `value` carries any of `keys`.
pub fn assert_no_keys(value: &Value, keys: &[&str]) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                assert!(
                    !keys.contains(&k.as_str()),
                    "unexpected key {k:?} in response body"
                );
                assert_no_keys(v, keys);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| assert_no_keys(v, keys)),
        _ => {}
    }
}
