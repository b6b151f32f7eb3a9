use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use bytes::BytesMut;
use futures_util::StreamExt;
use lazy_regex::regex_is_match;
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use tracing::debug;

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Request bodies larger than this are rejected before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Field-level checks run after deserialization. Every failing field is
/// reported, each with its first failing rule.
pub trait Validate {
    fn validate(&self, violations: &mut Violations);
}

#[derive(Debug, Default)]
pub struct Violations {
    messages: Vec<String>,
}

impl Violations {
    pub fn field<'a>(&'a mut self, name: &'a str, value: &'a str) -> FieldCheck<'a> {
        FieldCheck {
            violations: self,
            name,
            value,
            failed: false,
        }
    }

    /// Same rules, skipped entirely when the value is absent or empty.
    pub fn optional<'a>(&'a mut self, name: &'a str, value: Option<&'a str>) -> FieldCheck<'a> {
        let value = value.unwrap_or_default();
        FieldCheck {
            failed: value.is_empty(),
            violations: self,
            name,
            value,
        }
    }

    pub fn push(&mut self, message: String) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages joined by ", ".
    pub fn message(&self) -> String {
        self.messages.join(", ")
    }
}

pub struct FieldCheck<'a> {
    violations: &'a mut Violations,
    name: &'a str,
    value: &'a str,
    failed: bool,
}

impl FieldCheck<'_> {
    fn check(mut self, ok: impl FnOnce(&str) -> bool, message: impl FnOnce(&str) -> String) -> Self {
        if !self.failed && !ok(self.value) {
            self.violations.push(message(self.name));
            self.failed = true;
        }
        self
    }

    pub fn required(self) -> Self {
        self.check(|v| !v.trim().is_empty(), |f| format!("{f} is required"))
    }

    pub fn email(self) -> Self {
        self.check(is_valid_email, |f| format!("{f} must be a valid email address"))
    }

    pub fn min_len(self, n: usize) -> Self {
        self.check(
            |v| v.chars().count() >= n,
            |f| format!("{f} must be at least {n} characters long"),
        )
    }

    pub fn one_of(self, allowed: &[&str]) -> Self {
        self.check(|v| allowed.iter().any(|a| *a == v), |f| format!("{f} is not valid"))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    regex_is_match!(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$", value.trim())
}

/// JSON body extractor that deserializes, then runs [`Validate`].
///
/// Unreadable or mistyped JSON becomes `BAD_REQUEST`; rule failures become
/// `VALIDATION_ERROR` listing every failing field.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
{
    type Error = AppError;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let mut payload = payload.take();
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("")
            .to_string();

        Box::pin(async move {
            if !content_type.starts_with("application/json") {
                return Err(AppError::bad_request("Content-Type must be application/json"));
            }

            let mut body = BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk.map_err(|e| {
                    debug!(error = %e, "failed to read request body chunk");
                    AppError::bad_request("Failed to read request body")
                })?;
                if body.len() + chunk.len() > MAX_BODY_BYTES {
                    return Err(AppError::bad_request("Request body too large"));
                }
                body.extend_from_slice(&chunk);
            }

            // Bodies hold passwords, so only the category and size are logged.
            let parsed = serde_json::from_slice::<T>(&body).map_err(|e| {
                debug!(category = ?e.classify(), body_size = body.len(), "JSON parsing failed");
                AppError::bad_request(classify_json_error(&e))
            })?;

            let mut violations = Violations::default();
            parsed.validate(&mut violations);
            if !violations.is_empty() {
                return Err(AppError::invalid(ErrorCode::ValidationError, violations.message()));
            }

            Ok(ValidatedJson(parsed))
        })
    }
}

/// Classify serde_json::Error and return a sanitized error message
fn classify_json_error(error: &JsonError) -> String {
    match error.classify() {
        serde_json::error::Category::Syntax => {
            let line = error.line();
            format!("Invalid JSON at line {line}")
        }
        serde_json::error::Category::Eof => "Invalid JSON: unexpected end of input".to_string(),
        serde_json::error::Category::Data => {
            "Invalid JSON: wrong types for one or more fields".to_string()
        }
        serde_json::error::Category::Io => "Invalid JSON: I/O error while reading body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Signup {
        #[serde(default)]
        email: String,
        #[serde(default)]
        password: String,
        nickname: Option<String>,
    }

    impl Validate for Signup {
        fn validate(&self, v: &mut Violations) {
            v.field("email", &self.email).required().email();
            v.field("password", &self.password).required().min_len(6);
            v.optional("nickname", self.nickname.as_deref()).min_len(3);
        }
    }

    async fn extract(body: &str) -> Result<ValidatedJson<Signup>, AppError> {
        let (req, mut payload) = TestRequest::post()
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_string())
            .to_http_parts();
        ValidatedJson::<Signup>::from_request(&req, &mut payload).await
    }

    #[actix_web::test]
    async fn valid_body_passes() {
        let ok = extract(r#"{"email":"a@example.test","password":"secret1"}"#)
            .await
            .unwrap();
        assert_eq!(ok.email, "a@example.test");
    }

    #[actix_web::test]
    async fn every_failing_field_is_listed_once() {
        let err = extract(r#"{"email":"","password":"abc","nickname":"x"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(
            err.public_message(),
            "email is required, password must be at least 6 characters long, nickname must be at least 3 characters long"
        );
    }

    #[actix_web::test]
    async fn bad_email_format() {
        let err = extract(r#"{"email":"not-an-email","password":"secret1"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "email must be a valid email address");
    }

    #[actix_web::test]
    async fn wrong_types_are_bad_request() {
        let err = extract(r#"{"email":5,"password":"secret1"}"#).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.public_message(), "Invalid JSON: wrong types for one or more fields");
    }

    #[actix_web::test]
    async fn non_json_content_type_is_rejected() {
        let (req, mut payload) = TestRequest::post()
            .insert_header(("content-type", "text/plain"))
            .set_payload("email=a")
            .to_http_parts();
        let err = ValidatedJson::<Signup>::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@example.test"));
        assert!(is_valid_email("first.last+tag@sub.example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a example@test.com"));
    }

    #[test]
    fn one_of_rule() {
        let mut v = Violations::default();
        v.field("role", "owner").one_of(&["admin", "merchant", "operator"]);
        v.field("status", "active").one_of(&["active", "inactive", "banned"]);
        assert_eq!(v.message(), "role is not valid");
    }

    #[test]
    fn test_classify_json_error_eof() {
        let error = serde_json::from_str::<Signup>(r#"{"email": "test""#).unwrap_err();
        assert!(classify_json_error(&error).contains("unexpected end of input"));
    }
}
