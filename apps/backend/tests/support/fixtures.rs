use std::sync::Arc;
use std::time::SystemTime;

use actix_web::cookie::Cookie;
use async_trait::async_trait;
use api_starter::auth::claims::Role;
use api_starter::auth::password::CredentialHasher;
use api_starter::infra::state::build_state;
use api_starter::services::mailer::{MailError, Mailer, OutboundEmail, RecordingMailer};
use api_starter::services::users::{create_user, CreateUser};
use api_starter::state::app_state::AppState;
use api_starter::state::security_config::SecurityConfig;
use api_starter::store::{MemoryUserStore, UserRecord, UserStatus};
use api_starter::AppError;

use crate::common::{unique_email, unique_str};

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "correct-horse";

/// State over an in-memory store, a cheap Argon2 cost and a mailer the
/// test can read back.
pub struct TestContext {
    pub state: AppState,
    pub mailer: RecordingMailer,
}

pub async fn test_context() -> Result<TestContext, AppError> {
    let mailer = RecordingMailer::new();
    let state = build_state()
        .with_security(SecurityConfig::new(TEST_SECRET))
        .with_store(Arc::new(MemoryUserStore::new()))
        .with_hasher(fast_hasher())
        .with_mailer(Arc::new(mailer.clone()))
        .build()
        .await?;
    Ok(TestContext { state, mailer })
}

/// Mailer whose every delivery fails.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Delivery("relay unreachable".to_string()))
    }
}

/// Same as `test_context` but every mail delivery fails.
pub async fn failing_mail_state() -> Result<AppState, AppError> {
    build_state()
        .with_security(SecurityConfig::new(TEST_SECRET))
        .with_store(Arc::new(MemoryUserStore::new()))
        .with_hasher(fast_hasher())
        .with_mailer(Arc::new(FailingMailer))
        .build()
        .await
}

pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_params(1024, 1, 1).expect("valid argon2 params")
}

/// Inserts a user with `TEST_PASSWORD` and a unique email and username.
pub async fn seed_user(state: &AppState, role: Role, status: UserStatus) -> UserRecord {
    create_user(
        state.store(),
        &state.hasher,
        CreateUser {
            name: "Test User".to_string(),
            username: Some(unique_str("user")),
            email: unique_email(role.as_str()),
            password: TEST_PASSWORD.to_string(),
            role,
            status,
        },
    )
    .await
    .expect("seed user")
}

/// A `token` cookie holding a fresh session for `user`.
pub fn session_for(state: &AppState, user: &UserRecord) -> Cookie<'static> {
    let token = state
        .tokens
        .issue_session(&user.email, user.role, SystemTime::now())
        .expect("sign session token");
    Cookie::new("token", token)
}
