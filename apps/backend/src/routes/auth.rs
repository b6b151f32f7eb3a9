use std::time::SystemTime;

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::claims::TokenPurpose;
use crate::auth::identity::RequestIdentity;
use crate::auth::otp::OtpStore;
use crate::auth::tokens::constant_time_eq;
use crate::error::AppError;
use crate::extractors::{CurrentUser, Validate, ValidatedJson, Violations};
use crate::logging::pii::Redacted;
use crate::middleware::authenticate::{Authenticate, SESSION_COOKIE};
use crate::routes::responses::{EmailResponse, MessageResponse, UserResponse};
use crate::services::mailer::OutboundEmail;
use crate::services::users::{self, normalize_email, LoginIdentifier};
use crate::state::app_state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self, v: &mut Violations) {
        if self.email.trim().is_empty() && self.username.trim().is_empty() {
            v.push("email or username is required".to_string());
        }
        v.optional("email", Some(self.email.trim())).email();
        v.field("password", &self.password)
            .required()
            .min_len(MIN_PASSWORD_LEN);
    }
}

impl LoginRequest {
    fn identifier(&self) -> LoginIdentifier {
        if self.email.trim().is_empty() {
            LoginIdentifier::Username(self.username.clone())
        } else {
            LoginIdentifier::Email(self.email.clone())
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self, v: &mut Violations) {
        v.field("email", &self.email).required().email();
        v.field("password", &self.password)
            .required()
            .min_len(MIN_PASSWORD_LEN);
        v.optional("username", self.username.as_deref()).min_len(3);
    }
}

#[derive(Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

impl Validate for EmailRequest {
    fn validate(&self, v: &mut Violations) {
        v.field("email", &self.email).required().email();
    }
}

#[derive(Deserialize)]
pub struct OtpVerifyRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub otp: String,
}

impl Validate for OtpVerifyRequest {
    fn validate(&self, v: &mut Violations) {
        v.field("token", &self.token).required();
        v.field("otp", &self.otp).required();
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for ResetPasswordRequest {
    fn validate(&self, v: &mut Violations) {
        v.field("token", &self.token).required();
        v.field("password", &self.password)
            .required()
            .min_len(MIN_PASSWORD_LEN);
    }
}

/// `token` cookie carrying a session token for the next 24 hours.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let ttl = TokenPurpose::Session.ttl();
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(OffsetDateTime::now_utc() + CookieDuration::seconds(ttl.as_secs() as i64))
        .finish()
}

/// Empty `token` cookie that expired at the epoch, so browsers drop it.
pub fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .finish()
}

async fn login(
    body: ValidatedJson<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = users::authenticate(
        state.store(),
        &state.hasher,
        body.identifier(),
        &body.password,
    )
    .await?;

    let token = state
        .tokens
        .issue_session(&user.email, user.role, SystemTime::now())?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, state.security.secure_cookies))
        .json(UserResponse::new(user)))
}

async fn register(
    body: ValidatedJson<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let user = users::register(
        state.store(),
        &state.hasher,
        body.name.unwrap_or_default(),
        body.username,
        body.email,
        body.password,
    )
    .await?;

    Ok(HttpResponse::Created().json(UserResponse::new(user)))
}

async fn me(current: CurrentUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(UserResponse::new(current.record)))
}

async fn logout(
    identity: RequestIdentity,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    debug!(role = %identity.role, "session cleared");
    Ok(HttpResponse::Ok()
        .cookie(cleared_cookie(state.security.secure_cookies))
        .json(MessageResponse::new("Logged out successfully.")))
}

/// Issues a one-time code. The code and the token that binds it go out by
/// mail only, so verifying proves access to the mailbox. The response is
/// the same whether or not the account exists.
async fn request_otp(
    body: ValidatedJson<EmailRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&body.email);

    if users::find_by_email(state.store(), &email).await?.is_some() {
        let code = OtpStore::generate_code();
        state.otp.store(&email, &code);
        let token = state.tokens.issue_otp(&email, &code, SystemTime::now())?;

        match state
            .mailer
            .send(OutboundEmail::otp(&email, &code, &token))
            .await
        {
            Ok(()) => info!(email = %Redacted(&email), "otp issued"),
            // Same response as for unknown accounts.
            Err(e) => warn!(error = %e, "otp mail not delivered"),
        }
    } else {
        debug!(email = %Redacted(&email), "otp requested for unknown account");
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If the account exists, a verification code has been sent.",
    )))
}

async fn verify_otp(
    body: ValidatedJson<OtpVerifyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = state
        .tokens
        .verify_otp(&body.token, body.otp.trim(), SystemTime::now())?;

    // The token alone is not enough: the code must still be live and be
    // the most recent one issued for this address.
    match state.otp.retrieve(&email) {
        Some(current) if constant_time_eq(current.as_bytes(), body.otp.trim().as_bytes()) => {
            state.otp.remove(&email);
        }
        _ => {
            debug!(email = %Redacted(&email), "otp not live in store");
            return Err(AppError::unauthorized());
        }
    }

    info!(email = %Redacted(&email), "otp verified");
    Ok(HttpResponse::Ok().json(EmailResponse {
        success: true,
        email,
    }))
}

async fn forgot_password(
    body: ValidatedJson<EmailRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&body.email);

    if users::find_by_email(state.store(), &email).await?.is_some() {
        let token = state.tokens.issue_reset(&email, SystemTime::now())?;
        if let Err(e) = state
            .mailer
            .send(OutboundEmail::password_reset(&email, &token))
            .await
        {
            // Same response as for unknown accounts.
            warn!(error = %e, "password reset mail not delivered");
        }
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If the account exists, password reset instructions have been sent.",
    )))
}

async fn reset_password(
    body: ValidatedJson<ResetPasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let claims = state
        .tokens
        .verify_purpose(&body.token, TokenPurpose::Reset, SystemTime::now())?;

    users::reset_password(state.store(), &state.hasher, &claims.email, &body.password).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated successfully.")))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(login))
        .route("/register", web::post().to(register))
        .service(
            web::resource("/me")
                .wrap(Authenticate)
                .route(web::get().to(me)),
        )
        .service(
            web::resource("/logout")
                .wrap(Authenticate)
                .route(web::post().to(logout)),
        )
        .route("/otp", web::post().to(request_otp))
        .route("/otp/verify", web::post().to(verify_otp))
        .route("/password/forgot", web::post().to(forgot_password))
        .route("/password/reset", web::post().to(reset_password));
}
