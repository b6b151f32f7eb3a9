//! Admin user management. Mounted behind `Authenticate` and
//! `RoleOnly::admin()`.

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::auth::claims::Role;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::{Validate, ValidatedJson, Violations};
use crate::routes::responses::{MessageResponse, UserData, UserResponse, UsersResponse};
use crate::services::users::{self, CreateUser, UpdateUser};
use crate::state::app_state::AppState;
use crate::store::UserStatus;

const ROLES: &[&str] = &["admin", "merchant", "operator"];
const STATUSES: &[&str] = &["active", "inactive", "banned"];

#[derive(Deserialize)]
pub struct UserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
}

impl Validate for UserRequest {
    fn validate(&self, v: &mut Violations) {
        v.field("email", &self.email).required().email();
        v.field("password", &self.password).required().min_len(6);
        v.field("role", &self.role).required().one_of(ROLES);
        v.field("status", &self.status).required().one_of(STATUSES);
    }
}

#[derive(Deserialize)]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl Validate for UserUpdateRequest {
    fn validate(&self, v: &mut Violations) {
        let untouched = self.name.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.role.is_none()
            && self.status.is_none();
        if untouched {
            v.push("at least one field is required".to_string());
            return;
        }
        if let Some(email) = self.email.as_deref() {
            v.field("email", email).required().email();
        }
        if let Some(password) = self.password.as_deref() {
            v.field("password", password).required().min_len(6);
        }
        v.optional("role", self.role.as_deref()).one_of(ROLES);
        v.optional("status", self.status.as_deref()).one_of(STATUSES);
    }
}

fn parse_role(value: &str) -> Result<Role, AppError> {
    value
        .parse()
        .map_err(|_| AppError::invalid(ErrorCode::ValidationError, "role is not valid"))
}

fn parse_status(value: &str) -> Result<UserStatus, AppError> {
    value
        .parse()
        .map_err(|_| AppError::invalid(ErrorCode::ValidationError, "status is not valid"))
}

async fn list(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let users = users::list_users(state.store())
        .await?
        .into_iter()
        .map(UserData::from)
        .collect();

    Ok(HttpResponse::Ok().json(UsersResponse {
        success: true,
        users,
    }))
}

async fn get(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = users::get_user(state.store(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user)))
}

async fn create(
    body: ValidatedJson<UserRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = CreateUser {
        role: parse_role(&body.role)?,
        status: parse_status(&body.status)?,
        name: body.name.unwrap_or_default(),
        username: body.username,
        email: body.email,
        password: body.password,
    };

    let user = users::create_user(state.store(), &state.hasher, input).await?;
    Ok(HttpResponse::Created().json(UserResponse::new(user)))
}

async fn update(
    path: web::Path<String>,
    body: ValidatedJson<UserUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = UpdateUser {
        role: body.role.as_deref().map(parse_role).transpose()?,
        status: body.status.as_deref().map(parse_status).transpose()?,
        name: body.name,
        username: body.username,
        email: body.email,
        password: body.password,
    };

    let user = users::update_user(state.store(), &state.hasher, &path.into_inner(), input).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user)))
}

async fn delete(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    users::delete_user(state.store(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted successfully.")))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}
