use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::middleware::authenticate::Authenticate;
use crate::middleware::require_role::RoleOnly;

pub mod auth;
pub mod health;
pub mod responses;
pub mod users;

/// Every route the server exposes, with per-scope auth middleware.
///
/// App-wide middleware (tracing, logging, panic recovery, CORS) is added
/// by the caller so tests can assemble the same stack.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure_routes)
        .service(web::scope("/api/auth").configure(auth::configure_routes))
        .service(
            web::scope("/api/users")
                .wrap(RoleOnly::admin())
                .wrap(Authenticate)
                .configure(users::configure_routes),
        )
        .default_service(web::to(not_found));
}

async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::not_found(ErrorCode::NotFound, "Route not found"))
}
