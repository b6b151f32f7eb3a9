//! Session cookie authentication.
//!
//! Reads the `token` cookie, verifies it as a session or access token and
//! attaches the caller's `RequestIdentity` to the request. Every failure
//! answers 401 "Unauthorized" without saying which check failed. No store
//! lookup happens here: the role inside the token is trusted until it
//! expires.

use std::time::SystemTime;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::debug;

use crate::auth::identity::{self, RequestIdentity};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::state::app_state::AppState;

pub const SESSION_COOKIE: &str = "token";

pub struct Authenticate;

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware { service }))
    }
}

pub struct AuthenticateMiddleware<S> {
    service: S,
}

/// Responses are rendered inside the returned future so they pick up the
/// request's trace id.
fn reject<B: 'static>(
    req: ServiceRequest,
    err: AppError,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
    Box::pin(async move { Ok(req.error_response(err).map_into_right_body()) })
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());

        let Some(token) = token else {
            debug!("no session cookie");
            return reject(req, AppError::unauthorized());
        };

        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            return reject(
                req,
                AppError::internal(ErrorCode::Internal, "AppState missing from app data"),
            );
        };

        match state.tokens.verify_session_at(&token, SystemTime::now()) {
            Ok((email, role)) => {
                identity::attach(&req, RequestIdentity { email, role });
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(e) => {
                debug!(reason = %e, "session token rejected");
                reject(req, AppError::unauthorized())
            }
        }
    }
}
