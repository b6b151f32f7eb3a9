//! Converts a panicking handler into a 500 envelope so one bad request
//! cannot take its worker down mid-response.

use std::future::{ready, Ready};
use std::panic::AssertUnwindSafe;

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::{Error, ResponseError};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Register it first so it sits innermost, inside the trace scope. Bodies
/// come out boxed.
///
/// A panic surfaces as an `Err` carrying the rendered envelope. The router
/// needs sole ownership of the request, so nothing here holds on to it.
#[derive(Clone, Default)]
pub struct CatchPanic;

impl<S, B> Transform<S, ServiceRequest> for CatchPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CatchPanicMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CatchPanicMiddleware { service }))
    }
}

pub struct CatchPanicMiddleware<S> {
    service: S,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

/// Renders now, while the task-local trace id is still in scope.
fn panic_error(detail: String) -> Error {
    let err = AppError::internal(ErrorCode::Internal, detail);
    let response = err.error_response();
    InternalError::from_response(err, response).into()
}

impl<S, B> Service<ServiceRequest> for CatchPanicMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => {
                let detail = format!("service panicked: {}", panic_message(&*payload));
                return Box::pin(async move { Err(panic_error(detail)) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map(ServiceResponse::map_into_boxed_body),
                Err(payload) => Err(panic_error(format!(
                    "handler panicked: {}",
                    panic_message(&*payload)
                ))),
            }
        })
    }
}
