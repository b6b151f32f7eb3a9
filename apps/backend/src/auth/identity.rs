//! Request-scoped identity of the signed-in caller.
//!
//! `Authenticate` attaches a `RequestIdentity` to the request it verified.
//! Nothing else writes it, and it dies with the request. Handlers take it as
//! an extractor argument; if no identity was attached the extractor fails
//! with 401, so a route that forgot its middleware fails closed.

use std::future::{ready, Ready};

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use super::claims::Role;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub email: String,
    pub role: Role,
}

pub fn attach(req: &ServiceRequest, identity: RequestIdentity) {
    req.extensions_mut().insert(identity);
}

pub fn read(req: &HttpRequest) -> Option<RequestIdentity> {
    req.extensions().get::<RequestIdentity>().cloned()
}

pub fn read_service(req: &ServiceRequest) -> Option<RequestIdentity> {
    req.extensions().get::<RequestIdentity>().cloned()
}

impl FromRequest for RequestIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(read(req).ok_or_else(AppError::unauthorized))
    }
}
