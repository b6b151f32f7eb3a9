//! Role gate. Must sit inside `Authenticate`: actix runs the last `wrap`
//! first, so register `RoleOnly` before `Authenticate`.

use std::future::{ready, Ready};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use crate::auth::claims::Role;
use crate::auth::identity;
use crate::error::AppError;

/// Lets a request through only when its identity holds exactly `required`.
/// A request with no identity at all is refused with 403 as well.
#[derive(Debug, Clone, Copy)]
pub struct RoleOnly {
    required: Role,
}

impl RoleOnly {
    pub fn new(required: Role) -> Self {
        Self { required }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleOnly
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RoleOnlyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleOnlyMiddleware {
            service,
            required: self.required,
        }))
    }
}

pub struct RoleOnlyMiddleware<S> {
    service: S,
    required: Role,
}

impl<S, B> Service<ServiceRequest> for RoleOnlyMiddleware<S>
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
        let allowed = identity::read_service(&req).is_some_and(|id| id.role == self.required);

        if !allowed {
            debug!(required = %self.required, "role check failed");
            return Box::pin(async move {
                Ok(req.error_response(AppError::forbidden()).map_into_right_body())
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::dev::Service as _;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    use super::*;
    use crate::auth::identity::{attach, RequestIdentity};

    #[actix_web::test]
    async fn only_admins_pass() {
        let cases = [
            (Some(Role::Admin), StatusCode::OK),
            (Some(Role::Operator), StatusCode::FORBIDDEN),
            (Some(Role::Merchant), StatusCode::FORBIDDEN),
            (None, StatusCode::FORBIDDEN),
        ];

        for (role, expected) in cases {
            // wrap_fn stands in for `Authenticate`.
            let app = test::init_service(
                App::new().service(
                    web::scope("/admin")
                        .wrap(RoleOnly::admin())
                        .wrap_fn(move |req: ServiceRequest, srv| {
                            if let Some(role) = role {
                                attach(
                                    &req,
                                    RequestIdentity {
                                        email: "someone@example.test".into(),
                                        role,
                                    },
                                );
                            }
                            srv.call(req)
                        })
                        .route("", web::get().to(HttpResponse::Ok)),
                ),
            )
            .await;

            let resp =
                test::call_service(&app, test::TestRequest::get().uri("/admin").to_request()).await;
            assert_eq!(resp.status(), expected, "role {role:?}");
        }
    }
}
