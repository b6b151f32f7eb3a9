mod common;
mod support;

use actix_web::dev::ServiceResponse;
use actix_web::{test, web, HttpResponse};
use common::assert_error_envelope;
use support::{create_test_app, test_context};

async fn boom() -> HttpResponse {
    panic!("handler exploded");
}

async fn fine() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[actix_web::test]
async fn panicking_handler_becomes_500_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state)
        .with_routes(|cfg| {
            cfg.route("/boom", web::get().to(boom))
                .route("/fine", web::get().to(fine));
        })
        .build()
        .await?;

    // A panic leaves as an error carrying the rendered envelope; the server
    // writes that response as-is.
    let req = test::TestRequest::get().uri("/boom").to_request();
    let err = match test::try_call_service(&app, req).await {
        Ok(resp) => panic!("expected an error, got status {}", resp.status()),
        Err(err) => err,
    };
    let resp = ServiceResponse::new(
        test::TestRequest::default().to_http_request(),
        err.error_response(),
    );
    let body = assert_error_envelope(resp, 500, "INTERNAL", "Internal server error").await;
    assert!(!body.to_string().contains("exploded"));

    // The worker keeps serving.
    let req = test::TestRequest::get().uri("/fine").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);
    Ok(())
}

#[actix_web::test]
async fn error_trace_id_matches_request_id() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    let request_id = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(!request_id.is_empty());
    assert_eq!(common::trace_id(&resp), request_id);
    Ok(())
}

#[actix_web::test]
async fn routed_requests_pass_through_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    for uri in ["/health", "/api/auth/me", "/api/users/some-id"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_ne!(resp.status().as_u16(), 500, "{uri} must be routed normally");
    }

    let req = test::TestRequest::get().uri("/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);
    Ok(())
}
