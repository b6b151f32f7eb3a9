mod common;
mod support;

use std::time::{Duration, SystemTime};

use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::Cookie;
use actix_web::test;
use api_starter::auth::claims::Role;
use api_starter::services::users::delete_user;
use api_starter::store::UserStatus;
use common::{assert_error_envelope, session_cookie};
use serde_json::Value;
use support::{create_test_app, seed_user, session_for, test_context};

#[actix_web::test]
async fn me_returns_the_signed_in_user() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let user = seed_user(&ctx.state, Role::Operator, UserStatus::Active).await;
    let cookie = session_for(&ctx.state, &user);
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user.id.as_str());
    Ok(())
}

#[actix_web::test]
async fn me_without_cookie_is_unauthorized() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_error_envelope(resp, 401, "UNAUTHORIZED", "Unauthorized").await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(Cookie::new("token", ""))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_error_envelope(resp, 401, "UNAUTHORIZED", "Unauthorized").await;
    Ok(())
}

#[actix_web::test]
async fn rejected_tokens_all_answer_401() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let user = seed_user(&ctx.state, Role::Admin, UserStatus::Active).await;
    let tokens = ctx.state.tokens.clone();
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let long_ago = SystemTime::now() - Duration::from_secs(2 * 24 * 60 * 60);
    let expired = tokens.issue_session(&user.email, user.role, long_ago)?;
    let otp_token = tokens.issue_otp(&user.email, "123456", SystemTime::now())?;
    let reset_token = tokens.issue_reset(&user.email, SystemTime::now())?;
    let mut tampered = tokens.issue_session(&user.email, user.role, SystemTime::now())?;
    tampered.push('x');

    for token in [expired, otp_token, reset_token, tampered, "garbage".to_string()] {
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .cookie(Cookie::new("token", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_error_envelope(resp, 401, "UNAUTHORIZED", "Unauthorized").await;
    }
    Ok(())
}

#[actix_web::test]
async fn access_tokens_are_accepted_like_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let user = seed_user(&ctx.state, Role::Merchant, UserStatus::Active).await;
    let token = ctx
        .state
        .tokens
        .issue_access(&user.email, user.role, SystemTime::now())?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(Cookie::new("token", token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);
    Ok(())
}

#[actix_web::test]
async fn me_after_account_removal_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let user = seed_user(&ctx.state, Role::Operator, UserStatus::Active).await;
    let cookie = session_for(&ctx.state, &user);
    delete_user(ctx.state.store(), &user.id).await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_error_envelope(resp, 404, "USER_NOT_FOUND", "User not found").await;
    Ok(())
}

#[actix_web::test]
async fn logout_clears_the_cookie() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let user = seed_user(&ctx.state, Role::Operator, UserStatus::Active).await;
    let cookie = session_for(&ctx.state, &user);
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let cleared = session_cookie(&resp).expect("logout sets the cookie");
    assert_eq!(cleared.value(), "");
    assert_eq!(cleared.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logged out successfully.");

    let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_error_envelope(resp, 401, "UNAUTHORIZED", "Unauthorized").await;
    Ok(())
}

#[actix_web::test]
async fn unknown_route_is_json_404() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get().uri("/api/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_error_envelope(resp, 404, "NOT_FOUND", "Route not found").await;
    Ok(())
}

#[actix_web::test]
async fn health_reports_version() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = test_context().await?;
    let app = create_test_app(ctx.state).with_prod_routes().build().await?;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}
