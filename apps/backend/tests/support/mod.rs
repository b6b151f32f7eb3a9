#![allow(dead_code)]

pub mod app_builder;
pub mod fixtures;

pub use app_builder::create_test_app;
pub use fixtures::{failing_mail_state, seed_user, session_for, test_context, TestContext, TEST_PASSWORD};
