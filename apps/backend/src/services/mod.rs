pub mod mailer;
pub mod users;
