pub mod app;

pub use app::{AdminSeed, AppConfig, DatabaseTarget};
