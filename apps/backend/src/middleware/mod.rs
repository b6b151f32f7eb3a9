pub mod authenticate;
pub mod catch_panic;
pub mod cors;
pub mod request_trace;
pub mod require_role;
pub mod structured_logger;
pub mod trace_span;

pub use authenticate::{Authenticate, SESSION_COOKIE};
pub use catch_panic::CatchPanic;
pub use cors::cors_middleware;
pub use request_trace::RequestTrace;
pub use require_role::RoleOnly;
pub use structured_logger::StructuredLogger;
pub use trace_span::TraceSpan;
