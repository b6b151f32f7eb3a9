pub mod current_user;
pub mod validated_json;

pub use current_user::CurrentUser;
pub use validated_json::{Validate, ValidatedJson, Violations};
