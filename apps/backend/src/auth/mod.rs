pub mod claims;
pub mod identity;
pub mod otp;
pub mod password;
pub mod tokens;

pub use claims::{Claims, Role, TokenPurpose};
pub use identity::RequestIdentity;
pub use otp::OtpStore;
pub use password::CredentialHasher;
pub use tokens::{TokenError, TokenService};
