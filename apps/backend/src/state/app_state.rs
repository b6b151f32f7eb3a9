use std::sync::Arc;

use super::security_config::SecurityConfig;
use crate::auth::otp::OtpStore;
use crate::auth::password::CredentialHasher;
use crate::auth::tokens::TokenService;
use crate::services::mailer::Mailer;
use crate::store::UserStore;

/// Everything a handler needs, built once by `StateBuilder` and shared
/// across workers through `web::Data`. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub security: SecurityConfig,
    pub tokens: TokenService,
    pub hasher: CredentialHasher,
    pub otp: OtpStore,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        security: SecurityConfig,
        hasher: CredentialHasher,
        otp: OtpStore,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenService::new(&security);
        Self {
            store,
            security,
            tokens,
            hasher,
            otp,
            mailer,
        }
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }
}
