use std::sync::Arc;

use tracing::info;

use crate::auth::otp::OtpStore;
use crate::auth::password::CredentialHasher;
use crate::config::{AppConfig, DatabaseTarget};
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::services::mailer::{LogMailer, Mailer};
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;
use crate::store::{MemoryUserStore, SeaUserStore, UserStore};

/// Builder for `AppState`, shared by `main` and the tests.
///
/// Anything not set falls back to a test-friendly default: in-memory store,
/// default signing secret, default Argon2 cost, log-only mailer.
pub struct StateBuilder {
    security: SecurityConfig,
    database: Option<DatabaseTarget>,
    store: Option<Arc<dyn UserStore>>,
    hasher: Option<CredentialHasher>,
    mailer: Option<Arc<dyn Mailer>>,
    otp: Option<OtpStore>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            security: SecurityConfig::default(),
            database: None,
            store: None,
            hasher: None,
            mailer: None,
            otp: None,
        }
    }

    /// Security and database target from process configuration.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_security(
            SecurityConfig::new(config.jwt_secret.clone()).with_secure_cookies(config.cookie_secure),
        )
        .with_database(config.database.clone())
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    pub fn with_database(mut self, target: DatabaseTarget) -> Self {
        self.database = Some(target);
        self
    }

    /// Use this store as-is; overrides `with_database`.
    pub fn with_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_otp_store(mut self, otp: OtpStore) -> Self {
        self.otp = Some(otp);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let store: Arc<dyn UserStore> = match (self.store, self.database) {
            (Some(store), _) => store,
            (None, Some(DatabaseTarget::Url(url))) => {
                let conn = bootstrap_db(&url).await?;
                Arc::new(SeaUserStore::new(conn))
            }
            (None, Some(DatabaseTarget::Memory)) | (None, None) => {
                info!("using in-memory user store");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(AppState::new(
            store,
            self.security,
            self.hasher.unwrap_or_default(),
            self.otp.unwrap_or_default(),
            self.mailer.unwrap_or_else(|| Arc::new(LogMailer)),
        ))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
