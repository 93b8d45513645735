use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::repositories::user::{PgUserRepository, UserRepository};
use crate::services::credentials::CredentialStore;
use crate::services::session::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Password hashing and user records.
    pub credentials: CredentialStore,
    /// Session cookie issuance and validation.
    pub sessions: SessionManager,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        crate::db::ensure_schema(&db).await?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        Self::with_repository(config, Arc::new(PgUserRepository::new(db)))
    }

    /// Creates an `AppState` over any `UserRepository`.
    pub fn with_repository(config: &Config, repo: Arc<dyn UserRepository>) -> Result<Self> {
        let credentials = CredentialStore::new(repo);
        let sessions = SessionManager::from_config(config, credentials.clone())?;
        tracing::info!("✅ Session manager initialized");

        Ok(AppState {
            credentials,
            sessions,
        })
    }
}
