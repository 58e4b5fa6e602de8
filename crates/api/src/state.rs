//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::identity::{GoogleIdentity, IdentityProvider};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Federated login is enabled only when a Google client ID is configured.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let identity: Option<Arc<dyn IdentityProvider>> =
            config.google_client_id.as_ref().map(|client_id| {
                Arc::new(GoogleIdentity::new(
                    reqwest::Client::new(),
                    client_id.clone(),
                )) as Arc<dyn IdentityProvider>
            });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the configured identity provider, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&dyn IdentityProvider> {
        self.inner.identity.as_deref()
    }
}
