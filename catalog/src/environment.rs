//! Client environment.
//!
//! Defines the environment type injected into the session and catalog
//! reducers. Effects capture clones of these providers.

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::providers::{
    AuthService, CatalogService, CredentialStore, HttpAuthService, HttpCatalogService,
    LocalCredentialStore,
};

/// Client environment.
///
/// # Type Parameters
///
/// - `C`: Remote catalog
/// - `A`: Remote authentication
/// - `K`: Credential store
#[derive(Clone)]
pub struct AppEnvironment<C, A, K>
where
    C: CatalogService + Clone,
    A: AuthService + Clone,
    K: CredentialStore + Clone,
{
    /// Remote catalog.
    pub catalog: C,

    /// Remote authentication.
    pub auth: A,

    /// Token persistence.
    pub credentials: K,
}

impl<C, A, K> AppEnvironment<C, A, K>
where
    C: CatalogService + Clone,
    A: AuthService + Clone,
    K: CredentialStore + Clone,
{
    /// Create a new environment.
    #[must_use]
    pub const fn new(catalog: C, auth: A, credentials: K) -> Self {
        Self {
            catalog,
            auth,
            credentials,
        }
    }
}

/// Environment backed by the HTTP services and a local credential store.
pub type HttpEnvironment = AppEnvironment<HttpCatalogService, HttpAuthService, LocalCredentialStore>;

impl HttpEnvironment {
    /// Build the production environment from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            HttpCatalogService::from_config(config)?,
            HttpAuthService::from_config(config)?,
            LocalCredentialStore::from_config(config),
        ))
    }
}
