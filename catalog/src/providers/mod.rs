//! Remote and local service providers.
//!
//! Reducers never call these directly. They capture a clone of the provider
//! from the environment inside an effect, and the Store runtime runs it.
//!
//! Implementations:
//! - HTTP ([`http`]): the DummyJSON-style REST catalog and auth endpoints
//! - File ([`file`]): token persistence on the local filesystem
//! - Mocks (`crate::mocks`, feature `test-utils`): in-memory, scriptable

use crate::error::{CredentialError, TransportError};
use crate::types::{Credentials, LoginResponse, Product, ProductDraft, ProductId, ProductPatch};
use std::future::Future;

pub mod file;
pub mod http;

pub use file::{FileCredentialStore, LocalCredentialStore, MemoryCredentialStore};
pub use http::{HttpAuthService, HttpCatalogService};

/// Remote product catalog.
pub trait CatalogService: Send + Sync {
    /// List every product.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails or the body is invalid.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, TransportError>> + Send;

    /// Create a product; the remote assigns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails or the body is invalid.
    fn create_product(
        &self,
        draft: ProductDraft,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send;

    /// Apply `patch` to the product with `id` and return the full record.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails, the product does not
    /// exist remotely, or the body is invalid.
    fn replace_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send;

    /// Delete the product with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the request fails.
    fn delete_product(&self, id: ProductId)
        -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Remote authentication.
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a token and profile.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the credentials are rejected or the
    /// request fails.
    fn login(
        &self,
        credentials: Credentials,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send;
}

/// Persistence for the opaque session token.
pub trait CredentialStore: Send + Sync {
    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the token cannot be written.
    fn save(&self, token: &str) -> impl Future<Output = Result<(), CredentialError>> + Send;

    /// Load the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the store cannot be read.
    fn load(&self) -> impl Future<Output = Result<Option<String>, CredentialError>> + Send;
}
