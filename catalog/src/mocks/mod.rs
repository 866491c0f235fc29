//! Mock provider implementations for testing.
//!
//! In-memory, scriptable implementations of every provider trait. Failures
//! and delays are queued per call, so tests can decide how each remote call
//! settles and in which order.

pub mod auth;
pub mod catalog;
pub mod credentials;

pub use auth::MockAuthService;
pub use catalog::{CatalogCall, MockCatalogService};
pub use credentials::MockCredentialStore;

use crate::environment::AppEnvironment;

/// Environment wired entirely to mocks.
pub type MockEnvironment = AppEnvironment<MockCatalogService, MockAuthService, MockCredentialStore>;

/// Mock environment with the sample catalog, the sample account and an
/// empty credential store.
#[must_use]
pub fn test_environment() -> MockEnvironment {
    AppEnvironment::new(
        MockCatalogService::new(),
        MockAuthService::new(),
        MockCredentialStore::new(),
    )
}
