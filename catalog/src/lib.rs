//! # Catalog Client
//!
//! Session and product catalog synchronization built on the catalog sync
//! Store.
//!
//! Two domains live in one Store:
//!
//! - **Session** ([`session`]): the logged-in user, a login in flight, the
//!   last login error
//! - **Catalog** ([`products`]): the local product collection, a fetch in
//!   flight, the last fetch error
//!
//! Every remote operation runs in three phases: a start action folded
//! immediately, a remote call executed as an effect, and a settle action
//! (success or failure) folded when the call finishes. The [`Dispatcher`]
//! issues operations and returns how each one settled.
//!
//! ## Example
//!
//! ```no_run
//! use catalog_client::{ClientConfig, Credentials, Dispatcher, HttpEnvironment, Outcome};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let dispatcher = Dispatcher::new(HttpEnvironment::from_config(&config)?, &config);
//!
//! let _subscription = dispatcher.subscribe(|state| {
//!     println!("{} products", state.catalog.items.len());
//! });
//!
//! if let Outcome::Fulfilled(user) = dispatcher
//!     .login(Credentials::new("emilys", "emilyspass"))
//!     .await?
//! {
//!     println!("Welcome, {}", user.display_name());
//!     dispatcher.fetch_products().await?;
//! }
//!
//! dispatcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod products;
pub mod providers;
pub mod session;
pub mod types;

/// Mock providers (feature `test-utils`)
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use app::{AppAction, AppReducer, AppState, Domain, DomainSnapshot};
pub use config::ClientConfig;
pub use dispatcher::{AppStore, Dispatcher, Landing};
pub use environment::{AppEnvironment, HttpEnvironment};
pub use error::{ConfigError, CredentialError, OperationFailed, TransportError};
pub use products::{CatalogAction, CatalogReducer, CatalogState, CatalogStatus};
pub use session::{SessionAction, SessionReducer, SessionState};
pub use types::{
    Credentials, LoginResponse, Outcome, Price, Product, ProductDraft, ProductId, ProductPatch,
    RequestId, User,
};
