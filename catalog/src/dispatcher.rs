//! Dispatcher: the entry point a UI binds to.
//!
//! The dispatcher owns the Store. Each operation allocates a fresh
//! [`RequestId`], sends the start action and waits for the settle action
//! carrying the same id, so concurrent invocations of the same operation
//! never observe each other's results. By the time an operation returns, its
//! settle action has been folded and subscribers have seen the new snapshot.

use crate::app::{AppAction, AppReducer, AppState, Domain, DomainSnapshot};
use crate::config::ClientConfig;
use crate::environment::AppEnvironment;
use crate::products::{CatalogAction, CatalogState};
use crate::providers::{AuthService, CatalogService, CredentialStore};
use crate::session::{SessionAction, SessionState};
use crate::types::{
    Credentials, Outcome, Product, ProductDraft, ProductId, ProductPatch, RequestId, User,
};
use catalog_sync_runtime::{Store, StoreError, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Store specialised to the client's state, actions and reducer.
pub type AppStore<C, A, K> = Store<AppState, AppAction, AppEnvironment<C, A, K>, AppReducer<C, A, K>>;

/// Where a client should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// No user and no stored token: ask for credentials
    Login,
    /// A user or a stored token exists: load the catalog
    Catalog,
}

/// Issues operations against the Store and reports how they settled.
pub struct Dispatcher<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    store: AppStore<C, A, K>,
    credentials: K,
    next_request: Arc<AtomicU64>,
    settle_timeout: Duration,
}

impl<C, A, K> Dispatcher<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    /// Create a dispatcher with an empty Store over `environment`.
    #[must_use]
    pub fn new(environment: AppEnvironment<C, A, K>, config: &ClientConfig) -> Self {
        let credentials = environment.credentials.clone();
        let store = Store::with_config(
            AppState::default(),
            AppReducer::new(),
            environment,
            config.store_config(),
        );

        Self {
            store,
            credentials,
            next_request: Arc::new(AtomicU64::new(1)),
            settle_timeout: config.settle_timeout,
        }
    }

    /// The underlying Store.
    #[must_use]
    pub const fn store(&self) -> &AppStore<C, A, K> {
        &self.store
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Send a start action and wait for the action that settles it.
    async fn run<P>(&self, start: AppAction, settled: P) -> Result<AppAction, StoreError>
    where
        P: Fn(&AppAction) -> bool + Send + Sync + 'static,
    {
        let request_id = start.request_id();
        self.store
            .send_and_wait_for(
                start,
                move |action| action.settles(request_id) && settled(action),
                self.settle_timeout,
            )
            .await
    }

    /// Log in and persist the session token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the Store is shutting down or the login does
    /// not settle within the configured settle timeout. A rejected login is
    /// an `Ok(Outcome::Rejected(..))`.
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<Outcome<User>, StoreError> {
        let request_id = self.next_request_id();
        let start = AppAction::Session(SessionAction::LoginStarted {
            request_id,
            credentials,
        });

        let settled = self
            .run(start, |action| matches!(action, AppAction::Session(_)))
            .await?;

        let outcome = match settled {
            AppAction::Session(SessionAction::LoginSucceeded { user, .. }) => Outcome::Fulfilled(user),
            AppAction::Session(SessionAction::LoginFailed { error, .. }) => Outcome::Rejected(error),
            _ => unreachable!("Predicate ensures only terminal actions"),
        };

        log_outcome(request_id, "login", &outcome);
        Ok(outcome)
    }

    /// Fetch the whole catalog, replacing the local collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the Store is shutting down or the fetch does
    /// not settle within the configured settle timeout.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_products(&self) -> Result<Outcome<Vec<Product>>, StoreError> {
        let request_id = self.next_request_id();
        let start = AppAction::Catalog(CatalogAction::FetchStarted { request_id });

        let settled = self
            .run(start, |action| matches!(action, AppAction::Catalog(_)))
            .await?;

        let outcome = match settled {
            AppAction::Catalog(CatalogAction::FetchSucceeded { items, .. }) => Outcome::Fulfilled(items),
            AppAction::Catalog(CatalogAction::FetchFailed { error, .. }) => Outcome::Rejected(error),
            _ => unreachable!("Predicate ensures only terminal actions"),
        };

        log_outcome(request_id, "fetch", &outcome);
        Ok(outcome)
    }

    /// Create a product and append the remote's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the Store is shutting down or the add does
    /// not settle within the configured settle timeout.
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn add_product(&self, draft: ProductDraft) -> Result<Outcome<Product>, StoreError> {
        let request_id = self.next_request_id();
        let start = AppAction::Catalog(CatalogAction::AddStarted { request_id, draft });

        let settled = self
            .run(start, |action| matches!(action, AppAction::Catalog(_)))
            .await?;

        let outcome = match settled {
            AppAction::Catalog(CatalogAction::AddSucceeded { product, .. }) => Outcome::Fulfilled(product),
            AppAction::Catalog(CatalogAction::AddFailed { error, .. }) => Outcome::Rejected(error),
            _ => unreachable!("Predicate ensures only terminal actions"),
        };

        log_outcome(request_id, "add", &outcome);
        Ok(outcome)
    }

    /// Update a product and replace the local record in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the Store is shutting down or the update
    /// does not settle within the configured settle timeout.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Outcome<Product>, StoreError> {
        let request_id = self.next_request_id();
        let start = AppAction::Catalog(CatalogAction::UpdateStarted {
            request_id,
            id,
            patch,
        });

        let settled = self
            .run(start, |action| matches!(action, AppAction::Catalog(_)))
            .await?;

        let outcome = match settled {
            AppAction::Catalog(CatalogAction::UpdateSucceeded { product, .. }) => Outcome::Fulfilled(product),
            AppAction::Catalog(CatalogAction::UpdateFailed { error, .. }) => Outcome::Rejected(error),
            _ => unreachable!("Predicate ensures only terminal actions"),
        };

        log_outcome(request_id, "update", &outcome);
        Ok(outcome)
    }

    /// Delete a product and remove the local record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the Store is shutting down or the delete
    /// does not settle within the configured settle timeout.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<Outcome<ProductId>, StoreError> {
        let request_id = self.next_request_id();
        let start = AppAction::Catalog(CatalogAction::DeleteStarted { request_id, id });

        let settled = self
            .run(start, |action| matches!(action, AppAction::Catalog(_)))
            .await?;

        let outcome = match settled {
            AppAction::Catalog(CatalogAction::DeleteSucceeded { id, .. }) => Outcome::Fulfilled(id),
            AppAction::Catalog(CatalogAction::DeleteFailed { error, .. }) => Outcome::Rejected(error),
            _ => unreachable!("Predicate ensures only terminal actions"),
        };

        log_outcome(request_id, "delete", &outcome);
        Ok(outcome)
    }

    /// Current snapshot of every domain.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AppState> {
        self.store.snapshot()
    }

    /// Current snapshot of one domain.
    #[must_use]
    pub fn snapshot_of(&self, domain: Domain) -> DomainSnapshot {
        self.store.state(|state| state.domain(domain))
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Arc<SessionState> {
        self.store.state(|state| Arc::clone(&state.session))
    }

    /// Current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogState> {
        self.store.state(|state| Arc::clone(&state.catalog))
    }

    /// Call `callback` after every snapshot replacement.
    ///
    /// See [`Store::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        self.store.subscribe(callback)
    }

    /// Watch snapshots from async code.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<AppState>> {
        self.store.watch()
    }

    /// Decide where a client should start.
    ///
    /// A logged-in user or a stored token leads to the catalog; otherwise
    /// the client should ask for credentials. An unreadable credential store
    /// counts as no token.
    pub async fn landing(&self) -> Landing {
        if self.session().is_authenticated() {
            return Landing::Catalog;
        }

        match self.credentials.load().await {
            Ok(Some(_)) => Landing::Catalog,
            Ok(None) => Landing::Login,
            Err(error) => {
                tracing::warn!(%error, "Could not read stored token");
                Landing::Login
            },
        }
    }

    /// Stop accepting operations and wait for in-flight ones to settle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if operations are still in
    /// flight when the configured shutdown timeout expires.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.store.shutdown_default().await
    }
}

impl<C, A, K> Clone for Dispatcher<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            credentials: self.credentials.clone(),
            next_request: Arc::clone(&self.next_request),
            settle_timeout: self.settle_timeout,
        }
    }
}

fn log_outcome<T>(request_id: RequestId, operation: &'static str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Fulfilled(_) => tracing::info!(%request_id, operation, "Operation fulfilled"),
        Outcome::Rejected(error) => {
            tracing::warn!(%request_id, operation, %error, "Operation rejected");
        },
    }
}
