//! App-level state and routing.
//!
//! The Store holds one [`AppState`]: a snapshot per domain behind an `Arc`.
//! [`AppReducer`] routes each action to its domain reducer and replaces only
//! that domain's snapshot, so a domain that did not change keeps its `Arc`
//! identity across folds.

use crate::environment::AppEnvironment;
use crate::products::{CatalogAction, CatalogReducer, CatalogState};
use crate::providers::{AuthService, CatalogService, CredentialStore};
use crate::session::{SessionAction, SessionReducer, SessionState};
use crate::types::RequestId;
use catalog_sync_core::{composition::lift_effects, effect::Effect, reducer::Reducer, SmallVec};
use std::sync::Arc;

/// Snapshot of every domain.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Session domain
    pub session: Arc<SessionState>,
    /// Catalog domain
    pub catalog: Arc<CatalogState>,
}

/// Domain selector for [`AppState::domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Session domain
    Session,
    /// Catalog domain
    Catalog,
}

/// One domain's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainSnapshot {
    /// Session snapshot
    Session(Arc<SessionState>),
    /// Catalog snapshot
    Catalog(Arc<CatalogState>),
}

impl AppState {
    /// Snapshot of `domain`.
    #[must_use]
    pub fn domain(&self, domain: Domain) -> DomainSnapshot {
        match domain {
            Domain::Session => DomainSnapshot::Session(Arc::clone(&self.session)),
            Domain::Catalog => DomainSnapshot::Catalog(Arc::clone(&self.catalog)),
        }
    }
}

/// Every action the Store understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Session domain action
    Session(SessionAction),
    /// Catalog domain action
    Catalog(CatalogAction),
}

impl AppAction {
    /// Domain the action belongs to.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        match self {
            Self::Session(_) => Domain::Session,
            Self::Catalog(_) => Domain::Catalog,
        }
    }

    /// Invocation id of the operation the action belongs to.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::Session(action) => action.request_id(),
            Self::Catalog(action) => action.request_id(),
        }
    }

    /// `true` for success and failure phases.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        match self {
            Self::Session(action) => action.is_settled(),
            Self::Catalog(action) => action.is_settled(),
        }
    }

    /// `true` if this action settles the invocation `request_id`.
    #[must_use]
    pub fn settles(&self, request_id: RequestId) -> bool {
        self.is_settled() && self.request_id() == request_id
    }
}

/// Routes app actions to the session and catalog reducers.
pub struct AppReducer<C, A, K> {
    session: SessionReducer<C, A, K>,
    catalog: CatalogReducer<C, A, K>,
}

impl<C, A, K> AppReducer<C, A, K> {
    /// Create a new app reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: SessionReducer::new(),
            catalog: CatalogReducer::new(),
        }
    }
}

impl<C, A, K> Default for AppReducer<C, A, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A, K> Clone for AppReducer<C, A, K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<C, A, K> Reducer for AppReducer<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment<C, A, K>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Session(action) => {
                let effects = self
                    .session
                    .reduce(Arc::make_mut(&mut state.session), action, env);
                lift_effects(effects, AppAction::Session)
            },
            AppAction::Catalog(action) => {
                let effects = self
                    .catalog
                    .reduce(Arc::make_mut(&mut state.catalog), action, env);
                lift_effects(effects, AppAction::Catalog)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{test_environment, MockAuthService, MockCatalogService, MockCredentialStore};
    use crate::products::CatalogStatus;
    use crate::types::{Product, ProductId};
    use catalog_sync_testing::ReducerTest;

    type TestReducer = AppReducer<MockCatalogService, MockAuthService, MockCredentialStore>;

    fn fetch_succeeded() -> AppAction {
        AppAction::Catalog(CatalogAction::FetchSucceeded {
            request_id: RequestId::new(1),
            items: vec![Product::new(ProductId::new(1), "Pen", 2)],
        })
    }

    #[test]
    fn test_untouched_domain_keeps_identity() {
        let before = AppState::default();
        let session = Arc::clone(&before.session);

        // The harness hands the reducer its own copy, like the Store does
        let mut state = before.clone();
        let _ = TestReducer::new().reduce(&mut state, fetch_succeeded(), &test_environment());

        assert!(Arc::ptr_eq(&state.session, &session));
        assert!(!Arc::ptr_eq(&state.catalog, &before.catalog));
        assert_eq!(before.catalog.items.len(), 0);
        assert_eq!(state.catalog.items.len(), 1);
    }

    #[test]
    fn test_routes_catalog_actions() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(AppState::default())
            .when_action(AppAction::Catalog(CatalogAction::FetchStarted {
                request_id: RequestId::new(2),
            }))
            .then_state(|state| {
                assert_eq!(state.catalog.status(), CatalogStatus::Loading);
                assert!(!state.session.loading);
            })
            .run();
    }

    #[test]
    fn test_domain_snapshot_selects_domain() {
        let state = AppState::default();
        assert!(matches!(
            state.domain(Domain::Session),
            DomainSnapshot::Session(s) if Arc::ptr_eq(&s, &state.session)
        ));
        assert!(matches!(
            state.domain(Domain::Catalog),
            DomainSnapshot::Catalog(c) if Arc::ptr_eq(&c, &state.catalog)
        ));
    }

    #[test]
    fn test_settles_matches_only_its_invocation() {
        let action = fetch_succeeded();
        assert_eq!(action.domain(), Domain::Catalog);
        assert!(action.settles(RequestId::new(1)));
        assert!(!action.settles(RequestId::new(2)));

        let started = AppAction::Catalog(CatalogAction::FetchStarted {
            request_id: RequestId::new(1),
        });
        assert!(!started.settles(RequestId::new(1)));
    }
}
