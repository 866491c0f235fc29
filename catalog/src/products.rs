//! Catalog domain: the product collection and the lifecycle of its four
//! remote operations.
//!
//! # Merge rules
//!
//! | Operation | On success |
//! |---|---|
//! | fetch | replace `items` with the payload |
//! | add | append the payload |
//! | update | replace the record with the payload's id in place; no-op if absent |
//! | delete | remove the record with the payload id; no-op if absent |
//!
//! Only fetch touches `loading` and `error`. A failed add, update or delete
//! leaves state untouched; its failure reaches the caller through the
//! dispatcher's outcome.

use crate::environment::AppEnvironment;
use crate::error::OperationFailed;
use crate::providers::{AuthService, CatalogService, CredentialStore};
use crate::types::{Product, ProductDraft, ProductId, ProductPatch, RequestId};
use catalog_sync_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    /// Products in fetch/insertion order.
    pub items: Vec<Product>,
    /// `true` strictly between a fetch start and its settle.
    pub loading: bool,
    /// Message of the last failed fetch.
    pub error: Option<String>,
}

/// What a presentation layer should render for the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus<'a> {
    /// A fetch is in flight
    Loading,
    /// The last fetch failed
    Failed(&'a str),
    /// Items are ready to show
    Ready,
}

impl CatalogState {
    /// Find a product by id.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Products whose title contains `query`, ignoring case.
    ///
    /// An empty query matches everything. Order is preserved.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Render branch: loading wins over a stale error.
    #[must_use]
    pub fn status(&self) -> CatalogStatus<'_> {
        if self.loading {
            CatalogStatus::Loading
        } else if let Some(error) = &self.error {
            CatalogStatus::Failed(error)
        } else {
            CatalogStatus::Ready
        }
    }
}

/// Catalog actions. Every operation has a start and two settle phases.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogAction {
    /// A fetch was dispatched.
    FetchStarted {
        /// Invocation id
        request_id: RequestId,
    },
    /// The fetch succeeded.
    FetchSucceeded {
        /// Invocation id
        request_id: RequestId,
        /// The complete collection
        items: Vec<Product>,
    },
    /// The fetch failed.
    FetchFailed {
        /// Invocation id
        request_id: RequestId,
        /// Failure folded into state
        error: OperationFailed,
    },

    /// An add was dispatched.
    AddStarted {
        /// Invocation id
        request_id: RequestId,
        /// Product to create
        draft: ProductDraft,
    },
    /// The add succeeded.
    AddSucceeded {
        /// Invocation id
        request_id: RequestId,
        /// Created record, as returned by the remote
        product: Product,
    },
    /// The add failed.
    AddFailed {
        /// Invocation id
        request_id: RequestId,
        /// Failure message
        error: OperationFailed,
    },

    /// An update was dispatched.
    UpdateStarted {
        /// Invocation id
        request_id: RequestId,
        /// Record to update
        id: ProductId,
        /// Fields to change
        patch: ProductPatch,
    },
    /// The update succeeded.
    UpdateSucceeded {
        /// Invocation id
        request_id: RequestId,
        /// Updated record, as returned by the remote
        product: Product,
    },
    /// The update failed.
    UpdateFailed {
        /// Invocation id
        request_id: RequestId,
        /// Failure message
        error: OperationFailed,
    },

    /// A delete was dispatched.
    DeleteStarted {
        /// Invocation id
        request_id: RequestId,
        /// Record to delete
        id: ProductId,
    },
    /// The delete succeeded.
    DeleteSucceeded {
        /// Invocation id
        request_id: RequestId,
        /// Deleted record id
        id: ProductId,
    },
    /// The delete failed.
    DeleteFailed {
        /// Invocation id
        request_id: RequestId,
        /// Failure message
        error: OperationFailed,
    },
}

impl CatalogAction {
    /// Invocation id carried by every phase.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::FetchStarted { request_id }
            | Self::FetchSucceeded { request_id, .. }
            | Self::FetchFailed { request_id, .. }
            | Self::AddStarted { request_id, .. }
            | Self::AddSucceeded { request_id, .. }
            | Self::AddFailed { request_id, .. }
            | Self::UpdateStarted { request_id, .. }
            | Self::UpdateSucceeded { request_id, .. }
            | Self::UpdateFailed { request_id, .. }
            | Self::DeleteStarted { request_id, .. }
            | Self::DeleteSucceeded { request_id, .. }
            | Self::DeleteFailed { request_id, .. } => *request_id,
        }
    }

    /// `true` for success and failure phases.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(
            self,
            Self::FetchStarted { .. }
                | Self::AddStarted { .. }
                | Self::UpdateStarted { .. }
                | Self::DeleteStarted { .. }
        )
    }
}

/// Catalog reducer.
pub struct CatalogReducer<C, A, K> {
    _phantom: std::marker::PhantomData<(C, A, K)>,
}

impl<C, A, K> CatalogReducer<C, A, K> {
    /// Create a new catalog reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C, A, K> Default for CatalogReducer<C, A, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A, K> Clone for CatalogReducer<C, A, K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Run a remote call and map its result to a settle action.
fn remote<T, Fut, S, F>(call: Fut, succeeded: S, failed: F) -> Effect<CatalogAction>
where
    Fut: std::future::Future<Output = Result<T, crate::error::TransportError>> + Send + 'static,
    S: FnOnce(T) -> CatalogAction + Send + 'static,
    F: FnOnce(OperationFailed) -> CatalogAction + Send + 'static,
{
    async_effect! {
        Some(match call.await {
            Ok(value) => succeeded(value),
            Err(error) => failed(error.into()),
        })
    }
}

impl<C, A, K> Reducer for CatalogReducer<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    type State = CatalogState;
    type Action = CatalogAction;
    type Environment = AppEnvironment<C, A, K>;

    #[allow(clippy::too_many_lines)] // one arm per operation phase
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════
            // Fetch
            // ═══════════════════════════════════════════════════════════
            CatalogAction::FetchStarted { request_id } => {
                state.loading = true;

                let catalog = env.catalog.clone();
                smallvec![remote(
                    async move { catalog.list_products().await },
                    move |items| CatalogAction::FetchSucceeded { request_id, items },
                    move |error| CatalogAction::FetchFailed { request_id, error },
                )]
            },

            CatalogAction::FetchSucceeded { request_id, items } => {
                tracing::debug!(%request_id, count = items.len(), "Catalog fetched");
                state.items = items;
                state.loading = false;
                state.error = None;
                smallvec![Effect::None]
            },

            CatalogAction::FetchFailed { request_id, error } => {
                tracing::debug!(%request_id, %error, "Catalog fetch failed");
                state.error = Some(error.0);
                state.loading = false;
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════
            // Add
            // ═══════════════════════════════════════════════════════════
            CatalogAction::AddStarted { request_id, draft } => {
                let catalog = env.catalog.clone();
                smallvec![remote(
                    async move { catalog.create_product(draft).await },
                    move |product| CatalogAction::AddSucceeded { request_id, product },
                    move |error| CatalogAction::AddFailed { request_id, error },
                )]
            },

            CatalogAction::AddSucceeded { request_id, product } => {
                tracing::debug!(%request_id, id = %product.id, "Product added");
                state.items.push(product);
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════
            // Update
            // ═══════════════════════════════════════════════════════════
            CatalogAction::UpdateStarted {
                request_id,
                id,
                patch,
            } => {
                let catalog = env.catalog.clone();
                smallvec![remote(
                    async move { catalog.replace_product(id, patch).await },
                    move |product| CatalogAction::UpdateSucceeded { request_id, product },
                    move |error| CatalogAction::UpdateFailed { request_id, error },
                )]
            },

            CatalogAction::UpdateSucceeded { request_id, product } => {
                if let Some(slot) = state.items.iter_mut().find(|item| item.id == product.id) {
                    tracing::debug!(%request_id, id = %product.id, "Product updated");
                    *slot = product;
                } else {
                    tracing::debug!(%request_id, id = %product.id, "Updated product not in catalog");
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════
            // Delete
            // ═══════════════════════════════════════════════════════════
            CatalogAction::DeleteStarted { request_id, id } => {
                let catalog = env.catalog.clone();
                smallvec![remote(
                    async move { catalog.delete_product(id).await },
                    move |()| CatalogAction::DeleteSucceeded { request_id, id },
                    move |error| CatalogAction::DeleteFailed { request_id, error },
                )]
            },

            CatalogAction::DeleteSucceeded { request_id, id } => {
                tracing::debug!(%request_id, %id, "Product deleted");
                state.items.retain(|item| item.id != id);
                smallvec![Effect::None]
            },

            // Mutation failures are reported to the caller, not stored
            CatalogAction::AddFailed { request_id, error }
            | CatalogAction::UpdateFailed { request_id, error }
            | CatalogAction::DeleteFailed { request_id, error } => {
                tracing::warn!(%request_id, %error, "Catalog mutation rejected");
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::{test_environment, MockAuthService, MockCatalogService, MockCredentialStore};
    use catalog_sync_testing::{assertions, settle, ReducerTest};

    type TestReducer = CatalogReducer<MockCatalogService, MockAuthService, MockCredentialStore>;

    fn rid(id: u64) -> RequestId {
        RequestId::new(id)
    }

    fn pen() -> Product {
        Product::new(ProductId::new(1), "Pen", 2)
    }

    fn given(items: Vec<Product>) -> CatalogState {
        CatalogState {
            items,
            ..CatalogState::default()
        }
    }

    /// Fetch sets loading, then the payload replaces the collection
    #[test]
    fn test_fetch_start_then_success() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(CatalogState::default())
            .when_action(CatalogAction::FetchStarted { request_id: rid(1) })
            .then_state(|state| {
                assert!(state.loading);
                assert!(state.items.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(CatalogState::default())
            .when_actions([
                CatalogAction::FetchStarted { request_id: rid(1) },
                CatalogAction::FetchSucceeded {
                    request_id: rid(1),
                    items: vec![pen()],
                },
            ])
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(state.items, vec![pen()]);
            })
            .run();
    }

    /// An updated record keeps its position among its neighbours
    #[test]
    fn test_update_success_replaces_in_place() {
        let pencil = Product::new(ProductId::new(1), "Pencil", 1);
        let marker = Product::new(ProductId::new(2), "Marker", 3);

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(given(vec![pen(), marker.clone()]))
            .when_action(CatalogAction::UpdateSucceeded {
                request_id: rid(2),
                product: pencil.clone(),
            })
            .then_state(move |state| {
                assert_eq!(state.items, vec![pencil, marker]);
            })
            .run();
    }

    /// Deleting the only record empties the collection
    #[test]
    fn test_delete_success_removes_record() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(given(vec![pen()]))
            .when_action(CatalogAction::DeleteSucceeded {
                request_id: rid(3),
                id: ProductId::new(1),
            })
            .then_state(|state| {
                assert!(state.items.is_empty());
            })
            .run();
    }

    /// Identical add results are both appended, never deduplicated
    #[test]
    fn test_duplicate_adds_are_kept() {
        let marker = Product::new(ProductId::new(2), "Marker", 3);

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(CatalogState::default())
            .when_actions([
                CatalogAction::AddSucceeded {
                    request_id: rid(4),
                    product: marker.clone(),
                },
                CatalogAction::AddSucceeded {
                    request_id: rid(5),
                    product: marker.clone(),
                },
            ])
            .then_state(move |state| {
                assert_eq!(state.items, vec![marker.clone(), marker]);
            })
            .run();
    }

    #[test]
    fn test_fetch_failure_sets_error_and_keeps_items() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(given(vec![pen()]))
            .when_actions([
                CatalogAction::FetchStarted { request_id: rid(6) },
                CatalogAction::FetchFailed {
                    request_id: rid(6),
                    error: OperationFailed::new("Network Error"),
                },
            ])
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(state.error.as_deref(), Some("Network Error"));
                assert_eq!(state.items, vec![pen()]);
            })
            .run();
    }

    #[test]
    fn test_fetch_error_survives_until_next_fetch_settles() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(CatalogState {
                error: Some("Network Error".to_string()),
                ..CatalogState::default()
            })
            .when_action(CatalogAction::FetchStarted { request_id: rid(7) })
            .then_state(|state| {
                assert_eq!(state.error.as_deref(), Some("Network Error"));
                assert_eq!(state.status(), CatalogStatus::Loading);
            })
            .run();

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(CatalogState {
                error: Some("Network Error".to_string()),
                ..CatalogState::default()
            })
            .when_actions([
                CatalogAction::FetchStarted { request_id: rid(7) },
                CatalogAction::FetchSucceeded {
                    request_id: rid(7),
                    items: vec![],
                },
            ])
            .then_state(|state| {
                assert_eq!(state.error, None);
                assert_eq!(state.status(), CatalogStatus::Ready);
            })
            .run();
    }

    #[test]
    fn test_mutations_never_touch_loading_or_error() {
        let starts = [
            CatalogAction::AddStarted {
                request_id: rid(8),
                draft: ProductDraft::new("Ink", 4),
            },
            CatalogAction::UpdateStarted {
                request_id: rid(9),
                id: ProductId::new(1),
                patch: ProductPatch::default().with_price(5),
            },
            CatalogAction::DeleteStarted {
                request_id: rid(10),
                id: ProductId::new(1),
            },
            CatalogAction::AddFailed {
                request_id: rid(8),
                error: OperationFailed::new("boom"),
            },
        ];

        for loading in [false, true] {
            for action in starts.clone() {
                ReducerTest::new(TestReducer::new())
                    .with_env(test_environment())
                    .given_state(CatalogState {
                        items: vec![pen()],
                        loading,
                        error: None,
                    })
                    .when_action(action)
                    .then_state(move |state| {
                        assert_eq!(state.loading, loading);
                        assert_eq!(state.error, None);
                        assert_eq!(state.items, vec![pen()]);
                    })
                    .run();
            }
        }
    }

    #[test]
    fn test_update_of_missing_record_is_noop() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(given(vec![pen()]))
            .when_action(CatalogAction::UpdateSucceeded {
                request_id: rid(11),
                product: Product::new(ProductId::new(99), "Ghost", 0),
            })
            .then_state(|state| {
                assert_eq!(state.items, vec![pen()]);
            })
            .run();
    }

    #[test]
    fn test_add_effect_appends_remote_record() {
        let env = test_environment();
        let mut state = given(vec![pen()]);

        let feedback = tokio_test::block_on(settle(
            &TestReducer::new(),
            &mut state,
            CatalogAction::AddStarted {
                request_id: rid(12),
                draft: ProductDraft::new("Ink", 4),
            },
            &env,
        ));

        let [CatalogAction::AddSucceeded { product, .. }] = &feedback[..] else {
            panic!("unexpected feedback: {feedback:?}");
        };
        assert_eq!(product.title, "Ink");
        assert_eq!(state.items.len(), 2);
        assert_eq!(state.items.last(), Some(product));
    }

    #[test]
    fn test_update_effect_sends_patch() {
        let env = test_environment();
        let mut state = CatalogState::default();
        tokio_test::block_on(settle(
            &TestReducer::new(),
            &mut state,
            CatalogAction::FetchStarted { request_id: rid(13) },
            &env,
        ));
        let first = state.items[0].clone();

        tokio_test::block_on(settle(
            &TestReducer::new(),
            &mut state,
            CatalogAction::UpdateStarted {
                request_id: rid(14),
                id: first.id,
                patch: ProductPatch::default().with_title("Renamed"),
            },
            &env,
        ));

        assert_eq!(state.items[0].title, "Renamed");
        assert_eq!(state.items[0].price, first.price);
    }

    #[test]
    fn test_remote_failure_becomes_failed_action() {
        let env = test_environment();
        env.catalog.fail_next("Request failed with status code 404");
        let mut state = given(vec![pen()]);

        let feedback = tokio_test::block_on(settle(
            &TestReducer::new(),
            &mut state,
            CatalogAction::DeleteStarted {
                request_id: rid(15),
                id: ProductId::new(1),
            },
            &env,
        ));

        assert_eq!(
            feedback,
            vec![CatalogAction::DeleteFailed {
                request_id: rid(15),
                error: OperationFailed::new("Request failed with status code 404"),
            }]
        );
        assert_eq!(state.items, vec![pen()]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let state = given(vec![
            Product::new(ProductId::new(1), "Red Pen", 2),
            Product::new(ProductId::new(2), "Marker", 3),
            Product::new(ProductId::new(3), "PENCIL", 1),
        ]);

        let titles: Vec<_> = state.search("pen").iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Red Pen", "PENCIL"]);
        assert_eq!(state.search("").len(), 3);
        assert!(state.search("stapler").is_empty());
    }

    #[test]
    fn test_status_branches() {
        let mut state = CatalogState::default();
        assert_eq!(state.status(), CatalogStatus::Ready);

        state.error = Some("Network Error".into());
        assert_eq!(state.status(), CatalogStatus::Failed("Network Error"));

        state.loading = true;
        assert_eq!(state.status(), CatalogStatus::Loading);
    }

    #[test]
    fn test_action_request_ids() {
        let action = CatalogAction::DeleteSucceeded {
            request_id: rid(16),
            id: ProductId::new(1),
        };
        assert_eq!(action.request_id(), rid(16));
        assert!(action.is_settled());
        assert!(!CatalogAction::FetchStarted { request_id: rid(16) }.is_settled());
    }
}
