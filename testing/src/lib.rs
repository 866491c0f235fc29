//! # Catalog Sync Testing
//!
//! Testing utilities and helpers for the catalog sync engine.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: effect assertion helpers
//! - [`run_effects`] and [`settle`]: drive effects without a Store
//! - [`init_tracing`]: test-friendly log output
//!
//! ## Example
//!
//! ```ignore
//! use catalog_sync_testing::{settle, ReducerTest};
//!
//! #[test]
//! fn fetch_settles() {
//!     let env = test_environment();
//!     let mut state = CatalogState::default();
//!
//!     let feedback = tokio_test::block_on(settle(
//!         &CatalogReducer,
//!         &mut state,
//!         CatalogAction::FetchStarted { request_id },
//!         &env,
//!     ));
//!
//!     assert_eq!(feedback.len(), 1);
//!     assert!(!state.loading);
//! }
//! ```

pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

use catalog_sync_core::{effect::Effect, reducer::Reducer};
use std::collections::VecDeque;

/// Execute effects in place and collect the actions they produce.
///
/// Effects are run one at a time, depth first, in the order given.
/// `Parallel` children are therefore run sequentially, and `Delay` actions are
/// collected without sleeping. Produced actions are *not* reduced.
pub async fn run_effects<A, I>(effects: I) -> Vec<A>
where
    I: IntoIterator<Item = Effect<A>>,
{
    let mut queue: VecDeque<Effect<A>> = effects.into_iter().collect();
    let mut produced = Vec::new();

    while let Some(effect) = queue.pop_front() {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    produced.push(action);
                }
            },
            Effect::Delay { action, .. } => produced.push(*action),
            Effect::Parallel(children) | Effect::Sequential(children) => {
                for child in children.into_iter().rev() {
                    queue.push_front(child);
                }
            },
        }
    }

    produced
}

/// Fold `action` and every action its effects produce, until nothing is left.
///
/// Returns the feedback actions in the order they were folded. This is the
/// Store's feedback loop without concurrency, so completion order is the
/// effect order.
pub async fn settle<R>(
    reducer: &R,
    state: &mut R::State,
    action: R::Action,
    env: &R::Environment,
) -> Vec<R::Action>
where
    R: Reducer,
    R::Action: Clone,
{
    let effects = reducer.reduce(state, action, env);
    let mut pending: VecDeque<R::Action> = run_effects(effects).await.into();
    let mut folded = Vec::new();

    while let Some(next) = pending.pop_front() {
        folded.push(next.clone());
        let effects = reducer.reduce(state, next, env);
        pending.extend(run_effects(effects).await);
    }

    folded
}

/// Route `tracing` output to the test harness.
///
/// Honors `RUST_LOG`, defaulting to `debug`. Safe to call from every test;
/// only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}
