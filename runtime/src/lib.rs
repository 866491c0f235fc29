//! # Catalog Sync Runtime
//!
//! Runtime implementation for the catalog synchronization engine.
//!
//! This crate provides the Store that serializes reducer execution, publishes
//! immutable snapshots and executes effects.
//!
//! ## Core Components
//!
//! - **Store**: holds the current snapshot and folds actions into it
//! - **Effect Executor**: runs effect descriptions and feeds actions back
//! - **Subscriptions**: callbacks invoked after every snapshot replacement
//!
//! ## Example
//!
//! ```ignore
//! use catalog_sync_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! let _subscription = store.subscribe(|snapshot| render(snapshot));
//! store.send(Action::DoSomething).await?;
//!
//! let value = store.state(|s| s.some_field);
//! ```

use catalog_sync_core::{effect::Effect, reducer::Reducer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Prometheus metrics for observability
pub mod metrics;

/// Snapshot subscriptions
pub mod subscription;

mod waiters;

pub use subscription::Subscription;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires first.
        #[error("Timeout waiting for action")]
        Timeout,

        /// The reply slot closed before a matching action arrived
        #[error("Reply channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for action observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Waiting on it resolves once every effect
/// started by that action has finished, including the fold of the actions
/// those effects fed back.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context effects report to
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running for this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            self.notifier.send_replace(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Keeps the counter correct even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::metrics::StoreMetrics;
    use super::subscription::{Subscribers, Subscription};
    use super::waiters::Waiters;
    use super::{
        Arc, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect, EffectHandle,
        EffectTracking, Ordering, Reducer, StoreConfig, StoreError,
    };
    use std::sync::atomic::AtomicBool;
    use tokio::sync::{broadcast, watch, Mutex};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. The current snapshot (`Arc<S>`, replaced on every fold, never mutated in place)
    /// 2. Reducer (pure transition logic)
    /// 3. Environment (injected services captured by effects)
    /// 4. Effect execution (with feedback loop)
    /// 5. Subscribers notified after each snapshot replacement
    ///
    /// Reducer applications are serialized: no two folds interleave. Effects
    /// run concurrently on the tokio runtime and their feedback actions are
    /// folded in the order they settle.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        snapshot: Arc<watch::Sender<Arc<S>>>,
        reduce_lock: Arc<Mutex<()>>,
        reducer: R,
        environment: E,
        subscribers: Arc<Subscribers<S>>,
        waiters: Arc<Waiters<A>>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        default_shutdown_timeout: Duration,
        /// Action broadcast channel for observing actions produced by effects.
        ///
        /// Each effect-produced action is broadcast after it has been folded,
        /// so an observer that receives it can already read the new snapshot.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (snapshot, _) = watch::channel(Arc::new(initial_state));

            Self {
                snapshot: Arc::new(snapshot),
                reduce_lock: Arc::new(Mutex::new(())),
                reducer,
                environment,
                subscribers: Arc::new(Subscribers::new()),
                waiters: Arc::new(Waiters::new()),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
            }
        }

        /// Current snapshot
        ///
        /// Never waits for an in-flight remote call; the returned `Arc` is an
        /// immutable view that later folds will not change.
        #[must_use]
        pub fn snapshot(&self) -> Arc<S> {
            Arc::clone(&self.snapshot.borrow())
        }

        /// Read the current snapshot via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.catalog.items.len());
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let snapshot = self.snapshot();
            f(&snapshot)
        }

        /// Register a callback invoked after every snapshot replacement
        ///
        /// Callbacks run synchronously inside the fold, in registration order,
        /// and must not block. The returned [`Subscription`] unsubscribes when
        /// dropped or when [`Subscription::unsubscribe`] is called.
        pub fn subscribe<F>(&self, callback: F) -> Subscription
        where
            F: Fn(&S) + Send + Sync + 'static,
        {
            let subscription = Subscribers::register(&self.subscribers, callback);
            StoreMetrics::record_subscribers(self.subscribers.len());
            subscription
        }

        /// Watch snapshots from async code
        ///
        /// The receiver always holds the latest snapshot; intermediate
        /// snapshots may be skipped by slow readers.
        #[must_use]
        pub fn watch(&self) -> watch::Receiver<Arc<S>> {
            self.snapshot.subscribe()
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Only actions produced by effects are broadcast, never the actions
        /// passed to `send` directly. Each one is broadcast after its fold.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Waits for pending effects to complete (with timeout); actions they
        ///    produce are still folded
        ///
        /// In-flight remote calls are never aborted; shutdown only waits.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Waits for the reduce lock (folds never interleave)
        /// 2. Copies the current snapshot and lets the reducer fold the action into it
        /// 3. Publishes the new snapshot and notifies subscribers
        /// 4. Starts the returned effects; their actions come back through `send`
        ///
        /// `send()` returns once the fold is published and effects are started,
        /// not when the effects complete. Use the returned [`EffectHandle`] to
        /// wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic propagates. Reducers are pure
        /// functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }

            Ok(self.fold(action).await)
        }

        /// Fold one action, publish the snapshot and start its effects
        ///
        /// Skips the shutdown check: actions produced by in-flight effects
        /// still settle while the store drains.
        async fn fold(&self, action: A) -> EffectHandle
        where
            R: Clone,
            E: Clone,
        {
            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let _fold = self.reduce_lock.lock().await;

                // Copy-on-write: the published snapshot is never touched
                let mut next: S = S::clone(&self.snapshot.borrow());

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut next, action, &self.environment);
                StoreMetrics::record_action(start.elapsed());

                let next = Arc::new(next);
                self.snapshot.send_replace(Arc::clone(&next));

                let notified = self.subscribers.notify(&next);
                StoreMetrics::record_notifications(notified);

                tracing::trace!(
                    effects = effects.len(),
                    subscribers = notified,
                    "Snapshot replaced"
                );

                effects
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            handle
        }

        /// Send an action and wait for a matching effect-produced action
        ///
        /// Designed for request-response use: the caller learns how the
        /// operation it started settled. Subscribes before sending so the
        /// result cannot be missed. When the matching action is returned it has
        /// already been folded into the snapshot.
        ///
        /// Concurrent requests of the same kind must be told apart by the
        /// predicate, usually through a request id carried in the actions.
        /// Each waiter has its own reply slot, independent of the action
        /// broadcast capacity, so any number of requests may be in flight.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: timeout expired before a matching action arrived
        /// - [`StoreError::ChannelClosed`]: the reply slot closed without an action
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool + Send + Sync + 'static,
        {
            // Register BEFORE sending so the reply cannot be missed
            let mut ticket = Waiters::register(&self.waiters, predicate);
            StoreMetrics::record_waiters(self.waiters.len());

            self.send(action).await?;

            let reply = tokio::time::timeout(timeout, ticket.recv()).await;
            drop(ticket);
            StoreMetrics::record_waiters(self.waiters.len());

            match reply {
                Ok(Some(action)) => Ok(action),
                Ok(None) => Err(StoreError::ChannelClosed),
                Err(_) => Err(StoreError::Timeout),
            }
        }

        /// Fold an action produced by an effect, then hand it to waiters and
        /// observers
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            let _handle = self.fold(action.clone()).await;
            let delivered = self.waiters.complete(&action);
            if delivered > 0 {
                tracing::trace!(delivered, "Settled waiting requests");
            }
            // No receivers is fine
            let _ = self.action_broadcast.send(action);
        }

        /// Spawn a tracked task on behalf of an effect
        fn spawn_tracked<Fut>(&self, tracking: &EffectTracking, task: Fut)
        where
            Fut: std::future::Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
            let guard = DecrementGuard(tracking.clone());

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                task.await;
            });
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, folds the resulting action if `Some`
        /// - `Delay`: Waits for duration, then folds the action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        ///
        /// Effect failures are the effect's business: a remote call that fails
        /// is expected to resolve to a failure action, never to panic.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into tasks
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    StoreMetrics::record_effect("none");
                },
                Effect::Future(fut) => {
                    StoreMetrics::record_effect("future");
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    StoreMetrics::record_effect("delay");
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    StoreMetrics::record_effect("parallel");
                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    StoreMetrics::record_effect("sequential");
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        let total = effects.len();
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, total);

                            let (mut sub_handle, sub_tracking) = EffectHandle::new();
                            store.execute_effect(effect, sub_tracking);
                            sub_handle.wait().await;
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                snapshot: Arc::clone(&self.snapshot),
                reduce_lock: Arc::clone(&self.reduce_lock),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                subscribers: Arc::clone(&self.subscribers),
                waiters: Arc::clone(&self.waiters),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
