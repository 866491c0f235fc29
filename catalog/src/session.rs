//! Session domain: current user, in-flight login, last login error.

use crate::environment::AppEnvironment;
use crate::error::OperationFailed;
use crate::providers::{AuthService, CatalogService, CredentialStore};
use crate::types::{Credentials, RequestId, User};
use catalog_sync_core::{async_effect, effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Logged-in user; `None` until a login succeeds.
    pub user: Option<User>,
    /// `true` strictly between a login start and its settle.
    pub loading: bool,
    /// Message of the last failed login.
    pub error: Option<String>,
}

impl SessionState {
    /// `true` once a login has succeeded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Session actions: one login operation in three phases.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// A login was dispatched.
    LoginStarted {
        /// Invocation id
        request_id: RequestId,
        /// Credentials to send
        credentials: Credentials,
    },
    /// The login succeeded.
    LoginSucceeded {
        /// Invocation id
        request_id: RequestId,
        /// Authenticated profile
        user: User,
    },
    /// The login failed.
    LoginFailed {
        /// Invocation id
        request_id: RequestId,
        /// Failure folded into state
        error: OperationFailed,
    },
}

impl SessionAction {
    /// Invocation id carried by every phase.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::LoginStarted { request_id, .. }
            | Self::LoginSucceeded { request_id, .. }
            | Self::LoginFailed { request_id, .. } => *request_id,
        }
    }

    /// `true` for the success and failure phases.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::LoginStarted { .. })
    }
}

/// Session reducer.
///
/// | Phase | Transition |
/// |---|---|
/// | start | `loading = true`, `error = None`, login effect |
/// | success | `user = payload`, `loading = false` |
/// | failure | `error = message`, `loading = false`, user kept |
pub struct SessionReducer<C, A, K> {
    _phantom: std::marker::PhantomData<(C, A, K)>,
}

impl<C, A, K> SessionReducer<C, A, K> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C, A, K> Default for SessionReducer<C, A, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A, K> Clone for SessionReducer<C, A, K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<C, A, K> Reducer for SessionReducer<C, A, K>
where
    C: CatalogService + Clone + 'static,
    A: AuthService + Clone + 'static,
    K: CredentialStore + Clone + 'static,
{
    type State = SessionState;
    type Action = SessionAction;
    type Environment = AppEnvironment<C, A, K>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::LoginStarted {
                request_id,
                credentials,
            } => {
                state.loading = true;
                state.error = None;

                let auth = env.auth.clone();
                let store = env.credentials.clone();

                smallvec![async_effect! {
                    match auth.login(credentials).await {
                        Ok(response) => {
                            // Best-effort: a login that cannot be persisted still succeeded
                            if let Err(error) = store.save(&response.token).await {
                                tracing::warn!(
                                    %request_id,
                                    %error,
                                    "Login succeeded but the token could not be persisted"
                                );
                            }
                            Some(SessionAction::LoginSucceeded {
                                request_id,
                                user: response.user,
                            })
                        },
                        Err(error) => Some(SessionAction::LoginFailed {
                            request_id,
                            error: error.into(),
                        }),
                    }
                }]
            },

            SessionAction::LoginSucceeded { request_id, user } => {
                tracing::debug!(%request_id, username = %user.username, "Login succeeded");
                state.user = Some(user);
                state.loading = false;
                smallvec![Effect::None]
            },

            SessionAction::LoginFailed { request_id, error } => {
                tracing::debug!(%request_id, %error, "Login failed");
                state.error = Some(error.0);
                state.loading = false;
                smallvec![Effect::None]
            },
        }
    }
}
