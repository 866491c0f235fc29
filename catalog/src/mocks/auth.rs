//! Mock remote authentication.

use crate::error::TransportError;
use crate::providers::AuthService;
use crate::types::{Credentials, LoginResponse, User};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    failures: VecDeque<String>,
    delays: VecDeque<Duration>,
    attempts: Vec<String>,
}

/// Mock auth service with a single account.
///
/// Accepts `emilys` / `emilyspass` and answers every other pair with a 400
/// `Invalid credentials`, like the public DummyJSON backend.
#[derive(Debug, Clone)]
pub struct MockAuthService {
    credentials: Arc<Credentials>,
    response: Arc<LoginResponse>,
    inner: Arc<Mutex<Inner>>,
}

impl MockAuthService {
    /// Service accepting the sample account.
    #[must_use]
    pub fn new() -> Self {
        let user = User {
            id: 1,
            username: "emilys".to_string(),
            email: Some("emily.johnson@x.dummyjson.com".to_string()),
            first_name: Some("Emily".to_string()),
            last_name: Some("Johnson".to_string()),
            image: None,
        };
        Self::with_account(Credentials::new("emilys", "emilyspass"), user, "mock-token-emilys")
    }

    /// Service accepting `credentials` and answering with `user` and `token`.
    #[must_use]
    pub fn with_account(credentials: Credentials, user: User, token: impl Into<String>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            response: Arc::new(LoginResponse {
                token: token.into(),
                user,
            }),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Profile returned on a successful login.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.response.user
    }

    /// Token returned on a successful login.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.response.token
    }

    /// Fail the next login with `message` (status 500), whatever the credentials.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().failures.push_back(message.into());
    }

    /// Delay the response to the next login.
    pub fn delay_next(&self, delay: Duration) {
        self.lock().delays.push_back(delay);
    }

    /// Usernames of every login attempt so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }
}

impl Default for MockAuthService {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthService for MockAuthService {
    fn login(
        &self,
        credentials: Credentials,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send {
        let (delay, result) = {
            let mut inner = self.lock();
            inner.attempts.push(credentials.username.clone());
            let delay = inner.delays.pop_front();
            let result = match inner.failures.pop_front() {
                Some(message) => Err(TransportError::Status {
                    status: 500,
                    message,
                }),
                None if credentials == *self.credentials => Ok(LoginResponse::clone(&self.response)),
                None => Err(TransportError::Status {
                    status: 400,
                    message: "Invalid credentials".to_string(),
                }),
            };
            (delay, result)
        };

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}
