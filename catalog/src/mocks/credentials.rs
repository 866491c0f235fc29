//! Mock credential store.

use crate::error::CredentialError;
use crate::providers::CredentialStore;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    token: Option<String>,
    saved: Vec<String>,
    save_failure: Option<String>,
    load_failure: Option<String>,
}

/// In-memory credential store that records every save and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MockCredentialStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockCredentialStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding `token`, as after a previous session.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().token = Some(token.into());
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail every save with `message`.
    pub fn fail_saves(&self, message: impl Into<String>) {
        self.lock().save_failure = Some(message.into());
    }

    /// Fail every load with `message`.
    pub fn fail_loads(&self, message: impl Into<String>) {
        self.lock().load_failure = Some(message.into());
    }

    /// Tokens saved successfully, oldest first.
    #[must_use]
    pub fn saved_tokens(&self) -> Vec<String> {
        self.lock().saved.clone()
    }
}

impl CredentialStore for MockCredentialStore {
    fn save(&self, token: &str) -> impl Future<Output = Result<(), CredentialError>> + Send {
        let result = {
            let mut inner = self.lock();
            match inner.save_failure.clone() {
                Some(message) => Err(CredentialError::Unavailable(message)),
                None => {
                    inner.token = Some(token.to_owned());
                    inner.saved.push(token.to_owned());
                    Ok(())
                },
            }
        };
        async move { result }
    }

    fn load(&self) -> impl Future<Output = Result<Option<String>, CredentialError>> + Send {
        let result = {
            let inner = self.lock();
            match inner.load_failure.clone() {
                Some(message) => Err(CredentialError::Unavailable(message)),
                None => Ok(inner.token.clone()),
            }
        };
        async move { result }
    }
}
