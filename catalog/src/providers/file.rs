//! Local token persistence.

use super::CredentialStore;
use crate::config::ClientConfig;
use crate::error::CredentialError;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Token stored in a plain file.
///
/// A missing or blank file means no token.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: Arc<PathBuf>,
}

impl FileCredentialStore {
    /// Store the token at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> impl Future<Output = Result<(), CredentialError>> + Send {
        let path = Arc::clone(&self.path);
        let token = token.to_owned();

        async move {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path.as_path(), token).await?;
            tracing::debug!(path = %path.display(), "Token saved");
            Ok(())
        }
    }

    fn load(&self) -> impl Future<Output = Result<Option<String>, CredentialError>> + Send {
        let path = Arc::clone(&self.path);

        async move {
            match tokio::fs::read_to_string(path.as_path()).await {
                Ok(contents) => {
                    let token = contents.trim();
                    Ok((!token.is_empty()).then(|| token.to_owned()))
                },
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Token kept in process memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> impl Future<Output = Result<(), CredentialError>> + Send {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        std::future::ready(Ok(()))
    }

    fn load(&self) -> impl Future<Output = Result<Option<String>, CredentialError>> + Send {
        let token = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        std::future::ready(Ok(token))
    }
}

/// Credential store chosen at startup.
#[derive(Debug, Clone)]
pub enum LocalCredentialStore {
    /// Persist to a file
    File(FileCredentialStore),
    /// Keep in memory for this process only
    Memory(MemoryCredentialStore),
}

impl LocalCredentialStore {
    /// File-backed when a token path is configured, memory-backed otherwise.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        match &config.token_path {
            Some(path) => Self::File(FileCredentialStore::new(path.clone())),
            None => Self::Memory(MemoryCredentialStore::new()),
        }
    }
}

impl CredentialStore for LocalCredentialStore {
    async fn save(&self, token: &str) -> Result<(), CredentialError> {
        match self {
            Self::File(store) => store.save(token).await,
            Self::Memory(store) => store.save(token).await,
        }
    }

    async fn load(&self) -> Result<Option<String>, CredentialError> {
        match self {
            Self::File(store) => store.load().await,
            Self::Memory(store) => store.load().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_token_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("catalog-client-{}-{name}", std::process::id()))
            .join("token")
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let path = temp_token_path("round-trip");
        let store = FileCredentialStore::new(&path);

        assert_eq!(store.load().await.unwrap(), None);

        store.save("abc123").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("abc123".to_owned()));

        store.save("def456").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("def456".to_owned()));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_blank_file_is_no_token() {
        let path = temp_token_path("blank");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "  \n").unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().await.unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_file_store_reports_unwritable_path() {
        let path = temp_token_path("unwritable");
        std::fs::create_dir_all(&path).unwrap();

        // The token path is a directory, so writing it must fail
        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.save("abc").await, Err(CredentialError::Io(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = LocalCredentialStore::Memory(MemoryCredentialStore::new());
        assert_eq!(store.load().await.unwrap(), None);
        store.save("abc").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("abc".to_owned()));
    }

    #[test]
    fn test_from_config_picks_backend() {
        let file = LocalCredentialStore::from_config(&ClientConfig::default());
        assert!(matches!(file, LocalCredentialStore::File(_)));

        let memory =
            LocalCredentialStore::from_config(&ClientConfig::default().without_token_persistence());
        assert!(matches!(memory, LocalCredentialStore::Memory(_)));
    }
}
