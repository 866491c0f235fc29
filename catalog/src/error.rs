//! Error types for the catalog client.
//!
//! Remote and local failures have their own enums. None of them reach state
//! directly: an operation that fails is folded as [`OperationFailed`], which
//! carries only the display message.

use thiserror::Error;

/// Failure of a remote call (catalog or auth service).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("Network error: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    ///
    /// `message` is the server's own `message` field when the body has one,
    /// otherwise a generic description of the status.
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Human readable failure message
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Build a [`TransportError::Status`] from a status code and raw body.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("Request failed with status code {status}"));

        Self::Status { status, message }
    }
}

/// Failure of the local credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Reading or writing the backing file failed.
    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the operation.
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Invalid client configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP client could not be built from the configuration.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// The single error kind folded into state.
///
/// Every remote failure collapses into its message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OperationFailed(pub String);

impl OperationFailed {
    /// Create from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<TransportError> for OperationFailed {
    fn from(error: TransportError) -> Self {
        Self(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_server_message() {
        let error = TransportError::status(400, r#"{"message":"Invalid credentials"}"#);
        assert_eq!(error.to_string(), "Invalid credentials");
        assert!(matches!(error, TransportError::Status { status: 400, .. }));
    }

    #[test]
    fn test_status_falls_back_to_code() {
        let error = TransportError::status(502, "<html>bad gateway</html>");
        assert_eq!(error.to_string(), "Request failed with status code 502");
    }

    #[test]
    fn test_operation_failed_keeps_transport_message() {
        let failed = OperationFailed::from(TransportError::Request("connection refused".into()));
        assert_eq!(failed.message(), "Network error: connection refused");
    }
}
