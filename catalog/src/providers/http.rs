//! HTTP providers for a DummyJSON-style REST backend.
//!
//! | Operation | Request |
//! |---|---|
//! | list | `GET {base}/products` → `{ "products": [...] }` |
//! | create | `POST {base}/products/add` |
//! | replace | `PUT {base}/products/{id}` |
//! | delete | `DELETE {base}/products/{id}` |
//! | login | `POST {base}/auth/login` |

use super::{AuthService, CatalogService};
use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::types::{Credentials, LoginResponse, Product, ProductDraft, ProductId, ProductPatch};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;

/// Shared HTTP client and base URL.
#[derive(Debug, Clone)]
struct Endpoint {
    client: Client,
    base_url: String,
}

impl Endpoint {
    fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::new(client, &config.base_url))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn request_failed(error: &reqwest::Error) -> TransportError {
    TransportError::Request(error.to_string())
}

/// Map a non-success status to [`TransportError::Status`], otherwise decode the body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::status(status.as_u16(), &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct ProductList {
    products: Vec<Product>,
}

/// Remote catalog over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogService {
    endpoint: Endpoint,
}

impl HttpCatalogService {
    /// Create a service using `client` against `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(client, base_url),
        }
    }

    /// Create a service from configuration (base URL and request timeout).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::from_config(config)?,
        })
    }
}

impl CatalogService for HttpCatalogService {
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, TransportError>> + Send {
        let endpoint = self.endpoint.clone();

        async move {
            let url = endpoint.url("/products");
            tracing::debug!(%url, "Listing products");

            let response = endpoint
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            let list: ProductList = decode(response).await?;
            Ok(list.products)
        }
    }

    fn create_product(
        &self,
        draft: ProductDraft,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send {
        let endpoint = self.endpoint.clone();

        async move {
            let url = endpoint.url("/products/add");
            tracing::debug!(%url, title = %draft.title, "Creating product");

            let response = endpoint
                .client
                .post(&url)
                .json(&draft)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            decode(response).await
        }
    }

    fn replace_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send {
        let endpoint = self.endpoint.clone();

        async move {
            let url = endpoint.url(&format!("/products/{id}"));
            tracing::debug!(%url, "Updating product");

            let response = endpoint
                .client
                .put(&url)
                .json(&patch)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            decode(response).await
        }
    }

    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let endpoint = self.endpoint.clone();

        async move {
            let url = endpoint.url(&format!("/products/{id}"));
            tracing::debug!(%url, "Deleting product");

            let response = endpoint
                .client
                .delete(&url)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            // The body echoes the deleted record; only the status matters
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(TransportError::status(status.as_u16(), &body))
            }
        }
    }
}

/// Remote authentication over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthService {
    endpoint: Endpoint,
}

impl HttpAuthService {
    /// Create a service using `client` against `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            endpoint: Endpoint::new(client, base_url),
        }
    }

    /// Create a service from configuration (base URL and request timeout).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Endpoint::from_config(config)?,
        })
    }
}

impl AuthService for HttpAuthService {
    fn login(
        &self,
        credentials: Credentials,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send {
        let endpoint = self.endpoint.clone();

        async move {
            let url = endpoint.url("/auth/login");
            tracing::debug!(%url, username = %credentials.username, "Logging in");

            let response = endpoint
                .client
                .post(&url)
                .json(&credentials)
                .send()
                .await
                .map_err(|e| request_failed(&e))?;

            decode(response).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_ignored() {
        let service = HttpCatalogService::new(Client::new(), "https://dummyjson.com/");
        assert_eq!(
            service.endpoint.url("/products"),
            "https://dummyjson.com/products"
        );
    }

    #[test]
    fn test_from_config_uses_base_url() {
        let config = ClientConfig::default().with_base_url("http://localhost:9000");
        let service = HttpAuthService::from_config(&config);
        assert!(service.is_ok_and(|s| s.endpoint.url("/auth/login") == "http://localhost:9000/auth/login"));
    }
}
