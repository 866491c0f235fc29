//! Mock remote catalog.

use crate::error::TransportError;
use crate::providers::CatalogService;
use crate::types::{Product, ProductDraft, ProductId, ProductPatch};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A call received by [`MockCatalogService`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    /// `list_products`
    List,
    /// `create_product`
    Create(ProductDraft),
    /// `replace_product`
    Replace(ProductId, ProductPatch),
    /// `delete_product`
    Delete(ProductId),
}

#[derive(Debug, Default)]
struct Inner {
    products: Vec<Product>,
    next_id: u64,
    failures: VecDeque<String>,
    delays: VecDeque<Duration>,
    calls: Vec<CatalogCall>,
}

/// Mock remote catalog.
///
/// Keeps its own product list and applies every successful call to it, the
/// way a real backend would.
#[derive(Debug, Clone)]
pub struct MockCatalogService {
    inner: Arc<Mutex<Inner>>,
}

impl MockCatalogService {
    /// Catalog seeded with three sample products.
    #[must_use]
    pub fn new() -> Self {
        Self::with_products(vec![
            Product::new(ProductId::new(1), "Essence Mascara Lash Princess", 9.99),
            Product::new(ProductId::new(2), "Eyeshadow Palette with Mirror", 19.99),
            Product::new(ProductId::new(3), "Powder Canister", 14.99),
        ])
    }

    /// Catalog seeded with `products`.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let next_id = products.iter().map(|p| p.id.get()).max().unwrap_or(0) + 1;
        Self {
            inner: Arc::new(Mutex::new(Inner {
                products,
                next_id,
                ..Inner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call with `message` (status 500).
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().failures.push_back(message.into());
    }

    /// Delay the response to the next call.
    pub fn delay_next(&self, delay: Duration) {
        self.lock().delays.push_back(delay);
    }

    /// Products the mock backend currently holds.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.lock().calls.clone()
    }

    /// Record `call`, then either consume a queued failure or run `apply`.
    ///
    /// The backend changes now; the returned delay only postpones delivery.
    fn respond<T>(
        &self,
        call: CatalogCall,
        apply: impl FnOnce(&mut Inner) -> Result<T, TransportError>,
    ) -> (Option<Duration>, Result<T, TransportError>) {
        let mut inner = self.lock();
        inner.calls.push(call);
        let delay = inner.delays.pop_front();
        let result = match inner.failures.pop_front() {
            Some(message) => Err(TransportError::Status {
                status: 500,
                message,
            }),
            None => apply(&mut *inner),
        };
        (delay, result)
    }
}

async fn deliver<T>(
    (delay, result): (Option<Duration>, Result<T, TransportError>),
) -> Result<T, TransportError> {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    result
}

impl Default for MockCatalogService {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: ProductId) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("Product with id '{id}' not found"),
    }
}

impl CatalogService for MockCatalogService {
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, TransportError>> + Send {
        deliver(self.respond(CatalogCall::List, |inner| Ok(inner.products.clone())))
    }

    fn create_product(
        &self,
        draft: ProductDraft,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send {
        deliver(self.respond(CatalogCall::Create(draft.clone()), move |inner| {
            let product = Product {
                id: ProductId::new(inner.next_id),
                title: draft.title,
                price: draft.price,
            };
            inner.next_id += 1;
            inner.products.push(product.clone());
            Ok(product)
        }))
    }

    fn replace_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> impl Future<Output = Result<Product, TransportError>> + Send {
        deliver(self.respond(CatalogCall::Replace(id, patch.clone()), move |inner| {
            let slot = inner
                .products
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| not_found(id))?;
            *slot = patch.apply_to(slot);
            Ok(slot.clone())
        }))
    }

    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        deliver(self.respond(CatalogCall::Delete(id), move |inner| {
            let before = inner.products.len();
            inner.products.retain(|p| p.id != id);
            if inner.products.len() == before {
                Err(not_found(id))
            } else {
                Ok(())
            }
        }))
    }
}
