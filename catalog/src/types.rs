//! Domain values shared by the session and catalog domains.

use crate::error::OperationFailed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a product record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Create a new `ProductId`.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product price as the remote catalog reports it.
///
/// Usually a number; a form may submit free text, which the remote echoes
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    /// Numeric amount
    Amount(f64),
    /// Unparsed text
    Text(String),
}

impl Price {
    /// Numeric value, parsing text prices when possible.
    #[must_use]
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Self::Amount(value)
    }
}

impl From<i32> for Price {
    fn from(value: i32) -> Self {
        Self::Amount(f64::from(value))
    }
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Price {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A product record. Identity is `id`; every mutation locates a record by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Record identity
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Price
    pub price: Price,
}

impl Product {
    /// Create a product.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: impl Into<Price>) -> Self {
        Self {
            id,
            title: title.into(),
            price: price.into(),
        }
    }
}

/// Input for creating a product; the remote assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Display title
    pub title: String,
    /// Price
    pub price: Price,
}

impl ProductDraft {
    /// Create a draft.
    #[must_use]
    pub fn new(title: impl Into<String>, price: impl Into<Price>) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
        }
    }
}

/// Prefill an edit form from an existing record.
impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price.clone(),
        }
    }
}

/// Partial update of a product. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl ProductPatch {
    /// Patch that replaces every field with the draft's.
    #[must_use]
    pub fn from_draft(draft: ProductDraft) -> Self {
        Self {
            title: Some(draft.title),
            price: Some(draft.price),
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the price.
    #[must_use]
    pub fn with_price(mut self, price: impl Into<Price>) -> Self {
        self.price = Some(price.into());
        self
    }

    /// `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.price.is_none()
    }

    /// Merge the patch over `product`: present fields override, absent ones keep.
    #[must_use]
    pub fn apply_to(&self, product: &Product) -> Product {
        Product {
            id: product.id,
            title: self.title.clone().unwrap_or_else(|| product.title.clone()),
            price: self.price.clone().unwrap_or_else(|| product.price.clone()),
        }
    }
}

/// Login input.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Remote user id
    pub id: u64,
    /// Account name
    pub username: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub image: Option<String>,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or(&self.username)
    }
}

/// Successful login payload: the session token plus the user's profile.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// Opaque session token
    #[serde(alias = "accessToken")]
    pub token: String,
    /// Profile fields
    #[serde(flatten)]
    pub user: User,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Correlates the start and settle actions of one operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// How an operation invocation settled.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    /// The remote call succeeded and its payload was folded
    Fulfilled(T),
    /// The remote call failed
    Rejected(OperationFailed),
}

impl<T> Outcome<T> {
    /// `true` for [`Outcome::Fulfilled`].
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure of a rejected outcome.
    pub fn into_result(self) -> Result<T, OperationFailed> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(error) => Err(error),
        }
    }

    /// Transform the fulfilled payload.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Fulfilled(value) => Outcome::Fulfilled(f(value)),
            Self::Rejected(error) => Outcome::Rejected(error),
        }
    }
}
