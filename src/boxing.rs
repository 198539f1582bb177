//! Boxed `(domain, code)` errors shared by both reactive models.
//!
//! Legacy observers only understand errors as a domain string plus a numeric
//! code. Typed errors that declare a stable discriminant implement
//! [`LegacyCompatibleError`] and box into that pair; the original typed value
//! rides along as an opaque payload so it can be unwrapped again when the
//! error crosses back to the typed side.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A `(domain, code)` pair standing in for a typed error case.
#[derive(Clone)]
pub struct BoxedError {
    domain: String,
    code: i64,
    description: Option<String>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl BoxedError {
    /// Create a boxed error with no description or payload.
    pub fn new(domain: impl Into<String>, code: i64) -> Self {
        Self {
            domain: domain.into(),
            code,
            description: None,
            payload: None,
        }
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the typed value this error was boxed from
    pub fn with_payload<P: Any + Send + Sync>(mut self, payload: P) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Borrow the carried payload if it has type `P`.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.as_ref()?.downcast_ref::<P>()
    }

    /// Check whether this error identifies the given discriminant.
    pub fn matches(&self, domain: &str, code: i64) -> bool {
        self.domain == domain && self.code == code
    }

    /// Check whether this error was boxed from the same case as `error`.
    pub fn is<E: LegacyCompatibleError>(&self, error: &E) -> bool {
        self.matches(E::DOMAIN, error.code())
    }
}

// Identity is discriminant level; the payload is not compared.
impl PartialEq for BoxedError {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.code == other.code && self.description == other.description
    }
}

impl Eq for BoxedError {}

impl fmt::Debug for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedError")
            .field("domain", &self.domain)
            .field("code", &self.code)
            .field("description", &self.description)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({}): {}", self.domain, self.code, description),
            None => write!(f, "{} ({})", self.domain, self.code),
        }
    }
}

impl std::error::Error for BoxedError {}

/// A typed error with a fixed domain and a stable per-case discriminant.
pub trait LegacyCompatibleError: Clone + Send + Sync + 'static {
    /// Fixed domain shared by every case of the type
    const DOMAIN: &'static str;

    /// Raw discriminant of this case
    fn code(&self) -> i64;

    /// Optional text carried next to the discriminant
    fn description(&self) -> Option<String> {
        None
    }
}

/// Box a typed error into its `(domain, code)` pair.
///
/// Lossy: payload-bearing cases keep only their discriminant in the pair. The
/// typed value itself is attached as the payload.
pub fn to_boxed_error<E: LegacyCompatibleError>(error: &E) -> BoxedError {
    let boxed = BoxedError::new(E::DOMAIN, error.code());
    let boxed = match error.description() {
        Some(description) => boxed.with_description(description),
        None => boxed,
    };
    boxed.with_payload(error.clone())
}

/// Conversion into the legacy error representation.
pub trait IntoBoxedError {
    fn into_boxed_error(self) -> BoxedError;
}

impl<E: LegacyCompatibleError> IntoBoxedError for E {
    fn into_boxed_error(self) -> BoxedError {
        to_boxed_error(&self)
    }
}

impl IntoBoxedError for BoxedError {
    fn into_boxed_error(self) -> BoxedError {
        self
    }
}
