//! Error types for streambridge
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::boxing::{BoxedError, IntoBoxedError};

/// Domain used when a `BridgeError` is surfaced to legacy observers.
pub const BRIDGE_ERROR_DOMAIN: &str = "streambridge.BridgeError";

/// All error types that can occur while bridging
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Opaque error received from the legacy side with no typed reconstruction
    #[error("Legacy error: {0}")]
    Legacy(BoxedError),

    /// A legacy value did not have the shape the typed side expects
    #[error("Decode error: expected {expected}: {message}")]
    Decode {
        /// Name of the type the value was decoded into
        expected: &'static str,
        /// Deserializer message
        message: String,
    },

    /// A typed value could not be represented as a legacy value
    #[error("Encode error: {0}")]
    Encode(String),

    /// No async runtime was available for a queue-backed context
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl BridgeError {
    /// Build a decode error for the target type `T`.
    pub fn decode<T>(source: &serde_json::Error) -> Self {
        Self::Decode {
            expected: std::any::type_name::<T>(),
            message: source.to_string(),
        }
    }

    /// Build an encode error from a serializer failure.
    pub fn encode(source: &serde_json::Error) -> Self {
        Self::Encode(source.to_string())
    }

    /// Stable discriminant reported to legacy observers.
    pub fn code(&self) -> i64 {
        match self {
            Self::Legacy(boxed) => boxed.code(),
            Self::Decode { .. } => 1,
            Self::Encode(_) => 2,
            Self::Runtime(_) => 3,
        }
    }
}

impl IntoBoxedError for BridgeError {
    fn into_boxed_error(self) -> BoxedError {
        match self {
            // Opaque legacy errors travel back unchanged
            Self::Legacy(boxed) => boxed,
            other => BoxedError::new(BRIDGE_ERROR_DOMAIN, other.code())
                .with_description(other.to_string())
                .with_payload(other),
        }
    }
}

impl From<BridgeError> for BoxedError {
    fn from(error: BridgeError) -> Self {
        error.into_boxed_error()
    }
}

/// Result type alias for streambridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
