//! Events carried by typed signals and producers.

use serde::{Deserialize, Serialize};

use crate::boxing::LegacyCompatibleError;

/// One event of a typed stream: `Value* (Failed | Completed | Interrupted)?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
    /// A produced value
    Value(T),
    /// Terminated with an error
    Failed(E),
    /// Terminated successfully
    Completed,
    /// Terminated because the execution was disposed
    Interrupted,
}

impl<T, E> Event<T, E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U, E> {
        match self {
            Self::Value(value) => Event::Value(f(value)),
            Self::Failed(error) => Event::Failed(error),
            Self::Completed => Event::Completed,
            Self::Interrupted => Event::Interrupted,
        }
    }

    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Event<T, F> {
        match self {
            Self::Value(value) => Event::Value(value),
            Self::Failed(error) => Event::Failed(f(error)),
            Self::Completed => Event::Completed,
            Self::Interrupted => Event::Interrupted,
        }
    }
}

/// Uninhabited value or error type for streams that cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Never {}

impl std::fmt::Display for Never {
    fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {}
    }
}

impl std::error::Error for Never {}

impl LegacyCompatibleError for Never {
    const DOMAIN: &'static str = "streambridge.Never";

    fn code(&self) -> i64 {
        match *self {}
    }
}
