//! Typed reactive model.
//!
//! - [`Signal`]: hot, shared, no replay; terminates at most once.
//! - [`SignalProducer`]: cold template; every `start` is an independent
//!   execution with its own side effects and its own disposal handle.
//! - [`Property`] / [`MutableProperty`]: current value plus change signal.
//! - [`Action`]: enable-gated execution of `Fn(I) -> SignalProducer<O, E>`.

pub mod action;
pub mod event;
pub mod observer;
pub mod producer;
pub mod property;
pub mod signal;

pub use action::{ACTION_DISABLED_CODE, ACTION_ERROR_DOMAIN, Action, ActionError};
pub use event::{Event, Never};
pub use observer::Observer;
pub use producer::{ProducerStream, SignalProducer};
pub use property::{MutableProperty, Property};
pub use signal::Signal;

/// Bound shared by every value and error carried through a stream.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}
