//! What the legacy-facing adapter needs from a typed source.
//!
//! Hot and cold sources differ only in how an observer is attached:
//! hot sources share one stream and may already be over, cold sources run
//! their work once per attachment.

use crate::disposable::Disposable;
use crate::typed::{Never, Observer, Payload, Property, Signal, SignalProducer};

/// A hot source: attaching sees only events sent afterwards.
pub trait Subscribable: Clone + Send + Sync + 'static {
    type Value: Payload;
    type Error: Payload;

    /// Attach `observer`. `None` when the source already terminated, in
    /// which case the observer has been interrupted.
    fn subscribe_observer(&self, observer: Observer<Self::Value, Self::Error>) -> Option<Disposable>;
}

impl<T: Payload, E: Payload> Subscribable for Signal<T, E> {
    type Value = T;
    type Error = E;

    fn subscribe_observer(&self, observer: Observer<T, E>) -> Option<Disposable> {
        self.observe(observer)
    }
}

/// Changes of the property; the current value is not resent.
impl<T: Payload> Subscribable for Property<T> {
    type Value = T;
    type Error = Never;

    fn subscribe_observer(&self, observer: Observer<T, Never>) -> Option<Disposable> {
        self.signal().observe(observer)
    }
}

/// A cold source: every attachment starts a fresh run.
pub trait Startable: Clone + Send + Sync + 'static {
    type Value: Payload;
    type Error: Payload;

    fn start_observer(&self, observer: Observer<Self::Value, Self::Error>) -> Disposable;
}

impl<T: Payload, E: Payload> Startable for SignalProducer<T, E> {
    type Value = T;
    type Error = E;

    fn start_observer(&self, observer: Observer<T, E>) -> Disposable {
        self.start(observer)
    }
}
