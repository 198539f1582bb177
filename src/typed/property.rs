//! Observable values with a current state.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use super::Payload;
use super::event::{Event, Never};
use super::observer::Observer;
use super::producer::SignalProducer;
use super::signal::Signal;

struct PropertyInner<T> {
    /// Held while a change or a starting producer's snapshot is delivered.
    delivery: ReentrantMutex<()>,
    value: Mutex<T>,
    changes: Signal<T, Never>,
    input: Observer<T, Never>,
}

/// A value that can be read at any time and observed for changes.
pub struct MutableProperty<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T: Payload> MutableProperty<T> {
    pub fn new(value: T) -> Self {
        let (changes, input) = Signal::pipe();
        Self {
            inner: Arc::new(PropertyInner {
                delivery: ReentrantMutex::new(()),
                value: Mutex::new(value),
                changes,
                input,
            }),
        }
    }

    pub fn value(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Replace the value and notify observers.
    ///
    /// Concurrent sets are delivered in the order they are stored.
    pub fn set(&self, value: T) {
        let _delivery = self.inner.delivery.lock();
        *self.inner.value.lock() = value.clone();
        self.inner.input.send_value(value);
    }

    /// Hot signal of subsequent changes.
    pub fn signal(&self) -> Signal<T, Never> {
        self.inner.changes.clone()
    }

    /// Producer sending the current value and then every change.
    ///
    /// No change can be delivered between the snapshot and the attachment,
    /// so the last value observed is always the property's latest value.
    pub fn producer(&self) -> SignalProducer<T, Never> {
        let inner = self.inner.clone();
        SignalProducer::new(move |observer, lifetime| {
            let _delivery = inner.delivery.lock();
            let forward = observer.clone();
            if let Some(subscription) = inner.changes.observe_with(move |event| forward.send(event)) {
                lifetime.add_disposable(subscription);
            }
            let current = inner.value.lock().clone();
            observer.send(Event::Value(current));
        })
    }

    /// Read-only view sharing this property's storage.
    pub fn read_only(&self) -> Property<T> {
        Property {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for MutableProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Read-only observable value.
pub struct Property<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T: Payload> Property<T> {
    /// Property that never changes.
    pub fn constant(value: T) -> Self {
        MutableProperty::new(value).read_only()
    }

    pub fn value(&self) -> T {
        self.inner.value.lock().clone()
    }

    pub fn signal(&self) -> Signal<T, Never> {
        self.inner.changes.clone()
    }

    pub fn producer(&self) -> SignalProducer<T, Never> {
        MutableProperty {
            inner: self.inner.clone(),
        }
        .producer()
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Payload + std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property").field("value", &self.value()).finish()
    }
}

impl<T: Payload + std::fmt::Debug> std::fmt::Debug for MutableProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableProperty").field("value", &self.value()).finish()
    }
}
