//! Legacy signals built from creation blocks.
//!
//! The creation block runs once per subscription, so a signal built from a
//! side-effecting block repeats its side effects for every subscriber. Hot
//! sources are expressed as blocks that attach to a shared subject.

use std::sync::Arc;
use std::sync::mpsc;

use serde_json::Value;

use super::subscriber::{LegacyEvent, LegacySubscriber};
use crate::boxing::BoxedError;
use crate::context::warn_if_blocking_current_thread;
use crate::disposable::Disposable;

type SubscribeFn = dyn Fn(&LegacySubscriber) -> Option<Disposable> + Send + Sync;

/// A dynamically-typed legacy event source.
#[derive(Clone)]
pub struct LegacySignal {
    on_subscribe: Arc<SubscribeFn>,
}

impl LegacySignal {
    /// Signal running `block` for every subscriber.
    ///
    /// The block may return a disposable that is released when the
    /// subscription ends.
    pub fn create(block: impl Fn(&LegacySubscriber) -> Option<Disposable> + Send + Sync + 'static) -> Self {
        Self {
            on_subscribe: Arc::new(block),
        }
    }

    /// Send `value` then complete.
    pub fn value(value: Value) -> Self {
        Self::create(move |subscriber| {
            subscriber.send_next(value.clone());
            subscriber.send_completed();
            None
        })
    }

    pub fn values(values: Vec<Value>) -> Self {
        Self::create(move |subscriber| {
            for value in &values {
                subscriber.send_next(value.clone());
            }
            subscriber.send_completed();
            None
        })
    }

    pub fn error(error: BoxedError) -> Self {
        Self::create(move |subscriber| {
            subscriber.send_error(error.clone());
            None
        })
    }

    pub fn empty() -> Self {
        Self::create(|subscriber| {
            subscriber.send_completed();
            None
        })
    }

    pub fn never() -> Self {
        Self::create(|_| None)
    }

    /// Attach a subscriber; the returned handle ends the subscription.
    pub fn subscribe_with(&self, subscriber: LegacySubscriber) -> Disposable {
        let lifetime = subscriber.lifetime().clone();
        if let Some(disposable) = (self.on_subscribe)(&subscriber) {
            lifetime.add_disposable(disposable);
        }
        lifetime
    }

    pub fn subscribe(&self, handler: impl Fn(LegacyEvent) + Send + Sync + 'static) -> Disposable {
        self.subscribe_with(LegacySubscriber::new(handler))
    }

    pub fn subscribe_next(&self, next: impl Fn(Value) + Send + Sync + 'static) -> Disposable {
        self.subscribe(move |event| {
            if let LegacyEvent::Next(value) = event {
                next(value);
            }
        })
    }

    /// Subscribe with separate callbacks per event kind.
    pub fn subscribe_all(
        &self,
        next: impl Fn(Value) + Send + Sync + 'static,
        error: impl Fn(BoxedError) + Send + Sync + 'static,
        completed: impl Fn() + Send + Sync + 'static,
    ) -> Disposable {
        self.subscribe(move |event| match event {
            LegacyEvent::Next(value) => next(value),
            LegacyEvent::Error(err) => error(err),
            LegacyEvent::Completed => completed(),
        })
    }

    pub fn map(&self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        let source = self.clone();
        let f = Arc::new(f);
        Self::create(move |subscriber| {
            let forward = subscriber.clone();
            let f = f.clone();
            Some(source.subscribe(move |event| match event {
                LegacyEvent::Next(value) => forward.send_next(f(value)),
                other => forward.send(other),
            }))
        })
    }

    /// Subscribe and block until the subscription terminates or `stop`
    /// accepts an event.
    fn collect_until(&self, stop: impl Fn(&LegacyEvent) -> bool) -> Vec<LegacyEvent> {
        warn_if_blocking_current_thread("LegacySignal::collect_until");
        let (tx, rx) = mpsc::channel();
        let disposable = self.subscribe(move |event| {
            let _ = tx.send(event);
        });

        let mut events = Vec::new();
        while let Ok(event) = rx.recv() {
            let done = event.is_terminal() || stop(&event);
            events.push(event);
            if done {
                break;
            }
        }
        disposable.dispose();
        events
    }

    /// Block for the first value. `Ok(None)` when it completes without one.
    ///
    /// The blocking helpers park the calling thread. Do not call them from
    /// the runtime thread that drains a `SerialQueue` feeding this signal.
    pub fn first(&self) -> Result<Option<Value>, BoxedError> {
        match self.collect_until(|event| !event.is_terminal()).pop() {
            Some(LegacyEvent::Next(value)) => Ok(Some(value)),
            Some(LegacyEvent::Error(error)) => Err(error),
            Some(LegacyEvent::Completed) | None => Ok(None),
        }
    }

    /// Block until the signal terminates.
    pub fn wait_until_completed(&self) -> Result<(), BoxedError> {
        self.to_vec().map(|_| ())
    }

    /// Block and gather every value.
    pub fn to_vec(&self) -> Result<Vec<Value>, BoxedError> {
        let mut values = Vec::new();
        for event in self.collect_until(|_| false) {
            match event {
                LegacyEvent::Next(value) => values.push(value),
                LegacyEvent::Error(error) => return Err(error),
                LegacyEvent::Completed => {}
            }
        }
        Ok(values)
    }
}

impl std::fmt::Debug for LegacySignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySignal").finish_non_exhaustive()
    }
}
