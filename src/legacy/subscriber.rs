//! Legacy events and the subscriber that enforces their grammar.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::boxing::BoxedError;
use crate::disposable::Disposable;

/// One event of a legacy signal: `Next* (Error | Completed)?`.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyEvent {
    Next(Value),
    Error(BoxedError),
    Completed,
}

impl LegacyEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

type HandlerFn = dyn Fn(LegacyEvent) + Send + Sync;

/// The receiving end of one legacy subscription.
///
/// Drops every event after the first terminal event or after its
/// subscription was disposed. A terminal event disposes the subscription.
pub struct LegacySubscriber {
    inner: Arc<SubscriberInner>,
}

struct SubscriberInner {
    handler: Box<HandlerFn>,
    terminated: AtomicBool,
    lifetime: Disposable,
}

impl LegacySubscriber {
    pub fn new(handler: impl Fn(LegacyEvent) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(SubscriberInner {
                handler: Box::new(handler),
                terminated: AtomicBool::new(false),
                lifetime: Disposable::empty(),
            }),
        }
    }

    pub fn send(&self, event: LegacyEvent) {
        if self.inner.lifetime.is_disposed() {
            return;
        }
        let terminal = event.is_terminal();
        if terminal {
            if self.inner.terminated.swap(true, Ordering::AcqRel) {
                return;
            }
        } else if self.inner.terminated.load(Ordering::Acquire) {
            return;
        }
        (self.inner.handler)(event);
        if terminal {
            self.inner.lifetime.dispose();
        }
    }

    pub fn send_next(&self, value: Value) {
        self.send(LegacyEvent::Next(value));
    }

    pub fn send_error(&self, error: BoxedError) {
        self.send(LegacyEvent::Error(error));
    }

    pub fn send_completed(&self) {
        self.send(LegacyEvent::Completed);
    }

    /// Disposal handle of this subscription.
    pub fn lifetime(&self) -> &Disposable {
        &self.inner.lifetime
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lifetime.is_disposed()
    }
}

impl Clone for LegacySubscriber {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for LegacySubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySubscriber")
            .field("terminated", &self.inner.terminated.load(Ordering::Acquire))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
