//! Typed event sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::event::Event;

type EventFn<T, E> = dyn Fn(Event<T, E>) + Send + Sync;

/// Receives the events of one signal or producer execution.
///
/// Forwards `Value` events until the first terminal event and drops
/// everything after it.
pub struct Observer<T, E> {
    inner: Arc<ObserverInner<T, E>>,
}

struct ObserverInner<T, E> {
    action: Box<EventFn<T, E>>,
    terminated: AtomicBool,
}

impl<T, E> Observer<T, E> {
    pub fn new(action: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                action: Box::new(action),
                terminated: AtomicBool::new(false),
            }),
        }
    }

    pub fn send(&self, event: Event<T, E>) {
        if event.is_terminal() {
            if self.inner.terminated.swap(true, Ordering::AcqRel) {
                return;
            }
        } else if self.inner.terminated.load(Ordering::Acquire) {
            return;
        }
        (self.inner.action)(event);
    }

    pub fn send_value(&self, value: T) {
        self.send(Event::Value(value));
    }

    pub fn send_failed(&self, error: E) {
        self.send(Event::Failed(error));
    }

    pub fn send_completed(&self) {
        self.send(Event::Completed);
    }

    pub fn send_interrupted(&self) {
        self.send(Event::Interrupted);
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }
}

impl<T, E> Clone for Observer<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_drops_events_after_terminal() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = Observer::<i32, String>::new(move |event| sink.lock().push(event));

        observer.send_value(1);
        observer.send_completed();
        observer.send_value(2);
        observer.send_failed("late".into());
        observer.send_interrupted();

        assert_eq!(*seen.lock(), vec![Event::Value(1), Event::Completed]);
        assert!(observer.is_terminated());
    }

    #[test]
    fn test_clones_share_terminal_state() {
        let observer = Observer::<i32, String>::new(|_| {});
        let clone = observer.clone();
        clone.send_interrupted();
        assert!(observer.is_terminated());
    }
}
