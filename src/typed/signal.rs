//! Hot typed signals.
//!
//! A `Signal` is live from the moment it is created: every attached observer
//! sees the same events from the point it attached onward, and nothing is
//! replayed. After the terminal event the signal forgets its observers and
//! any later observer is interrupted right away.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::Payload;
use super::event::Event;
use super::observer::Observer;
use crate::bag::Bag;
use crate::disposable::Disposable;

/// A hot, multicast stream of typed events.
pub struct Signal<T, E> {
    core: Arc<SignalCore<T, E>>,
}

struct SignalCore<T, E> {
    state: Mutex<SignalState<T, E>>,
    /// Released when the last handle to this signal goes away.
    lifetime: Disposable,
}

impl<T, E> Drop for SignalCore<T, E> {
    fn drop(&mut self) {
        self.lifetime.dispose();
    }
}

enum SignalState<T, E> {
    Alive(Bag<Observer<T, E>>),
    Terminated,
}

impl<T: Payload, E: Payload> SignalCore<T, E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SignalState::Alive(Bag::new())),
            lifetime: Disposable::empty(),
        }
    }

    fn deliver(&self, event: Event<T, E>) {
        let observers = {
            let mut state = self.state.lock();
            match &mut *state {
                SignalState::Alive(bag) if event.is_terminal() => {
                    let observers = bag.drain();
                    *state = SignalState::Terminated;
                    observers
                }
                SignalState::Alive(bag) => bag.snapshot(),
                SignalState::Terminated => return,
            }
        };
        for observer in observers {
            observer.send(event.clone());
        }
    }

    fn remove(&self, token: u64) {
        if let SignalState::Alive(bag) = &mut *self.state.lock() {
            bag.remove(token);
        }
    }
}

impl<T: Payload, E: Payload> Signal<T, E> {
    /// Create a signal and the observer that feeds it.
    pub fn pipe() -> (Self, Observer<T, E>) {
        let core = Arc::new(SignalCore::new());
        let input_core = core.clone();
        let input = Observer::new(move |event| input_core.deliver(event));
        (Self { core }, input)
    }

    /// Attach an observer. Returns `None` when the signal already terminated,
    /// in which case the observer has been interrupted.
    pub fn observe(&self, observer: Observer<T, E>) -> Option<Disposable> {
        let token = {
            let mut state = self.core.state.lock();
            match &mut *state {
                SignalState::Alive(bag) => Some(bag.insert(observer.clone())),
                SignalState::Terminated => None,
            }
        };

        match token {
            Some(token) => {
                let weak: Weak<SignalCore<T, E>> = Arc::downgrade(&self.core);
                Some(Disposable::new(move || {
                    if let Some(core) = weak.upgrade() {
                        core.remove(token);
                    }
                }))
            }
            None => {
                observer.send_interrupted();
                None
            }
        }
    }

    /// Observe every event with a closure.
    pub fn observe_with(&self, f: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Option<Disposable> {
        self.observe(Observer::new(f))
    }

    /// Observe only the values.
    pub fn observe_values(&self, f: impl Fn(T) + Send + Sync + 'static) -> Option<Disposable> {
        self.observe_with(move |event| {
            if let Event::Value(value) = event {
                f(value);
            }
        })
    }

    /// Derived signal transforming each value.
    ///
    /// The derived signal stays attached to `self` until `self` terminates or
    /// every handle to the derived signal is dropped.
    pub fn map<U: Payload>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Signal<U, E> {
        let core = Arc::new(SignalCore::new());
        let derived: Weak<SignalCore<U, E>> = Arc::downgrade(&core);
        let subscription = self.observe_with(move |event| {
            if let Some(core) = derived.upgrade() {
                core.deliver(event.map(&f));
            }
        });
        if let Some(subscription) = subscription {
            core.lifetime.add_disposable(subscription);
        }
        Signal { core }
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        match &*self.core.state.lock() {
            SignalState::Alive(bag) => bag.len(),
            SignalState::Terminated => 0,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(&*self.core.state.lock(), SignalState::Terminated)
    }
}

impl<T, E> Clone for Signal<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for Signal<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Payload, E: Payload>() -> (Arc<Mutex<Vec<Event<T, E>>>>, Observer<T, E>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Observer::new(move |event| sink.lock().push(event)))
    }

    #[test]
    fn test_late_observer_misses_earlier_values() {
        let (signal, input) = Signal::<i32, String>::pipe();
        input.send_value(1);

        let (seen, observer) = recorder();
        signal.observe(observer);
        input.send_value(2);
        input.send_completed();

        assert_eq!(*seen.lock(), vec![Event::Value(2), Event::Completed]);
    }

    #[test]
    fn test_multicast_to_every_observer() {
        let (signal, input) = Signal::<i32, String>::pipe();
        let (first, a) = recorder();
        let (second, b) = recorder();
        signal.observe(a);
        signal.observe(b);

        input.send_value(7);

        assert_eq!(*first.lock(), vec![Event::Value(7)]);
        assert_eq!(*second.lock(), vec![Event::Value(7)]);
    }

    #[test]
    fn test_dispose_detaches_observer() {
        let (signal, input) = Signal::<i32, String>::pipe();
        let (seen, observer) = recorder();
        let disposable = signal.observe(observer).unwrap();
        assert_eq!(signal.observer_count(), 1);

        disposable.dispose();
        input.send_value(1);

        assert!(seen.lock().is_empty());
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_observing_terminated_signal_interrupts() {
        let (signal, input) = Signal::<i32, String>::pipe();
        input.send_failed("gone".into());
        assert!(signal.is_terminated());

        let (seen, observer) = recorder();
        assert!(signal.observe(observer).is_none());
        assert_eq!(*seen.lock(), vec![Event::Interrupted]);
    }

    #[test]
    fn test_map_transforms_values() {
        let (signal, input) = Signal::<i32, String>::pipe();
        let (seen, observer) = recorder();
        let mapped = signal.map(|v| v.to_string());
        mapped.observe(observer);

        input.send_value(4);
        input.send_completed();

        assert_eq!(*seen.lock(), vec![Event::Value("4".to_string()), Event::Completed]);
    }

    #[test]
    fn test_dropping_mapped_signal_detaches_from_source() {
        let (signal, input) = Signal::<i32, String>::pipe();
        let doubled = signal.map(|v| v * 2);
        assert_eq!(signal.observer_count(), 1);

        let (seen, observer) = recorder();
        doubled.observe(observer);
        input.send_value(2);
        assert_eq!(*seen.lock(), vec![Event::Value(4)]);

        drop(doubled);
        assert_eq!(signal.observer_count(), 0);

        input.send_value(3);
        assert_eq!(*seen.lock(), vec![Event::Value(4)]);
    }

    #[test]
    fn test_mapping_terminated_signal_interrupts_derived() {
        let (signal, input) = Signal::<i32, String>::pipe();
        input.send_completed();

        let mapped = signal.map(|v| v + 1);
        assert!(mapped.is_terminated());
    }
}
