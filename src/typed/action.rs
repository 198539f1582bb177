//! Typed actions: enable-gated, serially executed units of work.
//!
//! An `Action` wraps `Fn(I) -> SignalProducer<O, E>`. `apply` returns a
//! producer that runs one execution per start, gated on the action being
//! enabled. While an execution is in flight the action is disabled, so an
//! overlapping start fails with `ActionError::Disabled` instead of queueing.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use thiserror::Error;

use super::Payload;
use super::event::{Event, Never};
use super::observer::Observer;
use super::producer::SignalProducer;
use super::property::{MutableProperty, Property};
use super::signal::Signal;
use crate::boxing::{BoxedError, IntoBoxedError};
use crate::disposable::Disposable;

/// Domain of the `Disabled` case when boxed for legacy observers.
pub const ACTION_ERROR_DOMAIN: &str = "streambridge.ActionError";

/// Code of `ActionError::Disabled` in `ACTION_ERROR_DOMAIN`.
pub const ACTION_DISABLED_CODE: i64 = 0;

/// Why an applied action failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError<E> {
    /// The action was disabled or already executing when started
    #[error("Action is disabled")]
    Disabled,

    /// The execution's own producer failed
    #[error("{0}")]
    Producer(E),
}

impl<E: IntoBoxedError> IntoBoxedError for ActionError<E> {
    fn into_boxed_error(self) -> BoxedError {
        match self {
            Self::Disabled => BoxedError::new(ACTION_ERROR_DOMAIN, ACTION_DISABLED_CODE)
                .with_description("Action is disabled"),
            Self::Producer(error) => error.into_boxed_error(),
        }
    }
}

type ExecuteFn<I, O, E> = dyn Fn(I) -> SignalProducer<O, E> + Send + Sync;

#[derive(Debug, Default)]
struct ActionState {
    user_enabled: bool,
    executing: bool,
}

struct ActionInner<I, O, E> {
    execute: Box<ExecuteFn<I, O, E>>,
    state: Mutex<ActionState>,
    /// Held while the derived properties catch up with `state`.
    refreshing: ReentrantMutex<()>,
    enabled: MutableProperty<bool>,
    is_executing: MutableProperty<bool>,
    values: Signal<O, Never>,
    values_input: Observer<O, Never>,
    errors: Signal<E, Never>,
    errors_input: Observer<E, Never>,
    lifetime: Disposable,
}

impl<I, O: Payload, E: Payload> ActionInner<I, O, E> {
    /// Claim the action for one execution.
    fn begin(&self) -> bool {
        {
            let mut state = self.state.lock();
            if !state.user_enabled || state.executing {
                return false;
            }
            state.executing = true;
        }
        self.refresh();
        true
    }

    fn finish(&self) {
        self.state.lock().executing = false;
        self.refresh();
    }

    fn set_user_enabled(&self, enabled: bool) {
        self.state.lock().user_enabled = enabled;
        self.refresh();
    }

    fn refresh(&self) {
        let _refreshing = self.refreshing.lock();
        let (enabled, executing) = {
            let state = self.state.lock();
            (state.user_enabled && !state.executing, state.executing)
        };
        if self.enabled.value() != enabled {
            self.enabled.set(enabled);
        }
        if self.is_executing.value() != executing {
            self.is_executing.set(executing);
        }
    }
}

impl<I, O, E> Drop for ActionInner<I, O, E> {
    fn drop(&mut self) {
        self.lifetime.dispose();
    }
}

/// A typed, enable-gated unit of work.
pub struct Action<I, O, E> {
    inner: Arc<ActionInner<I, O, E>>,
}

impl<I, O, E> Action<I, O, E>
where
    I: Payload,
    O: Payload,
    E: Payload,
{
    /// Action that is enabled whenever it is not executing.
    pub fn new(execute: impl Fn(I) -> SignalProducer<O, E> + Send + Sync + 'static) -> Self {
        Self::with_enabled(Property::constant(true), execute)
    }

    /// Action additionally gated on `enabled_if`.
    pub fn with_enabled(
        enabled_if: Property<bool>,
        execute: impl Fn(I) -> SignalProducer<O, E> + Send + Sync + 'static,
    ) -> Self {
        let (values, values_input) = Signal::pipe();
        let (errors, errors_input) = Signal::pipe();
        let initial = enabled_if.value();

        let inner = Arc::new(ActionInner {
            execute: Box::new(execute),
            state: Mutex::new(ActionState {
                user_enabled: initial,
                executing: false,
            }),
            refreshing: ReentrantMutex::new(()),
            enabled: MutableProperty::new(initial),
            is_executing: MutableProperty::new(false),
            values,
            values_input,
            errors,
            errors_input,
            lifetime: Disposable::empty(),
        });

        let weak: Weak<ActionInner<I, O, E>> = Arc::downgrade(&inner);
        let subscription = enabled_if.producer().start_with_values(move |enabled| {
            if let Some(inner) = weak.upgrade() {
                inner.set_user_enabled(enabled);
            }
        });
        inner.lifetime.add_disposable(subscription);

        Self { inner }
    }

    /// Release `disposable` when the action is dropped.
    pub fn bind_lifetime(self, disposable: Disposable) -> Self {
        self.inner.lifetime.add_disposable(disposable);
        self
    }

    /// Whether a start right now would execute.
    pub fn enabled(&self) -> Property<bool> {
        self.inner.enabled.read_only()
    }

    pub fn is_executing(&self) -> Property<bool> {
        self.inner.is_executing.read_only()
    }

    /// Every value produced by every execution.
    pub fn values(&self) -> Signal<O, Never> {
        self.inner.values.clone()
    }

    /// Every error produced by every execution.
    pub fn errors(&self) -> Signal<E, Never> {
        self.inner.errors.clone()
    }

    /// Producer running one execution for `input` per start.
    pub fn apply(&self, input: I) -> SignalProducer<O, ActionError<E>> {
        let inner = self.inner.clone();
        SignalProducer::new(move |observer: Observer<O, ActionError<E>>, lifetime| {
            if !inner.begin() {
                tracing::debug!("Action start rejected, action is disabled");
                observer.send_failed(ActionError::Disabled);
                return;
            }
            tracing::debug!("Action execution started");

            let forward = inner.clone();
            let execution = (inner.execute)(input.clone()).start_with(move |event: Event<O, E>| {
                match &event {
                    Event::Value(value) => forward.values_input.send_value(value.clone()),
                    Event::Failed(error) => forward.errors_input.send_value(error.clone()),
                    Event::Completed | Event::Interrupted => {}
                }
                if event.is_terminal() {
                    forward.finish();
                    tracing::debug!("Action execution finished");
                }
                observer.send(event.map_err(ActionError::Producer));
            });
            lifetime.add_disposable(execution);
        })
    }
}

impl<I, O, E> Clone for Action<I, O, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I, O, E> std::fmt::Debug for Action<I, O, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Action")
            .field("user_enabled", &state.user_enabled)
            .field("executing", &state.executing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Oops;

    fn increment() -> Action<i32, i32, Oops> {
        Action::new(|input: i32| SignalProducer::value(input + 1))
    }

    #[test]
    fn test_apply_runs_once_per_start() {
        let action = increment();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        action.values().observe_values(move |v| sink.lock().push(v));

        let producer = action.apply(0);
        producer.start_with(|_| {});
        producer.start_with(|_| {});
        action.apply(2).start_with(|_| {});

        assert_eq!(*seen.lock(), vec![1, 1, 3]);
    }

    #[test]
    fn test_disabled_action_rejects_start() {
        let gate = MutableProperty::new(false);
        let action = Action::with_enabled(gate.read_only(), |input: i32| {
            SignalProducer::<i32, Oops>::value(input)
        });

        assert!(!action.enabled().value());
        assert_eq!(action.apply(1).first(), Some(Err(ActionError::Disabled)));

        gate.set(true);
        assert!(action.enabled().value());
        assert_eq!(action.apply(1).first(), Some(Ok(1)));
    }

    #[test]
    fn test_overlapping_start_is_rejected() {
        let (signal, input) = Signal::<i32, Oops>::pipe();
        let action = Action::new(move |_: ()| SignalProducer::from_signal(signal.clone()));

        let first = action.apply(()).start_with(|_| {});
        assert!(action.is_executing().value());
        assert!(!action.enabled().value());
        assert_eq!(action.apply(()).first(), Some(Err(ActionError::Disabled)));

        input.send_value(1);
        first.dispose();
        assert!(!action.is_executing().value());
        assert!(action.enabled().value());
    }

    #[test]
    fn test_errors_are_forwarded() {
        let action = Action::new(|_: ()| SignalProducer::<i32, Oops>::failed(Oops));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        action.errors().observe_values(move |e| sink.lock().push(e));

        assert_eq!(action.apply(()).wait(), Err(ActionError::Producer(Oops)));
        assert_eq!(*seen.lock(), vec![Oops]);
        assert!(action.enabled().value());
    }

    #[test]
    fn test_disabled_boxes_into_action_domain() {
        let boxed = ActionError::<BoxedError>::Disabled.into_boxed_error();
        assert!(boxed.matches(ACTION_ERROR_DOMAIN, ACTION_DISABLED_CODE));

        let inner = BoxedError::new("x", 9);
        assert_eq!(ActionError::Producer(inner.clone()).into_boxed_error(), inner);
    }

    #[test]
    fn test_enabled_settles_on_latest_gate_under_concurrent_toggles() {
        for _ in 0..50 {
            let gate = MutableProperty::new(true);
            let action = Action::with_enabled(gate.read_only(), |input: i32| SignalProducer::<i32, Oops>::value(input));
            let toggler = gate.clone();
            let writer = std::thread::spawn(move || {
                for i in 0..100 {
                    toggler.set(i % 2 == 0);
                }
            });

            for input in 0..20 {
                let _ = action.apply(input).wait();
            }
            writer.join().unwrap();

            assert!(!action.enabled().value());
            assert!(!action.is_executing().value());
        }
    }
}
