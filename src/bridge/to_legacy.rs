//! Typed signals and producers to legacy signals.

use serde::Serialize;

use super::capability::{Startable, Subscribable};
use crate::boxing::IntoBoxedError;
use crate::context::ContextRef;
use crate::error::BridgeError;
use crate::legacy::{LegacyEvent, LegacySignal, LegacySubscriber};
use crate::typed::{Event, Observer, Payload};

/// Exposes typed sources to legacy subscribers.
///
/// A hot source is observed from the moment a legacy subscriber attaches
/// and is never replayed. A cold source is started once per legacy
/// subscription. Values are encoded to JSON, errors are boxed, and both
/// `Completed` and `Interrupted` end the legacy subscription as completed.
#[derive(Debug, Clone, Default)]
pub struct ColdOrHotToLegacyAdapter {
    context: ContextRef,
}

impl ColdOrHotToLegacyAdapter {
    pub fn new(context: ContextRef) -> Self {
        Self { context }
    }

    pub fn wrap_hot<S>(&self, source: &S) -> LegacySignal
    where
        S: Subscribable,
        S::Value: Serialize,
        S::Error: IntoBoxedError,
    {
        let source = source.clone();
        let context = self.context.clone();
        LegacySignal::create(move |subscriber| {
            source.subscribe_observer(forwarder(subscriber.clone(), context.clone()))
        })
    }

    pub fn wrap_cold<S>(&self, source: &S) -> LegacySignal
    where
        S: Startable,
        S::Value: Serialize,
        S::Error: IntoBoxedError,
    {
        let source = source.clone();
        let context = self.context.clone();
        LegacySignal::create(move |subscriber| {
            Some(source.start_observer(forwarder(subscriber.clone(), context.clone())))
        })
    }
}

fn forwarder<T, E>(subscriber: LegacySubscriber, context: ContextRef) -> Observer<T, E>
where
    T: Serialize + Payload,
    E: IntoBoxedError + Payload,
{
    Observer::new(move |event: Event<T, E>| {
        let event = legacy_event(event);
        tracing::trace!(context = context.label(), ?event, "Forwarding typed event");
        let subscriber = subscriber.clone();
        context.run(move || subscriber.send(event));
    })
}

/// Translate one typed event into its legacy form.
pub fn legacy_event<T, E>(event: Event<T, E>) -> LegacyEvent
where
    T: Serialize,
    E: IntoBoxedError,
{
    match event {
        Event::Value(value) => match serde_json::to_value(&value) {
            Ok(value) => LegacyEvent::Next(value),
            Err(err) => {
                tracing::warn!(error = %err, "Typed value did not encode");
                LegacyEvent::Error(BridgeError::encode(&err).into_boxed_error())
            }
        },
        Event::Failed(error) => LegacyEvent::Error(error.into_boxed_error()),
        Event::Completed | Event::Interrupted => LegacyEvent::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxing::{BoxedError, LegacyCompatibleError};
    use crate::typed::{MutableProperty, Never, Signal, SignalProducer};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Fault {
        Timeout,
        Rejected(String),
    }

    impl LegacyCompatibleError for Fault {
        const DOMAIN: &'static str = "tests.Fault";

        fn code(&self) -> i64 {
            match self {
                Self::Timeout => 0,
                Self::Rejected(_) => 1,
            }
        }
    }

    fn record(signal: &LegacySignal) -> Arc<Mutex<Vec<LegacyEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.subscribe(move |event| sink.lock().push(event));
        seen
    }

    #[test]
    fn test_hot_signal_is_not_replayed() {
        let (signal, input) = Signal::<i32, Never>::pipe();
        input.send_value(0);

        let seen = record(&ColdOrHotToLegacyAdapter::default().wrap_hot(&signal));
        assert!(seen.lock().is_empty());

        input.send_value(1);
        input.send_completed();
        assert_eq!(
            *seen.lock(),
            vec![LegacyEvent::Next(json!(1)), LegacyEvent::Completed]
        );
    }

    #[test]
    fn test_terminated_hot_signal_completes_late_subscriber() {
        let (signal, input) = Signal::<i32, Never>::pipe();
        input.send_completed();

        let seen = record(&ColdOrHotToLegacyAdapter::default().wrap_hot(&signal));
        assert_eq!(*seen.lock(), vec![LegacyEvent::Completed]);
    }

    #[test]
    fn test_property_changes_only() {
        let property = MutableProperty::new(1);
        let seen = record(&ColdOrHotToLegacyAdapter::default().wrap_hot(&property.read_only()));
        property.set(2);
        assert_eq!(*seen.lock(), vec![LegacyEvent::Next(json!(2))]);
    }

    #[test]
    fn test_cold_producer_starts_per_subscription() {
        let counter = Arc::new(AtomicI64::new(0));
        let source = counter.clone();
        let producer = SignalProducer::<i64, Never>::attempt(move || Ok(source.fetch_add(1, Ordering::SeqCst)));

        let legacy = ColdOrHotToLegacyAdapter::default().wrap_cold(&producer);
        assert_eq!(legacy.first(), Ok(Some(json!(0))));
        assert_eq!(legacy.first(), Ok(Some(json!(1))));
    }

    #[test]
    fn test_typed_failure_is_boxed() {
        let producer = SignalProducer::<i32, Fault>::failed(Fault::Rejected("quota".to_string()));
        let err = ColdOrHotToLegacyAdapter::default()
            .wrap_cold(&producer)
            .wait_until_completed()
            .unwrap_err();

        assert!(err.matches("tests.Fault", 1));
        assert_eq!(err.payload::<Fault>(), Some(&Fault::Rejected("quota".to_string())));
        assert!(err.is(&Fault::Rejected("other".to_string())));
        assert!(!err.is(&Fault::Timeout));
    }

    #[test]
    fn test_interrupted_becomes_completed() {
        let event = legacy_event::<i32, BoxedError>(Event::Interrupted);
        assert_eq!(event, LegacyEvent::Completed);
    }

    #[test]
    fn test_disposing_legacy_subscription_disposes_start() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorded = starts.clone();
        let producer = SignalProducer::<i32, Never>::new(move |_, lifetime| {
            recorded.lock().push(lifetime.clone());
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = ColdOrHotToLegacyAdapter::default()
            .wrap_cold(&producer)
            .subscribe(move |event| sink.lock().push(event));
        subscription.dispose();

        assert!(starts.lock().iter().all(|lifetime| lifetime.is_disposed()));
        assert_eq!(starts.lock().len(), 1);
        assert!(seen.lock().is_empty());
    }
}
