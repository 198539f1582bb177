//! Legacy signal to typed producer.

use serde::de::DeserializeOwned;

use crate::boxing::BoxedError;
use crate::context::ContextRef;
use crate::error::BridgeError;
use crate::legacy::{LegacyEvent, LegacySignal, LegacySubscriber};
use crate::typed::{Event, Payload, SignalProducer};

/// Wraps a legacy signal as a typed producer.
///
/// Every start subscribes to the legacy signal anew, so a creation block
/// with side effects runs once per start. Events are decoded into `T`,
/// forwarded through the context, and the legacy subscription is released
/// when the start is disposed.
#[derive(Debug, Clone, Default)]
pub struct HotToColdAdapter {
    context: ContextRef,
}

impl HotToColdAdapter {
    pub fn new(context: ContextRef) -> Self {
        Self { context }
    }

    pub fn wrap<T, E>(&self, signal: &LegacySignal) -> SignalProducer<T, E>
    where
        T: DeserializeOwned + Payload,
        E: From<BridgeError> + Payload,
    {
        let signal = signal.clone();
        let context = self.context.clone();
        SignalProducer::new(move |observer, lifetime| {
            let context = context.clone();
            let subscriber = LegacySubscriber::new(move |event: LegacyEvent| {
                tracing::trace!(context = context.label(), ?event, "Forwarding legacy event");
                let event = typed_event::<T, E>(event);
                let observer = observer.clone();
                context.run(move || observer.send(event));
            });
            lifetime.add_disposable(signal.subscribe_with(subscriber));
        })
    }
}

/// Translate one legacy event. Values that do not decode into `T` fail the
/// stream with a decode error.
pub fn typed_event<T, E>(event: LegacyEvent) -> Event<T, E>
where
    T: DeserializeOwned,
    E: From<BridgeError> + Payload,
{
    match event {
        LegacyEvent::Next(value) => match serde_json::from_value::<T>(value) {
            Ok(value) => Event::Value(value),
            Err(err) => {
                tracing::warn!(error = %err, "Legacy value did not decode");
                Event::Failed(E::from(BridgeError::decode::<T>(&err)))
            }
        },
        LegacyEvent::Error(boxed) => Event::Failed(unbox_error(boxed)),
        LegacyEvent::Completed => Event::Completed,
    }
}

/// Recover the typed error a boxed error was made from, or wrap it opaquely.
pub fn unbox_error<E>(boxed: BoxedError) -> E
where
    E: From<BridgeError> + Payload,
{
    match boxed.payload::<E>() {
        Some(typed) => typed.clone(),
        None => E::from(BridgeError::Legacy(boxed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxing::IntoBoxedError;
    use crate::disposable::Disposable;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_values_decode_into_target_type() {
        let signal = LegacySignal::values(vec![json!(1), json!(2)]);
        let producer = HotToColdAdapter::default().wrap::<i64, BridgeError>(&signal);
        assert_eq!(producer.collect(), Ok(vec![1, 2]));
    }

    #[test]
    fn test_each_start_resubscribes() {
        let subscriptions = Arc::new(AtomicUsize::new(0));
        let counter = subscriptions.clone();
        let signal = LegacySignal::create(move |subscriber| {
            subscriber.send_next(json!(counter.fetch_add(1, Ordering::SeqCst)));
            subscriber.send_completed();
            None
        });

        let producer = HotToColdAdapter::default().wrap::<usize, BridgeError>(&signal);
        assert_eq!(producer.first(), Some(Ok(0)));
        assert_eq!(producer.first(), Some(Ok(1)));
        assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_decode_failure_fails_stream() {
        let signal = LegacySignal::value(json!("not a number"));
        let producer = HotToColdAdapter::default().wrap::<i64, BridgeError>(&signal);
        match producer.first() {
            Some(Err(BridgeError::Decode { expected, .. })) => assert_eq!(expected, "i64"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_boxed_bridge_error_unboxes_to_typed() {
        let original = BridgeError::Encode("bad".to_string());
        let signal = LegacySignal::error(original.clone().into_boxed_error());
        let producer = HotToColdAdapter::default().wrap::<i64, BridgeError>(&signal);
        assert_eq!(producer.last(), Some(Err(original)));
    }

    #[test]
    fn test_foreign_error_stays_opaque() {
        let boxed = BoxedError::new("legacy.Network", 42);
        let unboxed: BridgeError = unbox_error(boxed.clone());
        assert_eq!(unboxed, BridgeError::Legacy(boxed));
    }

    #[test]
    fn test_dispose_releases_legacy_subscription() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let signal = LegacySignal::create(move |_| {
            let counter = counter.clone();
            Some(Disposable::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
        });

        let started = HotToColdAdapter::default()
            .wrap::<i64, BridgeError>(&signal)
            .start_with(|_| {});
        started.dispose();
        started.dispose();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
