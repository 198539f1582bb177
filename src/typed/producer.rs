//! Cold typed producers.
//!
//! A `SignalProducer` is a template: nothing happens until `start`, and each
//! start runs the start handler again with its own observer and its own
//! lifetime. Disposing the handle returned by `start` interrupts that one
//! execution and releases everything registered on its lifetime.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::mpsc;
use std::task::{Context, Poll};

use futures::Stream;
use futures::channel::mpsc as async_mpsc;

use super::Payload;
use super::event::Event;
use super::observer::Observer;
use super::signal::Signal;
use crate::context::warn_if_blocking_current_thread;
use crate::disposable::Disposable;

type StartHandler<T, E> = dyn Fn(Observer<T, E>, &Disposable) + Send + Sync;

/// A cold, restartable source of typed events.
pub struct SignalProducer<T, E> {
    start_handler: Arc<StartHandler<T, E>>,
}

impl<T: Payload, E: Payload> SignalProducer<T, E> {
    /// Create a producer from a start handler.
    ///
    /// The handler receives the observer for one execution and that
    /// execution's lifetime, on which it registers its cleanup.
    pub fn new(handler: impl Fn(Observer<T, E>, &Disposable) + Send + Sync + 'static) -> Self {
        Self {
            start_handler: Arc::new(handler),
        }
    }

    /// Send `value` then complete.
    pub fn value(value: T) -> Self {
        Self::new(move |observer, _| {
            observer.send_value(value.clone());
            observer.send_completed();
        })
    }

    /// Send every value in order then complete.
    pub fn values(values: Vec<T>) -> Self {
        Self::new(move |observer, _| {
            for value in &values {
                observer.send_value(value.clone());
            }
            observer.send_completed();
        })
    }

    /// Fail immediately with `error`.
    pub fn failed(error: E) -> Self {
        Self::new(move |observer, _| observer.send_failed(error.clone()))
    }

    /// Complete without values.
    pub fn empty() -> Self {
        Self::new(|observer, _| observer.send_completed())
    }

    /// Never send anything.
    pub fn never() -> Self {
        Self::new(|_, _| {})
    }

    /// Run `f` on every start and send its outcome.
    pub fn attempt(f: impl Fn() -> Result<T, E> + Send + Sync + 'static) -> Self {
        Self::new(move |observer, _| match f() {
            Ok(value) => {
                observer.send_value(value);
                observer.send_completed();
            }
            Err(error) => observer.send_failed(error),
        })
    }

    /// Producer whose every start observes the hot `signal`.
    pub fn from_signal(signal: Signal<T, E>) -> Self {
        Self::new(move |observer, lifetime| {
            if let Some(disposable) = signal.observe(observer) {
                lifetime.add_disposable(disposable);
            }
        })
    }

    /// Start one execution.
    pub fn start(&self, observer: Observer<T, E>) -> Disposable {
        let lifetime = Disposable::empty();

        let terminal_lifetime = lifetime.clone();
        let execution = Observer::new(move |event: Event<T, E>| {
            let terminal = event.is_terminal();
            observer.send(event);
            if terminal {
                terminal_lifetime.dispose();
            }
        });

        // Registered first so disposal interrupts before any cleanup runs
        let interrupt = execution.clone();
        lifetime.add(move || interrupt.send_interrupted());

        (self.start_handler)(execution, &lifetime);
        lifetime
    }

    /// Start and handle every event with a closure.
    pub fn start_with(&self, f: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Disposable {
        self.start(Observer::new(f))
    }

    /// Start and handle only the values.
    pub fn start_with_values(&self, f: impl Fn(T) + Send + Sync + 'static) -> Disposable {
        self.start_with(move |event| {
            if let Event::Value(value) = event {
                f(value);
            }
        })
    }

    pub fn map<U: Payload>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> SignalProducer<U, E> {
        let source = self.clone();
        let f = Arc::new(f);
        SignalProducer::new(move |observer: Observer<U, E>, lifetime| {
            let f = f.clone();
            let disposable = source.start_with(move |event| observer.send(event.map(|v| f(v))));
            lifetime.add_disposable(disposable);
        })
    }

    pub fn map_err<F: Payload>(&self, f: impl Fn(E) -> F + Send + Sync + 'static) -> SignalProducer<T, F> {
        let source = self.clone();
        let f = Arc::new(f);
        SignalProducer::new(move |observer: Observer<T, F>, lifetime| {
            let f = f.clone();
            let disposable = source.start_with(move |event| observer.send(event.map_err(|e| f(e))));
            lifetime.add_disposable(disposable);
        })
    }

    /// Start and block until the execution terminates, collecting its events.
    fn run_until(&self, stop: impl Fn(&Event<T, E>) -> bool) -> Vec<Event<T, E>> {
        warn_if_blocking_current_thread("SignalProducer::run_until");
        let (tx, rx) = mpsc::channel();
        let disposable = self.start_with(move |event| {
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

    /// Block for the first value. `None` when the execution ends without one.
    ///
    /// The blocking helpers park the calling thread. Inside an async context
    /// prefer [`SignalProducer::into_stream`]; blocking on the runtime thread
    /// that drains a `SerialQueue` feeding this producer never returns.
    pub fn first(&self) -> Option<Result<T, E>> {
        match self.run_until(|event| event.value().is_some()).pop()? {
            Event::Value(value) => Some(Ok(value)),
            Event::Failed(error) => Some(Err(error)),
            Event::Completed | Event::Interrupted => None,
        }
    }

    /// Block for the last value, or the error if the execution failed.
    pub fn last(&self) -> Option<Result<T, E>> {
        let mut last = None;
        for event in self.run_until(|_| false) {
            match event {
                Event::Value(value) => last = Some(Ok(value)),
                Event::Failed(error) => return Some(Err(error)),
                Event::Completed | Event::Interrupted => {}
            }
        }
        last
    }

    /// Block until the execution terminates.
    pub fn wait(&self) -> Result<(), E> {
        self.collect().map(|_| ())
    }

    /// Block and gather every value.
    pub fn collect(&self) -> Result<Vec<T>, E> {
        let mut values = Vec::new();
        for event in self.run_until(|_| false) {
            match event {
                Event::Value(value) => values.push(value),
                Event::Failed(error) => return Err(error),
                Event::Completed | Event::Interrupted => {}
            }
        }
        Ok(values)
    }

    /// Start and expose the execution as an async stream.
    ///
    /// Dropping the stream disposes the execution.
    pub fn into_stream(&self) -> ProducerStream<T, E> {
        let (tx, rx) = async_mpsc::unbounded();
        let disposable = self.start_with(move |event| {
            let _ = tx.unbounded_send(event);
        });
        ProducerStream {
            receiver: rx,
            disposable,
            finished: false,
        }
    }
}

impl<T, E> Clone for SignalProducer<T, E> {
    fn clone(&self) -> Self {
        Self {
            start_handler: self.start_handler.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for SignalProducer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalProducer").finish_non_exhaustive()
    }
}

/// Async view over one producer execution.
pub struct ProducerStream<T, E> {
    receiver: async_mpsc::UnboundedReceiver<Event<T, E>>,
    disposable: Disposable,
    finished: bool,
}

impl<T, E> Stream for ProducerStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.receiver).poll_next(cx) {
            Poll::Ready(Some(Event::Value(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Event::Failed(error))) => {
                this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Event::Completed | Event::Interrupted)) | Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> Drop for ProducerStream<T, E> {
    fn drop(&mut self) {
        self.disposable.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_each_start_runs_handler_again() {
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = starts.clone();
        let producer = SignalProducer::<usize, String>::attempt(move || Ok(counter.fetch_add(1, Ordering::SeqCst)));

        assert_eq!(producer.first(), Some(Ok(0)));
        assert_eq!(producer.first(), Some(Ok(1)));
        assert_eq!(producer.first(), Some(Ok(2)));
        assert_eq!(starts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_last_and_collect() {
        let producer = SignalProducer::<i32, String>::values(vec![1, 2, 3]);
        assert_eq!(producer.last(), Some(Ok(3)));
        assert_eq!(producer.collect(), Ok(vec![1, 2, 3]));
        assert_eq!(SignalProducer::<i32, String>::empty().first(), None);
    }

    #[test]
    fn test_failure_surfaces_through_helpers() {
        let producer = SignalProducer::<i32, String>::failed("boom".into());
        assert_eq!(producer.first(), Some(Err("boom".to_string())));
        assert_eq!(producer.last(), Some(Err("boom".to_string())));
        assert_eq!(producer.wait(), Err("boom".to_string()));
    }

    #[test]
    fn test_dispose_interrupts_and_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let producer = SignalProducer::<i32, String>::new(move |_, lifetime| {
            let counter = counter.clone();
            lifetime.add(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let disposable = producer.start_with(move |event| sink.lock().push(event));

        disposable.dispose();
        disposable.dispose();

        assert_eq!(*seen.lock(), vec![Event::Interrupted]);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_terminal_event_releases_lifetime() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let producer = SignalProducer::<i32, String>::new(move |observer, lifetime| {
            let counter = counter.clone();
            lifetime.add(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            observer.send_value(1);
            observer.send_completed();
            observer.send_value(2);
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let disposable = producer.start_with(move |event| sink.lock().push(event));

        assert!(disposable.is_disposed());
        assert_eq!(*seen.lock(), vec![Event::Value(1), Event::Completed]);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_map_and_map_err() {
        let doubled = SignalProducer::<i32, String>::values(vec![1, 2]).map(|v| v * 2);
        assert_eq!(doubled.collect(), Ok(vec![2, 4]));

        let measured = SignalProducer::<i32, String>::failed("four".into()).map_err(|e| e.len());
        assert_eq!(measured.wait(), Err(4));
    }

    #[test]
    fn test_from_signal_observes_hot_values() {
        let (signal, input) = Signal::<i32, String>::pipe();
        let producer = SignalProducer::from_signal(signal);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        producer.start_with_values(move |v| sink.lock().push(v));

        input.send_value(5);
        input.send_value(6);
        assert_eq!(*seen.lock(), vec![5, 6]);
    }

    #[tokio::test]
    async fn test_into_stream_yields_values_then_ends() {
        let producer = SignalProducer::<i32, String>::values(vec![1, 2, 3]);
        let values: Vec<_> = producer.into_stream().collect().await;
        assert_eq!(values, vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[tokio::test]
    async fn test_into_stream_stops_after_failure() {
        let producer = SignalProducer::<i32, String>::new(|observer, _| {
            observer.send_value(1);
            observer.send_failed("bad".into());
        });
        let values: Vec<_> = producer.into_stream().collect().await;
        assert_eq!(values, vec![Ok(1), Err("bad".to_string())]);
    }

    #[tokio::test]
    async fn test_serial_queue_delivery_awaited_through_stream() {
        use crate::context::{ContextRef, SerialQueue};

        let queue = ContextRef::new(SerialQueue::spawn_current("stream").unwrap());
        let producer = SignalProducer::<i32, String>::new(move |observer, _| {
            for value in [1, 2] {
                let observer = observer.clone();
                queue.run(move || observer.send_value(value));
            }
            queue.run(move || observer.send_completed());
        });

        let values: Vec<_> = producer.into_stream().collect().await;
        assert_eq!(values, vec![Ok(1), Ok(2)]);
    }
}
