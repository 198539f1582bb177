//! Hot multicast legacy sources.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;

use super::signal::LegacySignal;
use super::subscriber::{LegacyEvent, LegacySubscriber};
use crate::bag::Bag;
use crate::boxing::BoxedError;
use crate::disposable::Disposable;

/// What a new subscriber receives from before it subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Nothing; only later events
    Off,
    /// The latest value
    Last,
    /// Every value sent so far
    All,
}

struct SubjectState {
    subscribers: Bag<LegacySubscriber>,
    history: Vec<Value>,
    terminal: Option<LegacyEvent>,
}

struct SubjectInner {
    replay: Replay,
    /// Held while an event or a new subscriber's replay is delivered.
    delivery: ReentrantMutex<()>,
    state: Mutex<SubjectState>,
}

/// Manually driven hot signal shared by all of its subscribers.
///
/// The terminal event is always replayed to late subscribers, together with
/// whatever history the replay policy keeps.
#[derive(Clone)]
pub struct LegacySubject {
    inner: Arc<SubjectInner>,
}

impl LegacySubject {
    /// Subject without replay.
    pub fn new() -> Self {
        Self::with_replay(Replay::Off)
    }

    pub fn with_replay(replay: Replay) -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                replay,
                delivery: ReentrantMutex::new(()),
                state: Mutex::new(SubjectState {
                    subscribers: Bag::new(),
                    history: Vec::new(),
                    terminal: None,
                }),
            }),
        }
    }

    /// Record `event` and deliver it to the current subscribers.
    ///
    /// Events sent from different threads reach every subscriber in the
    /// order they were recorded.
    pub fn send(&self, event: LegacyEvent) {
        let _delivery = self.inner.delivery.lock();
        let subscribers = {
            let mut state = self.inner.state.lock();
            if state.terminal.is_some() {
                return;
            }
            match &event {
                LegacyEvent::Next(value) => match self.inner.replay {
                    Replay::Off => {}
                    Replay::Last => state.history = vec![value.clone()],
                    Replay::All => state.history.push(value.clone()),
                },
                terminal => state.terminal = Some(terminal.clone()),
            }
            if event.is_terminal() {
                state.subscribers.drain()
            } else {
                state.subscribers.snapshot()
            }
        };
        for subscriber in subscribers {
            subscriber.send(event.clone());
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

    /// Latest replayed value, if the policy keeps one.
    pub fn latest(&self) -> Option<Value> {
        self.inner.state.lock().history.last().cloned()
    }

    /// Signal attaching each subscriber to this subject.
    ///
    /// The replayed history is delivered before any event sent after the
    /// subscriber attached.
    pub fn signal(&self) -> LegacySignal {
        let inner = self.inner.clone();
        LegacySignal::create(move |subscriber| {
            let _delivery = inner.delivery.lock();
            let (history, terminal, token) = {
                let mut state = inner.state.lock();
                let token = match state.terminal {
                    Some(_) => None,
                    None => Some(state.subscribers.insert(subscriber.clone())),
                };
                (state.history.clone(), state.terminal.clone(), token)
            };

            for value in history {
                subscriber.send_next(value);
            }
            if let Some(terminal) = terminal {
                subscriber.send(terminal);
            }

            let weak: Weak<SubjectInner> = Arc::downgrade(&inner);
            token.map(|token| {
                Disposable::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.state.lock().subscribers.remove(token);
                    }
                })
            })
        })
    }

    /// Subscriber feeding every event it receives into this subject.
    pub fn subscriber(&self) -> LegacySubscriber {
        let subject = self.clone();
        LegacySubscriber::new(move |event| subject.send(event))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }
}

impl Default for LegacySubject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LegacySubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySubject")
            .field("replay", &self.inner.replay)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(signal: &LegacySignal) -> (Arc<Mutex<Vec<LegacyEvent>>>, Disposable) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let disposable = signal.subscribe(move |event| sink.lock().push(event));
        (seen, disposable)
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let subject = LegacySubject::new();
        subject.send_next(json!(1));

        let (seen, _sub) = record(&subject.signal());
        subject.send_next(json!(2));

        assert_eq!(*seen.lock(), vec![LegacyEvent::Next(json!(2))]);
    }

    #[test]
    fn test_replay_last_keeps_latest_only() {
        let subject = LegacySubject::with_replay(Replay::Last);
        subject.send_next(json!(true));
        subject.send_next(json!(false));

        let (seen, _sub) = record(&subject.signal());
        assert_eq!(*seen.lock(), vec![LegacyEvent::Next(json!(false))]);
        assert_eq!(subject.latest(), Some(json!(false)));
    }

    #[test]
    fn test_replay_all_replays_history_and_terminal() {
        let subject = LegacySubject::with_replay(Replay::All);
        subject.send_next(json!("a"));
        subject.send_next(json!("b"));
        subject.send_completed();

        let (seen, sub) = record(&subject.signal());
        assert_eq!(
            *seen.lock(),
            vec![
                LegacyEvent::Next(json!("a")),
                LegacyEvent::Next(json!("b")),
                LegacyEvent::Completed
            ]
        );
        assert!(sub.is_disposed());
    }

    #[test]
    fn test_dispose_removes_subscriber() {
        let subject = LegacySubject::new();
        let (seen, sub) = record(&subject.signal());
        assert_eq!(subject.subscriber_count(), 1);

        sub.dispose();
        subject.send_next(json!(1));

        assert_eq!(subject.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_subscriber_feeds_subject() {
        let subject = LegacySubject::with_replay(Replay::All);
        LegacySignal::values(vec![json!(1), json!(2)]).subscribe_with(subject.subscriber());
        assert_eq!(subject.signal().to_vec(), Ok(vec![json!(1), json!(2)]));
    }

    #[test]
    fn test_replay_last_ends_on_latest_value_under_concurrent_sends() {
        for _ in 0..100 {
            let subject = LegacySubject::with_replay(Replay::Last);
            subject.send_next(json!(0));
            let sender = subject.clone();
            let writer = std::thread::spawn(move || {
                for value in 1..=200 {
                    sender.send_next(json!(value));
                }
            });

            let (seen, _sub) = record(&subject.signal());
            writer.join().unwrap();

            assert_eq!(seen.lock().last(), Some(&LegacyEvent::Next(json!(200))));
        }
    }

    #[test]
    fn test_subscriber_may_send_during_replay() {
        let subject = LegacySubject::with_replay(Replay::Last);
        subject.send_next(json!(1));
        let target = subject.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = subject.signal().subscribe(move |event| {
            sink.lock().push(event.clone());
            if event == LegacyEvent::Next(json!(1)) {
                target.send_next(json!(2));
            }
        });

        assert_eq!(
            *seen.lock(),
            vec![LegacyEvent::Next(json!(1)), LegacyEvent::Next(json!(2))]
        );
    }
}
