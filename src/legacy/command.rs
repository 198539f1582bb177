//! Legacy commands: enable-gated work returning one signal per execution.
//!
//! `execute` subscribes to the work signal exactly once and replays every
//! event of that execution to whoever subscribes to the returned signal, so
//! waiting on it repeatedly never triggers the work again. Executions are
//! serial unless concurrent execution is allowed: while one is in flight the
//! command reports disabled and `execute` returns a `COMMAND_NOT_ENABLED`
//! error signal.
//!
//! An execution is cancelled when the last subscriber of its signal leaves
//! before the work terminated, or when the command is dropped. Cancelling
//! releases the work subscription, completes the execution signal and frees
//! the command for the next execution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;

use super::signal::LegacySignal;
use super::subject::{LegacySubject, Replay};
use super::subscriber::LegacyEvent;
use crate::bag::Bag;
use crate::boxing::BoxedError;
use crate::disposable::Disposable;

/// Domain of errors raised by the command itself.
pub const COMMAND_ERROR_DOMAIN: &str = "streambridge.LegacyCommand";

/// `execute` was called while the command was disabled.
pub const COMMAND_NOT_ENABLED: i64 = 1;

type WorkFn = dyn Fn(Value) -> LegacySignal + Send + Sync;
type ExecutionObserver = Arc<dyn Fn(LegacySignal) + Send + Sync>;

#[derive(Debug)]
struct CommandState {
    input_enabled: bool,
    executing: usize,
}

struct CommandInner {
    work: Box<WorkFn>,
    allows_concurrent: AtomicBool,
    state: Mutex<CommandState>,
    enabled: LegacySubject,
    executing: LegacySubject,
    executions: Mutex<Bag<ExecutionObserver>>,
    in_flight: Mutex<Bag<Disposable>>,
    refreshing: ReentrantMutex<()>,
    lifetime: Disposable,
}

impl CommandInner {
    fn can_execute(&self, state: &CommandState) -> bool {
        state.input_enabled && (self.allows_concurrent.load(Ordering::Acquire) || state.executing == 0)
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.state.lock().input_enabled = enabled;
        self.refresh();
    }

    fn finish_execution(&self) {
        {
            let mut state = self.state.lock();
            state.executing = state.executing.saturating_sub(1);
        }
        tracing::debug!("Command execution finished");
        self.refresh();
    }

    fn refresh(&self) {
        let _refreshing = self.refreshing.lock();
        let (enabled, executing) = {
            let state = self.state.lock();
            (self.can_execute(&state), state.executing > 0)
        };
        if self.enabled.latest() != Some(Value::Bool(enabled)) {
            self.enabled.send_next(Value::Bool(enabled));
        }
        if self.executing.latest() != Some(Value::Bool(executing)) {
            self.executing.send_next(Value::Bool(executing));
        }
    }
}

impl Drop for CommandInner {
    fn drop(&mut self) {
        for cancel in self.in_flight.get_mut().drain() {
            cancel.dispose();
        }
        self.lifetime.dispose();
    }
}

/// One run of the work, shared by the work subscription and by every
/// subscriber of the execution signal.
struct Execution {
    command: Weak<CommandInner>,
    token: u64,
    work: Disposable,
    replay: LegacySubject,
    subscribers: Mutex<usize>,
    finished: AtomicBool,
}

impl Execution {
    fn forward(&self, event: LegacyEvent) {
        if !event.is_terminal() {
            self.replay.send(event);
            return;
        }
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.replay.send(event);
        self.release();
    }

    fn attach(&self) {
        *self.subscribers.lock() += 1;
    }

    fn detach(&self) {
        let remaining = {
            let mut subscribers = self.subscribers.lock();
            *subscribers = subscribers.saturating_sub(1);
            *subscribers
        };
        if remaining == 0 {
            self.cancel();
        }
    }

    fn cancel(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Command execution cancelled");
        self.work.dispose();
        self.replay.send_completed();
        self.release();
    }

    fn release(&self) {
        if let Some(command) = self.command.upgrade() {
            command.in_flight.lock().remove(self.token);
            command.finish_execution();
        }
    }

    /// Signal replaying this execution and counting its subscribers.
    fn signal(self: &Arc<Self>) -> LegacySignal {
        let execution = self.clone();
        let replay = self.replay.signal();
        LegacySignal::create(move |subscriber| {
            execution.attach();
            let forward = subscriber.clone();
            let subscription = replay.subscribe(move |event| forward.send(event));
            let execution = execution.clone();
            Some(Disposable::new(move || {
                subscription.dispose();
                execution.detach();
            }))
        })
    }
}

/// Enable-gated legacy work.
#[derive(Clone)]
pub struct LegacyCommand {
    inner: Arc<CommandInner>,
}

impl LegacyCommand {
    /// Command enabled whenever it is not executing.
    pub fn new(work: impl Fn(Value) -> LegacySignal + Send + Sync + 'static) -> Self {
        let enabled = LegacySubject::with_replay(Replay::Last);
        enabled.send_next(Value::Bool(true));
        let executing = LegacySubject::with_replay(Replay::Last);
        executing.send_next(Value::Bool(false));

        Self {
            inner: Arc::new(CommandInner {
                work: Box::new(work),
                allows_concurrent: AtomicBool::new(false),
                state: Mutex::new(CommandState {
                    input_enabled: true,
                    executing: 0,
                }),
                enabled,
                executing,
                executions: Mutex::new(Bag::new()),
                in_flight: Mutex::new(Bag::new()),
                refreshing: ReentrantMutex::new(()),
                lifetime: Disposable::empty(),
            }),
        }
    }

    /// Command additionally gated on the boolean values of `enabled_signal`.
    ///
    /// Starts enabled until the signal sends its first value. Values that
    /// are not booleans are logged and ignored.
    pub fn with_enabled(
        enabled_signal: LegacySignal,
        work: impl Fn(Value) -> LegacySignal + Send + Sync + 'static,
    ) -> Self {
        let command = Self::new(work);
        let weak: Weak<CommandInner> = Arc::downgrade(&command.inner);
        let subscription = enabled_signal.subscribe(move |event| {
            let LegacyEvent::Next(value) = event else {
                return;
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match value.as_bool() {
                Some(enabled) => inner.set_input_enabled(enabled),
                None => tracing::warn!(value = %value, "Ignoring non-boolean enabled value"),
            }
        });
        command.inner.lifetime.add_disposable(subscription);
        command
    }

    pub fn set_allows_concurrent_execution(&self, allows: bool) {
        self.inner.allows_concurrent.store(allows, Ordering::Release);
        self.inner.refresh();
    }

    pub fn allows_concurrent_execution(&self) -> bool {
        self.inner.allows_concurrent.load(Ordering::Acquire)
    }

    /// Boolean values telling whether `execute` would run; replays the latest.
    pub fn enabled(&self) -> LegacySignal {
        self.inner.enabled.signal()
    }

    pub fn is_enabled(&self) -> bool {
        let state = self.inner.state.lock();
        self.inner.can_execute(&state)
    }

    /// Boolean values telling whether an execution is in flight.
    pub fn executing(&self) -> LegacySignal {
        self.inner.executing.signal()
    }

    /// Observe the signal of every subsequent execution.
    pub fn execution_signals(&self, observer: impl Fn(LegacySignal) + Send + Sync + 'static) -> Disposable {
        let token = self.inner.executions.lock().insert(Arc::new(observer));
        let weak = Arc::downgrade(&self.inner);
        Disposable::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.executions.lock().remove(token);
            }
        })
    }

    /// Run the work for `input` once.
    ///
    /// The returned signal represents this execution only; subscribing to it
    /// again replays the execution instead of repeating it. Once it has had
    /// subscribers, the last of them leaving before the work terminated
    /// cancels the execution.
    pub fn execute(&self, input: Value) -> LegacySignal {
        {
            let mut state = self.inner.state.lock();
            if !self.inner.can_execute(&state) {
                tracing::debug!(input = %input, "Command not enabled, rejecting execution");
                return LegacySignal::error(
                    BoxedError::new(COMMAND_ERROR_DOMAIN, COMMAND_NOT_ENABLED)
                        .with_description("The command is disabled and cannot be executed"),
                );
            }
            state.executing += 1;
        }
        tracing::debug!(input = %input, "Command execution started");
        self.inner.refresh();

        let execution = Arc::new_cyclic(|weak: &Weak<Execution>| {
            let cancel = weak.clone();
            let token = self.inner.in_flight.lock().insert(Disposable::new(move || {
                if let Some(execution) = cancel.upgrade() {
                    execution.cancel();
                }
            }));
            Execution {
                command: Arc::downgrade(&self.inner),
                token,
                work: Disposable::empty(),
                replay: LegacySubject::with_replay(Replay::All),
                subscribers: Mutex::new(0),
                finished: AtomicBool::new(false),
            }
        });
        let signal = execution.signal();

        let observers = self.inner.executions.lock().snapshot();
        for observer in observers {
            observer(signal.clone());
        }

        if execution.finished.load(Ordering::Acquire) {
            return signal;
        }
        let forward = execution.clone();
        let subscription = (self.inner.work)(input).subscribe(move |event| forward.forward(event));
        execution.work.add_disposable(subscription);

        signal
    }
}

impl std::fmt::Debug for LegacyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LegacyCommand")
            .field("input_enabled", &state.input_enabled)
            .field("executing", &state.executing)
            .finish()
    }
}
