//! Execution contexts threaded through every adapter.
//!
//! Adapters never pick a thread or scheduler on their own: each one is built
//! with a [`ContextRef`] and forwards every event through it. `Immediate`
//! delivers on the caller's turn; `SerialQueue` delivers in FIFO order from a
//! single task on a runtime the caller already owns.

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::error::{BridgeError, Result};

/// A unit of work scheduled on a context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where forwarded events are delivered.
pub trait ExecutionContext: Send + Sync {
    /// Run `job`, preserving submission order relative to other jobs.
    fn execute(&self, job: Job);

    /// Label used in logs
    fn label(&self) -> &str;
}

/// Shared handle to an execution context.
#[derive(Clone)]
pub struct ContextRef(Arc<dyn ExecutionContext>);

impl ContextRef {
    pub fn new(context: impl ExecutionContext + 'static) -> Self {
        Self(Arc::new(context))
    }

    /// Context delivering inline on the caller's turn.
    pub fn immediate() -> Self {
        Self::new(Immediate)
    }

    /// Schedule a closure on this context.
    pub fn run(&self, job: impl FnOnce() + Send + 'static) {
        self.0.execute(Box::new(job));
    }

    pub fn label(&self) -> &str {
        self.0.label()
    }
}

impl Default for ContextRef {
    fn default() -> Self {
        Self::immediate()
    }
}

impl std::fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContextRef").field(&self.label()).finish()
    }
}

/// Runs every job synchronously on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ExecutionContext for Immediate {
    fn execute(&self, job: Job) {
        job();
    }

    fn label(&self) -> &str {
        "immediate"
    }
}

/// FIFO queue drained by one task on an existing tokio runtime.
#[derive(Debug)]
pub struct SerialQueue {
    label: String,
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    /// Start draining a new queue on `handle`.
    pub fn spawn(label: impl Into<String>, handle: &Handle) -> Self {
        let label = label.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let task_label = label.clone();
        handle.spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
            }
            tracing::debug!(queue = %task_label, "Serial queue drained and closed");
        });

        Self { label, sender }
    }

    /// Start draining a new queue on the runtime of the current task.
    pub fn spawn_current(label: impl Into<String>) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| BridgeError::Runtime(e.to_string()))?;
        Ok(Self::spawn(label, &handle))
    }
}

impl ExecutionContext for SerialQueue {
    fn execute(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::warn!(queue = %self.label, "Serial queue closed, dropping job");
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Warn when a blocking helper is called from a current-thread runtime.
///
/// A `SerialQueue` on that runtime cannot drain while its only thread is
/// blocked, so events routed through it never arrive.
pub(crate) fn warn_if_blocking_current_thread(helper: &str) -> bool {
    let blocking = Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread)
        .unwrap_or(false);
    if blocking {
        tracing::warn!(helper, "Blocking on a current-thread runtime; serial queue delivery cannot progress");
    }
    blocking
}
