//! Idempotent disposal handles shared by both reactive models.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type DisposeAction = Box<dyn FnOnce() + Send>;

/// Handle releasing the resources of a subscription or execution.
///
/// Cloning shares the handle. `dispose()` runs every registered action
/// exactly once no matter how many clones call it; actions added after
/// disposal run immediately.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<DisposableInner>,
}

struct DisposableInner {
    disposed: AtomicBool,
    actions: Mutex<Vec<DisposeAction>>,
}

impl Disposable {
    /// Create a handle with nothing registered yet.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(DisposableInner {
                disposed: AtomicBool::new(false),
                actions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a handle that runs `action` on disposal.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        let disposable = Self::empty();
        disposable.add(action);
        disposable
    }

    /// Register another action.
    pub fn add(&self, action: impl FnOnce() + Send + 'static) {
        {
            let mut actions = self.inner.actions.lock();
            if !self.inner.disposed.load(Ordering::Acquire) {
                actions.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Dispose `other` together with this handle.
    pub fn add_disposable(&self, other: Disposable) {
        self.add(move || other.dispose());
    }

    pub fn dispose(&self) {
        let actions = {
            let mut actions = self.inner.actions.lock();
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *actions)
        };
        for action in actions {
            action();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes the wrapped handle when dropped.
#[derive(Debug)]
pub struct DisposeOnDrop(Option<Disposable>);

impl DisposeOnDrop {
    pub fn new(disposable: Disposable) -> Self {
        Self(Some(disposable))
    }

    /// Give up ownership without disposing.
    pub fn into_inner(mut self) -> Disposable {
        self.0.take().unwrap_or_default()
    }
}

impl Drop for DisposeOnDrop {
    fn drop(&mut self) {
        if let Some(disposable) = self.0.take() {
            disposable.dispose();
        }
    }
}
