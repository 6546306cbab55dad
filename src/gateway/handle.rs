//! Resource handles: reference-counted, single-flight wrappers around
//! engine objects.
//!
//! A [`Handle`] is the only way gateway code reaches an engine object.
//! Cloning a handle acquires a reference; dropping the last clone releases
//! the object, running its orderly [`EngineObject::close`] exactly once.
//! The object slot starts empty for handles whose construction is itself
//! asynchronous (an index being opened) and is populated by the first
//! successful open task.
//!
//! Admission is single-flight: [`Handle::begin_task`] hands out at most one
//! [`TaskPermit`] at a time. While a permit is live the handle is busy and
//! every further admission fails synchronously. Dropping the permit clears
//! busy unconditionally, so an erroring task can never wedge its handle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{FalxError, Result};

/// An object that can live inside a [`Handle`].
///
/// `close` runs once, when the last handle clone drops with no task
/// outstanding. The default is a no-op; index objects override it to flush.
pub trait EngineObject: Send + 'static {
    /// Orderly shutdown before the object is destroyed.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct HandleInner<T: EngineObject> {
    slot: Mutex<Option<T>>,
    busy: AtomicBool,
}

impl<T: EngineObject> Drop for HandleInner<T> {
    fn drop(&mut self) {
        if let Some(object) = self.slot.get_mut().as_mut() {
            // Nothing left to report the failure to.
            let _ = object.close();
        }
    }
}

/// A reference-counted, single-flight handle to one engine object.
pub struct Handle<T: EngineObject> {
    inner: Arc<HandleInner<T>>,
}

impl<T: EngineObject> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: EngineObject> Handle<T> {
    /// Create a handle already holding its engine object.
    pub fn new(object: T) -> Self {
        Handle {
            inner: Arc::new(HandleInner {
                slot: Mutex::new(Some(object)),
                busy: AtomicBool::new(false),
            }),
        }
    }

    /// Create a handle whose object will be installed by its first open
    /// task.
    pub fn empty() -> Self {
        Handle {
            inner: Arc::new(HandleInner {
                slot: Mutex::new(None),
                busy: AtomicBool::new(false),
            }),
        }
    }

    /// Whether a task is currently outstanding against this handle.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Whether the object slot has been populated.
    pub fn is_open(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    /// The sole admission point: claim exclusive task access.
    ///
    /// Fails synchronously with [`FalxError::Busy`] if another task is
    /// outstanding. On success the handle is busy until the returned permit
    /// drops.
    pub fn begin_task(&self) -> Result<TaskPermit<T>> {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FalxError::busy("operation in progress on this handle"));
        }
        Ok(TaskPermit {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Run a short, synchronous exclusive section on the control thread.
    ///
    /// Same admission rule as [`Handle::begin_task`]; busy is cleared when
    /// the closure returns. Used for operations the engine performs without
    /// blocking I/O.
    pub fn with_exclusive<R>(&self, f: impl FnOnce(&mut Option<T>) -> Result<R>) -> Result<R> {
        let permit = self.begin_task()?;
        permit.with_object(f)
    }
}

/// Exclusive task access to a handle's object slot, held for the duration
/// of one task's worker body.
pub struct TaskPermit<T: EngineObject> {
    inner: Arc<HandleInner<T>>,
}

impl<T: EngineObject> TaskPermit<T> {
    /// Run `f` with the object slot. The slot is `None` until an open task
    /// installs the object.
    pub fn with_object<R>(&self, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        let mut guard = self.inner.slot.lock();
        f(&mut guard)
    }

    /// Consume the permit, running `f` before busy clears.
    ///
    /// Anything `f` publishes (a queued completion, say) is visible before
    /// another task can be admitted on this handle, which is what keeps
    /// same-handle completions in issue order.
    pub fn finish(self, f: impl FnOnce()) {
        f();
    }
}

impl<T: EngineObject> fmt::Debug for TaskPermit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPermit").finish_non_exhaustive()
    }
}

impl<T: EngineObject> Drop for TaskPermit<T> {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
    }
}

/// Borrow the open object out of a slot, or fail with an engine error.
pub(crate) fn open_object<'a, T>(slot: &'a mut Option<T>, what: &str) -> Result<&'a mut T> {
    slot.as_mut()
        .ok_or_else(|| FalxError::engine(format!("{what} is not open")))
}
