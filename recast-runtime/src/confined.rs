//! Thread-confined envelope for completion continuations.
//!
//! The isolated bridge moves each callback to its worker and back inside the
//! delivery message, so no process-wide table of pending continuations exists.
//! The callback itself may be `!Send`; [`Confined`] makes the envelope
//! movable while guaranteeing the value is only unwrapped, or dropped, on the
//! thread that created it.

use std::mem::ManuallyDrop;
use std::thread::{self, ThreadId};

pub(crate) struct Confined<T> {
    value: ManuallyDrop<T>,
    origin: ThreadId,
}

// SAFETY: the wrapped value is never accessed off its origin thread:
// `into_inner` asserts the thread, and `Drop` leaks the value instead of
// running its destructor elsewhere.
unsafe impl<T> Send for Confined<T> {}

impl<T> Confined<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            origin: thread::current().id(),
        }
    }

    pub(crate) fn is_on_origin(&self) -> bool {
        thread::current().id() == self.origin
    }

    /// Unwraps the value.
    ///
    /// # Panics
    ///
    /// Panics when called off the origin thread.
    pub(crate) fn into_inner(self) -> T {
        assert!(
            self.is_on_origin(),
            "confined value unwrapped off its origin thread"
        );
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the value is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<T> Drop for Confined<T> {
    fn drop(&mut self) {
        if self.is_on_origin() {
            // SAFETY: drop runs once and the value is not used afterwards.
            unsafe { ManuallyDrop::drop(&mut self.value) }
        } else {
            tracing::warn!("leaking continuation dropped off its origin thread");
        }
    }
}
