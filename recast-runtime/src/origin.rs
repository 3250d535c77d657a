//! Origin thread designation and its dispatch queue.
//!
//! The isolated background model delivers every result on a designated origin
//! thread (typically the UI/main thread). That thread installs an
//! [`OriginLoop`] and pumps it from its own event loop; workers post delivery
//! messages into the loop's queue.
//!
//! ```
//! use recast_runtime::OriginLoop;
//!
//! let mut origin = OriginLoop::install().expect("first install on this thread");
//! assert!(recast_runtime::origin::is_origin_thread());
//! assert_eq!(origin.run_pending(), 0);
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;

use crate::error::{Error, RuntimeResult};
use crate::runtime;

/// A delivery message, executed on the origin thread.
pub(crate) type Delivery = Box<dyn FnOnce() + Send>;

thread_local! {
    static ORIGIN: RefCell<Option<DispatchQueue>> = const { RefCell::new(None) };
}

/// Sending half of an origin thread's queue.
#[derive(Clone)]
pub(crate) struct DispatchQueue {
    sender: mpsc::UnboundedSender<Delivery>,
    thread: ThreadId,
}

impl DispatchQueue {
    /// Posts a delivery. Returns `false` if the origin loop is gone, in which
    /// case the message is dropped on the calling thread.
    pub(crate) fn post(&self, delivery: Delivery) -> bool {
        if self.sender.send(delivery).is_err() {
            tracing::warn!(origin = ?self.thread, "origin loop closed; dropping delivery");
            return false;
        }
        true
    }
}

/// The receiving end of the origin thread's dispatch queue.
///
/// `OriginLoop` is neither `Send` nor `Sync`: it stays on the thread that
/// installed it. Dropping it uninstalls the designation and discards
/// undelivered results on this thread.
///
/// The loop keeps its own current-thread runtime for waiting in
/// [`OriginLoop::run_next`]; an origin thread that already runs inside a
/// multi-threaded Tokio runtime waits on that one instead.
pub struct OriginLoop {
    receiver: mpsc::UnboundedReceiver<Delivery>,
    /// Always `Some` until dropped.
    runtime: Option<Runtime>,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl OriginLoop {
    /// Designates the current thread as the origin thread.
    pub fn install() -> RuntimeResult<Self> {
        let current = thread::current();
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(Error::RuntimeBuild)?;
        ORIGIN.with(|origin| {
            let mut slot = origin.borrow_mut();
            if slot.is_some() {
                return Err(Error::OriginAlreadyInstalled(
                    current.name().unwrap_or("<unnamed>").to_string(),
                ));
            }
            let (sender, receiver) = mpsc::unbounded_channel();
            *slot = Some(DispatchQueue {
                sender,
                thread: current.id(),
            });
            tracing::debug!(thread = ?current.id(), "origin loop installed");
            Ok(Self {
                receiver,
                runtime: Some(runtime),
                thread: current.id(),
                _not_send: PhantomData,
            })
        })
    }

    /// Runs every delivery already queued, without blocking.
    pub fn run_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(delivery) = self.receiver.try_recv() {
            delivery();
            delivered += 1;
        }
        delivered
    }

    /// Waits up to `timeout` for one delivery and runs it.
    ///
    /// Returns `false` if nothing arrived in time.
    pub fn run_next(&mut self, timeout: Duration) -> bool {
        let receiver = &mut self.receiver;
        let wait = async move { tokio::time::timeout(timeout, receiver.recv()).await };
        let next = match &self.runtime {
            Some(owned) => runtime::block_on_with(owned, wait),
            None => runtime::block_on(wait),
        };
        match next {
            Ok(Some(delivery)) => {
                delivery();
                true
            }
            _ => false,
        }
    }
}

impl Drop for OriginLoop {
    fn drop(&mut self) {
        let _ = ORIGIN.try_with(|origin| origin.borrow_mut().take());
        self.receiver.close();
        let discarded = std::iter::from_fn(|| self.receiver.try_recv().ok()).count();
        // A runtime may not be dropped from inside another one.
        if let Some(owned) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                owned.shutdown_background();
            }
        }
        tracing::debug!(thread = ?self.thread, discarded, "origin loop uninstalled");
    }
}

/// Whether the current thread has an installed [`OriginLoop`].
pub fn is_origin_thread() -> bool {
    ORIGIN.with(|origin| origin.borrow().is_some())
}

/// The current thread's dispatch queue.
///
/// # Panics
///
/// Panics if the current thread is not the origin thread. Starting isolated
/// background work elsewhere is a programming error, not a recoverable one.
pub(crate) fn dispatch_queue() -> DispatchQueue {
    ORIGIN.with(|origin| origin.borrow().clone()).unwrap_or_else(|| {
        panic!("recast background jobs must be started from the origin thread")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_twice_fails() {
        let _origin = OriginLoop::install().unwrap();
        assert!(matches!(
            OriginLoop::install(),
            Err(Error::OriginAlreadyInstalled(_))
        ));
    }

    #[test]
    fn test_drop_uninstalls() {
        let origin = OriginLoop::install().unwrap();
        assert!(is_origin_thread());
        drop(origin);
        assert!(!is_origin_thread());
        assert!(OriginLoop::install().is_ok());
    }

    #[test]
    fn test_other_threads_are_not_origin() {
        let _origin = OriginLoop::install().unwrap();
        let elsewhere = thread::spawn(is_origin_thread).join().unwrap();
        assert!(!elsewhere);
    }

    #[test]
    fn test_deliveries_run_on_origin() {
        let mut origin = OriginLoop::install().unwrap();
        let queue = dispatch_queue();
        let origin_id = thread::current().id();

        let (tx, mut rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            queue.post(Box::new(move || tx.send(thread::current().id()).unwrap()));
        })
        .join()
        .unwrap();

        assert!(origin.run_next(Duration::from_secs(1)));
        assert_eq!(rx.try_recv().ok(), Some(origin_id));
    }

    #[test]
    fn test_run_next_times_out() {
        let mut origin = OriginLoop::install().unwrap();
        assert!(!origin.run_next(Duration::from_millis(10)));
    }

    #[test]
    fn test_run_next_reuses_one_runtime() {
        let mut origin = OriginLoop::install().unwrap();
        let queue = dispatch_queue();
        for _ in 0..3 {
            let queue = queue.clone();
            thread::spawn(move || queue.post(Box::new(|| {})));
            assert!(origin.run_next(Duration::from_secs(1)));
        }
        assert!(!origin.run_next(Duration::from_millis(5)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_next_inside_multi_thread_runtime() {
        let mut origin = OriginLoop::install().unwrap();
        let queue = dispatch_queue();
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            queue.post(Box::new(move || {
                let _ = tx.send(7);
            }));
        });

        assert!(origin.run_next(Duration::from_secs(1)));
        assert_eq!(rx.try_recv().ok(), Some(7));
        // Dropping inside the runtime must not panic.
        drop(origin);
    }

    #[test]
    #[should_panic(expected = "origin thread")]
    fn test_dispatch_queue_requires_origin() {
        let _ = dispatch_queue();
    }
}
