//! Runtime utilities that drive operation thunks to completion.
//!
//! The blocking path never leaves the calling thread. Outside Tokio it builds
//! a throwaway current-thread runtime; on a thread that already runs inside a
//! multi-threaded runtime it blocks in place on that runtime instead. Background
//! dispatch lives in [`crate::bridge`]; the lazily started process-global
//! runtime used by [`crate::Scope::global`] lives here.

use std::future::Future;
use std::sync::OnceLock;

pub use tokio::runtime::{Builder, Handle, Runtime};
use tokio::runtime::RuntimeFlavor;
use tokio::task;

use crate::config::RuntimeConfig;

static GLOBAL: OnceLock<Runtime> = OnceLock::new();

/// Runs the provided future to completion on the calling thread.
///
/// # Panics
///
/// Panics when called from inside a current-thread Tokio runtime: its only
/// thread cannot wait for work it is supposed to drive.
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    match ambient_handle() {
        Some(handle) => task::block_in_place(move || handle.block_on(future)),
        None => Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("recast_runtime::runtime::block_on: failed to build Tokio runtime")
            .block_on(future),
    }
}

/// Like [`block_on`], but reuses `runtime` instead of building a new one when
/// the caller is outside Tokio.
pub(crate) fn block_on_with<F>(runtime: &Runtime, future: F) -> F::Output
where
    F: Future,
{
    match ambient_handle() {
        Some(handle) => task::block_in_place(move || handle.block_on(future)),
        None => runtime.block_on(future),
    }
}

/// The multi-threaded runtime the calling thread already runs in, if any.
fn ambient_handle() -> Option<Handle> {
    let handle = Handle::try_current().ok()?;
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => panic!(
            "recast blocking calls cannot run inside a current-thread Tokio runtime; \
             use a multi-threaded runtime or await the async function directly"
        ),
        _ => Some(handle),
    }
}

/// The blocking bridge used by synchronous wrappers.
///
/// Invokes `operation` on the calling thread and drives the returned future
/// until it completes. A panic raised by the operation propagates to the
/// caller unchanged; no [`crate::Job`] is produced. Callable from plain
/// threads, from multi-threaded Tokio workers (including background
/// callbacks) and from `spawn_blocking` threads.
///
/// ```
/// async fn get_user(id: String) -> String {
///     format!("user:{}", id)
/// }
///
/// let user = recast_runtime::run_blocking(move || get_user("7".to_string()));
/// assert_eq!(user, "user:7");
/// ```
///
/// # Panics
///
/// Panics inside a current-thread Tokio runtime, see [`block_on`].
pub fn run_blocking<T, Op, Fut>(operation: Op) -> T
where
    Op: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    block_on(async move { operation().await })
}

/// Handle to the process-global background runtime, started on first use.
pub(crate) fn global_handle() -> Handle {
    GLOBAL
        .get_or_init(|| {
            let config = RuntimeConfig::current();
            let mut builder = Builder::new_multi_thread();
            builder.enable_all().thread_name(config.global_thread_name.clone());
            if let Some(threads) = config.global_worker_threads {
                builder.worker_threads(threads);
            }
            tracing::debug!(
                threads = ?config.global_worker_threads,
                "starting global background runtime"
            );
            builder
                .build()
                .expect("recast_runtime: failed to build the global Tokio runtime")
        })
        .handle()
        .clone()
}
