//! Isolated-worker background model.
//!
//! Used where mutable state must not be shared between threads. Every call:
//!
//! 1. asserts it runs on the origin thread (see [`crate::OriginLoop`]);
//! 2. starts a fresh worker thread and moves the operation thunk into it,
//!    together with the completion continuation sealed in a thread-confined
//!    envelope, so exactly one continuation travels with exactly one call;
//! 3. on the worker, drives the operation through the blocking path and wraps
//!    the outcome in a [`Result`];
//! 4. posts the outcome and the envelope back to the origin thread's queue;
//! 5. on the origin thread, checks the job (and through it the scope) for
//!    cancellation and then invokes the callback, or silently drops it.
//!
//! The check in step 5 is not atomic with [`Job::cancel`]: a cancellation
//! requested while the delivery is already running does not recall it.
//! Workers are not pooled; one OS thread exists per in-flight call.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::confined::Confined;
use crate::job::Job;
use crate::origin;
use crate::result::Result;
use crate::runtime;
use crate::scope::Scope;

static NEXT_WORKER: AtomicUsize = AtomicUsize::new(0);

/// Runs `operation` on a fresh worker and delivers its outcome to `callback`
/// on the calling (origin) thread.
///
/// The callback does not need to be `Send`; it never leaves the origin thread
/// in a usable form.
///
/// # Panics
///
/// Panics if the calling thread has no installed [`crate::OriginLoop`].
pub fn run_background<T, Op, Fut, C>(scope: Scope, operation: Op, callback: C) -> Job
where
    Op: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
    C: FnOnce(Result<T>) + 'static,
{
    let queue = origin::dispatch_queue();
    let token = scope.token().child_token();
    let job = Job::new(token.clone());
    let continuation = Confined::new(callback);

    let id = NEXT_WORKER.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{}", RuntimeConfig::current().worker_name_prefix, id);

    let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
        // A job cancelled before its worker started never runs the operation.
        let outcome = if token.is_cancelled() {
            tracing::debug!("job cancelled before the worker started");
            None
        } else {
            Some(Result::of(|| runtime::block_on(async move { operation().await })))
        };
        queue.post(Box::new(move || deliver(token, continuation, outcome)));
    });

    if let Err(e) = spawned {
        tracing::error!(worker = %name, error = %e, "failed to start background worker");
        job.cancel();
    } else {
        tracing::debug!(worker = %name, "background worker started");
    }

    job
}

/// Runs on the origin thread.
fn deliver<T, C>(token: CancellationToken, continuation: Confined<C>, outcome: Option<Result<T>>)
where
    C: FnOnce(Result<T>),
{
    let callback = continuation.into_inner();
    match outcome {
        Some(result) if !token.is_cancelled() => callback(result),
        _ => tracing::debug!("background job cancelled; dropping result"),
    }
}
