//! Shared-memory background model.
//!
//! The operation is spawned onto the dispatcher of the supplied [`Scope`].
//! When it completes, the callback runs directly on the runtime thread that
//! finished it; there is no thread hop. The job's cancellation token is a
//! child of the scope's token, so cancelling either one races with completion:
//! a cancelled job whose operation is still pending is dropped at its next
//! await point, and a result is never delivered once cancellation has been
//! observed.

use std::future::Future;

use crate::job::Job;
use crate::result::Result;
use crate::scope::Scope;

/// Runs `operation` on `scope` and hands its outcome to `callback`.
///
/// # Examples
///
/// ```
/// use recast_runtime::{bridge::shared, Scope};
/// use std::sync::mpsc;
///
/// let (tx, rx) = mpsc::channel();
/// let _job = shared::run_background(
///     Scope::global(),
///     || async { 6 * 7 },
///     move |result| tx.send(result.into_value()).unwrap(),
/// );
/// assert_eq!(rx.recv().unwrap(), Some(42));
/// ```
pub fn run_background<T, Op, Fut, C>(scope: Scope, operation: Op, callback: C) -> Job
where
    Op: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
    C: FnOnce(Result<T>) + Send + 'static,
{
    let token = scope.token().child_token();
    let job = Job::new(token.clone());

    let _ = scope.spawn(async move {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                tracing::debug!("background job cancelled before completion");
            }
            result = Result::of_future(async move { operation().await }) => {
                if token.is_cancelled() {
                    tracing::debug!("background job cancelled; dropping result");
                } else {
                    callback(result);
                }
            }
        }
    });

    job
}
