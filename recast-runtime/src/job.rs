//! Cancellable handle returned by background wrappers.

use tokio_util::sync::CancellationToken;

/// A handle to one background invocation.
///
/// The caller owns the `Job`; the bridge's completion path only holds a clone
/// of its cancellation token. Cancelling is advisory: it never interrupts code
/// already running, it stops work that has not started and suppresses delivery
/// of a result that has not been delivered yet.
#[derive(Debug)]
pub struct Job {
    token: CancellationToken,
}

impl Job {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Requests cancellation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("cancelling background job");
        }
        self.token.cancel();
    }

    /// Whether cancellation was requested on this job or its scope.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let job = Job::new(CancellationToken::new());
        assert!(!job.is_cancelled());
        job.cancel();
        job.cancel();
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_is_visible() {
        let parent = CancellationToken::new();
        let job = Job::new(parent.child_token());
        parent.cancel();
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_job_cancel_does_not_cancel_parent() {
        let parent = CancellationToken::new();
        let job = Job::new(parent.child_token());
        job.cancel();
        assert!(!parent.is_cancelled());
    }
}
