//! Execution scopes for background wrappers.
//!
//! A [`Scope`] decides which dispatcher a background operation runs on (a
//! Tokio runtime handle) and which cancellation domain it belongs to (a
//! `CancellationToken`). Cancelling a scope cancels every job started in it
//! that has not delivered yet.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, RuntimeResult};
use crate::runtime;

#[derive(Debug, Clone)]
pub struct Scope {
    /// `None` resolves to the process-global runtime when work is spawned.
    handle: Option<Handle>,
    token: CancellationToken,
}

impl Scope {
    /// A scope dispatching onto `handle` with a fresh cancellation domain.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
            token: CancellationToken::new(),
        }
    }

    /// A scope on the runtime the caller is currently running in.
    pub fn current() -> RuntimeResult<Self> {
        let handle = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// The process-default scope embedded by unscoped async wrappers.
    ///
    /// Work runs on a lazily started multi-threaded runtime shared by the whole
    /// process. Each call returns an independent cancellation domain, so
    /// cancelling one global scope never affects jobs started from another.
    pub fn global() -> Self {
        Self {
            handle: None,
            token: CancellationToken::new(),
        }
    }

    /// A child scope on the same dispatcher. Cancelling the parent cancels the
    /// child; cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        tracing::debug!("cancelling scope");
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.handle {
            Some(handle) => handle.spawn(future),
            None => runtime::global_handle().spawn(future),
        }
    }
}
