//! The execution bridge behind generated async wrappers.
//!
//! Two realizations share one contract: the operation thunk runs in the
//! background, its outcome is wrapped in a [`crate::Result`], and the callback
//! is invoked at most once, never after the job or its scope was observed as
//! cancelled at the delivery check.
//!
//! - [`shared`]: shared-memory model. The operation runs on the scope's Tokio
//!   runtime and the callback runs on whichever worker finishes it.
//! - [`isolated`]: isolated-worker model. Each call gets a fresh worker thread;
//!   the result travels back to the origin thread's [`crate::OriginLoop`].
//!
//! [`crate::run_background`] resolves to the model selected by the `isolated`
//! feature.

pub mod isolated;
pub mod shared;
