//! Runtime support for recast-generated wrappers.
//!
//! Generated code calls exactly two entry points:
//!
//! - [`run_blocking`]: the synchronous bridge. Drives an operation thunk to
//!   completion on the calling thread and returns its value.
//! - [`run_background`]: the asynchronous bridge. Starts the thunk in the
//!   background, returns a cancellable [`Job`] immediately and later hands a
//!   [`Result`] to the callback, at most once.
//!
//! # Background models
//!
//! The default build uses the shared-memory model ([`bridge::shared`]): work
//! runs on a Tokio runtime chosen by the [`Scope`] and callbacks must be
//! `Send`. Enabling the `isolated` feature switches [`run_background`] to the
//! isolated-worker model ([`bridge::isolated`]): each call runs on a fresh
//! worker thread and the callback is delivered on the origin thread that
//! installed an [`OriginLoop`]. Generated wrappers name the [`Callback`] trait
//! so they compile unchanged under both models.
//!
//! # Examples
//!
//! ```rust
//! use recast_runtime::{run_background, Scope};
//! use std::sync::mpsc;
//!
//! async fn fetch_score(player: u32) -> u32 {
//!     player * 10
//! }
//!
//! # #[cfg(not(feature = "isolated"))]
//! # {
//! let (tx, rx) = mpsc::channel();
//! let job = run_background(
//!     Scope::global(),
//!     move || async move { fetch_score(4).await },
//!     move |result| tx.send(result).unwrap(),
//! );
//! assert_eq!(rx.recv().unwrap().into_value(), Some(40));
//! assert!(!job.is_cancelled());
//! # }
//! ```

pub mod bridge;
pub mod config;
mod confined;
pub mod error;
pub mod job;
pub mod logging;
pub mod origin;
pub mod platform;
pub mod result;
pub mod runtime;
pub mod scope;

pub use error::{Error, RuntimeResult};
pub use job::Job;
pub use origin::OriginLoop;
pub use platform::{Callback, PlatformSend};
pub use result::{Exception, Result};
pub use runtime::run_blocking;
pub use scope::Scope;

#[cfg(not(feature = "isolated"))]
pub use bridge::shared::run_background;

#[cfg(feature = "isolated")]
pub use bridge::isolated::run_background;
