//! Helper abstractions that keep callback bounds aligned with the threading
//! guarantees of the selected background model.
//!
//! The shared-memory model invokes callbacks on whichever runtime thread
//! finishes the operation, so callbacks must be `Send`. The isolated model
//! always delivers on the origin thread, so callbacks may capture
//! thread-bound state such as `Rc` handles to UI objects. Generated wrappers
//! name [`Callback`] and stay valid under either model.

use crate::result::Result;

/// Marker trait equivalent to `Send` for the shared-memory model.
#[cfg(not(feature = "isolated"))]
pub trait PlatformSend: Send {}

#[cfg(not(feature = "isolated"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(feature = "isolated")]
pub trait PlatformSend {}

#[cfg(feature = "isolated")]
impl<T> PlatformSend for T {}

/// The callback parameter type of generated async wrappers.
pub trait Callback<T>: FnOnce(Result<T>) + PlatformSend + 'static {}

impl<T, F> Callback<T> for F where F: FnOnce(Result<T>) + PlatformSend + 'static {}
