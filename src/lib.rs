//! Synchronous and callback-driven wrappers for async functions.
//!
//! Mark async functions, inherent impl blocks or traits with
//! [`recast_sync`] and [`recast_async`], run `recast-codegen` from a build
//! script, and `include!` the generated units next to the annotated code. For
//! every marked `async fn get_user(id: String) -> User` the generator writes:
//!
//! ```ignore
//! pub fn get_user_sync(id: String) -> User;
//! pub fn get_user_async(id: String, callback: impl ::recast::Callback<User>) -> ::recast::Job;
//! ```
//!
//! The wrappers call into the runtime re-exported here. Enable the `isolated`
//! feature to deliver background results on an origin thread instead of the
//! shared Tokio dispatcher.
//!
//! ```ignore
//! // build.rs
//! fn main() -> anyhow::Result<()> {
//!     recast_codegen::cargo::Build::new()
//!         .source("src/api.rs", "crate::api")
//!         .fail_on_error(true)
//!         .run()
//! }
//!
//! // src/api.rs
//! #[recast::recast_sync]
//! #[recast::recast_async(scoped)]
//! pub async fn get_user(id: String) -> User { /* ... */ }
//!
//! include!(concat!(env!("OUT_DIR"), "/crate/api/api_recast.rs"));
//! ```

pub use recast_macros::{recast_async, recast_sync};

pub use recast_runtime::{
    bridge, config, logging, origin, run_background, run_blocking, Callback, Error, Exception,
    Job, OriginLoop, PlatformSend, Result, RuntimeResult, Scope,
};
