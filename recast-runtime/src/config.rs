//! # Runtime Configuration
//!
//! Settings for the process-global background dispatcher and the isolated
//! workers. Install a [`RuntimeConfig`] once, before the first background call;
//! otherwise the defaults apply.
//!
//! ```
//! use recast_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::builder()
//!     .global_worker_threads(2)
//!     .worker_name_prefix("api-worker")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.global_worker_threads, Some(2));
//! ```

use std::sync::OnceLock;

use crate::error::{Error, RuntimeResult};

const DEFAULT_WORKER_NAME_PREFIX: &str = "recast-worker";
const DEFAULT_GLOBAL_THREAD_NAME: &str = "recast-io";

static INSTALLED: OnceLock<RuntimeConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker threads of the process-global runtime (`None` = tokio default).
    pub global_worker_threads: Option<usize>,

    /// Thread name of the process-global runtime's workers.
    pub global_thread_name: String,

    /// Prefix for isolated worker thread names; a per-call counter is appended.
    pub worker_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            global_worker_threads: None,
            global_thread_name: DEFAULT_GLOBAL_THREAD_NAME.to_string(),
            worker_name_prefix: DEFAULT_WORKER_NAME_PREFIX.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        if self.global_worker_threads == Some(0) {
            return Err(Error::Config(
                "Global runtime needs at least one worker thread".to_string(),
            ));
        }

        if self.worker_name_prefix.trim().is_empty() {
            return Err(Error::Config(
                "Worker name prefix cannot be empty".to_string(),
            ));
        }

        if self.global_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "Global thread name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Makes this configuration the process-wide one.
    ///
    /// Fails if a configuration was already installed or read, since the
    /// global runtime may already be running with it.
    pub fn install(self) -> RuntimeResult<()> {
        self.validate()?;
        INSTALLED.set(self).map_err(|_| {
            Error::Config("Runtime configuration is already installed".to_string())
        })
    }

    /// The installed configuration, freezing the defaults if none was installed.
    pub fn current() -> &'static RuntimeConfig {
        INSTALLED.get_or_init(RuntimeConfig::default)
    }
}

#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    global_worker_threads: Option<usize>,
    global_thread_name: Option<String>,
    worker_name_prefix: Option<String>,
}

impl RuntimeConfigBuilder {
    pub fn global_worker_threads(mut self, threads: usize) -> Self {
        self.global_worker_threads = Some(threads);
        self
    }

    pub fn global_thread_name(mut self, name: impl Into<String>) -> Self {
        self.global_thread_name = Some(name.into());
        self
    }

    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_name_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> RuntimeResult<RuntimeConfig> {
        let defaults = RuntimeConfig::default();
        let config = RuntimeConfig {
            global_worker_threads: self.global_worker_threads,
            global_thread_name: self
                .global_thread_name
                .unwrap_or(defaults.global_thread_name),
            worker_name_prefix: self
                .worker_name_prefix
                .unwrap_or(defaults.worker_name_prefix),
        };
        config.validate()?;
        Ok(config)
    }
}
