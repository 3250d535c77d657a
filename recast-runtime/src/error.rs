use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("An origin loop is already installed on thread {0}")]
    OriginAlreadyInstalled(String),

    #[error("No tokio runtime is available: {0}")]
    NoRuntime(String),

    #[error("Failed to build the origin runtime: {0}")]
    RuntimeBuild(#[source] std::io::Error),
}

/// `Result` is taken by the outcome container handed to callbacks.
pub type RuntimeResult<T> = std::result::Result<T, Error>;
