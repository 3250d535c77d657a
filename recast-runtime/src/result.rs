//! Immutable success-or-failure container handed to background callbacks.
//!
//! A [`Result`] is built only through [`Result::success`], [`Result::failure`],
//! [`Result::of`] or its async twin [`Result::of_future`]. Once built it is
//! never mutated; callbacks receive it by value.
//!
//! # Examples
//!
//! ```rust
//! use recast_runtime::{Exception, Result};
//!
//! let ok = Result::success(42);
//! assert!(ok.is_success());
//! assert_eq!(ok.value(), Some(&42));
//!
//! let failed: Result<i32> = Result::of(|| panic!("boom"));
//! assert!(failed.is_failure());
//! assert_eq!(failed.exception(), Some(&Exception::new("boom")));
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use thiserror::Error;

/// The failure side of a [`Result`].
///
/// Operations signal failure by panicking; the panic payload is reduced to its
/// message so the exception can cross thread boundaries and be compared.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
#[error("{message}")]
pub struct Exception {
    message: String,
}

impl Exception {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds an exception from any error, keeping its display text.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(error.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(exception) = payload.downcast_ref::<Exception>() {
            exception.message.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self { message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome<T> {
    Success(T),
    Failure(Exception),
}

/// The outcome of an operation: exactly one of a value or an [`Exception`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Result<T> {
    outcome: Outcome<T>,
}

impl<T> Result<T> {
    pub fn success(value: T) -> Self {
        Self {
            outcome: Outcome::Success(value),
        }
    }

    pub fn failure(exception: Exception) -> Self {
        Self {
            outcome: Outcome::Failure(exception),
        }
    }

    /// Runs `operation` on the current thread, capturing a panic as a failure.
    ///
    /// Panics configured to abort the process are not recoverable and are not
    /// captured.
    pub fn of<F>(operation: F) -> Self
    where
        F: FnOnce() -> T,
    {
        match panic::catch_unwind(AssertUnwindSafe(operation)) {
            Ok(value) => Self::success(value),
            Err(payload) => Self::failure(Exception::from_panic(payload)),
        }
    }

    /// Awaits `future`, capturing a panic raised while polling it as a failure.
    pub async fn of_future<F>(future: F) -> Self
    where
        F: Future<Output = T>,
    {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(value) => Self::success(value),
            Err(payload) => Self::failure(Exception::from_panic(payload)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failure(_))
    }

    /// The value, or `None` for a failure.
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The exception, or `None` for a success.
    pub fn exception(&self) -> Option<&Exception> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(exception) => Some(exception),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Converts into a standard `Result` for use with `?`.
    pub fn into_std(self) -> std::result::Result<T, Exception> {
        match self.outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(exception) => Err(exception),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Result<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Success(value) => write!(f, "Success({})", value),
            Outcome::Failure(exception) => write!(f, "Failure({})", exception),
        }
    }
}
