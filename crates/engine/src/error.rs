//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`Store`] returned when the local persistent store fails.
//! - [`Backend`] returned when a backend call fails.
//! - [`Serialization`] returned when persisted state cannot be encoded.
//! - [`Closed`] returned when the persister task has already stopped.
//!
//! None of them is fatal: quota decisions and queue moves never fail, these
//! only surface from lifecycle calls such as [`Session::suspend`].
//!
//!  [`Store`]: EngineError::Store
//!  [`Backend`]: EngineError::Backend
//!  [`Serialization`]: EngineError::Serialization
//!  [`Closed`]: EngineError::Closed
//!  [`Session::suspend`]: crate::Session::suspend
use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Failure reported by a [`Backend`](crate::Backend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("persister stopped")]
    Closed,
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Store(a), Self::Store(b)) => a == b,
            (Self::Backend(a), Self::Backend(b)) => a == b,
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            (Self::Closed, Self::Closed) => true,
            _ => false,
        }
    }
}
