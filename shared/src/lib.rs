// shared/src/lib.rs

/// Errors raised by the credential and session stores.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("serialization: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
