//! Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No Tokio runtime available to run the sweeper")]
    NoRuntime,
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] uuid::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
