//! Error types for dirgate configuration handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config: {0}")]
    ParseConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
