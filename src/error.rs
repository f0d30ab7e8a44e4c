use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed lock row: {0} is null")]
    MalformedRow(&'static str),

    #[error("There isn't conflict modes for {0}")]
    UnknownLockMode(String),

    #[error("Lock snapshot source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::SourceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
