use std::io;

use folio_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] folio_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Message body cannot be empty")]
    EmptyMessage,
    #[error("Invalid message key: {0}")]
    InvalidMessageKey(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `folio login --email <EMAIL> --password <PASSWORD>` first.")]
    NotLoggedIn,
    #[error("Stored admin session expired at {0}. Run `folio login` again.")]
    SessionExpired(String),
}
