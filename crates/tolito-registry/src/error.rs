//! Error types for the registry crate.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(tolito_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(tolito_registry::download),
        help("Check your network connection or the repository's mirror list")
    )]
    DownloadError(#[from] tolito_dl::error::DownloadError),

    #[error(transparent)]
    #[diagnostic(code(tolito_registry::config))]
    ConfigError(#[from] tolito_config::error::ConfigError),

    #[error(transparent)]
    #[diagnostic(code(tolito_registry::filesystem))]
    FileSystemError(#[from] tolito_utils::error::FileSystemError),

    #[error("Failed to extract {archive}")]
    #[diagnostic(
        code(tolito_registry::extract),
        help("Make sure `tar` is installed and the downloaded database is not truncated")
    )]
    ExtractFailed { archive: String },

    #[error("Repository `{0}` has no usable servers")]
    #[diagnostic(
        code(tolito_registry::no_servers),
        help("Add `servers` or a readable `include` mirrorlist to the repository")
    )]
    NoServers(String),

    #[error("Database from {0} contains no packages")]
    #[diagnostic(code(tolito_registry::empty_database))]
    EmptyDatabase(String),

    #[error("{0}")]
    #[diagnostic(code(tolito_registry::custom))]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
