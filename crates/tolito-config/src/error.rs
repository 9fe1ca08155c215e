use miette::Diagnostic;
use thiserror::Error;
use tolito_utils::error::{FileSystemError, PathError, UtilsError};

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(tolito_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(tolito_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists at {0}")]
    #[diagnostic(
        code(tolito_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists(String),

    #[error("Invalid source label: `{0}`")]
    #[diagnostic(
        code(tolito_config::invalid_source),
        help("Use CURATED, AUR, URL or the name of a configured repository")
    )]
    InvalidSourceKind(String),

    #[error("Repository name `{0}` is reserved for a built-in source")]
    #[diagnostic(
        code(tolito_config::reserved_repo_name),
        help("Choose a different name for your repository")
    )]
    ReservedRepositoryName(String),

    #[error("Repository `{0}` has neither `servers` nor `include`")]
    #[diagnostic(
        code(tolito_config::repo_without_servers),
        help("Add a `servers` list or point `include` at a mirrorlist file")
    )]
    RepositoryWithoutServers(String),

    #[error("Update rule `{rule}` refers to unknown repository `{repo}`")]
    #[diagnostic(
        code(tolito_config::unknown_repository),
        help("Define the repository under [repositories] or change the rule")
    )]
    UnknownRepository { rule: String, repo: String },

    #[error("`probe_workers` must be at least 1")]
    #[diagnostic(code(tolito_config::invalid_probe_workers))]
    InvalidProbeWorkers,

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(tolito_config::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(tolito_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(tolito_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(tolito_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

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
            ConfigError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
