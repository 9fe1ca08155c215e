//! Error types for tolito-core.

use miette::Diagnostic;
use thiserror::Error;
use tolito_config::error::ConfigError;
use tolito_utils::error::{FileSystemError, LockError, PathError};

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Required tool `{0}` was not found")]
    #[diagnostic(
        code(tolito::preflight),
        help("Install base-devel and git: sudo pacman -S --needed base-devel git")
    )]
    PreflightMissingTool(String),

    #[error("Could not reach {0}")]
    #[diagnostic(
        code(tolito::network),
        help("Check your internet connection and try again")
    )]
    NetworkUnavailable(String),

    #[error("Building {name} failed{}", .code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    #[diagnostic(
        code(tolito::build),
        help("Inspect the makepkg output above; the recipe may need manual attention")
    )]
    BuildFailure { name: String, code: Option<i32> },

    #[error("Downloaded artifact is corrupt: {0}")]
    #[diagnostic(
        code(tolito::corrupt_artifact),
        help("The mirror may be out of sync. Try again later or remove the mirror")
    )]
    CorruptArtifact(String),

    #[error("Package '{0}' was not found in any source")]
    #[diagnostic(
        code(tolito::source_not_found),
        help("Check the package name or add a repository that provides it")
    )]
    SourceNotFound(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] tolito_dl::error::DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] tolito_registry::RegistryError),

    #[error("Provenance file {path} is unreadable: {reason}")]
    #[diagnostic(
        code(tolito::provenance),
        help("Fix or delete the file; it is recreated on the next install")
    )]
    Provenance { path: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(tolito::lock), help("Another tolito process may be running"))]
    Lock(#[from] LockError),

    #[error(transparent)]
    #[diagnostic(code(tolito::filesystem), help("Check file permissions and disk space"))]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(tolito::path))]
    Path(#[from] PathError),

    #[error("Error while {action}")]
    #[diagnostic(code(tolito::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a valid package name")]
    #[diagnostic(
        code(tolito::invalid_name),
        help("Package names and clone URLs must end in a single path segment other than `.` or `..`")
    )]
    InvalidPackageName(String),

    #[error("Invalid PGP key id: {0}")]
    #[diagnostic(
        code(tolito::invalid_key),
        help("Key ids are hexadecimal and at most 40 characters long")
    )]
    InvalidKeyId(String),
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, CoreError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, CoreError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            CoreError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
