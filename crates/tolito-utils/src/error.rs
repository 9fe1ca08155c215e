//! Errors raised by the path, filesystem and lock helpers.

use std::{io, path::PathBuf};

use nix::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Cannot determine the working directory: {0}")]
    WorkingDir(#[source] io::Error),

    #[error("`${var}` used in `{input}` is not set")]
    UnsetVariable { var: String, input: String },

    #[error("Missing closing brace for a `${{...}}` expression in `{input}`")]
    UnterminatedVariable { input: String },
}

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("Cannot {action} `{}`: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` exists but is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

impl FileSystemError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    /// The target was a mount point or held open by another process.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.raw_os_error() == Some(Errno::EBUSY as i32))
    }
}

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Cannot open lock file `{}`: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot prepare lock directory: {0}")]
    Parent(#[from] FileSystemError),

    #[error("Cannot lock `{}`: {errno}", path.display())]
    Flock { path: PathBuf, errno: Errno },
}

#[derive(Error, Debug)]
pub enum UtilsError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type LockResult<T> = std::result::Result<T, LockError>;
pub type PathResult<T> = std::result::Result<T, PathError>;
