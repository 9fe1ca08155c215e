//! Seams to the external programs tolito drives.
//!
//! Each trait has a `System*` implementation that spawns the real tool with an explicit
//! working directory. Tests substitute in-memory fakes.

use std::{cmp::Ordering, path::Path, sync::Arc};

pub use tolito_registry::extract::{Extractor, TarExtractor};

mod builder;
mod keytrust;
mod pacman;
pub mod process;
mod vcs;
mod vercmp;

pub use builder::SystemBuilder;
pub use keytrust::SystemKeyTrust;
pub use pacman::SystemPackageManager;
pub use vcs::SystemVcs;
pub use vercmp::{lexical_compare, SystemVersionCompare};

/// Version-control client.
pub trait Vcs: Send + Sync {
    fn is_available(&self) -> bool;
    /// Full clone of `url` into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path) -> bool;
    /// Shallow, blobless, sparse clone of `url` into `dest`.
    fn clone_sparse(&self, url: &str, dest: &Path) -> bool;
    fn is_sparse_initialized(&self, repo: &Path) -> bool;
    fn sparse_init(&self, repo: &Path) -> bool;
    /// Restricts the sparse checkout to `path`.
    fn sparse_set(&self, repo: &Path, path: &str) -> bool;
    /// Removes untracked files.
    fn clean(&self, repo: &Path) -> bool;
    /// Whether `url` points at an existing remote repository.
    fn remote_exists(&self, url: &str) -> bool;
}

/// Result of one build run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Builds a package from the recipe in a directory.
pub trait PackageBuilder: Send + Sync {
    fn is_available(&self) -> bool;
    fn build(&self, cwd: &Path) -> BuildOutput;
    /// Recipe metadata in `.SRCINFO` format.
    fn print_srcinfo(&self, cwd: &Path) -> Option<String>;
}

/// The system package manager.
pub trait PackageManager: Send + Sync {
    /// Whether `name` is installed.
    fn query(&self, name: &str) -> bool;
    fn installed_version(&self, name: &str) -> Option<String>;
    /// Installs a package archive. Returns the exit code, `None` if it could not run.
    fn commit_install(&self, artifact: &Path) -> Option<i32>;
    /// Removes `name` with its unneeded dependencies. Returns the exit code.
    fn commit_removal(&self, name: &str) -> Option<i32>;
    /// Detailed information about an installed package.
    fn info(&self, name: &str) -> Option<String>;
}

/// Makes a PGP key trusted for package verification.
pub trait KeyTrust: Send + Sync {
    fn import_and_sign(&self, key_id: &str) -> bool;
}

/// Orders package versions.
pub trait VersionCompare: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Every external collaborator of an operation.
#[derive(Clone)]
pub struct Toolset {
    pub vcs: Arc<dyn Vcs>,
    pub builder: Arc<dyn PackageBuilder>,
    pub package_manager: Arc<dyn PackageManager>,
    pub key_trust: Arc<dyn KeyTrust>,
    pub version_compare: Arc<dyn VersionCompare>,
    pub extractor: Arc<dyn Extractor>,
}

impl Toolset {
    /// Implementations backed by git, makepkg, pacman, gpg, vercmp and tar.
    pub fn system(keyserver: &str) -> Self {
        Self {
            vcs: Arc::new(SystemVcs),
            builder: Arc::new(SystemBuilder),
            package_manager: Arc::new(SystemPackageManager),
            key_trust: Arc::new(SystemKeyTrust::new(keyserver)),
            version_compare: Arc::new(SystemVersionCompare),
            extractor: Arc::new(TarExtractor),
        }
    }
}
