use std::{fmt, path::PathBuf};

use tolito_config::source::SourceKind;
use tolito_core::{outcome::InstallOutcome, provenance::Provenance};

// ---- Install ----

/// Per-package outcomes of a batch, bucketed for the summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub succeeded: Vec<String>,
    pub declined: Vec<String>,
    pub already_installed: Vec<String>,
    pub not_found: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn record(&mut self, name: impl Into<String>, outcome: InstallOutcome) {
        let name = name.into();
        match outcome {
            InstallOutcome::Success => self.succeeded.push(name),
            InstallOutcome::Declined => self.declined.push(name),
            InstallOutcome::AlreadyInstalled => self.already_installed.push(name),
            InstallOutcome::NotFound => self.not_found.push(name),
            InstallOutcome::Failure => self.failed.push(name),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len()
            + self.declined.len()
            + self.already_installed.len()
            + self.not_found.len()
            + self.failed.len()
    }
}

// ---- Update ----

/// A tracked package with a newer version somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub name: String,
    pub current_version: String,
    pub new_version: String,
    /// Source offering `new_version`.
    pub source: SourceKind,
    /// Source the package was installed from.
    pub installed_from: SourceKind,
}

impl UpdateCandidate {
    pub fn switches_source(&self) -> bool {
        self.source != self.installed_from
    }
}

impl fmt::Display for UpdateCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} (from {})",
            self.name, self.current_version, self.new_version, self.source
        )
    }
}

// ---- Remove ----

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub declined: Vec<String>,
    pub not_installed: Vec<String>,
    pub failed: Vec<String>,
}

impl RemoveReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

// ---- Query ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub name: String,
    /// Installed version, `None` when not installed.
    pub version: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetails {
    pub name: String,
    /// Package manager's own description of the package.
    pub info: String,
    pub provenance: Provenance,
}

// ---- Clean ----

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    /// Entries left in place because they were busy.
    pub skipped: Vec<PathBuf>,
    pub build_path: PathBuf,
    pub package_cache: PathBuf,
}
