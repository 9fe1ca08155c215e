use std::fmt;

/// Final state of one install request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallOutcome {
    Success,
    Failure,
    /// The user answered no, at a tolito prompt or at the package manager's.
    Declined,
    AlreadyInstalled,
    /// No configured repository provides the package (repository-only installs).
    NotFound,
}

impl InstallOutcome {
    /// Maps the exit code of a package manager commit.
    ///
    /// pacman exits with 1 when the user declines the transaction.
    pub fn from_commit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => InstallOutcome::Success,
            Some(1) => InstallOutcome::Declined,
            _ => InstallOutcome::Failure,
        }
    }

    pub fn is_failure(self) -> bool {
        self == InstallOutcome::Failure
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallOutcome::Success => "installed",
            InstallOutcome::Failure => "failed",
            InstallOutcome::Declined => "declined",
            InstallOutcome::AlreadyInstalled => "already installed",
            InstallOutcome::NotFound => "not found",
        };
        f.write_str(label)
    }
}
