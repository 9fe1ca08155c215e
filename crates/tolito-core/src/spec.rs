use std::fmt;

use crate::{error::CoreError, CoreResult};

const URL_PREFIXES: [&str; 5] = ["http://", "https://", "git@", "ssh://", "git://"];

/// What the user asked to install: a clone URL or a bare package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpec {
    Url(String),
    Name(String),
}

impl PackageSpec {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if is_url(input) {
            PackageSpec::Url(input.to_string())
        } else {
            PackageSpec::Name(input.to_string())
        }
    }

    /// Name the package is known by locally. For URLs this is the repository directory name.
    pub fn name(&self) -> String {
        match self {
            PackageSpec::Url(url) => repo_dir_name(url),
            PackageSpec::Name(name) => name.clone(),
        }
    }

    /// Like [`name`](Self::name), but refuses names that would not stay a single directory
    /// below the build path.
    pub fn checked_name(&self) -> CoreResult<String> {
        let name = self.name();
        if is_valid_name(&name) {
            Ok(name)
        } else {
            Err(CoreError::InvalidPackageName(name))
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, PackageSpec::Url(_))
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSpec::Url(url) => f.write_str(url),
            PackageSpec::Name(name) => f.write_str(name),
        }
    }
}

/// Whether `input` starts with one of the recognized clone URL schemes.
pub fn is_url(input: &str) -> bool {
    URL_PREFIXES.iter().any(|prefix| input.starts_with(prefix))
}

/// Whether `name` is usable as one path component: non-empty, not `.` or `..`, and free of
/// separators and NUL bytes.
pub fn is_valid_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\\', '\0'])
}

/// Directory a clone URL checks out into: the last path segment without trailing `/`
/// or `.git`.
///
/// ```
/// use tolito_core::spec::repo_dir_name;
///
/// assert_eq!(repo_dir_name("https://example.com/foo.git"), "foo");
/// assert_eq!(repo_dir_name("git@github.com:user/bar.git"), "bar");
/// ```
pub fn repo_dir_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed)
        .to_string()
}
