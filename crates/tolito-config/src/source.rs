use std::{fmt, str::FromStr};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the binary repository the legacy `CHAOTIC` label refers to.
pub const CHAOTIC_REPO: &str = "chaotic-aur";

/// Where an installed package came from, or where a newer version may be found.
///
/// Serialized as its label: `URL`, `CURATED`, `AUR`, or the repository name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceKind {
    DirectUrl,
    Curated,
    Aur,
    Repo(String),
}

impl SourceKind {
    pub fn label(&self) -> &str {
        match self {
            SourceKind::DirectUrl => "URL",
            SourceKind::Curated => "CURATED",
            SourceKind::Aur => "AUR",
            SourceKind::Repo(name) => name,
        }
    }

    pub fn is_repo(&self) -> bool {
        matches!(self, SourceKind::Repo(_))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::InvalidSourceKind(s.to_string()));
        }

        let kind = match s.to_ascii_lowercase().as_str() {
            "url" | "direct" | "directurl" => SourceKind::DirectUrl,
            "curated" => SourceKind::Curated,
            "aur" => SourceKind::Aur,
            "chaotic" => SourceKind::Repo(CHAOTIC_REPO.to_string()),
            _ => {
                if s.chars().any(char::is_whitespace) {
                    return Err(ConfigError::InvalidSourceKind(s.to_string()));
                }
                SourceKind::Repo(s.to_string())
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for SourceKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.label().to_string()
    }
}

/// Which sources to search for a newer version of a package, keyed by where it was
/// installed from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct UpdateRule {
    /// Source probed first.
    pub main: SourceKind,

    /// Source probed second.
    pub alternative: SourceKind,

    /// Source probed last.
    pub fallback: SourceKind,

    /// Allow the AUR to be probed.
    pub get_from_aur: bool,

    /// Allow binary repositories (such as chaotic-aur) to be probed.
    pub get_from_chaotic: bool,

    /// Allow the curated recipe repository to be probed.
    pub get_from_curated: bool,
}

impl UpdateRule {
    pub fn new(main: SourceKind, alternative: SourceKind, fallback: SourceKind) -> Self {
        Self {
            main,
            alternative,
            fallback,
            get_from_aur: true,
            get_from_chaotic: true,
            get_from_curated: true,
        }
    }

    /// Whether the gates of this rule let `source` be probed.
    pub fn allows(&self, source: &SourceKind) -> bool {
        match source {
            SourceKind::Aur => self.get_from_aur,
            SourceKind::Curated => self.get_from_curated,
            SourceKind::Repo(_) => self.get_from_chaotic,
            SourceKind::DirectUrl => false,
        }
    }

    /// Sources to probe, in priority order, with gated and repeated entries removed.
    pub fn candidates(&self) -> Vec<SourceKind> {
        let mut out: Vec<SourceKind> = Vec::with_capacity(3);
        for source in [&self.main, &self.alternative, &self.fallback] {
            if self.allows(source) && !out.contains(source) {
                out.push(source.clone());
            }
        }
        out
    }
}
