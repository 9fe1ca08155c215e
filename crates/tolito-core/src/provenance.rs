//! Durable record of which source each package was installed from.
//!
//! The record is a flat JSON object, one `"name": "LABEL"` pair per line. Every change is
//! a whole-file read-modify-write under an exclusive lock on `<file>.lock`, so concurrent
//! tolito processes never lose each other's entries.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tolito_config::source::SourceKind;
use tolito_utils::{fs::ensure_dir_exists, lock::FileLock};
use tracing::{debug, warn};

use crate::{
    constants::UNTRACKED_LABEL,
    error::{CoreError, ErrorContext},
    CoreResult,
};

/// Recorded source of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Tracked(String),
    Unknown,
}

impl Provenance {
    /// The recorded label parsed back into a source, if it is still a valid label.
    pub fn source(&self) -> Option<SourceKind> {
        match self {
            Provenance::Tracked(label) => label.parse().ok(),
            Provenance::Unknown => None,
        }
    }

    /// Text shown to the user: the label, or "source not tracked".
    pub fn describe(&self) -> &str {
        match self {
            Provenance::Tracked(label) => label,
            Provenance::Unknown => UNTRACKED_LABEL,
        }
    }
}

pub struct ProvenanceStore {
    path: PathBuf,
}

impl ProvenanceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every tracked package and its label, sorted by name.
    pub fn entries(&self) -> CoreResult<BTreeMap<String, String>> {
        read_entries(&self.path)
    }

    /// Recorded label of `name`. An unreadable record is reported and treated as empty.
    pub fn lookup(&self, name: &str) -> Provenance {
        match self.entries() {
            Ok(entries) => {
                entries
                    .get(name)
                    .cloned()
                    .map_or(Provenance::Unknown, Provenance::Tracked)
            }
            Err(err) => {
                warn!("{err}");
                Provenance::Unknown
            }
        }
    }

    pub fn record(&self, name: &str, source: &SourceKind) -> CoreResult<()> {
        debug!("recording {name} as installed from {source}");
        self.update(|entries| {
            entries.insert(name.to_string(), source.label().to_string());
        })
    }

    /// Forgets `name`. Returns whether an entry existed.
    pub fn remove(&self, name: &str) -> CoreResult<bool> {
        self.update(|entries| entries.remove(name).is_some())
    }

    fn update<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> CoreResult<R> {
        let _lock = FileLock::acquire(&self.path)?;

        let mut entries = read_entries(&self.path)?;
        let result = f(&mut entries);
        write_entries(&self.path, &entries)?;
        Ok(result)
    }
}

fn read_entries(path: &Path) -> CoreResult<BTreeMap<String, String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).map_err(|err| {
        CoreError::Provenance {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    })
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }

    let mut content = serde_json::to_string_pretty(entries).map_err(|err| {
        CoreError::Provenance {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    })?;
    content.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))
}
