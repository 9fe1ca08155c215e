//! Per-run cache of repository databases.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
};

use tolito_config::{config::Config, repository::Repository};
use tolito_dl::{download::Download, types::Progress};
use tolito_events::{EventSinkHandle, SyncStage, TolitoEvent};
use tolito_utils::{fs::ensure_dir_exists, system::arch};
use tracing::{debug, info, warn};

use crate::{
    desc::{parse_desc, PackageInfo},
    error::{ErrorContext, RegistryError, Result},
    extract::{Extractor, TarExtractor},
    mirror::{HttpProbe, MirrorSelector},
};

/// Packages of one repository, keyed by name.
pub type RepoDatabase = HashMap<String, PackageInfo>;

/// Receives transfer progress samples.
pub type ProgressHandler = Arc<dyn Fn(Progress) + Send + Sync>;

/// Retrieves a remote file to a local path.
pub trait Fetcher: Send + Sync {
    /// Downloads `url` to `dest` and returns the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path, progress: Option<ProgressHandler>) -> Result<u64>;
}

/// Fetches over HTTP with the shared agent.
pub struct DbFetcher;

impl Fetcher for DbFetcher {
    fn fetch(&self, url: &str, dest: &Path, progress: Option<ProgressHandler>) -> Result<u64> {
        let mut download = Download::new(url).output(dest);
        if let Some(handler) = progress {
            download = download.progress(move |p| handler(p));
        }
        Ok(download.execute()?)
    }
}

type Slot = Arc<OnceLock<Arc<RepoDatabase>>>;

/// Fetches each repository database at most once per run.
///
/// A failed fetch is memoized as an empty database, so an unreachable repository costs
/// one round of network attempts per run rather than one per lookup.
pub struct RepoDbCache {
    root: PathBuf,
    selector: MirrorSelector,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    events: EventSinkHandle,
    databases: Mutex<HashMap<String, Slot>>,
}

macro_rules! report {
    ($silent:expr, $($arg:tt)+) => {
        if $silent {
            debug!($($arg)+);
        } else {
            warn!($($arg)+);
        }
    };
}

impl RepoDbCache {
    /// Cache backed by HTTP, the system `tar`, and `<cache>/repos`.
    pub fn new(config: &Config, events: EventSinkHandle) -> Result<Self> {
        let selector = MirrorSelector::new(
            Arc::new(HttpProbe),
            config.probe_workers(),
            arch(),
            events.clone(),
        );
        Ok(Self::with_parts(
            config.get_cache_path()?.join("repos"),
            selector,
            Arc::new(DbFetcher),
            Arc::new(TarExtractor),
            events,
        ))
    }

    pub fn with_parts(
        root: PathBuf,
        selector: MirrorSelector,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        events: EventSinkHandle,
    ) -> Self {
        Self {
            root,
            selector,
            fetcher,
            extractor,
            events,
            databases: Mutex::new(HashMap::new()),
        }
    }

    /// Transfer client shared with package downloads.
    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// Mirrors of `repo` with `$repo`/`$arch` substituted, fastest first.
    pub fn ranked_servers(&self, repo: &Repository) -> Result<Vec<String>> {
        let templates = repo.server_templates()?;
        if templates.is_empty() {
            return Err(RegistryError::NoServers(repo.name.clone()));
        }
        Ok(self.selector.rank_mirrors(&templates, &repo.name))
    }

    /// Database of `repo`, fetched on first use. Never fails: when every server fails
    /// the result is empty.
    pub fn get_database(&self, repo: &Repository, silent: bool) -> Arc<RepoDatabase> {
        let slot = {
            let mut databases = self
                .databases
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            databases.entry(repo.name.clone()).or_default().clone()
        };

        if let Some(db) = slot.get() {
            self.emit(&repo.name, SyncStage::Cached);
            return db.clone();
        }

        slot.get_or_init(|| Arc::new(self.load(repo, silent))).clone()
    }

    /// Whether `repo`'s database has already been fetched during this run.
    pub fn is_loaded(&self, repo_name: &str) -> bool {
        self.databases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(repo_name)
            .is_some_and(|slot| slot.get().is_some())
    }

    fn load(&self, repo: &Repository, silent: bool) -> RepoDatabase {
        let servers = match self.ranked_servers(repo) {
            Ok(servers) => servers,
            Err(err) => {
                report!(silent, "Cannot sync {}: {err}", repo.name);
                self.emit(&repo.name, SyncStage::Unavailable);
                return RepoDatabase::new();
            }
        };

        for server in servers {
            self.emit(
                &repo.name,
                SyncStage::Fetching {
                    server: server.clone(),
                },
            );
            match self.try_server(repo, &server) {
                Ok(db) => {
                    info!("Synced {} ({} packages) from {server}", repo.name, db.len());
                    self.emit(
                        &repo.name,
                        SyncStage::Complete {
                            package_count: db.len(),
                        },
                    );
                    return db;
                }
                Err(err) => {
                    report!(silent, "Failed to sync {} from {server}: {err}", repo.name);
                }
            }
        }

        report!(silent, "No mirror of {} could be used", repo.name);
        self.emit(&repo.name, SyncStage::Unavailable);
        RepoDatabase::new()
    }

    fn try_server(&self, repo: &Repository, server: &str) -> Result<RepoDatabase> {
        let repo_dir = self.root.join(&repo.name);
        ensure_dir_exists(&repo_dir)?;

        let db_file = repo.db_filename();
        let archive = repo_dir.join(&db_file);
        self.fetcher
            .fetch(&format!("{server}/{db_file}"), &archive, None)?;

        self.emit(&repo.name, SyncStage::Extracting);
        let db_dir = repo_dir.join("db");
        if db_dir.exists() {
            fs::remove_dir_all(&db_dir)
                .with_context(|| format!("removing {}", db_dir.display()))?;
        }
        fs::create_dir_all(&db_dir).with_context(|| format!("creating {}", db_dir.display()))?;

        if !self.extractor.extract(&archive, &db_dir) {
            return Err(RegistryError::ExtractFailed {
                archive: archive.display().to_string(),
            });
        }

        let db = read_database_dir(&db_dir)?;
        if db.is_empty() {
            return Err(RegistryError::EmptyDatabase(server.to_string()));
        }
        Ok(db)
    }

    fn emit(&self, repo_name: &str, stage: SyncStage) {
        self.events.emit(TolitoEvent::SyncProgress {
            repo_name: repo_name.to_string(),
            stage,
        });
    }
}

/// Parses every `<entry>/desc` below an extracted database directory.
pub fn read_database_dir(dir: &Path) -> Result<RepoDatabase> {
    let mut db = RepoDatabase::new();
    let entries = fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let desc = entry.path().join("desc");
        if !desc.is_file() {
            continue;
        }
        let content = fs::read_to_string(&desc)
            .with_context(|| format!("reading {}", desc.display()))?;
        if let Some(info) = parse_desc(&content) {
            db.insert(info.name.clone(), info);
        }
    }

    Ok(db)
}
