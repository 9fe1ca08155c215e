//! Test environment: a context over fakes rooted in a temporary directory.

use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tempfile::TempDir;
use tolito_config::{config::Config, repository::Repository};
use tolito_core::{provenance::ProvenanceStore, testing::FakeTools};
use tolito_dl::types::Progress;
use tolito_events::{CollectorSink, EventSinkHandle, TolitoEvent};
use tolito_registry::{
    error::{RegistryError, Result as RegistryResult},
    Extractor, Fetcher, MirrorSelector, Probe, ProgressHandler, RepoDbCache,
};

use crate::{
    aur::AurClient,
    context::{ContextParts, OperationContext},
    prompt::Prompter,
};

pub const TEST_REPO: &str = "testrepo";
pub const MIRRORS: [&str; 3] = ["https://m1.example", "https://m2.example", "https://m3.example"];

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Answers prompts from a queue, falling back to the default, and records every question.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answer(&self, answer: &str) {
        guard(&self.answers).push_back(answer.to_string());
    }

    pub fn questions(&self) -> Vec<String> {
        guard(&self.questions).clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str, default: &str) -> String {
        guard(&self.questions).push(question.to_string());
        guard(&self.answers)
            .pop_front()
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Default)]
pub struct FakeAur {
    versions: Mutex<HashMap<String, String>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeAur {
    pub fn publish(&self, name: &str, version: &str) {
        guard(&self.versions).insert(name.to_string(), version.to_string());
    }

    pub fn lookups(&self) -> Vec<String> {
        guard(&self.lookups).clone()
    }
}

impl AurClient for FakeAur {
    fn version(&self, name: &str) -> Option<String> {
        guard(&self.lookups).push(name.to_string());
        guard(&self.versions).get(name).cloned()
    }
}

/// Every mirror answers in the same time, so ranking keeps configuration order.
pub struct FlatProbe;

impl Probe for FlatProbe {
    fn probe(&self, _url: &str) -> Option<Duration> {
        Some(Duration::from_millis(10))
    }
}

#[derive(Default)]
struct MirrorState {
    db_packages: Vec<(String, String)>,
    filenames: HashMap<String, String>,
    packages: HashMap<String, Vec<u8>>,
    db_requests: Vec<String>,
    package_requests: Vec<String>,
}

/// Mirror network stand-in. The first mirror serves the database once
/// [`FakeMirror::serve_db`] is called; package files are served per server.
#[derive(Default)]
pub struct FakeMirror(Mutex<MirrorState>);

impl FakeMirror {
    pub fn serve_db(&self, packages: &[(&str, &str)]) {
        guard(&self.0).db_packages = packages
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect();
    }

    /// Overrides the `%FILENAME%` listed for `name`.
    pub fn serve_filename(&self, name: &str, filename: &str) {
        guard(&self.0)
            .filenames
            .insert(name.to_string(), filename.to_string());
    }

    pub fn serve_package(&self, server: &str, bytes: &[u8]) {
        guard(&self.0)
            .packages
            .insert(server.to_string(), bytes.to_vec());
    }

    pub fn db_requests(&self) -> Vec<String> {
        guard(&self.0).db_requests.clone()
    }

    pub fn package_requests(&self) -> Vec<String> {
        guard(&self.0).package_requests.clone()
    }
}

fn unreachable(url: &str) -> RegistryError {
    RegistryError::Custom(format!("{url}: connection refused"))
}

impl Fetcher for FakeMirror {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressHandler>,
    ) -> RegistryResult<u64> {
        let mut state = guard(&self.0);
        let bytes = if url.ends_with(".db") {
            state.db_requests.push(url.to_string());
            if state.db_packages.is_empty() || !url.starts_with(MIRRORS[0]) {
                return Err(unreachable(url));
            }
            b"db".to_vec()
        } else {
            state.package_requests.push(url.to_string());
            let server = MIRRORS.iter().find(|m| url.starts_with(*m));
            match server.and_then(|s| state.packages.get(*s)) {
                Some(bytes) => bytes.clone(),
                None => return Err(unreachable(url)),
            }
        };

        if let Some(parent) = dest.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let total = bytes.len() as u64;
        if let Some(progress) = &progress {
            progress(Progress::Starting { total });
        }
        fs::write(dest, &bytes).map_err(|_| unreachable(url))?;
        if let Some(progress) = &progress {
            progress(Progress::Complete { total });
        }
        Ok(total)
    }
}

impl Extractor for FakeMirror {
    fn extract(&self, _archive: &Path, dest: &Path) -> bool {
        let state = guard(&self.0);
        state.db_packages.iter().all(|(name, version)| {
            let dir = dest.join(format!("{name}-{version}"));
            let filename = state
                .filenames
                .get(name)
                .cloned()
                .unwrap_or_else(|| format!("{name}-{version}-x86_64.pkg.tar.zst"));
            let desc =
                format!("%NAME%\n{name}\n\n%VERSION%\n{version}\n\n%FILENAME%\n{filename}\n");
            fs::create_dir_all(&dir).is_ok() && fs::write(dir.join("desc"), desc).is_ok()
        })
    }
}

/// An [`OperationContext`] over fakes, with handles to every fake.
pub struct TestEnv {
    pub ctx: OperationContext,
    pub fakes: FakeTools,
    pub fetcher: Arc<FakeMirror>,
    pub aur: Arc<FakeAur>,
    pub prompter: Arc<ScriptedPrompter>,
    pub events: Arc<CollectorSink>,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Default configuration with a single three-mirror repository, adjusted by `tweak`.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut config = Config::default_config();
        config.repositories.clear();
        config.update_rules.clear();
        config.repositories.insert(
            TEST_REPO.to_string(),
            Repository {
                name: TEST_REPO.to_string(),
                servers: MIRRORS.iter().map(|m| m.to_string()).collect(),
                sig_level: None,
                include: None,
            },
        );
        tweak(&mut config);
        config.resolve().unwrap();

        let fakes = FakeTools::new();
        let fetcher = Arc::new(FakeMirror::default());
        let aur = Arc::new(FakeAur::default());
        let prompter = Arc::new(ScriptedPrompter::default());
        let events = Arc::new(CollectorSink::default());
        let sink: EventSinkHandle = events.clone();

        let build_path = root.join("build");
        let cache_path = root.join("cache");
        fs::create_dir_all(&build_path).unwrap();

        let selector = MirrorSelector::new(Arc::new(FlatProbe), 2, "x86_64", sink.clone());
        let repos = RepoDbCache::with_parts(
            cache_path.join("repos"),
            selector,
            fetcher.clone(),
            fetcher.clone(),
            sink.clone(),
        );

        let ctx = OperationContext::from_parts(ContextParts {
            config,
            tools: fakes.toolset(),
            provenance: ProvenanceStore::new(root.join("package_sources.json")),
            repos,
            aur: aur.clone(),
            events: sink,
            prompter: prompter.clone(),
            build_path,
            cache_path,
        });

        Self {
            ctx,
            fakes,
            fetcher,
            aur,
            prompter,
            events,
            _dir: dir,
        }
    }

    pub fn repo_serves_db(&self, packages: &[(&str, &str)]) {
        self.fetcher.serve_db(packages);
    }

    pub fn events(&self) -> Vec<TolitoEvent> {
        self.events.events()
    }
}
