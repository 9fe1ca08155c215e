use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use tolito_config::config::Config;
use tolito_core::{
    build::KeyImportBudget,
    constants::{CURATED_CHECKOUT_DIR, PACKAGE_CACHE_DIR, REPO_CACHE_DIR},
    provenance::ProvenanceStore,
    tools::Toolset,
    CoreResult,
};
use tolito_events::{EventSinkHandle, TolitoEvent};
use tolito_registry::{DbFetcher, HttpProbe, MirrorSelector, RepoDbCache};
use tolito_utils::{fs::ensure_dir_exists, system::arch};

use crate::{
    aur::{AurClient, AurRpc},
    prompt::Prompter,
};

/// Everything an operation needs, built once per run.
pub struct OperationContext {
    config: Config,
    tools: Toolset,
    provenance: ProvenanceStore,
    repos: RepoDbCache,
    aur: Arc<dyn AurClient>,
    events: EventSinkHandle,
    prompter: Arc<dyn Prompter>,
    build_path: PathBuf,
    cache_path: PathBuf,
    key_budget: Mutex<KeyImportBudget>,
}

/// Explicit components for [`OperationContext::from_parts`].
pub struct ContextParts {
    pub config: Config,
    pub tools: Toolset,
    pub provenance: ProvenanceStore,
    pub repos: RepoDbCache,
    pub aur: Arc<dyn AurClient>,
    pub events: EventSinkHandle,
    pub prompter: Arc<dyn Prompter>,
    pub build_path: PathBuf,
    pub cache_path: PathBuf,
}

impl OperationContext {
    /// Context backed by the real system tools and the network.
    ///
    /// Fails when the build directory cannot be created.
    pub fn new(
        config: Config,
        events: EventSinkHandle,
        prompter: Arc<dyn Prompter>,
    ) -> CoreResult<Self> {
        let build_path = config.get_build_path()?;
        let cache_path = config.get_cache_path()?;
        ensure_dir_exists(&build_path)?;

        let tools = Toolset::system(config.keyserver());
        let selector = MirrorSelector::new(
            Arc::new(HttpProbe),
            config.probe_workers(),
            arch(),
            events.clone(),
        );
        let repos = RepoDbCache::with_parts(
            cache_path.join(REPO_CACHE_DIR),
            selector,
            Arc::new(DbFetcher),
            tools.extractor.clone(),
            events.clone(),
        );

        Ok(Self::from_parts(ContextParts {
            provenance: ProvenanceStore::new(config.get_provenance_path()?),
            aur: Arc::new(AurRpc::new(config.aur_url())),
            config,
            tools,
            repos,
            events,
            prompter,
            build_path,
            cache_path,
        }))
    }

    pub fn from_parts(parts: ContextParts) -> Self {
        Self {
            config: parts.config,
            tools: parts.tools,
            provenance: parts.provenance,
            repos: parts.repos,
            aur: parts.aur,
            events: parts.events,
            prompter: parts.prompter,
            build_path: parts.build_path,
            cache_path: parts.cache_path,
            key_budget: Mutex::new(KeyImportBudget::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tools(&self) -> &Toolset {
        &self.tools
    }

    pub fn provenance(&self) -> &ProvenanceStore {
        &self.provenance
    }

    pub fn repos(&self) -> &RepoDbCache {
        &self.repos
    }

    pub fn aur(&self) -> &dyn AurClient {
        self.aur.as_ref()
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn emit(&self, event: TolitoEvent) {
        self.events.emit(event);
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn build_path(&self) -> &PathBuf {
        &self.build_path
    }

    pub fn cache_path(&self) -> &PathBuf {
        &self.cache_path
    }

    /// PGP key imports left for the rest of this run.
    pub fn key_budget(&self) -> &Mutex<KeyImportBudget> {
        &self.key_budget
    }

    /// Sparse checkout of the curated recipe repository.
    pub fn curated_checkout(&self) -> PathBuf {
        self.build_path.join(CURATED_CHECKOUT_DIR)
    }

    /// Downloaded binary packages.
    pub fn package_cache(&self) -> PathBuf {
        self.cache_path.join(PACKAGE_CACHE_DIR)
    }

    /// Clone URL of a package in the community repository.
    pub fn aur_clone_url(&self, name: &str) -> String {
        format!("{}/{name}.git", self.config.aur_url())
    }
}
