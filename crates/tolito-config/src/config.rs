use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use tolito_utils::path::{resolve_path, xdg_config_home};
use toml_edit::DocumentMut;
use tracing::{debug, info, warn};

use crate::{
    annotations::{annotate_toml_named_tables, annotate_toml_table},
    display::{DisplaySettings, ProgressStyle},
    error::{ConfigError, ErrorContext, Result},
    repository::Repository,
    source::{SourceKind, UpdateRule, CHAOTIC_REPO},
};

pub const DEFAULT_CURATED_URL: &str = "https://github.com/Xray-OS/viper-pkgbuilds";
pub const DEFAULT_AUR_URL: &str = "https://aur.archlinux.org";
pub const DEFAULT_KEYSERVER: &str = "keyserver.ubuntu.com";
pub const DEFAULT_PROBE_WORKERS: usize = 8;

/// tolito configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Ask before building from the AUR, and ask which source to use when a package
    /// exists both in the curated repository and in the AUR.
    /// When false, the curated repository always wins without a prompt.
    /// Default: true
    pub ask_before_fallback: Option<bool>,

    /// Log a warning whenever a package falls back to the AUR.
    /// Default: true
    pub warn_on_fallback: Option<bool>,

    /// Ask before an update reinstalls a package from a different source than the one
    /// it was installed from.
    /// Default: true
    pub ask_before_switching_sources: Option<bool>,

    /// Directory where recipes are checked out and packages are built.
    /// Default: $HOME/tolito
    pub build_path: Option<String>,

    /// Directory for downloaded repository databases and packages.
    /// Default: $XDG_CACHE_HOME/tolito
    pub cache_path: Option<String>,

    /// File recording which source each installed package came from.
    /// Default: $XDG_CONFIG_HOME/tolito/package_sources.json
    pub provenance_path: Option<String>,

    /// Git URL of the curated recipe mono-repository.
    /// Default: https://github.com/Xray-OS/viper-pkgbuilds
    pub curated_url: Option<String>,

    /// Base URL of the AUR.
    /// Default: https://aur.archlinux.org
    pub aur_url: Option<String>,

    /// Keyserver used to fetch missing PGP keys during builds.
    /// Default: keyserver.ubuntu.com
    pub keyserver: Option<String>,

    /// Number of mirrors probed concurrently when ranking servers.
    /// Default: 8
    pub probe_workers: Option<usize>,

    /// Terminal output settings.
    pub display: Option<DisplaySettings>,

    /// Update rules, keyed by the source a package was installed from
    /// (CURATED, AUR, URL or a repository name).
    #[serde(default)]
    pub update_rules: BTreeMap<SourceKind, UpdateRule>,

    /// Binary repositories, keyed by name.
    #[serde(default)]
    pub repositories: BTreeMap<String, Repository>,
}

/// Location of the configuration file: `$TOLITO_CONFIG` or `$XDG_CONFIG_HOME/tolito/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("TOLITO_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("tolito").join("config.toml"),
    }
}

fn chaotic() -> SourceKind {
    SourceKind::Repo(CHAOTIC_REPO.to_string())
}

impl Config {
    pub fn default_config() -> Self {
        let update_rules = BTreeMap::from([
            (
                SourceKind::Curated,
                UpdateRule::new(SourceKind::Curated, SourceKind::Aur, chaotic()),
            ),
            (
                SourceKind::Aur,
                UpdateRule::new(SourceKind::Curated, SourceKind::Aur, chaotic()),
            ),
            (
                chaotic(),
                UpdateRule::new(chaotic(), SourceKind::Curated, SourceKind::Aur),
            ),
        ]);

        let repositories = BTreeMap::from([(
            CHAOTIC_REPO.to_string(),
            Repository {
                name: CHAOTIC_REPO.to_string(),
                servers: Vec::new(),
                sig_level: Some("Required DatabaseOptional".to_string()),
                include: Some("/etc/pacman.d/chaotic-mirrorlist".to_string()),
            },
        )]);

        Self {
            ask_before_fallback: Some(true),
            warn_on_fallback: Some(true),
            ask_before_switching_sources: Some(true),
            build_path: Some("$HOME/tolito".to_string()),
            cache_path: Some("$XDG_CACHE_HOME/tolito".to_string()),
            provenance_path: Some("$XDG_CONFIG_HOME/tolito/package_sources.json".to_string()),
            curated_url: Some(DEFAULT_CURATED_URL.to_string()),
            aur_url: Some(DEFAULT_AUR_URL.to_string()),
            keyserver: Some(DEFAULT_KEYSERVER.to_string()),
            probe_workers: Some(DEFAULT_PROBE_WORKERS),
            display: Some(DisplaySettings {
                color: Some(true),
                candy_bar: Some(false),
                progress_style: Some(ProgressStyle::Bar),
                disable_timeout: Some(false),
            }),
            update_rules,
            repositories,
        }
    }

    /// Loads the configuration at `path`.
    ///
    /// A missing file is replaced by the default configuration, which is also written to
    /// `path` as an annotated document so the user has something to edit.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let mut config = Self::default_config();
                config.resolve()?;
                if let Err(err) = config.write_annotated(path) {
                    warn!("Could not persist default configuration: {}", err);
                }
                Ok(config)
            }
            Err(err) => {
                Err(ConfigError::IoError {
                    action: format!("reading config file {}", path.display()),
                    source: err,
                })
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Fills repository names from their table keys and validates cross references.
    pub fn resolve(&mut self) -> Result<()> {
        if self.probe_workers == Some(0) {
            return Err(ConfigError::InvalidProbeWorkers);
        }

        for (name, repo) in self.repositories.iter_mut() {
            if name.parse::<SourceKind>()? != SourceKind::Repo(name.clone()) {
                return Err(ConfigError::ReservedRepositoryName(name.clone()));
            }
            if repo.servers.is_empty() && repo.include.is_none() {
                return Err(ConfigError::RepositoryWithoutServers(name.clone()));
            }
            repo.name = name.clone();
        }

        for (key, rule) in &self.update_rules {
            for source in [key, &rule.main, &rule.alternative, &rule.fallback] {
                if let SourceKind::Repo(repo) = source {
                    if !self.repositories.contains_key(repo) {
                        return Err(ConfigError::UnknownRepository {
                            rule: key.to_string(),
                            repo: repo.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    pub fn ask_before_fallback(&self) -> bool {
        self.ask_before_fallback.unwrap_or(true)
    }

    pub fn warn_on_fallback(&self) -> bool {
        self.warn_on_fallback.unwrap_or(true)
    }

    pub fn ask_before_switching_sources(&self) -> bool {
        self.ask_before_switching_sources.unwrap_or(true)
    }

    pub fn curated_url(&self) -> &str {
        self.curated_url.as_deref().unwrap_or(DEFAULT_CURATED_URL)
    }

    pub fn aur_url(&self) -> &str {
        self.aur_url
            .as_deref()
            .unwrap_or(DEFAULT_AUR_URL)
            .trim_end_matches('/')
    }

    pub fn keyserver(&self) -> &str {
        self.keyserver.as_deref().unwrap_or(DEFAULT_KEYSERVER)
    }

    pub fn probe_workers(&self) -> usize {
        self.probe_workers.unwrap_or(DEFAULT_PROBE_WORKERS)
    }

    pub fn display(&self) -> DisplaySettings {
        self.display.clone().unwrap_or_default()
    }

    pub fn get_build_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("TOLITO_BUILD") {
            return Ok(resolve_path(&env_path)?);
        }
        Ok(resolve_path(
            self.build_path.as_deref().unwrap_or("$HOME/tolito"),
        )?)
    }

    pub fn get_cache_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("TOLITO_CACHE") {
            return Ok(resolve_path(&env_path)?);
        }
        Ok(resolve_path(
            self.cache_path.as_deref().unwrap_or("$XDG_CACHE_HOME/tolito"),
        )?)
    }

    pub fn get_provenance_path(&self) -> Result<PathBuf> {
        Ok(resolve_path(
            self.provenance_path
                .as_deref()
                .unwrap_or("$XDG_CONFIG_HOME/tolito/package_sources.json"),
        )?)
    }

    pub fn update_rule(&self, installed_from: &SourceKind) -> Option<&UpdateRule> {
        self.update_rules.get(installed_from)
    }

    pub fn get_repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(display) = doc.get_mut("display").and_then(|d| d.as_table_mut()) {
            annotate_toml_table::<DisplaySettings>(display, true)?;
        }
        if let Some(rules) = doc.get_mut("update_rules").and_then(|r| r.as_table_mut()) {
            annotate_toml_named_tables::<UpdateRule>(rules)?;
        }
        if let Some(repos) = doc.get_mut("repositories").and_then(|r| r.as_table_mut()) {
            annotate_toml_named_tables::<Repository>(repos)?;
        }

        Ok(doc)
    }

    fn write_annotated(&self, path: &Path) -> Result<()> {
        let annotated_doc = self.to_annotated_document()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        fs::write(path, annotated_doc.to_string())
            .with_context(|| format!("writing config file {}", path.display()))?;

        info!(
            "Default configuration file generated with documentation at: {}",
            path.display()
        );
        Ok(())
    }
}

/// Writes the annotated default configuration to `path`, refusing to overwrite.
pub fn generate_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(path.display().to_string()));
    }
    Config::default_config().write_annotated(path)
}
