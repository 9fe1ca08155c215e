//! Clone, build and install of a package from a build recipe.

use std::{
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tolito_config::source::SourceKind;
use tolito_events::{BuildStage, EventSinkHandle, InstallStage, OperationId, TolitoEvent};
use tolito_utils::fs::find_files_matching;
use tracing::{error, info, warn};

use crate::{
    constants::{ARTIFACT_GLOB, KEY_IMPORT_BUDGET, PKGBUILD, SIGNATURE_SUFFIX},
    error::CoreError,
    keys::{find_missing_key, is_valid_key_id},
    outcome::InstallOutcome,
    provenance::ProvenanceStore,
    tools::{BuildOutput, Toolset},
};

/// Where a build stands after each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Building,
    AwaitingKeyImport(String),
    Failed,
    Succeeded,
}

/// Decides whether a failed build may import a missing key and try again.
///
/// Each key is tried at most once, and no more than `budget` keys per run. One budget is
/// shared by every build of the run.
#[derive(Debug)]
pub struct KeyImportBudget {
    remaining: u32,
    tried: HashSet<String>,
}

impl Default for KeyImportBudget {
    fn default() -> Self {
        Self::new(KEY_IMPORT_BUDGET)
    }
}

impl KeyImportBudget {
    pub fn new(budget: u32) -> Self {
        Self {
            remaining: budget,
            tried: HashSet::new(),
        }
    }

    pub fn next_state(&mut self, result: &BuildOutput) -> BuildState {
        if result.success {
            return BuildState::Succeeded;
        }

        let Some(key) = find_missing_key(&result.output) else {
            return BuildState::Failed;
        };

        if !is_valid_key_id(&key) {
            warn!("{}", CoreError::InvalidKeyId(key));
            return BuildState::Failed;
        }

        if self.remaining == 0 || self.tried.contains(&key) {
            return BuildState::Failed;
        }

        self.remaining -= 1;
        self.tried.insert(key.clone());
        BuildState::AwaitingKeyImport(key)
    }
}

/// A recipe build to run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub name: String,
    pub source: SourceKind,
    /// Directory holding (or receiving) the recipe.
    pub dir: PathBuf,
    /// Repository to clone into `dir`. `None` when the recipe is already in place.
    pub clone_url: Option<String>,
}

/// First built package archive in `dir`, preferring one named after `name`.
pub fn find_built_artifact(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = find_files_matching(dir, ARTIFACT_GLOB)
        .ok()?
        .into_iter()
        .filter(|path| {
            !path
                .to_string_lossy()
                .ends_with(SIGNATURE_SUFFIX)
        })
        .collect();

    let prefix = format!("{name}-");
    candidates
        .iter()
        .find(|path| {
            path.file_name()
                .is_some_and(|f| f.to_string_lossy().starts_with(&prefix))
        })
        .or_else(|| candidates.first())
        .cloned()
}

/// Hands `artifact` to the package manager and records provenance on success.
pub fn commit_artifact(
    tools: &Toolset,
    provenance: &ProvenanceStore,
    events: &EventSinkHandle,
    op_id: OperationId,
    name: &str,
    source: &SourceKind,
    artifact: &Path,
) -> InstallOutcome {
    events.emit(TolitoEvent::Installing {
        op_id,
        pkg_name: name.to_string(),
        stage: InstallStage::Committing,
    });

    let code = tools.package_manager.commit_install(artifact);
    let outcome = InstallOutcome::from_commit_code(code);
    match outcome {
        InstallOutcome::Success => {
            if let Err(err) = provenance.record(name, source) {
                warn!("Installed {name} but could not record its source: {err}");
            }
            events.emit(TolitoEvent::Installing {
                op_id,
                pkg_name: name.to_string(),
                stage: InstallStage::Complete,
            });
            info!("Installed {name} from {source}");
        }
        InstallOutcome::Declined => info!("Installation of {name} declined"),
        _ => error!("Installing {} failed", artifact.display()),
    }
    outcome
}

/// Whether `dir` lies strictly below `root` without climbing out through `..`.
fn is_below(root: &Path, dir: &Path) -> bool {
    match dir.strip_prefix(root) {
        Ok(rest) => {
            let mut components = rest.components().peekable();
            components.peek().is_some()
                && components.all(|component| matches!(component, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

pub struct BuildDriver<'a> {
    tools: &'a Toolset,
    provenance: &'a ProvenanceStore,
    events: &'a EventSinkHandle,
    build_root: &'a Path,
    budget: &'a Mutex<KeyImportBudget>,
}

impl<'a> BuildDriver<'a> {
    /// Recipe directories must lie below `build_root`; `budget` limits key imports.
    pub fn new(
        tools: &'a Toolset,
        provenance: &'a ProvenanceStore,
        events: &'a EventSinkHandle,
        build_root: &'a Path,
        budget: &'a Mutex<KeyImportBudget>,
    ) -> Self {
        Self {
            tools,
            provenance,
            events,
            build_root,
            budget,
        }
    }

    /// Builds (unless an artifact is already present) and installs one package.
    pub fn run(&self, op_id: OperationId, request: &BuildRequest) -> InstallOutcome {
        let name = &request.name;

        if !is_below(self.build_root, &request.dir) {
            error!(
                "Refusing to build {name} in {}, outside {}",
                request.dir.display(),
                self.build_root.display()
            );
            return InstallOutcome::Failure;
        }

        let artifact = match find_built_artifact(&request.dir, name) {
            Some(artifact) => {
                info!("{name} is already built, skipping clone and build");
                self.stage(op_id, name, BuildStage::ReusingArtifact);
                artifact
            }
            None => {
                if let Some(url) = &request.clone_url {
                    if !self.fresh_clone(op_id, name, url, &request.dir) {
                        return InstallOutcome::Failure;
                    }
                } else if !request.dir.join(PKGBUILD).is_file() {
                    error!("No {PKGBUILD} in {}", request.dir.display());
                    return InstallOutcome::Failure;
                }

                if !self.build(op_id, name, &request.dir) {
                    return InstallOutcome::Failure;
                }

                match find_built_artifact(&request.dir, name) {
                    Some(artifact) => artifact,
                    None => {
                        error!("No package file found in {}", request.dir.display());
                        return InstallOutcome::Failure;
                    }
                }
            }
        };

        commit_artifact(
            self.tools,
            self.provenance,
            self.events,
            op_id,
            name,
            &request.source,
            &artifact,
        )
    }

    fn fresh_clone(&self, op_id: OperationId, name: &str, url: &str, dir: &Path) -> bool {
        if dir.exists() {
            if let Err(err) = fs::remove_dir_all(dir) {
                error!("Cannot remove stale {}: {err}", dir.display());
                return false;
            }
        }

        info!("Cloning {url}");
        self.stage(
            op_id,
            name,
            BuildStage::Cloning {
                url: url.to_string(),
            },
        );
        if !self.tools.vcs.clone_repo(url, dir) {
            error!("git clone of {url} failed");
            return false;
        }
        true
    }

    fn build(&self, op_id: OperationId, name: &str, dir: &Path) -> bool {
        let mut state = BuildState::Building;
        let mut attempt = 0;

        loop {
            state = match state {
                BuildState::Building => {
                    attempt += 1;
                    self.stage(op_id, name, BuildStage::Building { attempt });
                    let result = self.tools.builder.build(dir);
                    let next = self
                        .budget
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .next_state(&result);
                    if next == BuildState::Failed {
                        error!(
                            "{}",
                            CoreError::BuildFailure {
                                name: name.to_string(),
                                code: result.code,
                            }
                        );
                        self.stage(
                            op_id,
                            name,
                            BuildStage::Failed {
                                exit_code: result.code,
                            },
                        );
                    }
                    next
                }
                BuildState::AwaitingKeyImport(key_id) => {
                    warn!("Missing PGP key {key_id}, importing");
                    self.stage(
                        op_id,
                        name,
                        BuildStage::ImportingKey {
                            key_id: key_id.clone(),
                        },
                    );
                    if self.tools.key_trust.import_and_sign(&key_id) {
                        BuildState::Building
                    } else {
                        error!("Could not import PGP key {key_id}");
                        self.stage(op_id, name, BuildStage::Failed { exit_code: None });
                        BuildState::Failed
                    }
                }
                BuildState::Failed => return false,
                BuildState::Succeeded => {
                    self.stage(op_id, name, BuildStage::Complete);
                    return true;
                }
            };
        }
    }

    fn stage(&self, op_id: OperationId, name: &str, stage: BuildStage) {
        self.events.emit(TolitoEvent::Building {
            op_id,
            pkg_name: name.to_string(),
            stage,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::{tempdir, TempDir};
    use tolito_events::CollectorSink;

    use super::*;
    use crate::testing::{built_ok, key_failure, plain_failure, FakeTools};

    /// Runs one build below `root` against a fresh per-run budget.
    fn run_build(
        fakes: &FakeTools,
        root: &TempDir,
        events: &EventSinkHandle,
        request: &BuildRequest,
    ) -> (InstallOutcome, ProvenanceStore) {
        let tools = fakes.toolset();
        let store = ProvenanceStore::new(root.path().join("sources.json"));
        let budget = Mutex::new(KeyImportBudget::default());
        let outcome =
            BuildDriver::new(&tools, &store, events, root.path(), &budget).run(1, request);
        (outcome, store)
    }

    fn request(dir: &Path, url: Option<&str>) -> BuildRequest {
        BuildRequest {
            name: "foo".into(),
            source: SourceKind::Aur,
            dir: dir.to_path_buf(),
            clone_url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_budget_success() {
        let mut budget = KeyImportBudget::default();
        assert_eq!(budget.next_state(&built_ok()), BuildState::Succeeded);
    }

    #[test]
    fn test_budget_allows_one_import() {
        let mut budget = KeyImportBudget::default();
        assert_eq!(
            budget.next_state(&key_failure("ABCD1234")),
            BuildState::AwaitingKeyImport("ABCD1234".into())
        );
        assert_eq!(budget.next_state(&key_failure("ABCD1234")), BuildState::Failed);
        assert_eq!(budget.next_state(&key_failure("FFFF0000")), BuildState::Failed);
    }

    #[test]
    fn test_budget_plain_failure_and_bad_key() {
        let mut budget = KeyImportBudget::new(3);
        assert_eq!(budget.next_state(&plain_failure()), BuildState::Failed);
        let overlong = "A".repeat(41);
        assert_eq!(budget.next_state(&key_failure(&overlong)), BuildState::Failed);
    }

    #[test]
    fn test_find_built_artifact() {
        let dir = tempdir().unwrap();
        assert_eq!(find_built_artifact(dir.path(), "foo"), None);

        fs::write(dir.path().join("foo-1.0-1-x86_64.pkg.tar.zst.sig"), b"sig").unwrap();
        assert_eq!(find_built_artifact(dir.path(), "foo"), None);

        fs::write(dir.path().join("bar-2-1-any.pkg.tar.zst"), b"x").unwrap();
        fs::write(dir.path().join("foo-1.0-1-x86_64.pkg.tar.zst"), b"x").unwrap();
        assert_eq!(
            find_built_artifact(dir.path(), "foo"),
            Some(dir.path().join("foo-1.0-1-x86_64.pkg.tar.zst"))
        );
        assert_eq!(
            find_built_artifact(dir.path(), "other"),
            Some(dir.path().join("bar-2-1-any.pkg.tar.zst"))
        );
    }

    #[test]
    fn test_is_below() {
        let root = Path::new("/home/u/tolito");
        assert!(is_below(root, &root.join("foo")));
        assert!(is_below(root, &root.join("curated/foo")));
        assert!(!is_below(root, root));
        assert!(!is_below(root, &root.join("..")));
        assert!(!is_below(root, &root.join("../yay")));
        assert!(!is_below(root, Path::new("/home/u/yay")));
    }

    #[test]
    fn test_clone_build_install_records_provenance() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        let sink = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = sink.clone();
        let dir = root.path().join("foo");

        let (outcome, store) = run_build(
            &fakes,
            &root,
            &events,
            &request(&dir, Some("https://aur.archlinux.org/foo.git")),
        );

        assert_eq!(outcome, InstallOutcome::Success);
        assert_eq!(fakes.vcs.clones(), vec!["https://aur.archlinux.org/foo.git"]);
        assert_eq!(fakes.builder.build_count(), 1);
        assert_eq!(fakes.package_manager.commits().len(), 1);
        assert_eq!(store.lookup("foo").describe(), "AUR");
        assert!(sink.events().iter().any(|e| matches!(
            e,
            TolitoEvent::Building { stage: BuildStage::Complete, .. }
        )));
    }

    #[test]
    fn test_existing_artifact_skips_clone_and_build() {
        let root = tempdir().unwrap();
        let dir = root.path().join("foo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("foo-1.0-1-x86_64.pkg.tar.zst"), b"x").unwrap();

        let fakes = FakeTools::new();
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, _) = run_build(
            &fakes,
            &root,
            &events,
            &request(&dir, Some("https://aur.archlinux.org/foo.git")),
        );

        assert_eq!(outcome, InstallOutcome::Success);
        assert!(fakes.vcs.clones().is_empty());
        assert_eq!(fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_dir_outside_build_root_is_left_alone() {
        let outer = tempdir().unwrap();
        let build_root = outer.path().join("build");
        fs::create_dir_all(&build_root).unwrap();
        fs::write(outer.path().join("keep.txt"), b"keep").unwrap();

        let fakes = FakeTools::new();
        let tools = fakes.toolset();
        let store = ProvenanceStore::new(outer.path().join("sources.json"));
        let events: EventSinkHandle = Arc::new(CollectorSink::default());
        let budget = Mutex::new(KeyImportBudget::default());
        let driver = BuildDriver::new(&tools, &store, &events, &build_root, &budget);

        for dir in [build_root.join(".."), outer.path().to_path_buf(), build_root.clone()] {
            let outcome = driver.run(1, &request(&dir, Some("https://example.com/..")));
            assert_eq!(outcome, InstallOutcome::Failure);
        }

        assert!(outer.path().join("keep.txt").exists());
        assert!(build_root.exists());
        assert!(fakes.vcs.clones().is_empty());
        assert_eq!(fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_missing_key_retries_exactly_once() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        fakes
            .builder
            .queue([key_failure("1EB2638FF56C0C53"), key_failure("1EB2638FF56C0C53")]);
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, store) = run_build(
            &fakes,
            &root,
            &events,
            &request(&root.path().join("foo"), Some("https://x/foo.git")),
        );

        assert_eq!(outcome, InstallOutcome::Failure);
        assert_eq!(fakes.builder.build_count(), 2);
        assert_eq!(fakes.key_trust.imported(), vec!["1EB2638FF56C0C53"]);
        assert!(fakes.package_manager.commits().is_empty());
        assert_eq!(store.lookup("foo").describe(), "source not tracked");
    }

    #[test]
    fn test_missing_key_import_then_success() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        fakes.builder.queue([key_failure("ABCDEF12"), built_ok()]);
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, _) = run_build(
            &fakes,
            &root,
            &events,
            &request(&root.path().join("foo"), Some("https://x/foo.git")),
        );

        assert_eq!(outcome, InstallOutcome::Success);
        assert_eq!(fakes.builder.build_count(), 2);
    }

    #[test]
    fn test_key_budget_spans_the_run() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        fakes
            .builder
            .queue([key_failure("ABCDEF12"), built_ok(), key_failure("FEDCBA98")]);
        let tools = fakes.toolset();
        let store = ProvenanceStore::new(root.path().join("sources.json"));
        let events: EventSinkHandle = Arc::new(CollectorSink::default());
        let budget = Mutex::new(KeyImportBudget::default());
        let driver = BuildDriver::new(&tools, &store, &events, root.path(), &budget);

        let first = driver.run(1, &request(&root.path().join("foo"), Some("https://x/foo.git")));
        let mut second_request = request(&root.path().join("bar"), Some("https://x/bar.git"));
        second_request.name = "bar".into();
        let second = driver.run(2, &second_request);

        assert_eq!(first, InstallOutcome::Success);
        assert_eq!(second, InstallOutcome::Failure);
        assert_eq!(fakes.builder.build_count(), 3);
        assert_eq!(fakes.key_trust.imported(), vec!["ABCDEF12"]);
    }

    #[test]
    fn test_declined_commit_does_not_record() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        fakes.package_manager.set_commit_code(Some(1));
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, store) = run_build(
            &fakes,
            &root,
            &events,
            &request(&root.path().join("foo"), Some("https://x/foo.git")),
        );

        assert_eq!(outcome, InstallOutcome::Declined);
        assert_eq!(store.lookup("foo").describe(), "source not tracked");
    }

    #[test]
    fn test_clone_failure_is_failure() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        fakes.vcs.fail_clones();
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, _) = run_build(
            &fakes,
            &root,
            &events,
            &request(&root.path().join("foo"), Some("https://x/foo.git")),
        );
        assert_eq!(outcome, InstallOutcome::Failure);
        assert_eq!(fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_in_place_recipe_without_pkgbuild_fails() {
        let root = tempdir().unwrap();
        let fakes = FakeTools::new();
        let events: EventSinkHandle = Arc::new(CollectorSink::default());

        let (outcome, _) =
            run_build(&fakes, &root, &events, &request(&root.path().join("foo"), None));
        assert_eq!(outcome, InstallOutcome::Failure);
        assert_eq!(fakes.builder.build_count(), 0);
    }
}
