//! In-memory implementations of the tool seams, for tests.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet, VecDeque},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use tolito_registry::artifact::ZST_MAGIC_BYTES;

use crate::{
    constants::PKGBUILD,
    tools::{
        lexical_compare, BuildOutput, Extractor, KeyTrust, PackageBuilder, PackageManager,
        Toolset, Vcs, VersionCompare,
    },
};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

pub fn built_ok() -> BuildOutput {
    BuildOutput {
        success: true,
        code: Some(0),
        output: "==> Finished making: foo".into(),
    }
}

pub fn plain_failure() -> BuildOutput {
    BuildOutput {
        success: false,
        code: Some(4),
        output: "==> ERROR: A failure occurred in build().".into(),
    }
}

pub fn key_failure(key_id: &str) -> BuildOutput {
    BuildOutput {
        success: false,
        code: Some(1),
        output: format!(
            "==> Verifying source file signatures with gpg...\n    foo.tar.gz ... FAILED (unknown public key {key_id})\n"
        ),
    }
}

#[derive(Default)]
struct VcsState {
    unavailable: bool,
    fail_clones: bool,
    fail_cleans: bool,
    cleans: usize,
    recipes: HashSet<String>,
    remotes: HashSet<String>,
    clones: Vec<String>,
    sparse_clones: usize,
    sparse_initialized: bool,
    sparse_sets: Vec<String>,
    remote_checks: Vec<String>,
}

/// Git stand-in. Clones create a directory with a `PKGBUILD`; the curated checkout
/// materializes recipes registered with [`FakeVcs::add_recipe`].
#[derive(Default)]
pub struct FakeVcs(Mutex<VcsState>);

impl FakeVcs {
    pub fn add_recipe(&self, name: &str) {
        guard(&self.0).recipes.insert(name.to_string());
    }

    pub fn add_remote(&self, url: &str) {
        guard(&self.0).remotes.insert(url.to_string());
    }

    pub fn fail_clones(&self) {
        guard(&self.0).fail_clones = true;
    }

    pub fn fail_cleans(&self) {
        guard(&self.0).fail_cleans = true;
    }

    pub fn clean_count(&self) -> usize {
        guard(&self.0).cleans
    }

    pub fn set_unavailable(&self) {
        guard(&self.0).unavailable = true;
    }

    pub fn clones(&self) -> Vec<String> {
        guard(&self.0).clones.clone()
    }

    pub fn sparse_clones(&self) -> usize {
        guard(&self.0).sparse_clones
    }

    pub fn sparse_sets(&self) -> Vec<String> {
        guard(&self.0).sparse_sets.clone()
    }

    pub fn remote_checks(&self) -> Vec<String> {
        guard(&self.0).remote_checks.clone()
    }
}

fn write_recipe(dir: &Path) -> bool {
    fs::create_dir_all(dir).is_ok() && fs::write(dir.join(PKGBUILD), "pkgname=fake\n").is_ok()
}

impl Vcs for FakeVcs {
    fn is_available(&self) -> bool {
        !guard(&self.0).unavailable
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> bool {
        let mut state = guard(&self.0);
        state.clones.push(url.to_string());
        !state.fail_clones && write_recipe(dest)
    }

    fn clone_sparse(&self, _url: &str, dest: &Path) -> bool {
        let mut state = guard(&self.0);
        state.sparse_clones += 1;
        fs::create_dir_all(dest).is_ok()
    }

    fn is_sparse_initialized(&self, _repo: &Path) -> bool {
        guard(&self.0).sparse_initialized
    }

    fn sparse_init(&self, _repo: &Path) -> bool {
        guard(&self.0).sparse_initialized = true;
        true
    }

    fn sparse_set(&self, repo: &Path, path: &str) -> bool {
        let mut state = guard(&self.0);
        state.sparse_sets.push(path.to_string());
        if state.recipes.contains(path) {
            write_recipe(&repo.join(path))
        } else {
            true
        }
    }

    fn clean(&self, _repo: &Path) -> bool {
        let mut state = guard(&self.0);
        state.cleans += 1;
        !state.fail_cleans
    }

    fn remote_exists(&self, url: &str) -> bool {
        let mut state = guard(&self.0);
        state.remote_checks.push(url.to_string());
        state.remotes.contains(url)
    }
}

#[derive(Default)]
struct BuilderState {
    unavailable: bool,
    queue: VecDeque<BuildOutput>,
    builds: Vec<PathBuf>,
    srcinfo: HashMap<String, String>,
}

/// makepkg stand-in. Builds succeed unless results are queued; a successful build
/// writes `<dir>-1.0-1-x86_64.pkg.tar.zst` into the build directory.
#[derive(Default)]
pub struct FakeBuilder(Mutex<BuilderState>);

impl FakeBuilder {
    pub fn queue(&self, results: impl IntoIterator<Item = BuildOutput>) {
        guard(&self.0).queue.extend(results);
    }

    pub fn set_unavailable(&self) {
        guard(&self.0).unavailable = true;
    }

    /// `.SRCINFO` returned for recipes in a directory named `dir_name`.
    pub fn set_srcinfo(&self, dir_name: &str, srcinfo: &str) {
        guard(&self.0)
            .srcinfo
            .insert(dir_name.to_string(), srcinfo.to_string());
    }

    pub fn build_count(&self) -> usize {
        guard(&self.0).builds.len()
    }

    pub fn builds(&self) -> Vec<PathBuf> {
        guard(&self.0).builds.clone()
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl PackageBuilder for FakeBuilder {
    fn is_available(&self) -> bool {
        !guard(&self.0).unavailable
    }

    fn build(&self, cwd: &Path) -> BuildOutput {
        let mut state = guard(&self.0);
        state.builds.push(cwd.to_path_buf());
        let result = state.queue.pop_front().unwrap_or_else(built_ok);
        if result.success {
            let artifact = cwd.join(format!("{}-1.0-1-x86_64.pkg.tar.zst", dir_name(cwd)));
            let _ = fs::write(artifact, ZST_MAGIC_BYTES);
        }
        result
    }

    fn print_srcinfo(&self, cwd: &Path) -> Option<String> {
        guard(&self.0).srcinfo.get(&dir_name(cwd)).cloned()
    }
}

struct PackageManagerState {
    installed: HashMap<String, String>,
    commit_code: Option<i32>,
    removal_code: Option<i32>,
    commits: Vec<PathBuf>,
    removals: Vec<String>,
}

/// pacman stand-in over an in-memory installed set.
pub struct FakePackageManager(Mutex<PackageManagerState>);

impl Default for FakePackageManager {
    fn default() -> Self {
        Self(Mutex::new(PackageManagerState {
            installed: HashMap::new(),
            commit_code: Some(0),
            removal_code: Some(0),
            commits: Vec::new(),
            removals: Vec::new(),
        }))
    }
}

impl FakePackageManager {
    pub fn install(&self, name: &str, version: &str) {
        guard(&self.0)
            .installed
            .insert(name.to_string(), version.to_string());
    }

    pub fn set_commit_code(&self, code: Option<i32>) {
        guard(&self.0).commit_code = code;
    }

    pub fn set_removal_code(&self, code: Option<i32>) {
        guard(&self.0).removal_code = code;
    }

    pub fn commits(&self) -> Vec<PathBuf> {
        guard(&self.0).commits.clone()
    }

    pub fn removals(&self) -> Vec<String> {
        guard(&self.0).removals.clone()
    }
}

impl PackageManager for FakePackageManager {
    fn query(&self, name: &str) -> bool {
        guard(&self.0).installed.contains_key(name)
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        guard(&self.0).installed.get(name).cloned()
    }

    fn commit_install(&self, artifact: &Path) -> Option<i32> {
        let mut state = guard(&self.0);
        state.commits.push(artifact.to_path_buf());
        state.commit_code
    }

    fn commit_removal(&self, name: &str) -> Option<i32> {
        let mut state = guard(&self.0);
        state.removals.push(name.to_string());
        if state.removal_code == Some(0) {
            state.installed.remove(name);
        }
        state.removal_code
    }

    fn info(&self, name: &str) -> Option<String> {
        guard(&self.0)
            .installed
            .get(name)
            .map(|version| format!("Name            : {name}\nVersion         : {version}\n"))
    }
}

#[derive(Default)]
pub struct FakeKeyTrust {
    fail: Mutex<bool>,
    imported: Mutex<Vec<String>>,
}

impl FakeKeyTrust {
    pub fn fail_imports(&self) {
        *guard(&self.fail) = true;
    }

    pub fn imported(&self) -> Vec<String> {
        guard(&self.imported).clone()
    }
}

impl KeyTrust for FakeKeyTrust {
    fn import_and_sign(&self, key_id: &str) -> bool {
        guard(&self.imported).push(key_id.to_string());
        !*guard(&self.fail)
    }
}

/// Deterministic version ordering: plain string comparison.
pub struct LexicalVersionCompare;

impl VersionCompare for LexicalVersionCompare {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        lexical_compare(a, b)
    }
}

/// Extractor that never succeeds; repository tests inject their own.
pub struct NoExtractor;

impl Extractor for NoExtractor {
    fn extract(&self, _archive: &Path, _dest: &Path) -> bool {
        false
    }
}

/// One fake of every tool, kept accessible for assertions.
pub struct FakeTools {
    pub vcs: Arc<FakeVcs>,
    pub builder: Arc<FakeBuilder>,
    pub package_manager: Arc<FakePackageManager>,
    pub key_trust: Arc<FakeKeyTrust>,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTools {
    pub fn new() -> Self {
        Self {
            vcs: Arc::new(FakeVcs::default()),
            builder: Arc::new(FakeBuilder::default()),
            package_manager: Arc::new(FakePackageManager::default()),
            key_trust: Arc::new(FakeKeyTrust::default()),
        }
    }

    pub fn toolset(&self) -> Toolset {
        Toolset {
            vcs: self.vcs.clone(),
            builder: self.builder.clone(),
            package_manager: self.package_manager.clone(),
            key_trust: self.key_trust.clone(),
            version_compare: Arc::new(LexicalVersionCompare),
            extractor: Arc::new(NoExtractor),
        }
    }
}
