//! Source resolution and installation.
//!
//! A bare package name is tried against the curated recipes, then the AUR, and only when
//! the AUR build fails, against the configured binary repositories. A URL is cloned and
//! built directly.

use std::path::Path;

use tolito_config::source::SourceKind;
use tolito_core::{
    build::{find_built_artifact, BuildDriver, BuildRequest},
    constants::ARTIFACT_GLOB,
    error::CoreError,
    outcome::InstallOutcome,
    spec::{is_valid_name, PackageSpec},
    CoreResult,
};
use tolito_events::{OperationId, TolitoEvent};
use tolito_utils::fs::{find_files_matching, safe_remove};
use tracing::{debug, error, info, warn};

use crate::{
    context::OperationContext,
    curated::checkout_recipe,
    progress::next_op_id,
    prompt::confirm,
    repo::install_from_repo,
    types::InstallReport,
};

const BUILT_HINT: &str = " (1 version of this pkg is already built locally)";

/// Installs every spec, isolating failures, and returns the bucketed outcomes.
///
/// With `repo_only` the specs are looked up in the binary repositories alone. Missing
/// `git` or `makepkg` aborts the whole batch before anything is touched.
pub fn install_packages(
    ctx: &OperationContext,
    specs: &[String],
    repo_only: bool,
) -> CoreResult<InstallReport> {
    if !repo_only {
        preflight(ctx)?;
    }

    let total = specs.len() as u32;
    let mut report = InstallReport::default();

    for (index, raw) in specs.iter().enumerate() {
        let spec = PackageSpec::parse(raw);
        let op_id = next_op_id();

        let outcome = if repo_only {
            install_repo_only(ctx, op_id, &spec.name())
        } else {
            resolve_and_install(ctx, op_id, &spec)
        };

        finish_operation(ctx, op_id, &spec.name(), outcome);
        report.record(spec.name(), outcome);
        ctx.emit(TolitoEvent::BatchProgress {
            completed: index as u32 + 1,
            total,
            failed: report.failed.len() as u32,
        });
    }

    Ok(report)
}

pub(crate) fn finish_operation(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    outcome: InstallOutcome,
) {
    let event = if outcome.is_failure() {
        TolitoEvent::OperationFailed {
            op_id,
            pkg_name: name.to_string(),
            error: format!("{name}: {outcome}"),
        }
    } else {
        TolitoEvent::OperationComplete {
            op_id,
            pkg_name: name.to_string(),
        }
    };
    ctx.emit(event);
}

/// Checks that the tools needed to build from source are installed.
pub fn preflight(ctx: &OperationContext) -> CoreResult<()> {
    let tools = ctx.tools();
    if !tools.vcs.is_available() {
        return Err(CoreError::PreflightMissingTool("git".into()));
    }
    if !tools.builder.is_available() {
        return Err(CoreError::PreflightMissingTool("makepkg".into()));
    }
    Ok(())
}

/// Runs the full resolution for one spec.
pub fn resolve_and_install(
    ctx: &OperationContext,
    op_id: OperationId,
    spec: &PackageSpec,
) -> InstallOutcome {
    let name = match spec.checked_name() {
        Ok(name) => name,
        Err(err) => {
            error!("{err}");
            return InstallOutcome::Failure;
        }
    };

    if let Some(outcome) = already_installed(ctx, &name) {
        return outcome;
    }

    if let Err(err) = preflight(ctx) {
        error!("{err}");
        return InstallOutcome::Failure;
    }

    match spec {
        PackageSpec::Url(url) => {
            select(ctx, &name, &SourceKind::DirectUrl);
            build(
                ctx,
                op_id,
                BuildRequest {
                    source: SourceKind::DirectUrl,
                    dir: ctx.build_path().join(&name),
                    clone_url: Some(url.clone()),
                    name,
                },
            )
        }
        PackageSpec::Name(name) => resolve_name(ctx, op_id, name),
    }
}

fn resolve_name(ctx: &OperationContext, op_id: OperationId, name: &str) -> InstallOutcome {
    let aur_url = ctx.aur_clone_url(name);

    if let Some(recipe) = checkout_recipe(ctx, op_id, name) {
        let prefer_aur = ctx.config().ask_before_fallback()
            && ctx.tools().vcs.remote_exists(&aur_url)
            && ask_between_sources(ctx, name, &recipe);

        if !prefer_aur {
            select(ctx, name, &SourceKind::Curated);
            return build(
                ctx,
                op_id,
                BuildRequest {
                    name: name.to_string(),
                    source: SourceKind::Curated,
                    dir: recipe,
                    clone_url: None,
                },
            );
        }
    } else {
        if !ctx.tools().vcs.remote_exists(&aur_url) {
            info!("{name} is not in the curated repository or the AUR");
            return binary_fallback(ctx, op_id, name);
        }

        if ctx.config().ask_before_fallback() {
            let question = format!(
                "{name} is not in the curated repository. AUR packages are user-produced \
                 and may be unstable or unsafe. Build it from the AUR? [Y/n]"
            );
            if !confirm(ctx.prompter(), &question) {
                info!("Skipping {name}");
                return InstallOutcome::Declined;
            }
        } else if ctx.config().warn_on_fallback() {
            warn!("{name} is not in the curated repository, falling back to the AUR");
        }
    }

    select(ctx, name, &SourceKind::Aur);
    let outcome = build(
        ctx,
        op_id,
        BuildRequest {
            name: name.to_string(),
            source: SourceKind::Aur,
            dir: ctx.build_path().join(name),
            clone_url: Some(aur_url),
        },
    );

    if outcome.is_failure() {
        warn!("Building {name} from the AUR failed, trying binary repositories");
        return binary_fallback(ctx, op_id, name);
    }
    outcome
}

/// Asks whether to take the AUR build over the curated one. Defaults to the AUR.
fn ask_between_sources(ctx: &OperationContext, name: &str, recipe: &Path) -> bool {
    let hint = |dir: &Path| {
        if find_built_artifact(dir, name).is_some() {
            BUILT_HINT
        } else {
            ""
        }
    };

    let question = format!(
        "{name} is available from the curated repository{} and the AUR{}. \
         Install the AUR version? [Y/n]",
        hint(recipe),
        hint(&ctx.build_path().join(name)),
    );
    confirm(ctx.prompter(), &question)
}

fn binary_fallback(ctx: &OperationContext, op_id: OperationId, name: &str) -> InstallOutcome {
    match install_from_repos(ctx, op_id, name) {
        InstallOutcome::NotFound => {
            error!("{}", CoreError::SourceNotFound(name.to_string()));
            InstallOutcome::Failure
        }
        outcome => outcome,
    }
}

/// Installs `name` from the binary repositories only.
pub fn install_repo_only(ctx: &OperationContext, op_id: OperationId, name: &str) -> InstallOutcome {
    if !is_valid_name(name) {
        error!("{}", CoreError::InvalidPackageName(name.to_string()));
        return InstallOutcome::Failure;
    }
    if let Some(outcome) = already_installed(ctx, name) {
        return outcome;
    }

    let outcome = install_from_repos(ctx, op_id, name);
    if outcome == InstallOutcome::NotFound {
        warn!("{name} was not found in any configured repository");
    }
    outcome
}

/// Tries each repository whose database lists `name`, in configuration order.
///
/// Stops at the first outcome other than `Failure`. `NotFound` when no repository lists it.
pub fn install_from_repos(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
) -> InstallOutcome {
    let mut outcome = InstallOutcome::NotFound;

    for (repo_name, repo) in &ctx.config().repositories {
        let db = ctx.repos().get_database(repo, true);
        if !db.contains_key(name) {
            debug!("{name} is not in {repo_name}");
            continue;
        }

        select(ctx, name, &SourceKind::Repo(repo_name.clone()));
        outcome = install_from_repo(ctx, op_id, name, repo_name);
        if !outcome.is_failure() {
            break;
        }
    }

    outcome
}

/// Reinstalls `name` from `source`, as chosen by an update check.
///
/// Artifacts left by earlier builds are discarded so the build runs against the new recipe.
pub fn install_from_source(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    source: &SourceKind,
) -> InstallOutcome {
    if !is_valid_name(name) {
        error!("{}", CoreError::InvalidPackageName(name.to_string()));
        return InstallOutcome::Failure;
    }
    select(ctx, name, source);

    match source {
        SourceKind::Curated => {
            let Some(recipe) = checkout_recipe(ctx, op_id, name) else {
                error!("{}", CoreError::SourceNotFound(name.to_string()));
                return InstallOutcome::Failure;
            };
            discard_built_artifacts(&recipe);
            build(
                ctx,
                op_id,
                BuildRequest {
                    name: name.to_string(),
                    source: SourceKind::Curated,
                    dir: recipe,
                    clone_url: None,
                },
            )
        }
        SourceKind::Aur => {
            let dir = ctx.build_path().join(name);
            discard_built_artifacts(&dir);
            build(
                ctx,
                op_id,
                BuildRequest {
                    name: name.to_string(),
                    source: SourceKind::Aur,
                    dir,
                    clone_url: Some(ctx.aur_clone_url(name)),
                },
            )
        }
        SourceKind::Repo(repo_name) => install_from_repo(ctx, op_id, name, repo_name),
        SourceKind::DirectUrl => {
            error!("{name} was installed from a URL and cannot be updated automatically");
            InstallOutcome::Failure
        }
    }
}

fn already_installed(ctx: &OperationContext, name: &str) -> Option<InstallOutcome> {
    if !ctx.tools().package_manager.query(name) {
        return None;
    }

    let provenance = ctx.provenance().lookup(name);
    info!("{name} is already installed (source: {})", provenance.describe());
    Some(InstallOutcome::AlreadyInstalled)
}

fn build(ctx: &OperationContext, op_id: OperationId, request: BuildRequest) -> InstallOutcome {
    BuildDriver::new(
        ctx.tools(),
        ctx.provenance(),
        ctx.events(),
        ctx.build_path(),
        ctx.key_budget(),
    )
    .run(op_id, &request)
}

fn select(ctx: &OperationContext, name: &str, source: &SourceKind) {
    debug!("{name}: using {source}");
    ctx.emit(TolitoEvent::SourceSelected {
        pkg_name: name.to_string(),
        source: source.to_string(),
    });
}

fn discard_built_artifacts(dir: &Path) {
    for artifact in find_files_matching(dir, ARTIFACT_GLOB).unwrap_or_default() {
        if let Err(err) = safe_remove(&artifact) {
            warn!("Could not remove {}: {err}", artifact.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tolito_core::testing::{key_failure, plain_failure};
    use tolito_registry::artifact::ZST_MAGIC_BYTES;

    use super::*;
    use crate::testing::{TestEnv, MIRRORS, TEST_REPO};

    const AUR_FOO: &str = "https://aur.archlinux.org/foo.git";

    fn name(spec: &str) -> PackageSpec {
        PackageSpec::parse(spec)
    }

    fn selected(env: &TestEnv) -> Vec<String> {
        env.events()
            .into_iter()
            .filter_map(|event| match event {
                TolitoEvent::SourceSelected { source, .. } => Some(source),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_already_installed_is_reported_with_source() {
        let env = TestEnv::new();
        env.fakes.package_manager.install("foo", "1.0-1");
        env.ctx
            .provenance()
            .record("foo", &SourceKind::Curated)
            .unwrap();

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::AlreadyInstalled
        );
        assert!(env.fakes.vcs.sparse_sets().is_empty());
    }

    #[test]
    fn test_installed_untracked_still_counts() {
        let env = TestEnv::new();
        env.fakes.package_manager.install("foo", "1.0-1");
        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::AlreadyInstalled
        );
    }

    #[test]
    fn test_preflight_failure() {
        let env = TestEnv::new();
        env.fakes.builder.set_unavailable();

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Failure
        );
        assert!(matches!(
            install_packages(&env.ctx, &["foo".into()], false),
            Err(CoreError::PreflightMissingTool(tool)) if tool == "makepkg"
        ));
    }

    #[test]
    fn test_url_never_consults_named_sources() {
        let env = TestEnv::new();

        let outcome = resolve_and_install(&env.ctx, 1, &name("https://example.com/foo.git"));

        assert_eq!(outcome, InstallOutcome::Success);
        assert_eq!(env.fakes.vcs.clones(), vec!["https://example.com/foo.git"]);
        assert!(env.fakes.vcs.sparse_sets().is_empty());
        assert!(env.fakes.vcs.remote_checks().is_empty());
        assert_eq!(env.ctx.provenance().lookup("foo").describe(), "URL");
        assert_eq!(env.fakes.builder.builds(), vec![env.ctx.build_path().join("foo")]);
    }

    #[test]
    fn test_names_escaping_the_build_dir_are_refused() {
        let env = TestEnv::new();
        let outside = env.ctx.build_path().parent().unwrap().to_path_buf();
        fs::write(outside.join("keep.txt"), b"keep").unwrap();
        fs::create_dir_all(outside.join("yay")).unwrap();
        env.fakes.vcs.add_remote("https://aur.archlinux.org/../yay.git");

        for spec in ["https://example.com/..", "https://example.com/.git", "../yay", ".."] {
            assert_eq!(
                resolve_and_install(&env.ctx, 1, &name(spec)),
                InstallOutcome::Failure,
                "{spec}"
            );
        }
        assert_eq!(
            install_repo_only(&env.ctx, 1, "../yay"),
            InstallOutcome::Failure
        );

        assert!(outside.join("keep.txt").exists());
        assert!(outside.join("yay").is_dir());
        assert!(env.ctx.build_path().is_dir());
        assert!(env.fakes.vcs.clones().is_empty());
        assert!(env.fakes.vcs.sparse_sets().is_empty());
        assert_eq!(env.fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_curated_wins_silently_without_prompting() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_recipe("foo");
        env.fakes.vcs.add_remote(AUR_FOO);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Success
        );
        assert!(env.prompter.questions().is_empty());
        assert_eq!(selected(&env), vec!["CURATED"]);
        assert_eq!(env.ctx.provenance().lookup("foo").describe(), "CURATED");
    }

    #[test]
    fn test_dual_source_prompt_defaults_to_aur() {
        let env = TestEnv::new();
        env.fakes.vcs.add_recipe("foo");
        env.fakes.vcs.add_remote(AUR_FOO);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Success
        );
        assert_eq!(env.prompter.questions().len(), 1);
        assert_eq!(env.fakes.vcs.clones(), vec![AUR_FOO]);
        assert_eq!(env.ctx.provenance().lookup("foo").describe(), "AUR");
    }

    #[test]
    fn test_dual_source_prompt_no_picks_curated() {
        let env = TestEnv::new();
        env.fakes.vcs.add_recipe("foo");
        env.fakes.vcs.add_remote(AUR_FOO);
        env.prompter.answer("n");

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Success
        );
        assert!(env.fakes.vcs.clones().is_empty());
        assert_eq!(env.ctx.provenance().lookup("foo").describe(), "CURATED");
    }

    #[test]
    fn test_dual_source_prompt_shows_built_hint() {
        let env = TestEnv::new();
        env.fakes.vcs.add_recipe("foo");
        env.fakes.vcs.add_remote(AUR_FOO);
        let aur_dir = env.ctx.build_path().join("foo");
        fs::create_dir_all(&aur_dir).unwrap();
        fs::write(aur_dir.join("foo-1.0-1-x86_64.pkg.tar.zst"), ZST_MAGIC_BYTES).unwrap();
        env.prompter.answer("y");

        resolve_and_install(&env.ctx, 1, &name("foo"));

        let question = &env.prompter.questions()[0];
        assert!(question.contains(&format!("the AUR{BUILT_HINT}")));
        assert!(!question.contains(&format!("curated repository{BUILT_HINT}")));
        assert_eq!(env.fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_aur_fallback_declined() {
        let env = TestEnv::new();
        env.fakes.vcs.add_remote(AUR_FOO);
        env.prompter.answer("n");

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Declined
        );
        assert!(env.fakes.vcs.clones().is_empty());
    }

    #[test]
    fn test_aur_fallback_without_prompt() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_remote(AUR_FOO);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Success
        );
        assert!(env.prompter.questions().is_empty());
        assert_eq!(selected(&env), vec!["AUR"]);
    }

    #[test]
    fn test_binary_fallback_after_aur_failure() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_remote("https://aur.archlinux.org/bar.git");
        env.fakes.builder.queue([plain_failure()]);
        env.repo_serves_db(&[("bar", "1.0-1")]);
        env.fetcher.serve_package(MIRRORS[0], &ZST_MAGIC_BYTES);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("bar")),
            InstallOutcome::Success
        );
        assert_eq!(selected(&env), vec!["AUR", TEST_REPO]);
        assert_eq!(env.ctx.provenance().lookup("bar").describe(), TEST_REPO);
    }

    #[test]
    fn test_no_binary_fallback_after_decline() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_remote("https://aur.archlinux.org/bar.git");
        env.fakes.package_manager.set_commit_code(Some(1));
        env.repo_serves_db(&[("bar", "1.0-1")]);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("bar")),
            InstallOutcome::Declined
        );
        assert!(env.fetcher.db_requests().is_empty());
    }

    #[test]
    fn test_key_recovery_through_resolver() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_recipe("foo");
        env.fakes.builder.queue([key_failure("ABCDEF0123456789")]);

        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("foo")),
            InstallOutcome::Success
        );
        assert_eq!(env.fakes.key_trust.imported(), vec!["ABCDEF0123456789"]);
        assert_eq!(env.fakes.builder.build_count(), 2);
    }

    #[test]
    fn test_nowhere_to_be_found() {
        let env = TestEnv::new();
        assert_eq!(
            resolve_and_install(&env.ctx, 1, &name("ghost")),
            InstallOutcome::Failure
        );
        assert!(env.prompter.questions().is_empty());
    }

    #[test]
    fn test_repo_only_not_found_is_distinct() {
        let env = TestEnv::new();
        env.repo_serves_db(&[("bar", "1.0-1")]);

        assert_eq!(
            install_repo_only(&env.ctx, 1, "ghost"),
            InstallOutcome::NotFound
        );
        assert!(env.fakes.vcs.sparse_sets().is_empty());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let env = TestEnv::with_config(|c| c.ask_before_fallback = Some(false));
        env.fakes.vcs.add_recipe("good");
        env.fakes.package_manager.install("have", "1.0-1");

        let specs = vec!["ghost".to_string(), "good".into(), "have".into()];
        let report = install_packages(&env.ctx, &specs, false).unwrap();

        assert_eq!(report.failed, vec!["ghost"]);
        assert_eq!(report.succeeded, vec!["good"]);
        assert_eq!(report.already_installed, vec!["have"]);

        let last = env
            .events()
            .into_iter()
            .filter(|e| matches!(e, TolitoEvent::BatchProgress { .. }))
            .last();
        assert!(matches!(
            last,
            Some(TolitoEvent::BatchProgress {
                completed: 3,
                total: 3,
                failed: 1
            })
        ));
    }

    #[test]
    fn test_repo_only_batch_skips_preflight() {
        let env = TestEnv::new();
        env.fakes.vcs.set_unavailable();
        env.repo_serves_db(&[("bar", "1.0-1")]);
        env.fetcher.serve_package(MIRRORS[0], &ZST_MAGIC_BYTES);

        let report = install_packages(&env.ctx, &["bar".into(), "ghost".into()], true).unwrap();
        assert_eq!(report.succeeded, vec!["bar"]);
        assert_eq!(report.not_found, vec!["ghost"]);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_update_reinstall_discards_stale_artifact() {
        let env = TestEnv::new();
        env.fakes.vcs.add_recipe("foo");
        let recipe = checkout_recipe(&env.ctx, 1, "foo").unwrap();
        fs::write(recipe.join("foo-0.9-1-x86_64.pkg.tar.zst"), ZST_MAGIC_BYTES).unwrap();
        env.fakes.package_manager.install("foo", "0.9-1");

        let outcome = install_from_source(&env.ctx, 2, "foo", &SourceKind::Curated);

        assert_eq!(outcome, InstallOutcome::Success);
        assert_eq!(env.fakes.builder.build_count(), 1);
        assert!(!recipe.join("foo-0.9-1-x86_64.pkg.tar.zst").exists());
    }

    #[test]
    fn test_url_source_cannot_be_reinstalled() {
        let env = TestEnv::new();
        assert_eq!(
            install_from_source(&env.ctx, 1, "foo", &SourceKind::DirectUrl),
            InstallOutcome::Failure
        );
    }
}
