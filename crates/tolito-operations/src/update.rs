//! Update checks across sources and reinstall of the chosen versions.

use std::cmp::Ordering;

use tolito_config::source::SourceKind;
use tolito_core::{
    outcome::InstallOutcome, provenance::Provenance, srcinfo::version_from_srcinfo,
    tools::VersionCompare,
};
use tolito_events::{OperationId, TolitoEvent, UpdateCheckStatus};
use tracing::{debug, info, warn};

use crate::{
    context::OperationContext,
    curated::checkout_recipe,
    install::{finish_operation, install_from_source},
    progress::next_op_id,
    prompt::confirm,
    types::{InstallReport, UpdateCandidate},
};

pub const UPDATE_PROMPT: &str = "Proceed with updates? [Y/n]";

/// Finds tracked packages with a newer version in one of the sources their rule allows.
///
/// With `only`, just that package is checked.
pub fn check_updates(ctx: &OperationContext, only: Option<&str>) -> Vec<UpdateCandidate> {
    let tracked: Vec<(String, Provenance)> = match only {
        Some(name) => vec![(name.to_string(), ctx.provenance().lookup(name))],
        None => match ctx.provenance().entries() {
            Ok(entries) => entries
                .into_keys()
                .map(|name| {
                    let provenance = ctx.provenance().lookup(&name);
                    (name, provenance)
                })
                .collect(),
            Err(err) => {
                warn!("{err}");
                return Vec::new();
            }
        },
    };

    let op_id = next_op_id();
    tracked
        .into_iter()
        .filter_map(|(name, provenance)| check_package(ctx, op_id, &name, &provenance))
        .collect()
}

fn check_package(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    provenance: &Provenance,
) -> Option<UpdateCandidate> {
    let skip = |reason: String| {
        debug!("skipping {name}: {reason}");
        ctx.emit(TolitoEvent::UpdateCheck {
            pkg_name: name.to_string(),
            status: UpdateCheckStatus::Skipped { reason },
        });
        None
    };

    let Some(installed_from) = provenance.source() else {
        return skip(provenance.describe().to_string());
    };
    let Some(current) = ctx.tools().package_manager.installed_version(name) else {
        return skip("not installed".into());
    };
    let Some(rule) = ctx.config().update_rule(&installed_from) else {
        return skip(format!("no update rule for {installed_from}"));
    };

    let found: Vec<(SourceKind, String)> = rule
        .candidates()
        .into_iter()
        .filter_map(|source| {
            let version = probe_version(ctx, op_id, name, &source)?;
            debug!("{name}: {source} has {version}");
            Some((source, version))
        })
        .collect();

    let compare = ctx.tools().version_compare.as_ref();
    match select_best(compare, &found) {
        Some((source, best)) if compare.compare(best, &current) == Ordering::Greater => {
            ctx.emit(TolitoEvent::UpdateCheck {
                pkg_name: name.to_string(),
                status: UpdateCheckStatus::Available {
                    current_version: current.clone(),
                    new_version: best.clone(),
                    source: source.to_string(),
                },
            });
            Some(UpdateCandidate {
                name: name.to_string(),
                current_version: current,
                new_version: best.clone(),
                source: source.clone(),
                installed_from,
            })
        }
        _ => {
            ctx.emit(TolitoEvent::UpdateCheck {
                pkg_name: name.to_string(),
                status: UpdateCheckStatus::UpToDate { version: current },
            });
            None
        }
    }
}

/// Latest version of `name` offered by `source`, if it has the package at all.
pub fn probe_version(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    source: &SourceKind,
) -> Option<String> {
    match source {
        SourceKind::Curated => {
            let recipe = checkout_recipe(ctx, op_id, name)?;
            let srcinfo = ctx.tools().builder.print_srcinfo(&recipe)?;
            version_from_srcinfo(&srcinfo)
        }
        SourceKind::Aur => ctx.aur().version(name),
        SourceKind::Repo(repo_name) => {
            let repo = ctx.config().get_repository(repo_name)?;
            let db = ctx.repos().get_database(repo, true);
            db.get(name).map(|info| info.version.clone())
        }
        SourceKind::DirectUrl => None,
    }
}

/// Strictly highest version; on ties the earlier entry is kept.
pub fn select_best<'a>(
    compare: &dyn VersionCompare,
    found: &'a [(SourceKind, String)],
) -> Option<(&'a SourceKind, &'a String)> {
    let mut best: Option<(&SourceKind, &String)> = None;
    for (source, version) in found {
        match best {
            Some((_, current)) if compare.compare(version, current) != Ordering::Greater => {}
            _ => best = Some((source, version)),
        }
    }
    best
}

/// Asks once, then reinstalls every candidate from its chosen source.
///
/// Switching away from the recorded source is confirmed per package when
/// `ask_before_switching_sources` is set.
pub fn apply_updates(ctx: &OperationContext, candidates: &[UpdateCandidate]) -> InstallReport {
    let mut report = InstallReport::default();
    if candidates.is_empty() {
        info!("Everything is up to date");
        return report;
    }

    if !confirm(ctx.prompter(), UPDATE_PROMPT) {
        for candidate in candidates {
            report.record(&candidate.name, InstallOutcome::Declined);
        }
        return report;
    }

    for candidate in candidates {
        let op_id = next_op_id();
        let outcome = if candidate.switches_source()
            && ctx.config().ask_before_switching_sources()
            && !confirm(
                ctx.prompter(),
                &format!(
                    "{} was installed from {}. Switch to {} for version {}? [Y/n]",
                    candidate.name,
                    candidate.installed_from,
                    candidate.source,
                    candidate.new_version
                ),
            ) {
            InstallOutcome::Declined
        } else {
            info!("Updating {candidate}");
            install_from_source(ctx, op_id, &candidate.name, &candidate.source)
        };

        finish_operation(ctx, op_id, &candidate.name, outcome);
        report.record(&candidate.name, outcome);
    }

    report
}

#[cfg(test)]
mod tests {
    use tolito_config::source::UpdateRule;
    use tolito_core::testing::LexicalVersionCompare;

    use super::*;
    use crate::testing::{TestEnv, TEST_REPO};

    fn repo() -> SourceKind {
        SourceKind::Repo(TEST_REPO.to_string())
    }

    fn env_with_rules() -> TestEnv {
        TestEnv::with_config(|c| {
            for key in [SourceKind::Curated, SourceKind::Aur] {
                c.update_rules.insert(
                    key,
                    UpdateRule::new(SourceKind::Curated, SourceKind::Aur, repo()),
                );
            }
        })
    }

    fn srcinfo(pkgver: &str) -> String {
        format!("pkgbase = foo\n\tpkgver = {pkgver}\n\tpkgrel = 1\n\npkgname = foo\n")
    }

    #[test]
    fn test_select_best_ties_keep_earlier() {
        let found = vec![
            (SourceKind::Curated, "1.0-1".to_string()),
            (SourceKind::Aur, "1.0-1".to_string()),
            (repo(), "0.9-1".to_string()),
        ];
        let (source, version) = select_best(&LexicalVersionCompare, &found).unwrap();
        assert_eq!(source, &SourceKind::Curated);
        assert_eq!(version, "1.0-1");

        assert!(select_best(&LexicalVersionCompare, &[]).is_none());
    }

    #[test]
    fn test_select_best_strictly_higher_wins() {
        let found = vec![
            (SourceKind::Curated, "1.0-1".to_string()),
            (SourceKind::Aur, "1.2-1".to_string()),
        ];
        let (source, _) = select_best(&LexicalVersionCompare, &found).unwrap();
        assert_eq!(source, &SourceKind::Aur);
    }

    #[test]
    fn test_aur_package_newer_in_curated() {
        let env = env_with_rules();
        env.ctx.provenance().record("foo", &SourceKind::Aur).unwrap();
        env.fakes.package_manager.install("foo", "1.0-1");
        env.fakes.vcs.add_recipe("foo");
        env.fakes.builder.set_srcinfo("foo", &srcinfo("1.2"));
        env.aur.publish("foo", "1.1-1");

        let candidates = check_updates(&env.ctx, None);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].to_string(), "foo: 1.0-1 -> 1.2-1 (from CURATED)");
        assert!(candidates[0].switches_source());
        // curated is probed before the AUR
        assert_eq!(env.fakes.vcs.sparse_sets(), vec!["foo"]);
        assert_eq!(env.aur.lookups(), vec!["foo"]);
    }

    #[test]
    fn test_up_to_date_and_untracked() {
        let env = env_with_rules();
        env.ctx.provenance().record("foo", &SourceKind::Aur).unwrap();
        env.fakes.package_manager.install("foo", "1.1-1");
        env.aur.publish("foo", "1.1-1");

        assert!(check_updates(&env.ctx, None).is_empty());
        assert!(check_updates(&env.ctx, Some("untracked")).is_empty());

        let statuses: Vec<_> = env
            .events()
            .into_iter()
            .filter_map(|e| match e {
                TolitoEvent::UpdateCheck { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                UpdateCheckStatus::UpToDate {
                    version: "1.1-1".into()
                },
                UpdateCheckStatus::Skipped {
                    reason: "source not tracked".into()
                },
            ]
        );
    }

    #[test]
    fn test_gated_sources_are_not_probed() {
        let env = TestEnv::with_config(|c| {
            let mut rule = UpdateRule::new(SourceKind::Curated, SourceKind::Aur, repo());
            rule.get_from_curated = false;
            rule.get_from_chaotic = false;
            c.update_rules.insert(SourceKind::Aur, rule);
        });
        env.ctx.provenance().record("foo", &SourceKind::Aur).unwrap();
        env.fakes.package_manager.install("foo", "1.0-1");
        env.aur.publish("foo", "1.1-1");

        let candidates = check_updates(&env.ctx, Some("foo"));

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, SourceKind::Aur);
        assert!(env.fakes.vcs.sparse_sets().is_empty());
        assert!(env.fetcher.db_requests().is_empty());
    }

    #[test]
    fn test_repo_version_probe() {
        let env = env_with_rules();
        env.repo_serves_db(&[("foo", "2.0-1")]);

        assert_eq!(
            probe_version(&env.ctx, 1, "foo", &repo()).as_deref(),
            Some("2.0-1")
        );
        assert_eq!(probe_version(&env.ctx, 1, "foo", &SourceKind::DirectUrl), None);
    }

    fn candidate(source: SourceKind) -> UpdateCandidate {
        UpdateCandidate {
            name: "foo".into(),
            current_version: "1.0-1".into(),
            new_version: "1.1-1".into(),
            source,
            installed_from: SourceKind::Aur,
        }
    }

    #[test]
    fn test_apply_updates_declined_up_front() {
        let env = env_with_rules();
        env.prompter.answer("n");

        let report = apply_updates(&env.ctx, &[candidate(SourceKind::Aur)]);

        assert_eq!(report.declined, vec!["foo"]);
        assert_eq!(env.prompter.questions(), vec![UPDATE_PROMPT]);
        assert!(env.fakes.vcs.clones().is_empty());
    }

    #[test]
    fn test_apply_updates_reinstalls_same_source() {
        let env = env_with_rules();
        env.fakes.package_manager.install("foo", "1.0-1");

        let report = apply_updates(&env.ctx, &[candidate(SourceKind::Aur)]);

        assert_eq!(report.succeeded, vec!["foo"]);
        assert_eq!(env.prompter.questions().len(), 1);
        assert_eq!(env.fakes.vcs.clones(), vec!["https://aur.archlinux.org/foo.git"]);
    }

    #[test]
    fn test_apply_updates_confirms_source_switch() {
        let env = env_with_rules();
        env.fakes.vcs.add_recipe("foo");
        env.prompter.answer("y");
        env.prompter.answer("n");

        let report = apply_updates(&env.ctx, &[candidate(SourceKind::Curated)]);

        assert_eq!(report.declined, vec!["foo"]);
        assert_eq!(env.prompter.questions().len(), 2);
        assert!(env.prompter.questions()[1].contains("Switch to CURATED"));
        assert_eq!(env.fakes.builder.build_count(), 0);
    }

    #[test]
    fn test_apply_updates_switch_without_asking() {
        let env = TestEnv::with_config(|c| c.ask_before_switching_sources = Some(false));
        env.fakes.vcs.add_recipe("foo");

        let report = apply_updates(&env.ctx, &[candidate(SourceKind::Curated)]);

        assert_eq!(report.succeeded, vec!["foo"]);
        assert_eq!(env.prompter.questions(), vec![UPDATE_PROMPT]);
        assert_eq!(env.ctx.provenance().lookup("foo").describe(), "CURATED");
    }
}
