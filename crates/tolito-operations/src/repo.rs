//! Install of prebuilt packages from binary repositories.

use std::path::Path;

use tolito_config::source::SourceKind;
use tolito_core::{build::commit_artifact, error::CoreError, outcome::InstallOutcome};
use tolito_events::{InstallStage, OperationId, TolitoEvent};
use tolito_registry::artifact::{is_plain_file_name, is_valid_package_archive};
use tolito_utils::fs::{ensure_dir_exists, safe_remove};
use tracing::{error, info, warn};

use crate::{context::OperationContext, progress::create_progress_bridge};

/// Installs `name` from the binary repository `repo_name`.
///
/// A valid archive already in the package cache is reused; otherwise mirrors are tried
/// fastest first until one serves an archive that passes the magic-byte check.
pub fn install_from_repo(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    repo_name: &str,
) -> InstallOutcome {
    let Some(repo) = ctx.config().get_repository(repo_name) else {
        error!("Repository {repo_name} is not configured");
        return InstallOutcome::Failure;
    };

    let db = ctx.repos().get_database(repo, false);
    let Some(info) = db.get(name) else {
        warn!("{name} is not in {repo_name}");
        return InstallOutcome::Failure;
    };

    if !is_plain_file_name(&info.filename) {
        error!(
            "{}",
            CoreError::CorruptArtifact(format!(
                "{repo_name} lists {name} with file name '{}'",
                info.filename
            ))
        );
        return InstallOutcome::Failure;
    }

    let cache_dir = ctx.package_cache();
    if let Err(err) = ensure_dir_exists(&cache_dir) {
        error!("{err}");
        return InstallOutcome::Failure;
    }
    let target = cache_dir.join(&info.filename);

    if is_valid_package_archive(&target) {
        info!("Using cached {}", info.filename);
        ctx.emit(TolitoEvent::Installing {
            op_id,
            pkg_name: name.to_string(),
            stage: InstallStage::CachedArtifact,
        });
    } else {
        let _ = safe_remove(&target);
        let servers = match ctx.repos().ranked_servers(repo) {
            Ok(servers) => servers,
            Err(err) => {
                error!("{err}");
                return InstallOutcome::Failure;
            }
        };

        if !download_first_valid(ctx, op_id, name, &servers, &info.filename, &target) {
            error!("Could not download {} from any mirror of {repo_name}", info.filename);
            return InstallOutcome::Failure;
        }
    }

    commit_artifact(
        ctx.tools(),
        ctx.provenance(),
        ctx.events(),
        op_id,
        name,
        &SourceKind::Repo(repo_name.to_string()),
        &target,
    )
}

fn download_first_valid(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
    servers: &[String],
    filename: &str,
    target: &Path,
) -> bool {
    for server in servers {
        let url = format!("{server}/{filename}");
        info!("Downloading {url}");

        let bridge = create_progress_bridge(ctx.events().clone(), op_id, name.to_string());
        let reason = match ctx
            .repos()
            .fetcher()
            .fetch(&url, target, Some(std::sync::Arc::new(bridge)))
        {
            Ok(_) if is_valid_package_archive(target) => return true,
            Ok(_) => CoreError::CorruptArtifact(url.clone()).to_string(),
            Err(err) => CoreError::NetworkUnavailable(format!("{url} ({err})")).to_string(),
        };

        warn!("{reason}");
        let _ = safe_remove(target);
        ctx.emit(TolitoEvent::DownloadAborted {
            op_id,
            pkg_name: name.to_string(),
            reason,
        });
    }

    false
}
