use tolito_core::CoreResult;
use tolito_utils::fs::clear_dir_contents;
use tracing::{info, warn};

use crate::{context::OperationContext, types::CleanReport};

/// Empties the build directory and the downloaded package cache.
///
/// Busy entries are left in place and reported.
pub fn clean(ctx: &OperationContext) -> CoreResult<CleanReport> {
    let build_path = ctx.build_path().clone();
    let package_cache = ctx.package_cache();

    let mut skipped = clear_dir_contents(&build_path)?;
    skipped.extend(clear_dir_contents(&package_cache)?);

    for path in &skipped {
        warn!("{} is busy, leaving it in place", path.display());
    }
    info!(
        "Cleared {} and {}",
        build_path.display(),
        package_cache.display()
    );

    Ok(CleanReport {
        skipped,
        build_path,
        package_cache,
    })
}
