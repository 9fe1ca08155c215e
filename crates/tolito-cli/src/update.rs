use nu_ansi_term::Color::{Blue, Cyan, Green, Red};
use tolito_core::CoreResult;
use tolito_operations::{update, OperationContext};
use tracing::info;

use crate::{install::display_install_report, utils::Colored};

/// Lists available updates and applies them. Returns whether any update failed.
pub fn update_packages(ctx: &OperationContext, package: Option<&str>) -> CoreResult<bool> {
    let candidates = update::check_updates(ctx, package);

    if candidates.is_empty() {
        info!("No packages to update.");
        return Ok(false);
    }

    for candidate in &candidates {
        info!(
            "{}: {} -> {} (from {})",
            Colored(Blue, &candidate.name),
            Colored(Red, &candidate.current_version),
            Colored(Green, &candidate.new_version),
            Colored(Cyan, &candidate.source),
        );
    }

    let report = update::apply_updates(ctx, &candidates);
    display_install_report(&report, "Update Summary");
    Ok(report.has_failures())
}
