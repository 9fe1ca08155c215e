use tolito_operations::{remove, OperationContext};
use tracing::{error, info};

/// Removes `packages`. Returns whether any removal failed.
pub fn remove_packages(ctx: &OperationContext, packages: &[String]) -> bool {
    let report = remove::remove_packages(ctx, packages);

    for name in &report.failed {
        error!("{name} could not be removed");
    }
    if !report.removed.is_empty() {
        info!("Removed {}", report.removed.join(", "));
    }

    report.has_failures()
}
