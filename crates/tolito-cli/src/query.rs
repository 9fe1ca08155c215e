use nu_ansi_term::Color::{Blue, Cyan, Green};
use tolito_operations::{query, OperationContext};
use tracing::{error, info};

use crate::utils::Colored;

/// Prints the installed version and recorded source of each package.
pub fn query_packages(ctx: &OperationContext, packages: &[String]) {
    for result in query::query_packages(ctx, packages) {
        match result.version {
            Some(version) => {
                info!(
                    "{} {} ({})",
                    Colored(Blue, &result.name),
                    Colored(Green, version),
                    Colored(Cyan, result.provenance.describe())
                );
            }
            None => error!("package '{}' was not found", result.name),
        }
    }
}

/// Prints the package manager's details followed by the recorded source.
pub fn package_info(ctx: &OperationContext, packages: &[String]) {
    for name in packages {
        match query::package_info(ctx, name) {
            Some(details) => {
                info!(
                    "{}\n{:<16}: {}\n",
                    details.info.trim_end(),
                    "Installed From",
                    Colored(Cyan, details.provenance.describe())
                );
            }
            None => error!("package '{name}' was not found"),
        }
    }
}
