use nu_ansi_term::Color::{self, Cyan, Green, Red, Yellow};
use tabled::{
    builder::Builder,
    settings::{themes::BorderCorrection, Panel, Style},
};
use tolito_core::CoreResult;
use tolito_operations::{install, InstallReport, OperationContext};
use tracing::{error, info};

use crate::utils::{Colored, Icons};

/// Installs `packages` and prints a summary. Returns whether any of them failed.
pub fn install_packages(
    ctx: &OperationContext,
    packages: &[String],
    repo_only: bool,
) -> CoreResult<bool> {
    let report = install::install_packages(ctx, packages, repo_only)?;
    display_install_report(&report, "Install Summary");
    Ok(report.has_failures())
}

fn count_row(builder: &mut Builder, icon: &str, label: &str, names: &[String], color: Color) {
    if names.is_empty() {
        return;
    }
    builder.push_record([
        format!("{icon} {label}"),
        format!("{}", Colored(color, names.len())),
        names.join(", "),
    ]);
}

pub fn display_install_report(report: &InstallReport, title: &str) {
    for name in &report.failed {
        error!("{name} could not be installed");
    }

    if report.total() == 0 {
        return;
    }

    if report.total() == 1 {
        let (label, color) = if !report.succeeded.is_empty() {
            ("installed", Green)
        } else if !report.failed.is_empty() {
            ("failed", Red)
        } else if !report.declined.is_empty() {
            ("declined", Yellow)
        } else if !report.already_installed.is_empty() {
            ("already installed", Cyan)
        } else {
            ("not found", Yellow)
        };
        info!(":: {}", Colored(color, label));
        return;
    }

    let mut builder = Builder::new();
    count_row(&mut builder, Icons::CHECK, "Installed", &report.succeeded, Green);
    count_row(
        &mut builder,
        Icons::SKIPPED,
        "Already installed",
        &report.already_installed,
        Cyan,
    );
    count_row(&mut builder, Icons::DECLINED, "Declined", &report.declined, Yellow);
    count_row(&mut builder, Icons::WARNING, "Not found", &report.not_found, Yellow);
    count_row(&mut builder, Icons::CROSS, "Failed", &report.failed, Red);

    let table = builder
        .build()
        .with(Panel::header(title))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .to_string();

    info!("\n{table}");
}
