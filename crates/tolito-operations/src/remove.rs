use tolito_core::outcome::InstallOutcome;
use tolito_events::{OperationId, RemoveStage, TolitoEvent};
use tracing::{error, info, warn};

use crate::{context::OperationContext, progress::next_op_id, types::RemoveReport};

/// Removes each installed package with its unneeded dependencies and forgets its source.
pub fn remove_packages(ctx: &OperationContext, names: &[String]) -> RemoveReport {
    let mut report = RemoveReport::default();

    for name in names {
        if !ctx.tools().package_manager.query(name) {
            warn!("{name} is not installed");
            report.not_installed.push(name.clone());
            continue;
        }

        let op_id = next_op_id();
        match remove_package(ctx, op_id, name) {
            InstallOutcome::Success => report.removed.push(name.clone()),
            InstallOutcome::Declined => report.declined.push(name.clone()),
            _ => report.failed.push(name.clone()),
        }
    }

    report
}

fn remove_package(ctx: &OperationContext, op_id: OperationId, name: &str) -> InstallOutcome {
    let stage = |stage| {
        ctx.emit(TolitoEvent::Removing {
            op_id,
            pkg_name: name.to_string(),
            stage,
        })
    };

    stage(RemoveStage::Committing);
    let code = ctx.tools().package_manager.commit_removal(name);
    let outcome = InstallOutcome::from_commit_code(code);
    match outcome {
        InstallOutcome::Success => {}
        InstallOutcome::Declined => {
            info!("Removal of {name} declined");
            return outcome;
        }
        _ => {
            error!("Removing {name} failed (exit code {code:?})");
            return outcome;
        }
    }

    stage(RemoveStage::ForgettingSource);
    match ctx.provenance().remove(name) {
        Ok(true) => {}
        Ok(false) => info!("{name} had no recorded source"),
        Err(err) => warn!("Removed {name} but could not update the source record: {err}"),
    }

    stage(RemoveStage::Complete);
    info!("Removed {name}");
    outcome
}
