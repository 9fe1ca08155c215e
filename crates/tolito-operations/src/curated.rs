//! Sparse checkout of the curated recipe repository.

use std::path::PathBuf;

use tolito_core::constants::PKGBUILD;
use tolito_events::{BuildStage, OperationId, TolitoEvent};
use tracing::{debug, warn};

use crate::context::OperationContext;

/// Narrows the curated checkout to `name` and returns its recipe directory when the
/// curated repository has a `PKGBUILD` for it.
///
/// The repository is cloned once (shallow, blobless, sparse) under the build path.
pub fn checkout_recipe(
    ctx: &OperationContext,
    op_id: OperationId,
    name: &str,
) -> Option<PathBuf> {
    let checkout = ctx.curated_checkout();
    let vcs = &ctx.tools().vcs;

    ctx.emit(TolitoEvent::Building {
        op_id,
        pkg_name: name.to_string(),
        stage: BuildStage::SparseCheckout,
    });

    if !checkout.exists() {
        debug!("cloning curated recipes into {}", checkout.display());
        if !vcs.clone_sparse(ctx.config().curated_url(), &checkout) {
            warn!("Could not clone {}", ctx.config().curated_url());
            return None;
        }
    }

    if !vcs.is_sparse_initialized(&checkout) && !vcs.sparse_init(&checkout) {
        warn!("Could not initialize sparse checkout in {}", checkout.display());
    }

    // stale untracked files make sparse-checkout refuse to switch
    if !vcs.clean(&checkout) {
        debug!("git clean in {} failed", checkout.display());
    }
    if !vcs.sparse_set(&checkout, name) {
        debug!("sparse-checkout set {name} failed");
    }

    let recipe = checkout.join(name);
    recipe.join(PKGBUILD).is_file().then_some(recipe)
}
