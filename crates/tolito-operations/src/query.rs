use crate::{
    context::OperationContext,
    types::{PackageDetails, QueryResult},
};

/// Installed version and recorded source of each package.
pub fn query_packages(ctx: &OperationContext, names: &[String]) -> Vec<QueryResult> {
    names
        .iter()
        .map(|name| QueryResult {
            name: name.clone(),
            version: ctx.tools().package_manager.installed_version(name),
            provenance: ctx.provenance().lookup(name),
        })
        .collect()
}

/// The package manager's details for an installed package, with its recorded source.
pub fn package_info(ctx: &OperationContext, name: &str) -> Option<PackageDetails> {
    let info = ctx.tools().package_manager.info(name)?;
    Some(PackageDetails {
        name: name.to_string(),
        info,
        provenance: ctx.provenance().lookup(name),
    })
}
