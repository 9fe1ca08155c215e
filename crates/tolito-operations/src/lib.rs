pub mod aur;
pub mod context;
pub mod progress;
pub mod prompt;
pub mod types;

pub mod clean;
pub mod curated;
pub mod install;
pub mod query;
pub mod remove;
pub mod repo;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ContextParts, OperationContext};
pub use prompt::Prompter;
pub use types::*;
