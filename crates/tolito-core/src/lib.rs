use error::CoreError;

pub mod build;
pub mod constants;
pub mod error;
pub mod keys;
pub mod outcome;
pub mod provenance;
pub mod spec;
pub mod srcinfo;
pub mod tools;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub type CoreResult<T> = std::result::Result<T, CoreError>;
