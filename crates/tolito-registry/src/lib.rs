//! Binary repository access for tolito.
//!
//! This crate ranks a repository's mirrors by latency, fetches and parses its package
//! database, and memoizes the result for the rest of the run.
//!
//! # Overview
//!
//! - [`mirror`]: latency probing and ranking of mirror servers
//! - [`desc`]: parsing of the `desc` records inside a repository database
//! - [`database`]: the per-run [`RepoDbCache`]
//! - [`artifact`]: magic-byte sanity check for downloaded package archives
//! - [`extract`]: the external archive extractor seam
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tolito_config::config::Config;
//! use tolito_events::NullSink;
//! use tolito_registry::RepoDbCache;
//!
//! let config = Config::default_config();
//! let cache = RepoDbCache::new(&config, Arc::new(NullSink)).unwrap();
//! if let Some(repo) = config.get_repository("chaotic-aur") {
//!     let db = cache.get_database(repo, false);
//!     println!("{} packages", db.len());
//! }
//! ```

pub mod artifact;
pub mod database;
pub mod desc;
pub mod error;
pub mod extract;
pub mod mirror;

pub use artifact::{detect_archive_kind, is_valid_package_archive, ArchiveKind};
pub use database::{DbFetcher, Fetcher, ProgressHandler, RepoDatabase, RepoDbCache};
pub use desc::{parse_desc, PackageInfo};
pub use error::{ErrorContext, RegistryError, Result};
pub use extract::{Extractor, TarExtractor};
pub use mirror::{rank_by_latency, HttpProbe, MirrorSelector, Probe};
