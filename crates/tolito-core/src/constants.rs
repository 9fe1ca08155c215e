//! Constants used throughout tolito-core.

/// Glob matching built package archives (signatures are filtered separately).
pub const ARTIFACT_GLOB: &str = "*.pkg.tar.*";

/// Suffix of detached signatures that share the artifact glob.
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Directory under the build path holding the curated sparse checkout.
pub const CURATED_CHECKOUT_DIR: &str = "curated";

/// Directory under the cache path holding downloaded binary packages.
pub const PACKAGE_CACHE_DIR: &str = "pkg";

/// Directory under the cache path holding repository databases.
pub const REPO_CACHE_DIR: &str = "repos";

/// Build recipe file name.
pub const PKGBUILD: &str = "PKGBUILD";

/// Longest accepted PGP key id (a full v4 fingerprint).
pub const MAX_KEY_ID_LEN: usize = 40;

/// How many missing keys a single build may import before giving up.
pub const KEY_IMPORT_BUDGET: u32 = 1;

/// Label shown for installed packages without a provenance entry.
pub const UNTRACKED_LABEL: &str = "source not tracked";
