//! PGP key handling for builds that need a signing key the user does not trust yet.

use std::sync::LazyLock;

use regex::Regex;

use crate::{constants::MAX_KEY_ID_LEN, error::CoreError, CoreResult};

static MISSING_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unknown public key ([0-9A-F]+)").expect("valid missing-key pattern")
});

/// First key id named by an "unknown public key" message in build output.
pub fn find_missing_key(output: &str) -> Option<String> {
    MISSING_KEY_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Key ids are non-empty hex strings of at most 40 characters.
pub fn is_valid_key_id(key_id: &str) -> bool {
    !key_id.is_empty()
        && key_id.len() <= MAX_KEY_ID_LEN
        && key_id.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_key_id(key_id: &str) -> CoreResult<()> {
    if is_valid_key_id(key_id) {
        Ok(())
    } else {
        Err(CoreError::InvalidKeyId(key_id.to_string()))
    }
}
