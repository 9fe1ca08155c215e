use std::process::Command;

use tracing::{info, warn};

use super::{process::run_interactive, KeyTrust};

/// Receives keys with `gpg` and locally signs them with `pacman-key`.
pub struct SystemKeyTrust {
    keyserver: String,
}

impl SystemKeyTrust {
    pub fn new(keyserver: impl Into<String>) -> Self {
        Self {
            keyserver: keyserver.into(),
        }
    }
}

impl KeyTrust for SystemKeyTrust {
    fn import_and_sign(&self, key_id: &str) -> bool {
        let mut recv = Command::new("gpg");
        recv.args(["--batch", "--keyserver", &self.keyserver, "--recv-keys", key_id])
            .current_dir("/");
        if run_interactive(&mut recv) != Some(0) {
            warn!("gpg failed to fetch key {key_id}");
            return false;
        }

        let mut sign = Command::new("sudo");
        sign.args(["pacman-key", "--lsign-key", key_id])
            .current_dir("/");
        if run_interactive(&mut sign) != Some(0) {
            warn!("pacman-key failed to sign {key_id}");
            return false;
        }

        info!("Imported and signed PGP key {key_id}");
        true
    }
}
