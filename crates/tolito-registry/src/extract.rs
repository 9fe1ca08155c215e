//! External archive extraction.

use std::{
    path::Path,
    process::{Command, Stdio},
};

use tracing::{debug, warn};

/// Unpacks an archive into a directory.
pub trait Extractor: Send + Sync {
    /// Extracts `archive` into `dest`, which already exists. Returns `true` on success.
    fn extract(&self, archive: &Path, dest: &Path) -> bool;
}

/// Extracts with the system `tar`, which detects the compression itself.
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> bool {
        debug!("tar -xf {} -C {}", archive.display(), dest.display());
        let status = Command::new("tar")
            .arg("-xf")
            .arg(archive)
            .arg("-C")
            .arg(dest)
            .current_dir(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        match status {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                debug!(
                    "tar failed on {}: {}",
                    archive.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(err) => {
                warn!("Failed to run tar: {err}");
                false
            }
        }
    }
}
