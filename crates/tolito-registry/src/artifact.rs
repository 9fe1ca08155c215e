//! Magic-byte sanity check for downloaded package archives.

use std::path::{Component, Path};

use tolito_utils::fs::read_file_signature;
use tracing::debug;

/// Magic bytes for Zstandard compressed files.
pub const ZST_MAGIC_BYTES: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
pub const XZ_MAGIC_BYTES: [u8; 6] = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
pub const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];
pub const BZIP2_MAGIC_BYTES: [u8; 3] = *b"BZh";
/// `ustar` marker of an uncompressed tar header, found at [`TAR_MAGIC_OFFSET`].
pub const TAR_MAGIC_BYTES: [u8; 5] = *b"ustar";
pub const TAR_MAGIC_OFFSET: usize = 257;

const SIGNATURE_LEN: usize = TAR_MAGIC_OFFSET + TAR_MAGIC_BYTES.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zstd,
    Xz,
    Gzip,
    Bzip2,
    Tar,
}

/// Identifies the archive format from the leading bytes of a file.
pub fn detect_archive_kind(head: &[u8]) -> Option<ArchiveKind> {
    if head.starts_with(&ZST_MAGIC_BYTES) {
        Some(ArchiveKind::Zstd)
    } else if head.starts_with(&XZ_MAGIC_BYTES) {
        Some(ArchiveKind::Xz)
    } else if head.starts_with(&GZIP_MAGIC_BYTES) {
        Some(ArchiveKind::Gzip)
    } else if head.starts_with(&BZIP2_MAGIC_BYTES) {
        Some(ArchiveKind::Bzip2)
    } else if head.get(TAR_MAGIC_OFFSET..SIGNATURE_LEN) == Some(&TAR_MAGIC_BYTES[..]) {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Whether a `%FILENAME%` value names a file directly inside the package cache.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\0'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}

/// Whether `path` looks like a package archive pacman can install.
///
/// Unreadable files count as invalid.
pub fn is_valid_package_archive<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    match read_file_signature(path, SIGNATURE_LEN) {
        Ok(head) => {
            let kind = detect_archive_kind(&head);
            if kind.is_none() {
                debug!("{} has no known archive signature", path.display());
            }
            kind.is_some()
        }
        Err(err) => {
            debug!("cannot read {}: {err}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("bar-1.0-1-x86_64.pkg.tar.zst"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("../../evil.pkg.tar.zst"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name("sub/bar.pkg.tar.zst"));
    }

    #[test]
    fn test_detect_compressed_formats() {
        assert_eq!(
            detect_archive_kind(&[0x28, 0xb5, 0x2f, 0xfd, 0x00]),
            Some(ArchiveKind::Zstd)
        );
        assert_eq!(
            detect_archive_kind(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00, 0x00]),
            Some(ArchiveKind::Xz)
        );
        assert_eq!(detect_archive_kind(&[0x1f, 0x8b, 0x08]), Some(ArchiveKind::Gzip));
        assert_eq!(detect_archive_kind(b"BZh91AY"), Some(ArchiveKind::Bzip2));
    }

    #[test]
    fn test_detect_plain_tar() {
        let mut head = vec![0u8; 512];
        head[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect_archive_kind(&head), Some(ArchiveKind::Tar));
    }

    #[test]
    fn test_detect_rejects_html_error_page() {
        assert_eq!(detect_archive_kind(b"<!DOCTYPE html><html>404</html>"), None);
        assert_eq!(detect_archive_kind(&[]), None);
        assert_eq!(detect_archive_kind(&[0x1f]), None);
    }

    #[test]
    fn test_is_valid_package_archive() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("foo-1-1-x86_64.pkg.tar.zst");
        let bad = dir.path().join("foo-1-1-x86_64.pkg.tar.xz");
        fs::write(&good, [0x28, 0xb5, 0x2f, 0xfd, 1, 2, 3]).unwrap();
        fs::write(&bad, b"Not Found").unwrap();

        assert!(is_valid_package_archive(&good));
        assert!(!is_valid_package_archive(&bad));
        assert!(!is_valid_package_archive(dir.path().join("missing")));
    }
}
