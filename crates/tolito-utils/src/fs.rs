use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

/// Removes a file or a whole directory tree. A missing path is not an error.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    let result = match fs::symlink_metadata(path) {
        Err(_) => return Ok(()),
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
    };

    result.map_err(FileSystemError::io("remove", path))
}

/// Creates `path` and its parents unless it is already a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    fs::create_dir_all(path).map_err(FileSystemError::io("create directory", path))
}

/// Reads up to `len` leading bytes of a file.
///
/// Shorter files yield a shorter buffer rather than an error.
pub fn read_file_signature<P: AsRef<Path>>(path: P, len: usize) -> FileSystemResult<Vec<u8>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(FileSystemError::io("open", path))?;

    let mut buf = Vec::with_capacity(len);
    file.take(len as u64)
        .read_to_end(&mut buf)
        .map_err(FileSystemError::io("read", path))?;
    Ok(buf)
}

fn read_entries(dir: &Path) -> FileSystemResult<Vec<PathBuf>> {
    fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(FileSystemError::io("list", dir))
}

/// Removes every entry inside `dir`, keeping the directory itself.
///
/// Busy entries (mount points, files held open by a running build) are left in place and
/// returned. A missing directory counts as empty.
pub fn clear_dir_contents<P: AsRef<Path>>(dir: P) -> FileSystemResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut skipped = Vec::new();
    for path in read_entries(dir)? {
        match safe_remove(&path) {
            Ok(()) => {}
            Err(err) if err.is_busy() => skipped.push(path),
            Err(err) => return Err(err),
        }
    }

    Ok(skipped)
}

/// Regular files directly inside `dir` whose names match the glob `pattern`, sorted.
pub fn find_files_matching<P: AsRef<Path>>(
    dir: P,
    pattern: &str,
) -> FileSystemResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches: Vec<PathBuf> = read_entries(dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| fast_glob::glob_match(pattern, name))
        })
        .collect();
    matches.sort();

    Ok(matches)
}
