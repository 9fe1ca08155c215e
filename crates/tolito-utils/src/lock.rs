//! Cross-process exclusive locks for read-modify-write of state files.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

use crate::{
    error::{LockError, LockResult},
    fs::ensure_dir_exists,
};

/// An exclusive `flock` on `<target>.lock`, released on drop.
pub struct FileLock {
    _file: Flock<File>,
    path: PathBuf,
}

impl FileLock {
    /// `target` with `.lock` appended to its file name.
    pub fn lock_path_for<P: AsRef<Path>>(target: P) -> PathBuf {
        let target = target.as_ref();
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        target.with_file_name(name)
    }

    fn lock(target: &Path, arg: FlockArg) -> LockResult<Result<Self, Errno>> {
        let path = Self::lock_path_for(target);
        if let Some(parent) = path.parent() {
            ensure_dir_exists(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| {
                LockError::Open {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok(Flock::lock(file, arg)
            .map(|file| FileLock { _file: file, path })
            .map_err(|(_, errno)| errno))
    }

    /// Blocks until the lock guarding `target` is ours.
    pub fn acquire<P: AsRef<Path>>(target: P) -> LockResult<Self> {
        let target = target.as_ref();
        Self::lock(target, FlockArg::LockExclusive)?.map_err(|errno| {
            LockError::Flock {
                path: Self::lock_path_for(target),
                errno,
            }
        })
    }

    /// Like [`acquire`](Self::acquire) but returns `None` instead of waiting.
    pub fn try_acquire<P: AsRef<Path>>(target: P) -> LockResult<Option<Self>> {
        let target = target.as_ref();
        match Self::lock(target, FlockArg::LockExclusiveNonblock)? {
            Ok(lock) => Ok(Some(lock)),
            Err(Errno::EWOULDBLOCK) => Ok(None),
            Err(errno) => {
                Err(LockError::Flock {
                    path: Self::lock_path_for(target),
                    errno,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::mpsc,
        thread,
        time::Duration,
    };

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_lock_path_for() {
        let path = FileLock::lock_path_for("/tmp/state/package_sources.json");
        assert_eq!(path, PathBuf::from("/tmp/state/package_sources.json.lock"));
    }

    #[test]
    fn test_try_acquire_while_held() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/package_sources.json");

        let held = FileLock::acquire(&target).unwrap();
        assert!(held.path().exists());
        assert!(FileLock::try_acquire(&target).unwrap().is_none());

        drop(held);
        assert!(FileLock::try_acquire(&target).unwrap().is_some());
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("package_sources.json");
        let held = FileLock::acquire(&target).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let _lock = FileLock::acquire(&target).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }
}
