use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

use crate::error::LockError;

/// Held exclusive lock on a configuration's lock file. Dropping it removes
/// the file and releases the lock.
pub struct LockGuard {
    path: PathBuf,
    _lock: Flock<File>,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").field("path", &self.path).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!("releasing lock {}", self.path.display());
        let _ = fs::remove_file(&self.path);
    }
}

/// Takes the lock without waiting. `Ok(None)` means another run holds it.
pub fn try_acquire(path: &Path) -> Result<Option<LockGuard>, LockError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => {
            debug!("acquired lock {}", path.display());
            Ok(Some(LockGuard {
                path: path.to_path_buf(),
                _lock: lock,
            }))
        }
        Err((_, Errno::EWOULDBLOCK)) => Ok(None),
        Err((_, errno)) => Err(LockError::Flock {
            path: path.to_path_buf(),
            errno,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_is_refused_without_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("home.lock");
        let first = try_acquire(&path).expect("first").expect("acquired");
        let second = try_acquire(&path).expect("no error");
        assert!(second.is_none());
        assert_eq!(first.path(), path.as_path());
    }

    #[test]
    fn release_removes_file_and_frees_lock() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("home.lock");
        let guard = try_acquire(&path).expect("acquire").expect("acquired");
        assert!(path.exists());
        drop(guard);
        assert!(!path.exists());
        assert!(try_acquire(&path).expect("again").is_some());
    }

    #[test]
    fn unopenable_path_is_an_open_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("missing").join("home.lock");
        let err = try_acquire(&path).expect_err("open");
        assert!(matches!(err, LockError::Open { .. }));
    }
}
