//! Lock file guarding write transactions on the store file.
//!
//! On unix the lock is an advisory `flock` on `<store>.lock`. The file itself
//! is never deleted, so there is no stale-lock cleanup to race on: the kernel
//! drops the lock when the holder's descriptor closes, including on a crash.
//! Each acquisition opens its own descriptor, so threads of one process
//! exclude each other as well as other processes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::Error;

/// How long to wait for a held lock before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Path of the lock file for `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Lock handle - releases lock when dropped.
pub struct LockHandle {
    lock_path: PathBuf,
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    token: String,
}

/// Try once to take the lock.
#[cfg(unix)]
pub fn try_acquire_lock(path: &Path) -> Result<Option<LockHandle>, Error> {
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(flock) => {
            tracing::debug!("Acquired lock: {}", lock_path.display());
            Ok(Some(LockHandle {
                lock_path,
                _flock: flock,
            }))
        }
        Err((_, errno)) if errno == Errno::EWOULDBLOCK || errno == Errno::EINTR => Ok(None),
        Err((_, errno)) => Err(Error::Io(std::io::Error::from(errno))),
    }
}

/// Try once to take the lock.
///
/// Without `flock` the lock is the existence of the file, created with
/// `create_new`. A leftover file is never removed here; it blocks writers
/// until someone deletes it by hand.
#[cfg(not(unix))]
pub fn try_acquire_lock(path: &Path) -> Result<Option<LockHandle>, Error> {
    use std::io::{ErrorKind, Write};
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

    let lock_path = lock_path(path);
    match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
        Ok(mut lock_file) => {
            let token = format!(
                "{}:{}",
                std::process::id(),
                NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
            );
            lock_file.write_all(token.as_bytes())?;
            lock_file.sync_all()?;
            tracing::debug!("Acquired lock: {}", lock_path.display());
            Ok(Some(LockHandle { lock_path, token }))
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Acquire an exclusive lock on a file, waiting for the current holder.
pub fn acquire_lock(path: &Path) -> Result<LockHandle, Error> {
    let started = Instant::now();

    loop {
        if let Some(handle) = try_acquire_lock(path)? {
            return Ok(handle);
        }

        if started.elapsed() >= LOCK_WAIT {
            return Err(Error::Storage(format!(
                "Lock file is held: {}",
                lock_path(path).display()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Drop for LockHandle {
    #[cfg(unix)]
    fn drop(&mut self) {
        tracing::debug!("Released lock: {}", self.lock_path.display());
    }

    #[cfg(not(unix))]
    fn drop(&mut self) {
        // Only remove the file if it is still ours.
        match std::fs::read_to_string(&self.lock_path) {
            Ok(content) if content == self.token => {
                if let Err(e) = std::fs::remove_file(&self.lock_path) {
                    tracing::warn!("Failed to release lock {}: {}", self.lock_path.display(), e);
                } else {
                    tracing::debug!("Released lock: {}", self.lock_path.display());
                }
            }
            _ => tracing::warn!("Lock {} is no longer ours", self.lock_path.display()),
        }
    }
}

/// Acquire lock, execute function, release lock.
pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error>,
{
    let _lock = acquire_lock(path)?;
    f()
}
