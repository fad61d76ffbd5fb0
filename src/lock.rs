//! Batch lock
//!
//! Two batches writing the same signed directory would race on the signed
//! copies. The CLI holds an advisory exclusive lock on the directory for the
//! duration of a batch, with a timeout and a contention warning.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

pub type LockResult<T> = Result<T, LockError>;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out after {timeout:?} waiting for {path}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Advisory lock on a signed directory, released on drop
pub struct BatchLock {
    lock_path: PathBuf,
    #[allow(dead_code)]
    lock_file: File,
}

impl BatchLock {
    pub const LOCK_FILENAME: &'static str = ".sn-batch.lock";

    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    const CONTENTION_WARNING_AFTER: Duration = Duration::from_millis(500);

    /// Acquire the lock for `dir`, creating the directory if needed.
    /// Waits up to `timeout`.
    pub fn acquire(dir: &Path, timeout: Duration) -> LockResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_path = dir.join(Self::LOCK_FILENAME);
        let start = Instant::now();
        let mut warned = false;

        loop {
            match Self::try_acquire_exclusive(&lock_path) {
                Ok(file) => {
                    if warned {
                        warn!(
                            lock = %lock_path.display(),
                            waited_secs = start.elapsed().as_secs_f64(),
                            "Batch lock acquired after contention"
                        );
                    } else {
                        debug!(lock = %lock_path.display(), "Batch lock acquired");
                    }
                    return Ok(Self {
                        lock_path,
                        lock_file: file,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if !warned && start.elapsed() > Self::CONTENTION_WARNING_AFTER {
                        warn!(
                            lock = %lock_path.display(),
                            "Another batch holds the signed directory, waiting"
                        );
                        warned = true;
                    }
                }
                Err(e) => return Err(LockError::Io(e)),
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: lock_path,
                    timeout,
                });
            }

            thread::sleep(Self::POLL_INTERVAL);
        }
    }

    #[cfg(unix)]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(lock_path)?;

        // SAFETY: fd is owned by `file`, which outlives the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };

        if result == 0 {
            Ok(file)
        } else {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            } else {
                Err(err)
            }
        }
    }

    #[cfg(not(unix))]
    fn try_acquire_exclusive(lock_path: &Path) -> io::Result<File> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "lock held"))
            }
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for BatchLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: fd is still owned by `lock_file`.
            unsafe {
                libc::flock(self.lock_file.as_raw_fd(), libc::LOCK_UN);
            }
        }
        // The create_new fallback treats the file itself as the lock.
        #[cfg(not(unix))]
        {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
