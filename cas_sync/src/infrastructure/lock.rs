// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cache Root Lock
//!
//! An advisory, process-exclusive lock taken for the duration of a state
//! index write, so two processes sharing a cache root don't race on the
//! SQLite file's surrounding bookkeeping (creation, migration). Built on
//! `flock(2)`, the same platform primitive family the bootstrap layer
//! already depends on `libc` for.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Holds an exclusive `flock` for as long as it is alive; dropping it
/// releases the lock.
pub struct CacheRootLock {
    _file: File,
}

impl CacheRootLock {
    /// Block until an exclusive lock on `<root>/.lock` is acquired.
    pub fn acquire(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let lock_path = root.join(".lock");
        let file = std::fs::OpenOptions::new().create(true).write(true).open(lock_path)?;
        let fd = file.as_raw_fd();
        // SAFETY: fd is a valid, open file descriptor owned by `file`, and
        // LOCK_EX blocks this thread until the lock is held.
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { _file: file })
    }
}

impl Drop for CacheRootLock {
    fn drop(&mut self) {
        let fd = self._file.as_raw_fd();
        // SAFETY: fd is still valid; unlocking on drop is best-effort.
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquiring_twice_sequentially_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = CacheRootLock::acquire(dir.path()).unwrap();
        }
        let _lock2 = CacheRootLock::acquire(dir.path()).unwrap();
    }
}
