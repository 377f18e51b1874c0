// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Materializer
//!
//! Places a cached object at a working-tree path using one of four link
//! strategies, and implements the `protect`/`unprotect` protocol that keeps
//! cache-interior files read-only while letting a consumer safely edit a
//! checked-out copy.
//!
//! Every strategy writes to a temporary sibling and renames into place, so
//! a reader never observes a partially-written destination. The one
//! exception carved out deliberately: empty files are always materialized
//! as a fresh empty file rather than hardlinked, because ext4 and NTFS both
//! impose a cap on the number of hardlinks to a single inode (65,000 and
//! 1024 respectively), and every empty file in a corpus shares the same
//! all-zero digest.

use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use cas_sync_domain::link_strategy::ModeMap;
use cas_sync_domain::{CacheError, LinkStrategy};
use uuid::Uuid;

fn tmp_sibling(to: &Path) -> PathBuf {
    let parent = to.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}", Uuid::new_v4()))
}

fn chmod(path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

fn rename_into_place(tmp: &Path, to: &Path) -> io::Result<()> {
    fs::rename(tmp, to)
}

fn cleanup_tmp(tmp: &Path) {
    let _ = fs::remove_file(tmp);
}

/// Materialize `from` at `to` using `reflink`, an OS copy-on-write clone.
/// The clone gets its own inode, so its mode must be set explicitly even
/// though the source is protected at `0o444`.
pub fn reflink(from: &Path, to: &Path, file_mode: u32) -> Result<(), CacheError> {
    let tmp = tmp_sibling(to);
    reflink_copy::reflink(from, &tmp).map_err(|e| CacheError::link_strategy_exhausted(to.display().to_string(), e.to_string()))?;
    if let Err(e) = chmod(&tmp, file_mode) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    if let Err(e) = rename_into_place(&tmp, to) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Materialize `from` at `to` as an independent byte-for-byte copy.
pub fn copy(from: &Path, to: &Path, file_mode: u32) -> Result<(), CacheError> {
    let tmp = tmp_sibling(to);
    if let Err(e) = fs::copy(from, &tmp) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    if let Err(e) = chmod(&tmp, file_mode) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    if let Err(e) = rename_into_place(&tmp, to) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Materialize `from` at `to` as a hardlink, unless `from` is a zero-size
/// file, in which case a fresh empty file is written instead (see module
/// docs for why). Verifies inode identity afterward for non-empty sources.
pub fn hardlink(from: &Path, to: &Path) -> Result<(), CacheError> {
    let meta = fs::metadata(from)?;
    if meta.size() == 0 {
        fs::File::create(to)?;
        return Ok(());
    }

    let tmp = tmp_sibling(to);
    if let Err(e) = fs::hard_link(from, &tmp) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    if let Err(e) = rename_into_place(&tmp, to) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }

    verify_hardlink(from, to)?;
    Ok(())
}

/// Confirms `to` shares inode identity with `from`. Zero-size files are
/// exempt: they are never actually hardlinked (see [`hardlink`]).
fn verify_hardlink(from: &Path, to: &Path) -> Result<(), CacheError> {
    let from_meta = fs::metadata(from)?;
    if from_meta.size() == 0 {
        return Ok(());
    }
    let to_meta = fs::metadata(to)?;
    if from_meta.ino() != to_meta.ino() || from_meta.dev() != to_meta.dev() {
        return Err(CacheError::InvariantViolation(format!(
            "hardlink verification failed: {} and {} do not share an inode",
            from.display(),
            to.display()
        )));
    }
    Ok(())
}

/// Materialize `from` at `to` as a symbolic link.
pub fn symlink(from: &Path, to: &Path) -> Result<(), CacheError> {
    let tmp = tmp_sibling(to);
    if let Err(e) = std::os::unix::fs::symlink(from, &tmp) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    if let Err(e) = rename_into_place(&tmp, to) {
        cleanup_tmp(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Try each strategy in `order` until one succeeds, returning which one
/// worked. Fails only if every strategy in `order` fails.
pub fn link(from: &Path, to: &Path, order: &[LinkStrategy], mode_map: ModeMap) -> Result<LinkStrategy, CacheError> {
    let mut last_err: Option<CacheError> = None;
    for strategy in order {
        let result = match strategy {
            LinkStrategy::Reflink => reflink(from, to, mode_map.file_mode),
            LinkStrategy::Hardlink => hardlink(from, to),
            LinkStrategy::Symlink => symlink(from, to),
            LinkStrategy::Copy => copy(from, to, mode_map.file_mode),
        };
        match result {
            Ok(()) => return Ok(*strategy),
            Err(e) => last_err = Some(e),
        }
    }
    Err(CacheError::link_strategy_exhausted(
        to.display().to_string(),
        last_err.map(|e| e.to_string()).unwrap_or_else(|| "no strategies configured".to_string()),
    ))
}

/// Chmod `path` to the cache-protected mode (`0o444`). Tolerates a
/// read-only filesystem (EROFS) silently. Tolerates EACCES/EPERM iff the
/// current mode already matches, since another user in a shared cache may
/// have already protected the file.
pub fn protect(path: &Path) -> Result<(), CacheError> {
    match chmod(path, ModeMap::CACHE_MODE) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EROFS) => Ok(()),
        Err(e) if matches!(e.kind(), io::ErrorKind::PermissionDenied) => {
            let current_mode = fs::metadata(path)?.permissions().mode() & 0o777;
            if current_mode == ModeMap::CACHE_MODE {
                Ok(())
            } else {
                Err(CacheError::permission(path.display().to_string(), e.to_string()))
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// True iff `path`'s mode bits equal the cache-protected mode.
pub fn is_protected(path: &Path) -> Result<bool, CacheError> {
    let mode = fs::metadata(path)?.permissions().mode() & 0o777;
    Ok(mode == ModeMap::CACHE_MODE)
}

/// Make `path` safely writable without disturbing a concurrent reader of
/// the same cache-backed content: copy to a sibling temp name, remove the
/// original, rename the copy into place (in that exact order), then chmod
/// to `file_mode`. If `path` is neither a symlink nor shares an inode with
/// anything else, the copy step is skipped, but the chmod still runs.
pub fn unprotect_file(path: &Path, file_mode: u32) -> Result<(), CacheError> {
    let meta = fs::symlink_metadata(path)?;
    let is_symlink = meta.file_type().is_symlink();
    let is_hardlinked = !is_symlink && meta.nlink() > 1;

    if is_symlink || is_hardlinked {
        let tmp = tmp_sibling(path);
        fs::copy(path, &tmp)?;
        fs::remove_file(path)?;
        rename_into_place(&tmp, path)?;
    }

    chmod(path, file_mode)?;
    Ok(())
}

/// Recursively unprotect every regular file under `dir`.
pub fn unprotect_dir(dir: &Path, file_mode: u32) -> Result<(), CacheError> {
    for entry in walk_files(dir)? {
        unprotect_file(&entry, file_mode)?;
    }
    Ok(())
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, content: &[u8]) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn copy_strategy_materializes_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write_file(&src, b"hello\n");

        copy(&src, &dst, ModeMap::DEFAULT.file_mode).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"hello\n");
    }

    #[test]
    fn hardlink_shares_inode_for_nonempty_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write_file(&src, b"hello\n");

        hardlink(&src, &dst).unwrap();
        let src_meta = fs::metadata(&src).unwrap();
        let dst_meta = fs::metadata(&dst).unwrap();
        assert_eq!(src_meta.ino(), dst_meta.ino());
    }

    #[test]
    fn hardlink_on_empty_file_creates_independent_inode() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write_file(&src, b"");

        hardlink(&src, &dst).unwrap();
        let src_meta = fs::metadata(&src).unwrap();
        let dst_meta = fs::metadata(&dst).unwrap();
        assert_ne!(src_meta.ino(), dst_meta.ino());
    }

    #[test]
    fn reflink_result_gets_explicit_chmod() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write_file(&src, b"hello\n");

        // Not all filesystems in CI support reflink; fall back to copy via
        // the generic `link` dispatcher's strategy order when reflink fails.
        let _ = link(&src, &dst, &[LinkStrategy::Reflink, LinkStrategy::Copy], ModeMap::DEFAULT).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, ModeMap::DEFAULT.file_mode);
    }

    #[test]
    fn protect_sets_cache_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        write_file(&path, b"data");
        protect(&path).unwrap();
        assert!(is_protected(&path).unwrap());
    }

    #[test]
    fn unprotect_symlink_replaces_with_independent_copy() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link_path = dir.path().join("link");
        write_file(&target, b"hello\n");
        protect(&target).unwrap();
        std::os::unix::fs::symlink(&target, &link_path).unwrap();

        unprotect_file(&link_path, ModeMap::DEFAULT.file_mode).unwrap();

        assert!(!fs::symlink_metadata(&link_path).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&link_path).unwrap(), b"hello\n");
        let mode = fs::metadata(&link_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, ModeMap::DEFAULT.file_mode);
    }

    #[test]
    fn link_exhausts_all_strategies_before_failing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("does-not-exist");
        let dst = dir.path().join("dst");
        let err = link(&src, &dst, &[LinkStrategy::Hardlink, LinkStrategy::Copy], ModeMap::DEFAULT).unwrap_err();
        assert_eq!(err.category(), "link_strategy");
    }
}
