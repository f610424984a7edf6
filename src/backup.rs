// src/backup.rs

//! Timestamped backups of files about to be overwritten
//!
//! Every destructive write in the resolution engine goes through here
//! first. Backups are grouped into seconds-resolution timestamp buckets
//! (`.devsync/backups/20260806-142501/`); inside a bucket the original
//! relative path is preserved, and a second backup of the same path in
//! the same bucket gets an incrementing numeric suffix so nothing is
//! ever silently overwritten.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hash;
use crate::paths;

/// Bucket name format, seconds resolution
const BUCKET_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One stored backup
#[derive(Debug, Clone, PartialEq)]
pub struct BackupEntry {
    /// Seconds-resolution grouping, e.g. `20260806-142501`
    pub bucket: String,
    /// Original path relative to the project root, forward slashes
    pub original_path: String,
    /// Where the copy lives on disk
    pub stored_path: PathBuf,
    /// Set when this backup collided with an earlier one in the bucket
    pub counter: Option<u32>,
    /// Digest recorded at backup time; verified on restore when present
    pub checksum: Option<String>,
}

impl BackupEntry {
    /// Bucket timestamp as a UTC instant
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_bucket(&self.bucket)
    }
}

fn parse_bucket(bucket: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(bucket, BUCKET_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Store of timestamped backups under one directory
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a copy of `bytes` for the file at `original_relative_path`.
    ///
    /// The copy lands in the current timestamp bucket under the original
    /// relative path; a collision within the bucket appends `.1`, `.2`, …
    /// (first unused) instead of overwriting.
    pub fn backup(&self, original_relative_path: &Path, bytes: &[u8]) -> Result<BackupEntry> {
        if original_relative_path.is_absolute() {
            return Err(Error::InvalidPath(format!(
                "backup paths must be project-relative: {}",
                original_relative_path.display()
            )));
        }

        let bucket = Utc::now().format(BUCKET_FORMAT).to_string();
        let bucket_dir = self.root.join(&bucket);
        let target = bucket_dir.join(original_relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let (stored_path, counter) = if target.exists() {
            let mut n = 1u32;
            loop {
                let candidate =
                    target.with_file_name(format!("{}.{}", file_name_of(&target), n));
                if !candidate.exists() {
                    break (candidate, Some(n));
                }
                n += 1;
            }
        } else {
            (target, None)
        };

        fs::write(&stored_path, bytes)?;
        debug!(
            "backed up {} to {}",
            original_relative_path.display(),
            stored_path.display()
        );

        Ok(BackupEntry {
            bucket,
            original_path: paths::to_portable(original_relative_path),
            stored_path,
            counter,
            checksum: Some(hash::content_digest(bytes)),
        })
    }

    /// Enumerate stored backups, oldest bucket first.
    ///
    /// With `since`, only buckets at or after the instant are returned.
    pub fn list(&self, since: Option<DateTime<Utc>>) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        if !self.root.exists() {
            return Ok(entries);
        }

        let mut buckets: Vec<(String, DateTime<Utc>)> = Vec::new();
        for dir in fs::read_dir(&self.root)? {
            let dir = dir?;
            if !dir.file_type()?.is_dir() {
                continue;
            }
            let name = dir.file_name().to_string_lossy().into_owned();
            match parse_bucket(&name) {
                Some(ts) => {
                    if since.is_none_or(|cutoff| ts >= cutoff) {
                        buckets.push((name, ts));
                    }
                }
                None => warn!("ignoring non-bucket directory in backups: {}", name),
            }
        }
        buckets.sort_by_key(|(_, ts)| *ts);

        for (bucket, _) in buckets {
            let bucket_dir = self.root.join(&bucket);
            let mut files: Vec<PathBuf> = WalkDir::new(&bucket_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            files.sort();

            for stored_path in files {
                let rel = stored_path
                    .strip_prefix(&bucket_dir)
                    .map_err(|_| Error::InvalidPath(stored_path.display().to_string()))?;
                let (original, counter) = split_counter(rel);
                entries.push(BackupEntry {
                    bucket: bucket.clone(),
                    original_path: original,
                    stored_path,
                    counter,
                    checksum: None,
                });
            }
        }

        Ok(entries)
    }

    /// Read a backup's bytes, verifying its digest when one is recorded
    pub fn restore(&self, entry: &BackupEntry) -> Result<Vec<u8>> {
        let bytes = fs::read(&entry.stored_path)?;
        if let Some(expected) = &entry.checksum {
            hash::verify_bytes(&bytes, expected)?;
        }
        Ok(bytes)
    }

    /// Delete backups in buckets older than `older_than_days`.
    ///
    /// Paths listed in `keep_latest_for` keep their most recent backup
    /// even past the threshold, so a recovery point always exists for
    /// still-tracked components. Callers disable the exemption by
    /// passing an empty set. Returns the number of files removed.
    pub fn cleanup(
        &self,
        older_than_days: u32,
        keep_latest_for: &HashSet<String>,
    ) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(older_than_days));
        let all = self.list(None)?;

        // Newest surviving backup per original path, across all buckets
        let mut latest: std::collections::HashMap<&str, &BackupEntry> =
            std::collections::HashMap::new();
        for entry in &all {
            latest.insert(entry.original_path.as_str(), entry);
        }

        let mut removed = 0usize;
        for entry in &all {
            let Some(ts) = entry.timestamp() else { continue };
            if ts >= cutoff {
                continue;
            }
            let exempt = keep_latest_for.contains(&entry.original_path)
                && latest
                    .get(entry.original_path.as_str())
                    .is_some_and(|newest| newest.stored_path == entry.stored_path);
            if exempt {
                debug!(
                    "keeping last backup of tracked path {} despite age",
                    entry.original_path
                );
                continue;
            }
            fs::remove_file(&entry.stored_path)?;
            removed += 1;
        }

        // Drop bucket directories that are now empty
        if self.root.exists() {
            for dir in fs::read_dir(&self.root)? {
                let dir = dir?;
                if dir.file_type()?.is_dir() {
                    remove_empty_tree(&dir.path())?;
                }
            }
        }

        Ok(removed)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split a trailing all-digit extension back into (original path, counter)
fn split_counter(rel: &Path) -> (String, Option<u32>) {
    let portable = paths::to_portable(rel);
    if let Some((base, last)) = portable.rsplit_once('.') {
        if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) && base.contains('.') {
            if let Ok(n) = last.parse() {
                return (base.to_string(), Some(n));
            }
        }
    }
    (portable, None)
}

/// Remove a directory tree that contains no files (empty dirs only)
fn remove_empty_tree(dir: &Path) -> Result<()> {
    let has_files = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file());
    if !has_files {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_preserves_relative_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        let entry = store
            .backup(Path::new(".claude/rules/style.md"), b"original")
            .unwrap();

        assert!(entry.stored_path.exists());
        assert!(entry.stored_path.ends_with(".claude/rules/style.md"));
        assert_eq!(entry.original_path, ".claude/rules/style.md");
        assert_eq!(entry.counter, None);
        assert_eq!(fs::read(&entry.stored_path).unwrap(), b"original");
    }

    #[test]
    fn test_same_bucket_collision_gets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        // Two backups of the same path within one second share a bucket
        let first = store.backup(Path::new("notes.md"), b"one").unwrap();
        let second = store.backup(Path::new("notes.md"), b"two").unwrap();
        let third = store.backup(Path::new("notes.md"), b"three").unwrap();

        // Both survive on disk with distinct stored paths
        if second.bucket == first.bucket {
            assert_ne!(first.stored_path, second.stored_path);
            assert_eq!(second.counter, Some(1));
        }
        if third.bucket == second.bucket && third.bucket == first.bucket {
            assert_eq!(third.counter, Some(2));
        }
        assert_eq!(fs::read(&first.stored_path).unwrap(), b"one");
        assert_eq!(fs::read(&second.stored_path).unwrap(), b"two");
        assert_eq!(fs::read(&third.stored_path).unwrap(), b"three");
    }

    #[test]
    fn test_absolute_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        assert!(matches!(
            store.backup(Path::new("/etc/passwd"), b"x"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_list_reports_backups_with_original_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        store.backup(Path::new("a/one.md"), b"1").unwrap();
        store.backup(Path::new("two.md"), b"2").unwrap();

        let listed = store.list(None).unwrap();
        assert_eq!(listed.len(), 2);
        let originals: Vec<&str> = listed.iter().map(|e| e.original_path.as_str()).collect();
        assert!(originals.contains(&"a/one.md"));
        assert!(originals.contains(&"two.md"));
    }

    #[test]
    fn test_list_since_excludes_old_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        // Fabricate an old bucket directly on disk
        let old_bucket = store.root().join("20200101-000000");
        fs::create_dir_all(&old_bucket).unwrap();
        fs::write(old_bucket.join("stale.md"), b"old").unwrap();
        store.backup(Path::new("fresh.md"), b"new").unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(1);
        let listed = store.list(Some(cutoff)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_path, "fresh.md");
    }

    #[test]
    fn test_restore_roundtrip_and_verification() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        let entry = store.backup(Path::new("doc.md"), b"precious").unwrap();

        assert_eq!(store.restore(&entry).unwrap(), b"precious");

        // Tampering is caught because the entry carries its digest
        fs::write(&entry.stored_path, b"tampered").unwrap();
        assert!(matches!(
            store.restore(&entry),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_cleanup_prunes_old_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        let old_bucket = store.root().join("20200101-000000");
        fs::create_dir_all(&old_bucket).unwrap();
        fs::write(old_bucket.join("stale.md"), b"old").unwrap();
        store.backup(Path::new("fresh.md"), b"new").unwrap();

        let removed = store.cleanup(30, &HashSet::new()).unwrap();
        assert_eq!(removed, 1);
        assert!(!old_bucket.exists());

        let remaining = store.list(None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].original_path, "fresh.md");
    }

    #[test]
    fn test_cleanup_keeps_latest_for_tracked_paths() {
        // Policy assumption (documented, configurable): the newest backup
        // of a still-tracked component survives cleanup regardless of age.
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backups"));

        let older = store.root().join("20200101-000000");
        let newer = store.root().join("20200202-000000");
        fs::create_dir_all(&older).unwrap();
        fs::create_dir_all(&newer).unwrap();
        fs::write(older.join("tracked.md"), b"v1").unwrap();
        fs::write(newer.join("tracked.md"), b"v2").unwrap();

        let mut tracked = HashSet::new();
        tracked.insert("tracked.md".to_string());

        let removed = store.cleanup(30, &tracked).unwrap();
        assert_eq!(removed, 1);

        let remaining = store.list(None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].bucket, "20200202-000000");

        // With the exemption off, everything old goes
        let removed = store.cleanup(30, &HashSet::new()).unwrap();
        assert_eq!(removed, 1);
        assert!(store.list(None).unwrap().is_empty());
    }
}
