// src/ledger.rs

//! Persisted installation ledger
//!
//! The ledger is the authoritative record of what devsync installed into a
//! project: one entry per installed component carrying its provenance
//! (source, source_ref), the content checksum at install time, and the
//! install timestamp. It lives at `.devsync/installations.json` as pretty
//! JSON so it is diff-friendly and safe to version-control.
//!
//! Consistency rules:
//! - a missing file is an empty ledger,
//! - a structurally invalid file is a fatal error, never treated as empty,
//! - saves go through a temp file and an atomic rename, so the on-disk
//!   ledger is never observable half-written,
//! - an advisory lock guards the save against a second writer.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::component::ComponentKind;
use crate::error::{Error, Result};

/// Current on-disk schema version
pub const LEDGER_VERSION: u32 = 1;

/// Provenance record for one installed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub identity: String,
    pub kind: ComponentKind,
    /// Relative, forward-slash path of the installed artifact
    pub installed_path: String,
    /// Origin identifier: repository URL or local path
    pub source: String,
    /// Tag, branch, commit, or version string at the origin
    pub source_ref: String,
    /// Prefixed digest of the content at install time
    pub content_checksum: String,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    entries: Vec<TrackingEntry>,
}

/// In-memory ledger, loaded once per operation and saved explicitly
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<TrackingEntry>,
    dirty: bool,
}

impl Ledger {
    /// Load the ledger at `path`.
    ///
    /// A missing file yields an empty ledger. Unparseable content fails
    /// loudly: treating a corrupt ledger as empty would silently orphan
    /// every tracked installation.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("no ledger at {}, starting empty", path.display());
            return Ok(Self {
                path,
                entries: Vec::new(),
                dirty: false,
            });
        }

        let raw = fs::read_to_string(&path)?;
        let file: LedgerFile =
            serde_json::from_str(&raw).map_err(|e| Error::LedgerCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if file.version > LEDGER_VERSION {
            return Err(Error::LedgerCorrupt {
                path,
                reason: format!(
                    "ledger version {} is newer than supported {}",
                    file.version, LEDGER_VERSION
                ),
            });
        }

        Ok(Self {
            path,
            entries: file.entries,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[TrackingEntry] {
        &self.entries
    }

    /// Whether in-memory state differs from what was loaded/saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert or replace the entry keyed by (identity, kind, installed_path)
    pub fn upsert(&mut self, entry: TrackingEntry) {
        match self.entries.iter_mut().find(|e| {
            e.identity == entry.identity
                && e.kind == entry.kind
                && e.installed_path == entry.installed_path
        }) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.dirty = true;
    }

    /// Remove the entry keyed by (identity, kind, installed_path).
    ///
    /// Returns whether an entry was removed. Removal only happens through
    /// an explicit uninstall; nothing in the install path deletes entries.
    pub fn remove(&mut self, identity: &str, kind: ComponentKind, installed_path: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| {
            !(e.identity == identity && e.kind == kind && e.installed_path == installed_path)
        });
        let removed = self.entries.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// All live entries for an identity within a kind, across sources
    pub fn find_by_identity(&self, identity: &str, kind: ComponentKind) -> Vec<&TrackingEntry> {
        self.entries
            .iter()
            .filter(|e| e.identity == identity && e.kind == kind)
            .collect()
    }

    /// The entry at one specific installed path, if tracked
    pub fn find_exact(
        &self,
        identity: &str,
        kind: ComponentKind,
        installed_path: &str,
    ) -> Option<&TrackingEntry> {
        self.entries.iter().find(|e| {
            e.identity == identity && e.kind == kind && e.installed_path == installed_path
        })
    }

    /// The entry tracking a given installed path, regardless of identity
    pub fn find_by_path(&self, installed_path: &str) -> Option<&TrackingEntry> {
        self.entries.iter().find(|e| e.installed_path == installed_path)
    }

    /// Persist the ledger atomically.
    ///
    /// Entries are sorted for stable diffs, serialized to a temp file in
    /// the ledger's directory, then renamed over the ledger. An advisory
    /// lock on a sibling lock file rejects a concurrent second writer.
    pub fn save(&mut self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::InvalidPath(format!("ledger path {} has no parent", self.path.display())))?;
        fs::create_dir_all(parent)?;

        let lock_path = self.path.with_extension("json.lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file.try_lock_exclusive().map_err(|_| {
            Error::LedgerCorrupt {
                path: self.path.clone(),
                reason: "ledger is locked by another devsync process".to_string(),
            }
        })?;

        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            (a.kind.as_str(), &a.identity, &a.installed_path)
                .cmp(&(b.kind.as_str(), &b.identity, &b.installed_path))
        });
        let file = LedgerFile {
            version: LEDGER_VERSION,
            entries: sorted,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Serialize(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;

        fs2::FileExt::unlock(&lock_file)?;
        self.dirty = false;
        debug!(
            "saved ledger with {} entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, source: &str, path: &str) -> TrackingEntry {
        TrackingEntry {
            identity: identity.to_string(),
            kind: ComponentKind::Instruction,
            installed_path: path.to_string(),
            source: source.to_string(),
            source_ref: "main".to_string(),
            content_checksum: crate::hash::content_digest(identity.as_bytes()),
            installed_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(dir.path().join("installations.json")).unwrap();
        assert!(ledger.entries().is_empty());
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn test_corrupt_file_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installations.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Ledger::load(&path).unwrap_err();
        assert!(matches!(err, Error::LedgerCorrupt { .. }));
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installations.json");
        fs::write(&path, r#"{"version": 99, "entries": []}"#).unwrap();

        assert!(matches!(
            Ledger::load(&path),
            Err(Error::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".devsync/installations.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.upsert(entry("style", "github.com/org/pack", ".claude/rules/style.md"));
        ledger.upsert(entry("tests", "github.com/org/pack", ".claude/rules/tests.md"));
        assert!(ledger.is_dirty());
        ledger.save().unwrap();
        assert!(!ledger.is_dirty());

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.entries().len(), 2);
        assert_eq!(reloaded.entries(), ledger.entries());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("l.json")).unwrap();

        ledger.upsert(entry("style", "src-a", "style.md"));
        let mut updated = entry("style", "src-a", "style.md");
        updated.content_checksum = crate::hash::content_digest(b"v2");
        ledger.upsert(updated.clone());

        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].content_checksum, updated.content_checksum);
    }

    #[test]
    fn test_same_identity_different_path_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("l.json")).unwrap();

        ledger.upsert(entry("style", "src-a", "style.md"));
        ledger.upsert(entry("style", "src-b", "style-b.md"));

        assert_eq!(ledger.entries().len(), 2);
        let found = ledger.find_by_identity("style", ComponentKind::Instruction);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_remove_requires_exact_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("l.json")).unwrap();
        ledger.upsert(entry("style", "src-a", "style.md"));

        assert!(!ledger.remove("style", ComponentKind::Hook, "style.md"));
        assert!(!ledger.remove("style", ComponentKind::Instruction, "other.md"));
        assert!(ledger.remove("style", ComponentKind::Instruction, "style.md"));
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn test_saved_ledger_is_sorted_and_versioned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.json");
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.upsert(entry("zeta", "s", "z.md"));
        ledger.upsert(entry("alpha", "s", "a.md"));
        ledger.save().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["version"], 1);
        assert_eq!(parsed["entries"][0]["identity"], "alpha");
        assert_eq!(parsed["entries"][1]["identity"], "zeta");
        // Pretty output stays readable in version control
        assert!(raw.lines().count() > 4);
    }
}
