// src/commands/backups.rs

//! `devsync backups` / `restore` / `prune`: backup store maintenance

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::backup::BackupStore;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::paths;

pub fn list(project: &Path, days: Option<u32>) -> Result<()> {
    let store = BackupStore::new(paths::backups_dir(project));
    let since = days.map(|d| Utc::now() - Duration::days(i64::from(d)));
    let entries = store.list(since)?;

    if entries.is_empty() {
        println!("No backups.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}  {}", entry.bucket, entry.original_path);
    }
    println!("\n{} backup(s)", entries.len());
    Ok(())
}

pub fn restore(project: &Path, bucket: &str, original_path: &str) -> Result<()> {
    let store = BackupStore::new(paths::backups_dir(project));
    let entry = store
        .list(None)?
        .into_iter()
        .filter(|e| e.bucket == bucket && e.original_path == original_path)
        .next_back()
        .ok_or_else(|| {
            Error::NotFound(format!("no backup of {} in bucket {}", original_path, bucket))
        })?;

    let bytes = store.restore(&entry)?;
    let target = project.join(original_path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    // The restore itself is destructive, so back up what it replaces
    if target.exists() {
        let current = fs::read(&target)?;
        store.backup(Path::new(original_path), &current)?;
    }
    fs::write(&target, &bytes)?;
    println!("Restored {} from bucket {}", original_path, bucket);
    Ok(())
}

pub fn prune(project: &Path, days: u32, keep_latest: bool) -> Result<()> {
    let store = BackupStore::new(paths::backups_dir(project));

    // Keep-latest policy: still-tracked components retain one recovery
    // point regardless of age (configurable, on by default)
    let keep_for: HashSet<String> = if keep_latest {
        let ledger = Ledger::load(paths::ledger_path(project))?;
        ledger
            .entries()
            .iter()
            .map(|e| e.installed_path.clone())
            .collect()
    } else {
        HashSet::new()
    };

    let removed = store.cleanup(days, &keep_for)?;
    println!("Removed {} backup file(s) older than {} day(s)", removed, days);
    Ok(())
}
