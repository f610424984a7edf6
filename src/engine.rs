// src/engine.rs

//! Conflict-safe component installation
//!
//! The engine is the only writer of target files and the ledger. For each
//! requested install it classifies the conflict, applies the configured
//! strategy (or defers to an injected decision function), backs up any
//! bytes it is about to destroy, performs the write, and commits the
//! result to the ledger.
//!
//! Transaction discipline: the write and the ledger update for one
//! component form one logical transaction. A failed write leaves the
//! ledger untouched. A failed ledger update after a successful write is
//! surfaced as a consistency warning on the outcome, never rolled back;
//! the next run re-classifies the file as locally modified against the
//! stale entry and recovers from there.

use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Component as PathComponent, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::backup::{BackupEntry, BackupStore};
use crate::component::{ComponentKind, IncomingComponent, Layout};
use crate::conflict::{self, Verdict};
use crate::error::{Error, Result};
use crate::hash;
use crate::ledger::{Ledger, TrackingEntry};
use crate::paths;
use crate::section;

/// How conflicts are resolved without asking anyone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Leave conflicting targets untouched
    Skip,
    /// Back up, then replace with incoming content
    Overwrite,
    /// Move the local file aside to a `-N` suffix, then install
    Rename,
    /// Ask the merge callback for reconciled content
    Merge,
    /// Ask the interactive callback to decide
    Interactive,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Strategy::Skip),
            "overwrite" => Ok(Strategy::Overwrite),
            "rename" => Ok(Strategy::Rename),
            "merge" => Ok(Strategy::Merge),
            "interactive" => Ok(Strategy::Interactive),
            _ => Err(format!("unknown strategy: {}", s)),
        }
    }
}

/// Everything a decision callback gets to see about one conflict
#[derive(Debug)]
pub struct ConflictContext<'a> {
    pub identity: &'a str,
    pub kind: ComponentKind,
    pub verdict: Verdict,
    /// True when local and incoming both diverged from the tracked state,
    /// so a three-way reconciliation is appropriate
    pub both_diverged: bool,
    pub current: Option<&'a [u8]>,
    pub incoming: &'a [u8],
    pub tracked_ref: Option<&'a str>,
    pub incoming_ref: &'a str,
}

/// What a decision callback chose to do
#[derive(Debug, Clone)]
pub enum Decision {
    /// Write these bytes (the incoming content, or a merge result —
    /// merge output is untrusted new content and gets the same backup
    /// discipline as any overwrite)
    Apply(Vec<u8>),
    /// Move the local file aside, then install the incoming content
    Rename,
    /// Leave the target and its ledger entry untouched
    Skip,
}

/// Decision callback signature shared by interactive and merge modes
pub type DecideFn<'a> = dyn FnMut(&ConflictContext<'_>) -> Decision + 'a;

/// Terminal state of one component install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    /// Fresh write, or adoption of an identical pre-existing file
    Installed,
    /// Existing content replaced (update, merge, or upgrade)
    Updated,
    /// Target already matches; nothing written, ledger untouched
    AlreadyCurrent,
    /// Conflict left unresolved by choice
    Skipped,
}

/// Result of one component install
#[derive(Debug)]
pub struct InstallOutcome {
    pub identity: String,
    pub kind: ComponentKind,
    pub verdict: Verdict,
    pub status: InstallStatus,
    pub backup: Option<BackupEntry>,
    /// Where the displaced local file went under the rename strategy
    pub renamed_to: Option<PathBuf>,
    /// Set when the file was written but the ledger update failed
    pub consistency_warning: Option<String>,
}

/// Per-component result of a batch install
#[derive(Debug)]
pub struct BatchItemResult {
    pub identity: String,
    pub kind: ComponentKind,
    pub result: Result<InstallOutcome>,
}

/// The resolution engine for one target project
pub struct Engine {
    project_root: PathBuf,
    backups: BackupStore,
}

impl Engine {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let backups = BackupStore::new(paths::backups_dir(&project_root));
        Self {
            project_root,
            backups,
        }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Install or update one component.
    ///
    /// `strategy` governs LOCAL_MODIFIED / BOTH_MODIFIED conflicts; when
    /// it is `None` those verdicts fail closed. `decide` supplies the
    /// interactive / merge callback and gates upgrades when present.
    pub fn install(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        strategy: Option<Strategy>,
        mut decide: Option<&mut DecideFn<'_>>,
    ) -> Result<InstallOutcome> {
        let target_abs = self.safe_target(&incoming.target_path)?;
        let portable = paths::to_portable(&incoming.target_path);

        // Integrity gate: content that does not match its declared
        // checksum is never written
        if let Some(expected) = &incoming.declared_checksum {
            hash::verify_bytes(&incoming.content, expected)?;
        }

        // Section spans are stored without surrounding newlines; normalize
        // the incoming blob the same way so re-installs stay idempotent
        let normalized;
        let incoming = if matches!(incoming.layout, Layout::SingleFileSection { .. }) {
            let trimmed = trim_newlines(&incoming.content);
            if trimmed.len() != incoming.content.len() {
                normalized = IncomingComponent {
                    content: trimmed.to_vec(),
                    ..incoming.clone()
                };
                &normalized
            } else {
                incoming
            }
        } else {
            incoming
        };

        let current = self.read_current(&target_abs, &incoming.layout, &incoming.identity)?;
        let tracked = ledger
            .find_exact(&incoming.identity, incoming.kind, &portable)
            .cloned();

        let verdict = conflict::classify(current.as_deref(), tracked.as_ref(), incoming);
        debug!(
            "classified {} '{}' at {} as {}",
            incoming.kind, incoming.identity, portable, verdict
        );

        match verdict {
            Verdict::NameCollision => {
                // Existing installation and its entry stay untouched; the
                // caller must supply a disambiguated target path instead.
                let existing_source = tracked
                    .as_ref()
                    .map(|e| e.source.clone())
                    .unwrap_or_default();
                Err(Error::Collision {
                    identity: incoming.identity.clone(),
                    existing_source,
                    incoming_source: incoming.source.clone(),
                })
            }
            Verdict::NoConflict => {
                self.apply_clean(ledger, incoming, &target_abs, current.as_deref(), tracked.as_ref())
            }
            Verdict::SafeUpdate => {
                let backup = self.backup_target(incoming, &target_abs)?;
                self.commit_write(
                    ledger,
                    incoming,
                    &target_abs,
                    &incoming.content,
                    Verdict::SafeUpdate,
                    InstallStatus::Updated,
                    backup,
                    None,
                )
            }
            Verdict::LocalModified | Verdict::BothModified => self.resolve_modified(
                ledger,
                incoming,
                &target_abs,
                current.as_deref(),
                tracked.as_ref(),
                verdict,
                strategy,
                decide.as_deref_mut(),
            ),
            Verdict::UpgradeAvailable => self.resolve_upgrade(
                ledger,
                incoming,
                &target_abs,
                current.as_deref(),
                tracked.as_ref(),
                strategy,
                decide.as_deref_mut(),
            ),
        }
    }

    /// Install many components under one uniform strategy.
    ///
    /// Components are processed independently and in order; one failure
    /// never aborts the rest. Only shared-state corruption does.
    pub fn batch_install(
        &self,
        ledger: &mut Ledger,
        components: &[IncomingComponent],
        strategy: Option<Strategy>,
    ) -> Result<Vec<BatchItemResult>> {
        let mut results = Vec::with_capacity(components.len());
        for incoming in components {
            match self.install(ledger, incoming, strategy, None) {
                // Shared state is broken; installing more would make it worse
                Err(Error::LedgerCorrupt { path, reason }) => {
                    return Err(Error::LedgerCorrupt { path, reason });
                }
                result => results.push(BatchItemResult {
                    identity: incoming.identity.clone(),
                    kind: incoming.kind,
                    result,
                }),
            }
        }
        Ok(results)
    }

    /// Remove one tracked component: its ledger entry and, optionally,
    /// its file (or section span). The displaced bytes are backed up
    /// before removal.
    pub fn uninstall(
        &self,
        ledger: &mut Ledger,
        identity: &str,
        kind: ComponentKind,
        installed_path: Option<&str>,
        remove_file: bool,
    ) -> Result<String> {
        let matches: Vec<TrackingEntry> = ledger
            .find_by_identity(identity, kind)
            .into_iter()
            .filter(|e| installed_path.is_none_or(|p| e.installed_path == p))
            .cloned()
            .collect();

        let entry = match matches.as_slice() {
            [] => {
                return Err(Error::NotFound(format!(
                    "no tracked {} named '{}'",
                    kind, identity
                )));
            }
            [single] => single.clone(),
            multiple => {
                let paths: Vec<&str> =
                    multiple.iter().map(|e| e.installed_path.as_str()).collect();
                return Err(Error::NotFound(format!(
                    "'{}' is installed at multiple paths ({}); specify one",
                    identity,
                    paths.join(", ")
                )));
            }
        };

        if remove_file {
            let rel = PathBuf::from(&entry.installed_path);
            let target_abs = self.safe_target(&rel)?;
            if target_abs.exists() {
                let raw = fs::read(&target_abs)?;
                self.backups.backup(&rel, &raw)?;

                // Section-managed components remove only their span
                let marker_start = section::start_marker(identity);
                let text = String::from_utf8_lossy(&raw);
                if text.contains(&marker_start) {
                    if let Some(remaining) = section::remove(&text, identity) {
                        if remaining.is_empty() {
                            fs::remove_file(&target_abs)?;
                        } else {
                            atomic_write(&target_abs, remaining.as_bytes())?;
                        }
                    }
                } else {
                    fs::remove_file(&target_abs)?;
                }
                info!("removed {} '{}' from {}", kind, identity, entry.installed_path);
            }
        }

        ledger.remove(identity, kind, &entry.installed_path);
        ledger.save()?;
        Ok(entry.installed_path)
    }

    // ---- verdict handlers ----

    fn apply_clean(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        target_abs: &Path,
        current: Option<&[u8]>,
        tracked: Option<&TrackingEntry>,
    ) -> Result<InstallOutcome> {
        let incoming_digest = incoming.content_checksum();

        if let Some(entry) = tracked {
            if entry.content_checksum == incoming_digest && entry.source_ref == incoming.source_ref
            {
                // True idempotent re-install: no filesystem diff, no
                // ledger churn
                return Ok(self.outcome(
                    incoming,
                    Verdict::NoConflict,
                    InstallStatus::AlreadyCurrent,
                    None,
                    None,
                    None,
                ));
            }
            // Same content under a new ref: record the ref, skip the write
            return self.commit_entry_only(incoming, ledger, Verdict::NoConflict);
        }

        if current.is_some() {
            // Identical unmanaged file: adopt it into the ledger as-is
            return self.commit_entry_only(incoming, ledger, Verdict::NoConflict);
        }

        // Fresh install
        self.commit_write(
            ledger,
            incoming,
            target_abs,
            &incoming.content,
            Verdict::NoConflict,
            InstallStatus::Installed,
            None,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_modified(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        target_abs: &Path,
        current: Option<&[u8]>,
        tracked: Option<&TrackingEntry>,
        verdict: Verdict,
        strategy: Option<Strategy>,
        decide: Option<&mut DecideFn<'_>>,
    ) -> Result<InstallOutcome> {
        let Some(strategy) = strategy else {
            // Refuse to guess: local edits are only destroyed on request
            return Err(Error::StrategyRequired {
                identity: incoming.identity.clone(),
                verdict: verdict.to_string(),
            });
        };

        match strategy {
            Strategy::Skip => {
                info!("skipping '{}': {}", incoming.identity, verdict);
                Ok(self.outcome(incoming, verdict, InstallStatus::Skipped, None, None, None))
            }
            Strategy::Overwrite => {
                let backup = self.backup_target(incoming, target_abs)?;
                self.commit_write(
                    ledger,
                    incoming,
                    target_abs,
                    &incoming.content,
                    verdict,
                    InstallStatus::Updated,
                    backup,
                    None,
                )
            }
            Strategy::Rename => {
                self.rename_aside(ledger, incoming, target_abs, verdict, &incoming.content)
            }
            Strategy::Merge | Strategy::Interactive => {
                let decide = decide.ok_or_else(|| Error::StrategyRequired {
                    identity: incoming.identity.clone(),
                    verdict: format!("{} (no decision callback supplied)", verdict),
                })?;
                let ctx = ConflictContext {
                    identity: &incoming.identity,
                    kind: incoming.kind,
                    verdict,
                    both_diverged: verdict == Verdict::BothModified,
                    current,
                    incoming: &incoming.content,
                    tracked_ref: tracked.map(|e| e.source_ref.as_str()),
                    incoming_ref: &incoming.source_ref,
                };
                match decide(&ctx) {
                    Decision::Skip => Ok(self.outcome(
                        incoming,
                        verdict,
                        InstallStatus::Skipped,
                        None,
                        None,
                        None,
                    )),
                    Decision::Rename => {
                        self.rename_aside(ledger, incoming, target_abs, verdict, &incoming.content)
                    }
                    Decision::Apply(resolved) => {
                        let backup = self.backup_target(incoming, target_abs)?;
                        self.commit_write(
                            ledger,
                            incoming,
                            target_abs,
                            &resolved,
                            verdict,
                            InstallStatus::Updated,
                            backup,
                            None,
                        )
                    }
                }
            }
        }
    }

    fn resolve_upgrade(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        target_abs: &Path,
        current: Option<&[u8]>,
        tracked: Option<&TrackingEntry>,
        strategy: Option<Strategy>,
        decide: Option<&mut DecideFn<'_>>,
    ) -> Result<InstallOutcome> {
        let current_digest = current.map(hash::content_digest);
        let underlying = conflict::content_verdict(
            current_digest.as_deref(),
            tracked,
            &incoming.content_checksum(),
        );

        // With a decision layer present, the upgrade is gated on it; a
        // refusal leaves the old version and its entry untouched.
        if let Some(decide) = decide {
            let ctx = ConflictContext {
                identity: &incoming.identity,
                kind: incoming.kind,
                verdict: Verdict::UpgradeAvailable,
                both_diverged: underlying == Verdict::BothModified,
                current,
                incoming: &incoming.content,
                tracked_ref: tracked.map(|e| e.source_ref.as_str()),
                incoming_ref: &incoming.source_ref,
            };
            return match decide(&ctx) {
                Decision::Skip => Ok(self.outcome(
                    incoming,
                    Verdict::UpgradeAvailable,
                    InstallStatus::Skipped,
                    None,
                    None,
                    None,
                )),
                Decision::Rename => self.rename_aside(
                    ledger,
                    incoming,
                    target_abs,
                    Verdict::UpgradeAvailable,
                    &incoming.content,
                ),
                Decision::Apply(resolved) => {
                    let backup = self.backup_target(incoming, target_abs)?;
                    self.commit_write(
                        ledger,
                        incoming,
                        target_abs,
                        &resolved,
                        Verdict::UpgradeAvailable,
                        InstallStatus::Updated,
                        backup,
                        None,
                    )
                }
            };
        }

        // Unattended: resolution treatment is identical to the underlying
        // content verdict, with the version context kept on the outcome.
        match underlying {
            Verdict::SafeUpdate => {
                info!(
                    "upgrading '{}' {} -> {}",
                    incoming.identity,
                    tracked.map(|e| e.source_ref.as_str()).unwrap_or("?"),
                    incoming.source_ref
                );
                let backup = self.backup_target(incoming, target_abs)?;
                self.commit_write(
                    ledger,
                    incoming,
                    target_abs,
                    &incoming.content,
                    Verdict::UpgradeAvailable,
                    InstallStatus::Updated,
                    backup,
                    None,
                )
            }
            _ => self.resolve_modified(
                ledger,
                incoming,
                target_abs,
                current,
                tracked,
                Verdict::UpgradeAvailable,
                strategy,
                None,
            ),
        }
    }

    // ---- mechanics ----

    /// Validate a component path and anchor it under the project root.
    ///
    /// Rejects absolute paths and any `..` component; a path that would
    /// escape the target tree is never written to.
    fn safe_target(&self, relative: &Path) -> Result<PathBuf> {
        if relative.as_os_str().is_empty() {
            return Err(Error::InvalidPath("empty target path".to_string()));
        }
        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                PathComponent::Normal(c) => normalized.push(c),
                PathComponent::CurDir => {}
                PathComponent::ParentDir => {
                    warn!("rejecting traversal in target path: {}", relative.display());
                    return Err(Error::InvalidPath(format!(
                        "target path escapes project root: {}",
                        relative.display()
                    )));
                }
                PathComponent::Prefix(_) | PathComponent::RootDir => {
                    return Err(Error::InvalidPath(format!(
                        "target path must be relative: {}",
                        relative.display()
                    )));
                }
            }
        }
        if normalized.as_os_str().is_empty() {
            return Err(Error::InvalidPath("empty target path".to_string()));
        }
        Ok(self.project_root.join(normalized))
    }

    /// Current bytes at the target: the file content, or for section
    /// components the body of their span inside the shared file
    fn read_current(
        &self,
        target_abs: &Path,
        layout: &Layout,
        identity: &str,
    ) -> Result<Option<Vec<u8>>> {
        if !target_abs.exists() {
            return Ok(None);
        }
        match layout {
            Layout::MultiFile => Ok(Some(fs::read(target_abs)?)),
            Layout::SingleFileSection { .. } => {
                let text = fs::read_to_string(target_abs)?;
                Ok(section::extract(&text, identity).map(|body| body.as_bytes().to_vec()))
            }
        }
    }

    /// Back up whatever the incoming write would destroy. For section
    /// components that is the whole shared file, so unrelated spans are
    /// recoverable too.
    fn backup_target(
        &self,
        incoming: &IncomingComponent,
        target_abs: &Path,
    ) -> Result<Option<BackupEntry>> {
        if !target_abs.exists() {
            return Ok(None);
        }
        let bytes = fs::read(target_abs)?;
        let entry = self.backups.backup(&incoming.target_path, &bytes)?;
        Ok(Some(entry))
    }

    /// Move the conflicting local file aside, then install at the
    /// original path. The rename preserves the local bytes, so it is the
    /// backup; only the original path is tracked.
    fn rename_aside(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        target_abs: &Path,
        verdict: Verdict,
        content: &[u8],
    ) -> Result<InstallOutcome> {
        if matches!(incoming.layout, Layout::SingleFileSection { .. }) {
            return Err(Error::InvalidPath(format!(
                "'{}' lives in a shared file; the rename strategy only applies to standalone files",
                incoming.identity
            )));
        }

        let renamed_abs = paths::first_free_rename(target_abs);
        fs::rename(target_abs, &renamed_abs)?;
        info!(
            "kept local '{}' as {}",
            incoming.identity,
            renamed_abs.display()
        );

        let renamed_rel = renamed_abs
            .strip_prefix(&self.project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| renamed_abs.clone());

        self.commit_write(
            ledger,
            incoming,
            target_abs,
            content,
            verdict,
            InstallStatus::Updated,
            None,
            Some(renamed_rel),
        )
    }

    /// Write content for the component, then commit its ledger entry.
    #[allow(clippy::too_many_arguments)]
    fn commit_write(
        &self,
        ledger: &mut Ledger,
        incoming: &IncomingComponent,
        target_abs: &Path,
        content: &[u8],
        verdict: Verdict,
        status: InstallStatus,
        backup: Option<BackupEntry>,
        renamed_to: Option<PathBuf>,
    ) -> Result<InstallOutcome> {
        // Filesystem first: a failed write must leave the ledger untouched
        let written_checksum = match &incoming.layout {
            Layout::MultiFile => {
                if let Some(parent) = target_abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                atomic_write(target_abs, content)?;
                hash::content_digest(content)
            }
            Layout::SingleFileSection { .. } => {
                let body = std::str::from_utf8(content).map_err(|_| {
                    Error::Serialize(format!(
                        "section content for '{}' is not UTF-8",
                        incoming.identity
                    ))
                })?;
                let existing = if target_abs.exists() {
                    fs::read_to_string(target_abs)?
                } else {
                    String::new()
                };
                let updated =
                    section::upsert(&existing, &incoming.identity, body.trim_end_matches('\n'));
                if let Some(parent) = target_abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                atomic_write(target_abs, updated.as_bytes())?;
                // The tracked digest covers the span body, which is what
                // classification reads back on the next run
                section::extract(&updated, &incoming.identity)
                    .map(|b| hash::content_digest(b.as_bytes()))
                    .unwrap_or_else(|| hash::content_digest(content))
            }
        };

        let entry = TrackingEntry {
            identity: incoming.identity.clone(),
            kind: incoming.kind,
            installed_path: paths::to_portable(&incoming.target_path),
            source: incoming.source.clone(),
            source_ref: incoming.source_ref.clone(),
            content_checksum: written_checksum,
            installed_at: Utc::now(),
        };
        ledger.upsert(entry);

        let consistency_warning = match ledger.save() {
            Ok(()) => None,
            Err(e) => {
                // The file is installed; losing the record is reported,
                // not undone
                warn!(
                    "'{}' installed but ledger update failed: {}",
                    incoming.identity, e
                );
                Some(format!("file installed but ledger update failed: {}", e))
            }
        };

        Ok(InstallOutcome {
            identity: incoming.identity.clone(),
            kind: incoming.kind,
            verdict,
            status,
            backup,
            renamed_to,
            consistency_warning,
        })
    }

    /// Commit a ledger entry without touching the file (adoption, or a
    /// content-identical re-tag)
    fn commit_entry_only(
        &self,
        incoming: &IncomingComponent,
        ledger: &mut Ledger,
        verdict: Verdict,
    ) -> Result<InstallOutcome> {
        let entry = TrackingEntry {
            identity: incoming.identity.clone(),
            kind: incoming.kind,
            installed_path: paths::to_portable(&incoming.target_path),
            source: incoming.source.clone(),
            source_ref: incoming.source_ref.clone(),
            content_checksum: incoming.content_checksum(),
            installed_at: Utc::now(),
        };
        ledger.upsert(entry);
        let consistency_warning = ledger.save().err().map(|e| {
            warn!("ledger update for '{}' failed: {}", incoming.identity, e);
            format!("ledger update failed: {}", e)
        });
        Ok(InstallOutcome {
            identity: incoming.identity.clone(),
            kind: incoming.kind,
            verdict,
            status: InstallStatus::Installed,
            backup: None,
            renamed_to: None,
            consistency_warning,
        })
    }

    fn outcome(
        &self,
        incoming: &IncomingComponent,
        verdict: Verdict,
        status: InstallStatus,
        backup: Option<BackupEntry>,
        renamed_to: Option<PathBuf>,
        consistency_warning: Option<String>,
    ) -> InstallOutcome {
        InstallOutcome {
            identity: incoming.identity.clone(),
            kind: incoming.kind,
            verdict,
            status,
            backup,
            renamed_to,
            consistency_warning,
        }
    }
}

/// Strip leading and trailing newlines, matching how span bodies are stored
fn trim_newlines(content: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = content.len();
    while start < end && content[start] == b'\n' {
        start += 1;
    }
    while end > start && content[end - 1] == b'\n' {
        end -= 1;
    }
    &content[start..end]
}

/// Write a file through a temp sibling and an atomic rename
fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no parent", target.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
