// src/conflict.rs

//! Three-way conflict classification
//!
//! A verdict relates three things: what is on disk now, what the ledger
//! says was installed, and what is about to be installed. Verdicts are
//! derived purely from checksums and tracked provenance; content is
//! never inspected semantically, so classification is deterministic and
//! repeatable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::component::IncomingComponent;
use crate::hash;
use crate::ledger::TrackingEntry;

/// Relationship between on-disk, tracked, and incoming content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing to do, or a fresh install into empty space
    NoConflict,
    /// Remote changed, local untouched since install: auto-applicable
    SafeUpdate,
    /// Local diverged from its tracked checksum, remote unchanged
    LocalModified,
    /// Local diverged and the incoming content also changed
    BothModified,
    /// Same identity tracked from a different source
    NameCollision,
    /// Same identity and source at a different source_ref
    UpgradeAvailable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NoConflict => "no_conflict",
            Verdict::SafeUpdate => "safe_update",
            Verdict::LocalModified => "local_modified",
            Verdict::BothModified => "both_modified",
            Verdict::NameCollision => "name_collision",
            Verdict::UpgradeAvailable => "upgrade_available",
        }
    }

    /// Whether resolving this verdict may overwrite existing bytes
    pub fn is_destructive(&self) -> bool {
        !matches!(self, Verdict::NoConflict)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The checksum-only decision table, ignoring source/source_ref.
///
/// `current_digest` is `None` when no file (or section) exists at the
/// target. A tracked entry whose file has been deleted counts as local
/// divergence: the user changed the target, and that must not be
/// silently papered over.
pub fn content_verdict(
    current_digest: Option<&str>,
    tracked: Option<&TrackingEntry>,
    incoming_digest: &str,
) -> Verdict {
    match (current_digest, tracked) {
        (Some(current), Some(entry)) => {
            let local_clean = current == entry.content_checksum;
            let remote_same = incoming_digest == entry.content_checksum;
            match (local_clean, remote_same) {
                (true, true) => Verdict::NoConflict,
                (true, false) => Verdict::SafeUpdate,
                (false, true) => Verdict::LocalModified,
                (false, false) => Verdict::BothModified,
            }
        }
        (None, Some(entry)) => {
            // Tracked but deleted locally
            if incoming_digest == entry.content_checksum {
                Verdict::LocalModified
            } else {
                Verdict::BothModified
            }
        }
        (Some(current), None) => {
            // Unmanaged pre-existing file: never silently overwritten
            if current == incoming_digest {
                Verdict::NoConflict
            } else {
                Verdict::LocalModified
            }
        }
        (None, None) => Verdict::NoConflict,
    }
}

/// Classify one install against disk and ledger state.
///
/// `NameCollision` (different source for the same identity) takes
/// precedence over everything; `UpgradeAvailable` (same source, new
/// source_ref, changed content) over the plain content verdicts it
/// wraps. Resolution treats an upgrade exactly as its underlying
/// content verdict — use [`content_verdict`] to recover it.
pub fn classify(
    current: Option<&[u8]>,
    tracked: Option<&TrackingEntry>,
    incoming: &IncomingComponent,
) -> Verdict {
    let current_digest = current.map(hash::content_digest);
    let incoming_digest = incoming.content_checksum();

    if let Some(entry) = tracked {
        if entry.source != incoming.source {
            return Verdict::NameCollision;
        }
    }

    let verdict = content_verdict(current_digest.as_deref(), tracked, &incoming_digest);

    if let Some(entry) = tracked {
        let ref_changed = entry.source_ref != incoming.source_ref;
        let content_changed = incoming_digest != entry.content_checksum;
        if ref_changed
            && content_changed
            && matches!(verdict, Verdict::SafeUpdate | Verdict::BothModified)
        {
            return Verdict::UpgradeAvailable;
        }
    }

    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, Layout};
    use chrono::Utc;
    use std::path::PathBuf;

    fn tracked(source: &str, source_ref: &str, content: &[u8]) -> TrackingEntry {
        TrackingEntry {
            identity: "style".to_string(),
            kind: ComponentKind::Instruction,
            installed_path: ".claude/rules/style.md".to_string(),
            source: source.to_string(),
            source_ref: source_ref.to_string(),
            content_checksum: hash::content_digest(content),
            installed_at: Utc::now(),
        }
    }

    fn incoming(source: &str, source_ref: &str, content: &[u8]) -> IncomingComponent {
        IncomingComponent {
            identity: "style".to_string(),
            kind: ComponentKind::Instruction,
            target_path: PathBuf::from(".claude/rules/style.md"),
            layout: Layout::MultiFile,
            source: source.to_string(),
            source_ref: source_ref.to_string(),
            content: content.to_vec(),
            declared_checksum: None,
        }
    }

    #[test]
    fn test_tracked_decision_table() {
        let entry = tracked("src", "v1", b"installed");

        // current == tracked, incoming == tracked
        assert_eq!(
            classify(Some(b"installed"), Some(&entry), &incoming("src", "v1", b"installed")),
            Verdict::NoConflict
        );
        // current == tracked, incoming changed
        assert_eq!(
            classify(Some(b"installed"), Some(&entry), &incoming("src", "v1", b"newer")),
            Verdict::SafeUpdate
        );
        // current changed, incoming == tracked
        assert_eq!(
            classify(Some(b"edited"), Some(&entry), &incoming("src", "v1", b"installed")),
            Verdict::LocalModified
        );
        // both changed
        assert_eq!(
            classify(Some(b"edited"), Some(&entry), &incoming("src", "v1", b"newer")),
            Verdict::BothModified
        );
    }

    #[test]
    fn test_untracked_existing_file() {
        assert_eq!(
            classify(Some(b"same"), None, &incoming("src", "v1", b"same")),
            Verdict::NoConflict
        );
        assert_eq!(
            classify(Some(b"theirs"), None, &incoming("src", "v1", b"ours")),
            Verdict::LocalModified
        );
    }

    #[test]
    fn test_fresh_install() {
        assert_eq!(
            classify(None, None, &incoming("src", "v1", b"new")),
            Verdict::NoConflict
        );
    }

    #[test]
    fn test_tracked_but_deleted_locally() {
        let entry = tracked("src", "v1", b"installed");
        assert_eq!(
            classify(None, Some(&entry), &incoming("src", "v1", b"installed")),
            Verdict::LocalModified
        );
        assert_eq!(
            classify(None, Some(&entry), &incoming("src", "v1", b"newer")),
            Verdict::BothModified
        );
    }

    #[test]
    fn test_name_collision_beats_everything() {
        let entry = tracked("source-a", "v1", b"installed");
        // Even byte-identical content from another source collides
        assert_eq!(
            classify(
                Some(b"installed"),
                Some(&entry),
                &incoming("source-b", "v1", b"installed")
            ),
            Verdict::NameCollision
        );
        // And so does a would-be upgrade
        assert_eq!(
            classify(
                Some(b"installed"),
                Some(&entry),
                &incoming("source-b", "v2", b"newer")
            ),
            Verdict::NameCollision
        );
    }

    #[test]
    fn test_upgrade_available_wraps_safe_update() {
        let entry = tracked("src", "v1", b"installed");
        assert_eq!(
            classify(Some(b"installed"), Some(&entry), &incoming("src", "v2", b"newer")),
            Verdict::UpgradeAvailable
        );
        // The underlying content verdict is what resolution follows
        assert_eq!(
            content_verdict(
                Some(&hash::content_digest(b"installed")),
                Some(&entry),
                &hash::content_digest(b"newer")
            ),
            Verdict::SafeUpdate
        );
    }

    #[test]
    fn test_upgrade_available_wraps_both_modified() {
        let entry = tracked("src", "v1", b"installed");
        assert_eq!(
            classify(Some(b"edited"), Some(&entry), &incoming("src", "v2", b"newer")),
            Verdict::UpgradeAvailable
        );
    }

    #[test]
    fn test_ref_change_without_content_change_is_not_upgrade() {
        // A re-tag of identical content has nothing to surface
        let entry = tracked("src", "v1", b"installed");
        assert_eq!(
            classify(Some(b"installed"), Some(&entry), &incoming("src", "v2", b"installed")),
            Verdict::NoConflict
        );
        // Locally modified stays locally modified even across refs
        assert_eq!(
            classify(Some(b"edited"), Some(&entry), &incoming("src", "v2", b"installed")),
            Verdict::LocalModified
        );
    }

    #[test]
    fn test_classification_is_total_and_deterministic() {
        let entry = tracked("src", "v1", b"tracked");
        let currents: [Option<&[u8]>; 3] = [None, Some(b"tracked"), Some(b"edited")];
        let trackeds = [None, Some(&entry)];
        let incomings = [
            incoming("src", "v1", b"tracked"),
            incoming("src", "v1", b"newer"),
            incoming("other", "v1", b"tracked"),
            incoming("src", "v2", b"newer"),
        ];

        for current in currents {
            for tracked_entry in trackeds {
                for inc in &incomings {
                    let first = classify(current, tracked_entry, inc);
                    let second = classify(current, tracked_entry, inc);
                    assert_eq!(first, second);
                }
            }
        }
    }
}
