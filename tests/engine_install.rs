// tests/engine_install.rs

//! Integration tests for the install/uninstall lifecycle.
//!
//! These tests exercise the engine end to end against a real temporary
//! project tree:
//! 1. Installs are idempotent and leave no duplicate tracker entries
//! 2. Safe updates back up the previous bytes before writing
//! 3. Conflicting installs honor the configured strategy
//! 4. Collisions never touch the existing installation
//! 5. Batches process components independently

use std::fs;
use std::path::{Path, PathBuf};

use devsync::{
    content_digest, paths, ComponentKind, Decision, Engine, IncomingComponent, InstallStatus,
    Layout, Ledger, SectionMarker, Strategy, Verdict,
};
use tempfile::TempDir;

fn project() -> (TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(dir.path());
    (dir, engine)
}

fn load_ledger(root: &Path) -> Ledger {
    Ledger::load(paths::ledger_path(root)).unwrap()
}

fn rule(identity: &str, content: &[u8], source_ref: &str) -> IncomingComponent {
    IncomingComponent {
        identity: identity.to_string(),
        kind: ComponentKind::Instruction,
        target_path: PathBuf::from(format!(".claude/rules/{}.md", identity)),
        layout: Layout::MultiFile,
        source: "github.com/org/practices".to_string(),
        source_ref: source_ref.to_string(),
        content: content.to_vec(),
        declared_checksum: None,
    }
}

#[test]
fn install_then_reinstall_is_a_noop() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());
    let component = rule("style", b"tabs, not spaces\n", "v1");

    let first = engine.install(&mut ledger, &component, None, None).unwrap();
    assert_eq!(first.status, InstallStatus::Installed);

    let ledger_bytes = fs::read(ledger.path()).unwrap();
    let file_bytes = fs::read(dir.path().join(".claude/rules/style.md")).unwrap();

    let second = engine.install(&mut ledger, &component, None, None).unwrap();
    assert_eq!(second.verdict, Verdict::NoConflict);
    assert_eq!(second.status, InstallStatus::AlreadyCurrent);

    // No filesystem diff, no ledger churn, no duplicate entries
    assert_eq!(fs::read(ledger.path()).unwrap(), ledger_bytes);
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/style.md")).unwrap(),
        file_bytes
    );
    assert_eq!(ledger.entries().len(), 1);
}

#[test]
fn safe_update_scenario_end_to_end() {
    // The full §SAFE_UPDATE example: tracked c1, on-disk c1, incoming c2
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("style", b"content c1", "v1"), None, None)
        .unwrap();

    let outcome = engine
        .install(&mut ledger, &rule("style", b"content c2", "v1"), None, None)
        .unwrap();
    assert_eq!(outcome.verdict, Verdict::SafeUpdate);

    // File and tracker both carry c2 now
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/style.md")).unwrap(),
        b"content c2"
    );
    let reloaded = load_ledger(dir.path());
    assert_eq!(reloaded.entries().len(), 1);
    assert_eq!(
        reloaded.entries()[0].content_checksum,
        content_digest(b"content c2")
    );

    // Exactly one backup exists and it holds the c1 bytes
    let backups = engine.backups().list(None).unwrap();
    assert_eq!(backups.len(), 1);
    let restored = engine.backups().restore(&backups[0]).unwrap();
    assert_eq!(content_digest(&restored), content_digest(b"content c1"));
}

#[test]
fn rename_strategy_keeps_both_files() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("style", b"upstream v1", "v1"), None, None)
        .unwrap();
    fs::write(dir.path().join(".claude/rules/style.md"), b"local edits").unwrap();

    engine
        .install(
            &mut ledger,
            &rule("style", b"upstream v2", "v1"),
            Some(Strategy::Rename),
            None,
        )
        .unwrap();

    // {style.md, style-1.md} both exist; the -1 file preserves the edits
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/style.md")).unwrap(),
        b"upstream v2"
    );
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/style-1.md")).unwrap(),
        b"local edits"
    );

    // The tracker entry for style.md reflects the new content
    let reloaded = load_ledger(dir.path());
    let entry = reloaded
        .find_exact("style", ComponentKind::Instruction, ".claude/rules/style.md")
        .unwrap();
    assert_eq!(entry.content_checksum, content_digest(b"upstream v2"));
    // And nothing tracks the renamed copy
    assert!(reloaded.find_by_path(".claude/rules/style-1.md").is_none());
}

#[test]
fn collision_leaves_first_source_intact() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("lint", b"from A", "v1"), None, None)
        .unwrap();
    let entry_before = ledger.entries()[0].clone();

    let mut from_b = rule("lint", b"from B", "v1");
    from_b.source = "github.com/else/practices".to_string();

    let err = engine
        .install(&mut ledger, &from_b, Some(Strategy::Overwrite), None)
        .unwrap_err();
    assert!(matches!(err, devsync::Error::Collision { .. }));

    // The A installation and its tracker entry are untouched
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/lint.md")).unwrap(),
        b"from A"
    );
    let reloaded = load_ledger(dir.path());
    assert_eq!(reloaded.entries().len(), 1);
    assert_eq!(reloaded.entries()[0], entry_before);
}

#[test]
fn batch_with_one_failure_installs_the_rest() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    // Seed a collision so exactly one batch member fails
    engine
        .install(&mut ledger, &rule("taken", b"original", "v1"), None, None)
        .unwrap();
    let mut colliding = rule("taken", b"usurper", "v1");
    colliding.source = "github.com/else/practices".to_string();

    let batch = vec![
        rule("a", b"1", "v1"),
        rule("b", b"2", "v1"),
        colliding,
        rule("c", b"3", "v1"),
        rule("d", b"4", "v1"),
    ];

    let results = engine
        .batch_install(&mut ledger, &batch, Some(Strategy::Overwrite))
        .unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(results.iter().filter(|r| r.result.is_err()).count(), 1);
    for name in ["a", "b", "c", "d"] {
        assert!(
            dir.path()
                .join(format!(".claude/rules/{}.md", name))
                .exists(),
            "{} should have installed despite the failure",
            name
        );
    }
    assert_eq!(
        fs::read(dir.path().join(".claude/rules/taken.md")).unwrap(),
        b"original"
    );
}

#[test]
fn batch_with_integrity_failure_installs_the_rest() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    let mut corrupted = rule("corrupted", b"actual bytes", "v1");
    corrupted.declared_checksum = Some(content_digest(b"what the manifest promised"));

    let batch = vec![
        rule("one", b"1", "v1"),
        rule("two", b"2", "v1"),
        corrupted,
        rule("three", b"3", "v1"),
        rule("four", b"4", "v1"),
    ];

    let results = engine.batch_install(&mut ledger, &batch, None).unwrap();

    let failures: Vec<_> = results.iter().filter(|r| r.result.is_err()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].identity, "corrupted");
    assert!(matches!(
        failures[0].result,
        Err(devsync::Error::ChecksumMismatch { .. })
    ));
    for name in ["one", "two", "three", "four"] {
        assert!(dir.path().join(format!(".claude/rules/{}.md", name)).exists());
    }
    assert!(!dir.path().join(".claude/rules/corrupted.md").exists());
}

#[test]
fn interrupted_transaction_is_recoverable_by_reclassification() {
    // Simulate a crash after the write but before the ledger flush: the
    // file changes while the tracker still holds the old checksum. The
    // next run must classify it as locally modified, not lose data.
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("style", b"v1", "v1"), None, None)
        .unwrap();
    // "Crash": the new content landed, the ledger was never updated
    fs::write(dir.path().join(".claude/rules/style.md"), b"v2").unwrap();

    let mut fresh_ledger = load_ledger(dir.path());
    let err = engine
        .install(&mut fresh_ledger, &rule("style", b"v2", "v1"), None, None)
        .unwrap_err();
    assert!(matches!(err, devsync::Error::StrategyRequired { .. }));

    // Overwrite reconciles and re-aligns the ledger
    let outcome = engine
        .install(
            &mut fresh_ledger,
            &rule("style", b"v2", "v1"),
            Some(Strategy::Overwrite),
            None,
        )
        .unwrap();
    assert_eq!(outcome.status, InstallStatus::Updated);
    assert_eq!(
        load_ledger(dir.path()).entries()[0].content_checksum,
        content_digest(b"v2")
    );
}

#[test]
fn upgrade_flow_records_new_ref() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("style", b"v1 body", "v1.0.0"), None, None)
        .unwrap();

    let outcome = engine
        .install(&mut ledger, &rule("style", b"v2 body", "v2.0.0"), None, None)
        .unwrap();
    assert_eq!(outcome.verdict, Verdict::UpgradeAvailable);

    let reloaded = load_ledger(dir.path());
    assert_eq!(reloaded.entries()[0].source_ref, "v2.0.0");
    assert_eq!(
        reloaded.entries()[0].content_checksum,
        content_digest(b"v2 body")
    );
}

#[test]
fn merge_decision_drives_both_modified_resolution() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    engine
        .install(&mut ledger, &rule("style", b"base", "v1"), None, None)
        .unwrap();
    fs::write(dir.path().join(".claude/rules/style.md"), b"local change").unwrap();

    let mut merge = |ctx: &devsync::ConflictContext<'_>| {
        assert!(ctx.both_diverged);
        let mut merged = ctx.current.unwrap_or_default().to_vec();
        merged.extend_from_slice(b" + ");
        merged.extend_from_slice(ctx.incoming);
        Decision::Apply(merged)
    };

    engine
        .install(
            &mut ledger,
            &rule("style", b"remote change", "v1"),
            Some(Strategy::Merge),
            Some(&mut merge),
        )
        .unwrap();

    assert_eq!(
        fs::read(dir.path().join(".claude/rules/style.md")).unwrap(),
        b"local change + remote change"
    );
    // The pre-merge local bytes are recoverable
    let backups = engine.backups().list(None).unwrap();
    assert_eq!(backups.len(), 1);
}

#[test]
fn shared_file_sections_coexist_and_uninstall_cleanly() {
    let (dir, engine) = project();
    let mut ledger = load_ledger(dir.path());

    let span = |identity: &str, content: &[u8]| IncomingComponent {
        identity: identity.to_string(),
        kind: ComponentKind::Instruction,
        target_path: PathBuf::from("AGENTS.md"),
        layout: Layout::SingleFileSection {
            marker: SectionMarker::for_identity(identity),
        },
        source: "github.com/org/practices".to_string(),
        source_ref: "v1".to_string(),
        content: content.to_vec(),
        declared_checksum: None,
    };

    engine
        .install(&mut ledger, &span("conventions", b"write tests"), None, None)
        .unwrap();
    engine
        .install(&mut ledger, &span("security", b"no secrets in code"), None, None)
        .unwrap();

    let agents = fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
    assert!(agents.contains("<!-- devsync:start:conventions -->"));
    assert!(agents.contains("<!-- devsync:start:security -->"));

    engine
        .uninstall(
            &mut ledger,
            "conventions",
            ComponentKind::Instruction,
            None,
            true,
        )
        .unwrap();

    let agents = fs::read_to_string(dir.path().join("AGENTS.md")).unwrap();
    assert!(!agents.contains("conventions"));
    assert!(agents.contains("no secrets in code"));
    assert_eq!(load_ledger(dir.path()).entries().len(), 1);
}
