// src/commands/install.rs

//! `devsync install`: install components from a resolved source tree
//!
//! The source directory is laid out like a project (the same layout the
//! detector understands), so loading it is a detection scan over the
//! source followed by reading each component's bytes. Skills expand to
//! one installable unit per contained file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::component::{ComponentKind, IncomingComponent, Layout};
use crate::detect::Detector;
use crate::engine::{Engine, InstallStatus, Strategy};
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::{conflict, paths};

pub struct InstallReport {
    pub installed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl InstallReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    project: &Path,
    source_dir: &Path,
    source: Option<&str>,
    source_ref: &str,
    strategy: Option<&str>,
    dry_run: bool,
) -> Result<InstallReport> {
    let strategy = strategy
        .map(|s| s.parse::<Strategy>().map_err(Error::InvalidPath))
        .transpose()?;

    let source_label = source
        .map(str::to_string)
        .unwrap_or_else(|| source_dir.display().to_string());
    let components = load_source_components(source_dir, &source_label, source_ref)?;
    if components.is_empty() {
        println!("Nothing to install from {}", source_dir.display());
        return Ok(InstallReport {
            installed: 0,
            updated: 0,
            skipped: 0,
            unchanged: 0,
            failed: 0,
        });
    }

    let engine = Engine::new(project);
    let mut ledger = Ledger::load(paths::ledger_path(project))?;

    if dry_run {
        return classify_only(project, &engine, &ledger, &components);
    }

    let results = engine.batch_install(&mut ledger, &components, strategy)?;

    let mut report = InstallReport {
        installed: 0,
        updated: 0,
        skipped: 0,
        unchanged: 0,
        failed: 0,
    };
    for item in &results {
        match &item.result {
            Ok(outcome) => {
                let label = match outcome.status {
                    InstallStatus::Installed => {
                        report.installed += 1;
                        "installed"
                    }
                    InstallStatus::Updated => {
                        report.updated += 1;
                        "updated"
                    }
                    InstallStatus::Skipped => {
                        report.skipped += 1;
                        "skipped"
                    }
                    InstallStatus::AlreadyCurrent => {
                        report.unchanged += 1;
                        "up to date"
                    }
                };
                let mut line = format!("{:<12} {} ({})", label, outcome.identity, outcome.kind);
                if let Some(renamed) = &outcome.renamed_to {
                    line.push_str(&format!(", local copy kept as {}", renamed.display()));
                }
                println!("{}", line);
                if let Some(warning) = &outcome.consistency_warning {
                    println!("  warning: {}", warning);
                }
            }
            Err(e) => {
                report.failed += 1;
                println!("{:<12} {} ({}): {}", "failed", item.identity, item.kind, e);
            }
        }
    }

    println!(
        "\n{} installed, {} updated, {} unchanged, {} skipped, {} failed",
        report.installed, report.updated, report.unchanged, report.skipped, report.failed
    );
    Ok(report)
}

/// Report what a real run would do, component by component, writing nothing
fn classify_only(
    project: &Path,
    _engine: &Engine,
    ledger: &Ledger,
    components: &[IncomingComponent],
) -> Result<InstallReport> {
    for incoming in components {
        let target = project.join(&incoming.target_path);
        let current = if target.exists() {
            match &incoming.layout {
                Layout::MultiFile => Some(fs::read(&target)?),
                Layout::SingleFileSection { .. } => {
                    let text = fs::read_to_string(&target)?;
                    crate::section::extract(&text, &incoming.identity)
                        .map(|body| body.as_bytes().to_vec())
                }
            }
        } else {
            None
        };
        let tracked = ledger.find_exact(
            &incoming.identity,
            incoming.kind,
            &paths::to_portable(&incoming.target_path),
        );
        let verdict = conflict::classify(current.as_deref(), tracked, incoming);
        println!("{:<20} {} ({})", verdict.to_string(), incoming.identity, incoming.kind);
    }
    Ok(InstallReport {
        installed: 0,
        updated: 0,
        skipped: 0,
        unchanged: 0,
        failed: 0,
    })
}

/// Turn a resolved source tree into installable units.
///
/// Detection runs against the source directory; each detected component
/// contributes its bytes at the same relative target path. Skill
/// directories expand to one unit per file so the engine stays
/// file-level.
pub fn load_source_components(
    source_dir: &Path,
    source: &str,
    source_ref: &str,
) -> Result<Vec<IncomingComponent>> {
    if !source_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "source directory {} does not exist",
            source_dir.display()
        )));
    }

    let inventory = Detector::new(source_dir).detect_all();
    for warning in &inventory.warnings {
        warn!("source scan: {}", warning);
    }

    let mut components = Vec::new();
    for detected in &inventory.components {
        let abs = source_dir.join(&detected.target_path);
        match detected.kind {
            ComponentKind::Skill => {
                for file in WalkDir::new(&abs)
                    .min_depth(1)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    let rel = file
                        .path()
                        .strip_prefix(source_dir)
                        .map_err(|_| Error::InvalidPath(file.path().display().to_string()))?;
                    components.push(IncomingComponent {
                        identity: detected.identity.clone(),
                        kind: ComponentKind::Skill,
                        target_path: rel.to_path_buf(),
                        layout: Layout::MultiFile,
                        source: source.to_string(),
                        source_ref: source_ref.to_string(),
                        content: fs::read(file.path())?,
                        declared_checksum: None,
                    });
                }
            }
            // Servers found inside a tool's shared config are re-rendered
            // as standalone units under the tool-agnostic mcp directory
            ComponentKind::McpServer if detected.source_tool != "devsync" => {
                let json_key = crate::registry::by_name(&detected.source_tool)
                    .map(|cap| cap.mcp_servers_json_key)
                    .unwrap_or("mcpServers");
                let raw = fs::read_to_string(&abs)?;
                let parsed: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                let Some(server) = parsed
                    .get(json_key)
                    .and_then(|v| v.get(&detected.identity))
                else {
                    warn!(
                        "server '{}' vanished from {} between scans",
                        detected.identity,
                        detected.target_path.display()
                    );
                    continue;
                };
                let rendered = serde_json::to_string_pretty(server)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                components.push(IncomingComponent {
                    identity: detected.identity.clone(),
                    kind: ComponentKind::McpServer,
                    target_path: PathBuf::from(format!(
                        ".devsync/mcp/{}.json",
                        paths::safe_file_name(&detected.identity)
                    )),
                    layout: Layout::MultiFile,
                    source: source.to_string(),
                    source_ref: source_ref.to_string(),
                    content: rendered.into_bytes(),
                    declared_checksum: None,
                });
            }
            _ => {
                let content = match &detected.layout {
                    Layout::MultiFile => fs::read(&abs)?,
                    Layout::SingleFileSection { .. } => {
                        let text = fs::read_to_string(&abs)?;
                        crate::section::extract(&text, &detected.identity)
                            .map(|body| body.as_bytes().to_vec())
                            .unwrap_or_default()
                    }
                };
                // Resources carry the checksum recorded at scan time, so
                // content that changed underneath the scan is caught
                let declared_checksum = (detected.kind == ComponentKind::Resource)
                    .then(|| detected.content_checksum.clone());
                components.push(IncomingComponent {
                    identity: detected.identity.clone(),
                    kind: detected.kind,
                    target_path: detected.target_path.clone(),
                    layout: detected.layout.clone(),
                    source: source.to_string(),
                    source_ref: source_ref.to_string(),
                    content,
                    declared_checksum,
                });
            }
        }
    }
    Ok(components)
}
