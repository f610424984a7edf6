// src/detect.rs

//! Component detection scans
//!
//! Walks a project directory tree looking for existing configuration
//! artifacts at every location the tool registry knows about, and
//! materializes them as a normalized [`Inventory`]. The scan is strictly
//! read-only: missing directories mean zero matches, unreadable entries
//! become warnings, and nothing ever aborts the whole scan.
//!
//! Identities are stable across runs: derived from file names (extension
//! stripped), or for nested files from the path segments relative to the
//! kind's root joined with `-`. Duplicate identities within one kind are
//! resolved deterministically — candidates are sorted by path and the
//! lexicographically later one wins, with a warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::component::{
    Component, ComponentKind, DetectionWarning, Inventory, Layout, SectionMarker,
};
use crate::hash::{self, HashAlgorithm, Hasher};
use crate::paths;
use crate::registry::{self, ToolCapability};
use crate::section;

/// Resources above this size are skipped entirely
pub const MAX_RESOURCE_SIZE: u64 = 200 * 1024 * 1024;

/// Resources above this size are detected but flagged
pub const WARN_RESOURCE_SIZE: u64 = 50 * 1024 * 1024;

/// Directories never descended into when scanning for memory files
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "venv",
    ".venv",
    "__pycache__",
];

/// Hidden directories that are still scanned for memory files
const ALLOWED_HIDDEN: &[&str] = &[".claude", ".github"];

/// Read-only scanner over one project root
pub struct Detector {
    project_root: PathBuf,
    tool_filter: Vec<String>,
}

impl Detector {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            tool_filter: Vec::new(),
        }
    }

    /// Restrict the scan to the named tools' locations
    pub fn with_tool_filter(mut self, tools: &[String]) -> Self {
        self.tool_filter = tools.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    fn tools(&self) -> impl Iterator<Item = &'static ToolCapability> + '_ {
        registry::REGISTRY.iter().filter(move |cap| {
            self.tool_filter.is_empty() || self.tool_filter.iter().any(|t| t == cap.name)
        })
    }

    /// Detect every component in the project.
    ///
    /// The result is order-independent: candidates are gathered, sorted,
    /// and deduplicated before they reach the inventory.
    pub fn detect_all(&self) -> Inventory {
        let mut warnings = Vec::new();
        let mut candidates = Vec::new();

        self.detect_instructions(&mut candidates, &mut warnings);
        self.detect_mcp_servers(&mut candidates, &mut warnings);
        self.detect_hooks(&mut candidates, &mut warnings);
        self.detect_commands(&mut candidates, &mut warnings);
        self.detect_skills(&mut candidates, &mut warnings);
        self.detect_workflows(&mut candidates, &mut warnings);
        self.detect_memory_files(&mut candidates, &mut warnings);
        self.detect_resources(&mut candidates, &mut warnings);

        let components = dedupe(candidates, &mut warnings);
        debug!(
            "detected {} components ({} warnings)",
            components.len(),
            warnings.len()
        );
        Inventory {
            components,
            warnings,
        }
    }

    // ---- per-kind scans ----

    fn detect_instructions(
        &self,
        out: &mut Vec<Component>,
        warnings: &mut Vec<DetectionWarning>,
    ) {
        for cap in self.tools() {
            if let Some(dir) = cap.instructions_dir {
                let dir_path = self.project_root.join(dir);
                if !dir_path.is_dir() {
                    continue;
                }
                for file in files_in(&dir_path, cap.recursive_instructions) {
                    let Some(ext) = matching_extension(&file, cap.instruction_extensions) else {
                        continue;
                    };
                    let identity = match identity_for(&dir_path, &file, ext, cap.recursive_instructions)
                    {
                        Some(identity) => identity,
                        None => continue,
                    };
                    match fs::read(&file) {
                        Ok(bytes) => out.push(Component {
                            identity,
                            kind: ComponentKind::Instruction,
                            target_path: self.relative(&file),
                            layout: Layout::MultiFile,
                            content_checksum: hash::content_digest(&bytes),
                            source_tool: cap.name.to_string(),
                            description: None,
                            variant: None,
                        }),
                        Err(e) => warnings.push(DetectionWarning::new(
                            Some(self.relative(&file)),
                            format!("failed to read instruction: {}", e),
                        )),
                    }
                }
            }

            if let Some(single) = cap.single_instruction_file {
                self.detect_single_file(cap, single, out, warnings);
            }
        }
    }

    /// A shared single-file target: one component per managed span, or the
    /// whole file as one unmanaged component when no markers are present
    fn detect_single_file(
        &self,
        cap: &ToolCapability,
        relative: &str,
        out: &mut Vec<Component>,
        warnings: &mut Vec<DetectionWarning>,
    ) {
        let file = self.project_root.join(relative);
        if !file.is_file() {
            return;
        }
        let text = match fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) => {
                warnings.push(DetectionWarning::new(
                    Some(PathBuf::from(relative)),
                    format!("failed to read instruction file: {}", e),
                ));
                return;
            }
        };

        let spans = section::identities(&text);
        if spans.is_empty() {
            let identity = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| relative.to_string());
            out.push(Component {
                identity,
                kind: ComponentKind::Instruction,
                target_path: PathBuf::from(relative),
                layout: Layout::MultiFile,
                content_checksum: hash::content_digest(text.as_bytes()),
                source_tool: cap.name.to_string(),
                description: None,
                variant: None,
            });
            return;
        }

        for identity in spans {
            let Some(body) = section::extract(&text, &identity) else {
                warnings.push(DetectionWarning::new(
                    Some(PathBuf::from(relative)),
                    format!("unterminated section markers for '{}'", identity),
                ));
                continue;
            };
            out.push(Component {
                identity: identity.clone(),
                kind: ComponentKind::Instruction,
                target_path: PathBuf::from(relative),
                layout: Layout::SingleFileSection {
                    marker: SectionMarker::for_identity(&identity),
                },
                content_checksum: hash::content_digest(body.as_bytes()),
                source_tool: cap.name.to_string(),
                description: None,
                variant: None,
            });
        }
    }

    fn detect_mcp_servers(
        &self,
        out: &mut Vec<Component>,
        warnings: &mut Vec<DetectionWarning>,
    ) {
        for cap in self.tools() {
            let Some(config_rel) = cap.mcp_project_config else {
                continue;
            };
            let config_path = self.project_root.join(config_rel);
            if !config_path.is_file() {
                continue;
            }

            let parsed: serde_json::Value = match fs::read_to_string(&config_path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
            {
                Ok(value) => value,
                Err(e) => {
                    warnings.push(DetectionWarning::new(
                        Some(PathBuf::from(config_rel)),
                        format!("invalid MCP config: {}", e),
                    ));
                    continue;
                }
            };

            let Some(servers) = parsed.get(cap.mcp_servers_json_key).and_then(|v| v.as_object())
            else {
                continue;
            };
            for (name, server) in servers {
                let canonical = server.to_string();
                let command = server
                    .get("command")
                    .and_then(|c| c.as_str())
                    .map(str::to_string);
                out.push(Component {
                    identity: name.clone(),
                    kind: ComponentKind::McpServer,
                    target_path: PathBuf::from(config_rel),
                    layout: Layout::MultiFile,
                    content_checksum: hash::content_digest(canonical.as_bytes()),
                    source_tool: cap.name.to_string(),
                    description: None,
                    variant: command,
                });
            }
        }

        // Tool-agnostic fallback: one JSON file per server
        let mcp_dir = paths::mcp_dir(&self.project_root);
        if mcp_dir.is_dir() {
            for file in files_in(&mcp_dir, false) {
                if file.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                match fs::read(&file) {
                    Ok(bytes) => out.push(Component {
                        identity: stem_of(&file),
                        kind: ComponentKind::McpServer,
                        target_path: self.relative(&file),
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: "devsync".to_string(),
                        description: None,
                        variant: None,
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(self.relative(&file)),
                        format!("failed to read MCP config: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_hooks(&self, out: &mut Vec<Component>, warnings: &mut Vec<DetectionWarning>) {
        for cap in self.tools() {
            let Some(dir) = cap.hooks_dir else { continue };
            let dir_path = self.project_root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }
            for file in files_in(&dir_path, false) {
                match fs::read(&file) {
                    Ok(bytes) => out.push(Component {
                        identity: stem_of(&file),
                        kind: ComponentKind::Hook,
                        target_path: self.relative(&file),
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: cap.name.to_string(),
                        description: None,
                        variant: Some(hook_event(&file).to_string()),
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(self.relative(&file)),
                        format!("failed to read hook: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_commands(&self, out: &mut Vec<Component>, warnings: &mut Vec<DetectionWarning>) {
        for cap in self.tools() {
            let Some(dir) = cap.commands_dir else { continue };
            let dir_path = self.project_root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }
            for file in files_in(&dir_path, false) {
                match fs::read(&file) {
                    Ok(bytes) => out.push(Component {
                        identity: stem_of(&file),
                        kind: ComponentKind::Command,
                        target_path: self.relative(&file),
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: cap.name.to_string(),
                        description: None,
                        variant: Some(command_style(&file).to_string()),
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(self.relative(&file)),
                        format!("failed to read command: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_skills(&self, out: &mut Vec<Component>, warnings: &mut Vec<DetectionWarning>) {
        for cap in self.tools() {
            let Some(dir) = cap.skills_dir else { continue };
            let dir_path = self.project_root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }
            let entries = match fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(e) => {
                    warnings.push(DetectionWarning::new(
                        Some(PathBuf::from(dir)),
                        format!("failed to scan skills: {}", e),
                    ));
                    continue;
                }
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let skill_dir = entry.path();
                if !skill_dir.is_dir() {
                    continue;
                }
                // A skill directory is only a skill if it carries its marker file
                let marker = ["SKILL.md", "Skill.md"]
                    .iter()
                    .map(|name| skill_dir.join(name))
                    .find(|p| p.is_file());
                let Some(marker) = marker else {
                    debug!("skipping {} (no SKILL.md)", skill_dir.display());
                    continue;
                };

                match dir_digest(&skill_dir) {
                    Ok(checksum) => out.push(Component {
                        identity: entry.file_name().to_string_lossy().into_owned(),
                        kind: ComponentKind::Skill,
                        target_path: self.relative(&skill_dir),
                        layout: Layout::MultiFile,
                        content_checksum: checksum,
                        source_tool: cap.name.to_string(),
                        description: frontmatter_description(&marker),
                        variant: None,
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(self.relative(&skill_dir)),
                        format!("failed to checksum skill: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_workflows(&self, out: &mut Vec<Component>, warnings: &mut Vec<DetectionWarning>) {
        for cap in self.tools() {
            let Some(dir) = cap.workflows_dir else { continue };
            let dir_path = self.project_root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }
            for file in files_in(&dir_path, true) {
                let is_workflow = file
                    .extension()
                    .is_some_and(|e| e == "md" || e == "yaml" || e == "yml");
                if !is_workflow {
                    continue;
                }
                match fs::read(&file) {
                    Ok(bytes) => out.push(Component {
                        identity: stem_of(&file),
                        kind: ComponentKind::Workflow,
                        target_path: self.relative(&file),
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: cap.name.to_string(),
                        description: frontmatter_description(&file),
                        variant: None,
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(self.relative(&file)),
                        format!("failed to read workflow: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_memory_files(
        &self,
        out: &mut Vec<Component>,
        warnings: &mut Vec<DetectionWarning>,
    ) {
        // Each memory file name maps to the first tool claiming it
        let mut names: BTreeMap<&'static str, &'static str> = BTreeMap::new();
        for cap in self.tools() {
            if let Some(name) = cap.memory_file {
                names.entry(name).or_insert(cap.name);
            }
        }

        for (file_name, tool) in names {
            let stem = Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string());

            // Root memory file
            let root_file = self.project_root.join(file_name);
            if root_file.is_file() {
                match fs::read(&root_file) {
                    Ok(bytes) => out.push(Component {
                        identity: stem.clone(),
                        kind: ComponentKind::MemoryFile,
                        target_path: PathBuf::from(file_name),
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: tool.to_string(),
                        description: None,
                        variant: Some("root".to_string()),
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(PathBuf::from(file_name)),
                        format!("failed to read memory file: {}", e),
                    )),
                }
            }

            // Nested memory files, skipping vendored and hidden trees
            let walker = WalkDir::new(&self.project_root)
                .min_depth(2)
                .into_iter()
                .filter_entry(|e| {
                    if e.depth() == 0 || !e.file_type().is_dir() {
                        return true;
                    }
                    let name = e.file_name().to_string_lossy();
                    if IGNORED_DIRS.contains(&name.as_ref()) {
                        return false;
                    }
                    if name.starts_with('.') && !ALLOWED_HIDDEN.contains(&name.as_ref()) {
                        return false;
                    }
                    true
                });
            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() || entry.file_name() != file_name {
                    continue;
                }
                let rel = self.relative(entry.path());
                let parents: Vec<String> = rel
                    .parent()
                    .map(|p| {
                        p.components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect()
                    })
                    .unwrap_or_default();
                let identity = if parents.is_empty() {
                    stem.clone()
                } else {
                    format!("{}-{}", parents.join("-"), stem)
                };
                match fs::read(entry.path()) {
                    Ok(bytes) => out.push(Component {
                        identity,
                        kind: ComponentKind::MemoryFile,
                        target_path: rel,
                        layout: Layout::MultiFile,
                        content_checksum: hash::content_digest(&bytes),
                        source_tool: tool.to_string(),
                        description: None,
                        variant: None,
                    }),
                    Err(e) => warnings.push(DetectionWarning::new(
                        Some(rel),
                        format!("failed to read memory file: {}", e),
                    )),
                }
            }
        }
    }

    fn detect_resources(&self, out: &mut Vec<Component>, warnings: &mut Vec<DetectionWarning>) {
        let res_dir = paths::resources_dir(&self.project_root);
        if !res_dir.is_dir() {
            return;
        }
        for file in files_in(&res_dir, true) {
            let size = match fs::metadata(&file) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warnings.push(DetectionWarning::new(
                        Some(self.relative(&file)),
                        format!("failed to stat resource: {}", e),
                    ));
                    continue;
                }
            };
            if size > MAX_RESOURCE_SIZE {
                warnings.push(DetectionWarning::new(
                    Some(self.relative(&file)),
                    format!("resource exceeds {} byte limit, skipped", MAX_RESOURCE_SIZE),
                ));
                continue;
            }
            if size > WARN_RESOURCE_SIZE {
                warnings.push(DetectionWarning::new(
                    Some(self.relative(&file)),
                    format!("large resource ({} bytes)", size),
                ));
            }
            match hash::file_digest(&file) {
                Ok(checksum) => out.push(Component {
                    identity: stem_of(&file),
                    kind: ComponentKind::Resource,
                    target_path: self.relative(&file),
                    layout: Layout::MultiFile,
                    content_checksum: checksum,
                    source_tool: "devsync".to_string(),
                    description: None,
                    variant: None,
                }),
                Err(e) => warnings.push(DetectionWarning::new(
                    Some(self.relative(&file)),
                    format!("failed to checksum resource: {}", e),
                )),
            }
        }
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

// ---- helpers ----

/// Files directly in `dir`, or its whole tree when `recursive`
fn files_in(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// The first registered extension the file name ends with
fn matching_extension(file: &Path, extensions: &[&'static str]) -> Option<&'static str> {
    let name = file.file_name()?.to_string_lossy().to_lowercase();
    extensions.iter().copied().find(|ext| name.ends_with(ext))
}

/// Identity for an instruction file: name with the matched extension
/// stripped; nested paths join their segments with `-`
fn identity_for(root: &Path, file: &Path, ext: &str, recursive: bool) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    let portable = paths::to_portable(rel);
    // Extensions matched case-insensitively, so strip that way too
    let trimmed = if portable.to_lowercase().ends_with(ext) {
        &portable[..portable.len() - ext.len()]
    } else {
        &portable[..]
    };
    if trimmed.is_empty() {
        return None;
    }
    if recursive {
        Some(trimmed.replace('/', "-"))
    } else {
        Some(trimmed.to_string())
    }
}

fn stem_of(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hook event inferred from the file name; metadata only
fn hook_event(file: &Path) -> &'static str {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("pretooluse") || name.contains("pre-tool") {
        "PreToolUse"
    } else if name.contains("posttooluse") || name.contains("post-tool") {
        "PostToolUse"
    } else if name.contains("notification") {
        "Notification"
    } else if name.contains("stop") {
        "Stop"
    } else {
        "Unknown"
    }
}

/// Command style inferred from the extension; metadata only
fn command_style(file: &Path) -> &'static str {
    match file.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        Some(ext) if ext == "md" || ext == "txt" => "slash",
        _ => "shell",
    }
}

/// Canonical digest of a directory-based component: every file in sorted
/// relative-path order, each contributing its path, a NUL, its bytes,
/// and a NUL
fn dir_digest(dir: &Path) -> crate::error::Result<String> {
    let mut hasher = Hasher::new(HashAlgorithm::Sha256);
    for file in files_in(dir, true) {
        let rel = file.strip_prefix(dir).unwrap_or(&file);
        hasher.update(paths::to_portable(rel).as_bytes());
        hasher.update(&[0]);
        hasher.update(&fs::read(&file)?);
        hasher.update(&[0]);
    }
    Ok(hasher.finalize().to_prefixed_string())
}

/// `description:` value from a YAML frontmatter block, if any
fn frontmatter_description(file: &Path) -> Option<String> {
    let content = fs::read_to_string(file).ok()?;
    let rest = content.strip_prefix("---")?;
    let end = rest.find("---")?;
    for line in rest[..end].lines() {
        if let Some(value) = line.strip_prefix("description:") {
            let cleaned = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !cleaned.is_empty() {
                return Some(cleaned.to_string());
            }
        }
    }
    None
}

/// Drop duplicate identities within a kind: candidates are ordered by
/// path, the later path wins, and each override is reported
fn dedupe(mut candidates: Vec<Component>, warnings: &mut Vec<DetectionWarning>) -> Vec<Component> {
    candidates.sort_by(|a, b| a.target_path.cmp(&b.target_path));

    let mut by_key: BTreeMap<(&'static str, String, String), Component> = BTreeMap::new();
    for component in candidates {
        // A span is identified by its shared file plus its identity, so
        // the path participates in the key only for section components
        let key = (
            component.kind.as_str(),
            component.identity.clone(),
            match &component.layout {
                Layout::SingleFileSection { .. } => {
                    paths::to_portable(&component.target_path)
                }
                Layout::MultiFile => String::new(),
            },
        );
        let winner = component.target_path.clone();
        if let Some(previous) = by_key.insert(key, component) {
            warnings.push(DetectionWarning::new(
                Some(previous.target_path.clone()),
                format!(
                    "duplicate {} identity '{}'; {} overrides it",
                    previous.kind,
                    previous.identity,
                    winner.display()
                ),
            ));
        }
    }

    let mut components: Vec<Component> = by_key.into_values().collect();
    components.sort_by(|a, b| {
        (a.kind.as_str(), &a.identity, &a.target_path)
            .cmp(&(b.kind.as_str(), &b.identity, &b.target_path))
    });
    components
}
