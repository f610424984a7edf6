// src/component.rs

//! Data model for detected and incoming components
//!
//! A component is one installable unit of development-practice
//! configuration: an instruction file, an MCP server config, a hook,
//! a command, a skill directory, a workflow, a memory file, or an
//! opaque resource. Detection materializes components from disk;
//! installation receives them as (target path, content blob) pairs
//! from an upstream package loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::hash;

/// The kinds of installable configuration artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Instruction,
    McpServer,
    Hook,
    Command,
    Skill,
    Workflow,
    MemoryFile,
    Resource,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 8] = [
        ComponentKind::Instruction,
        ComponentKind::McpServer,
        ComponentKind::Hook,
        ComponentKind::Command,
        ComponentKind::Skill,
        ComponentKind::Workflow,
        ComponentKind::MemoryFile,
        ComponentKind::Resource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Instruction => "instruction",
            ComponentKind::McpServer => "mcp_server",
            ComponentKind::Hook => "hook",
            ComponentKind::Command => "command",
            ComponentKind::Skill => "skill",
            ComponentKind::Workflow => "workflow",
            ComponentKind::MemoryFile => "memory_file",
            ComponentKind::Resource => "resource",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "instruction" | "instructions" | "rules" => Ok(ComponentKind::Instruction),
            "mcp_server" | "mcp_servers" | "mcp" => Ok(ComponentKind::McpServer),
            "hook" | "hooks" => Ok(ComponentKind::Hook),
            "command" | "commands" => Ok(ComponentKind::Command),
            "skill" | "skills" => Ok(ComponentKind::Skill),
            "workflow" | "workflows" => Ok(ComponentKind::Workflow),
            "memory_file" | "memory_files" | "memory" => Ok(ComponentKind::MemoryFile),
            "resource" | "resources" => Ok(ComponentKind::Resource),
            _ => Err(format!("unknown component kind: {}", s)),
        }
    }
}

/// Delimiter pair isolating one component's span inside a shared file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarker {
    pub start: String,
    pub end: String,
}

impl SectionMarker {
    /// The standard marker pair embedding a component identity
    pub fn for_identity(identity: &str) -> Self {
        Self {
            start: format!("<!-- devsync:start:{} -->", identity),
            end: format!("<!-- devsync:end:{} -->", identity),
        }
    }
}

/// How a component materializes on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Layout {
    /// Its own file (or directory, for skills)
    MultiFile,
    /// A marker-delimited span inside a shared file (AGENTS.md and friends)
    SingleFileSection { marker: SectionMarker },
}

/// A detected or to-be-installed artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Stable name, unique within its kind and target location
    pub identity: String,
    pub kind: ComponentKind,
    /// Path relative to the project root where the artifact lives
    pub target_path: PathBuf,
    #[serde(flatten)]
    pub layout: Layout,
    /// Prefixed digest of current content
    pub content_checksum: String,
    /// Which tool's location the artifact was found in
    pub source_tool: String,
    /// Description from frontmatter, for skills and workflows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind-specific variant, e.g. the hook event or command style
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// A component arriving from an upstream source, ready to install
#[derive(Debug, Clone)]
pub struct IncomingComponent {
    pub identity: String,
    pub kind: ComponentKind,
    /// Install target, relative to the project root
    pub target_path: PathBuf,
    pub layout: Layout,
    /// Origin identifier: repository URL or local path
    pub source: String,
    /// Tag, branch, commit, or version string at the origin
    pub source_ref: String,
    pub content: Vec<u8>,
    /// Checksum declared by the source manifest; verified against the
    /// content before anything is written
    pub declared_checksum: Option<String>,
}

impl IncomingComponent {
    /// Ledger digest of the incoming content
    pub fn content_checksum(&self) -> String {
        hash::content_digest(&self.content)
    }
}

/// Non-fatal issue encountered during a detection scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl DetectionWarning {
    pub fn new(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for DetectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Normalized result of a detection scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub components: Vec<Component>,
    pub warnings: Vec<DetectionWarning>,
}

impl Inventory {
    /// Total number of detected components
    pub fn total(&self) -> usize {
        self.components.len()
    }

    /// Components of one kind, in detection order
    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind == kind)
    }

    /// Keep only components matching the given tool and kind filters.
    ///
    /// An empty filter keeps everything. Warnings are carried through
    /// unchanged. Resources are tool-agnostic and pass any tool filter.
    pub fn filter(mut self, tools: &[String], kinds: &[ComponentKind]) -> Self {
        let tool_set: Vec<String> = tools.iter().map(|t| t.to_lowercase()).collect();
        self.components.retain(|c| {
            let tool_ok = tool_set.is_empty()
                || c.kind == ComponentKind::Resource
                || tool_set.contains(&c.source_tool.to_lowercase());
            let kind_ok = kinds.is_empty() || kinds.contains(&c.kind);
            tool_ok && kind_ok
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(identity: &str, kind: ComponentKind, tool: &str) -> Component {
        Component {
            identity: identity.to_string(),
            kind,
            target_path: PathBuf::from(format!("{}.md", identity)),
            layout: Layout::MultiFile,
            content_checksum: hash::content_digest(identity.as_bytes()),
            source_tool: tool.to_string(),
            description: None,
            variant: None,
        }
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.as_str().parse::<ComponentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_accepts_plurals() {
        assert_eq!(
            "instructions".parse::<ComponentKind>().unwrap(),
            ComponentKind::Instruction
        );
        assert_eq!(
            "mcp".parse::<ComponentKind>().unwrap(),
            ComponentKind::McpServer
        );
        assert!("widget".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_section_marker_embeds_identity() {
        let marker = SectionMarker::for_identity("code-style");
        assert_eq!(marker.start, "<!-- devsync:start:code-style -->");
        assert_eq!(marker.end, "<!-- devsync:end:code-style -->");
    }

    #[test]
    fn test_inventory_filter_by_tool() {
        let inv = Inventory {
            components: vec![
                component("a", ComponentKind::Instruction, "claude"),
                component("b", ComponentKind::Instruction, "cursor"),
                component("r", ComponentKind::Resource, "devsync"),
            ],
            warnings: vec![],
        };
        let filtered = inv.filter(&["claude".to_string()], &[]);
        // Resources are tool-agnostic, so they survive the tool filter
        assert_eq!(filtered.total(), 2);
        assert!(filtered.components.iter().any(|c| c.identity == "a"));
        assert!(filtered.components.iter().any(|c| c.identity == "r"));
    }

    #[test]
    fn test_inventory_filter_by_kind() {
        let inv = Inventory {
            components: vec![
                component("a", ComponentKind::Instruction, "claude"),
                component("h", ComponentKind::Hook, "claude"),
            ],
            warnings: vec![],
        };
        let filtered = inv.filter(&[], &[ComponentKind::Hook]);
        assert_eq!(filtered.total(), 1);
        assert_eq!(filtered.components[0].identity, "h");
    }

    #[test]
    fn test_incoming_checksum_matches_content() {
        let incoming = IncomingComponent {
            identity: "x".to_string(),
            kind: ComponentKind::Instruction,
            target_path: PathBuf::from("x.md"),
            layout: Layout::MultiFile,
            source: "local".to_string(),
            source_ref: "v1".to_string(),
            content: b"body".to_vec(),
            declared_checksum: None,
        };
        assert_eq!(incoming.content_checksum(), hash::content_digest(b"body"));
    }
}
