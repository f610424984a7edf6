// src/registry.rs

//! Static capability table for supported AI coding tools
//!
//! Each entry records where a tool keeps its configuration inside a
//! project: rule directories, MCP config files, hook/command/skill/
//! workflow directories, memory files, and single shared instruction
//! files managed through section markers. The table is fixed and
//! ordered; the detector walks it in order, so iteration order is the
//! detection priority order.

use crate::component::ComponentKind;

/// Install locations and conventions for one AI coding tool
#[derive(Debug, Clone, Copy)]
pub struct ToolCapability {
    /// Lowercase tool name used in filters and ledger provenance
    pub name: &'static str,
    /// Directory of individual instruction files, if the tool has one
    pub instructions_dir: Option<&'static str>,
    /// Accepted instruction file extensions for this tool
    pub instruction_extensions: &'static [&'static str],
    /// Whether the instructions directory is scanned recursively
    pub recursive_instructions: bool,
    /// Shared single-file instruction target managed via section markers
    pub single_instruction_file: Option<&'static str>,
    /// Project-level MCP config file
    pub mcp_project_config: Option<&'static str>,
    /// JSON key holding the server map inside the MCP config
    pub mcp_servers_json_key: &'static str,
    pub hooks_dir: Option<&'static str>,
    pub commands_dir: Option<&'static str>,
    pub skills_dir: Option<&'static str>,
    pub workflows_dir: Option<&'static str>,
    /// Memory file name detected at the project root and in subdirectories
    pub memory_file: Option<&'static str>,
}

impl ToolCapability {
    const fn base(name: &'static str) -> Self {
        Self {
            name,
            instructions_dir: None,
            instruction_extensions: &[".md"],
            recursive_instructions: false,
            single_instruction_file: None,
            mcp_project_config: None,
            mcp_servers_json_key: "mcpServers",
            hooks_dir: None,
            commands_dir: None,
            skills_dir: None,
            workflows_dir: None,
            memory_file: None,
        }
    }

    /// Whether this tool has any location for the given component kind
    pub fn supports(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Instruction => {
                self.instructions_dir.is_some() || self.single_instruction_file.is_some()
            }
            ComponentKind::McpServer => self.mcp_project_config.is_some(),
            ComponentKind::Hook => self.hooks_dir.is_some(),
            ComponentKind::Command => self.commands_dir.is_some(),
            ComponentKind::Skill => self.skills_dir.is_some(),
            ComponentKind::Workflow => self.workflows_dir.is_some(),
            ComponentKind::MemoryFile => self.memory_file.is_some(),
            // Resources live in the tool-agnostic .devsync tree
            ComponentKind::Resource => false,
        }
    }
}

/// The fixed, ordered capability table
pub static REGISTRY: &[ToolCapability] = &[
    ToolCapability {
        instructions_dir: Some(".claude/rules"),
        mcp_project_config: Some(".claude/settings.local.json"),
        hooks_dir: Some(".claude/hooks"),
        commands_dir: Some(".claude/commands"),
        skills_dir: Some(".claude/skills"),
        memory_file: Some("CLAUDE.md"),
        ..ToolCapability::base("claude")
    },
    ToolCapability {
        instructions_dir: Some(".cursor/rules"),
        instruction_extensions: &[".mdc", ".md"],
        mcp_project_config: Some(".cursor/mcp.json"),
        ..ToolCapability::base("cursor")
    },
    ToolCapability {
        instructions_dir: Some(".windsurf/rules"),
        workflows_dir: Some(".windsurf/workflows"),
        ..ToolCapability::base("windsurf")
    },
    ToolCapability {
        instructions_dir: Some(".kiro/steering"),
        ..ToolCapability::base("kiro")
    },
    ToolCapability {
        instructions_dir: Some(".clinerules"),
        ..ToolCapability::base("cline")
    },
    ToolCapability {
        instructions_dir: Some(".roo/rules"),
        mcp_project_config: Some(".roo/mcp.json"),
        commands_dir: Some(".roo/commands"),
        ..ToolCapability::base("roo")
    },
    ToolCapability {
        instructions_dir: Some(".github/instructions"),
        instruction_extensions: &[".instructions.md"],
        recursive_instructions: true,
        single_instruction_file: Some(".github/copilot-instructions.md"),
        mcp_project_config: Some(".vscode/mcp.json"),
        // VS Code uses "servers", not "mcpServers"
        mcp_servers_json_key: "servers",
        ..ToolCapability::base("copilot")
    },
    ToolCapability {
        single_instruction_file: Some("AGENTS.md"),
        ..ToolCapability::base("codex")
    },
    ToolCapability {
        single_instruction_file: Some("GEMINI.md"),
        ..ToolCapability::base("gemini")
    },
    ToolCapability {
        single_instruction_file: Some("CONVENTIONS.md"),
        ..ToolCapability::base("aider")
    },
];

/// Look up a tool by its lowercase name
pub fn by_name(name: &str) -> Option<&'static ToolCapability> {
    let lower = name.to_lowercase();
    REGISTRY.iter().find(|cap| cap.name == lower)
}

/// Tools that have a location for the given component kind, in table order
pub fn tools_supporting(kind: ComponentKind) -> Vec<&'static ToolCapability> {
    REGISTRY.iter().filter(|cap| cap.supports(kind)).collect()
}
