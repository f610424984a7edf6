// src/paths.rs

//! Centralized path derivation for devsync state directories

use std::path::{Path, PathBuf};

/// Name of the per-project state directory
pub const STATE_DIR: &str = ".devsync";

/// Ledger filename inside the state directory
pub const LEDGER_FILE: &str = "installations.json";

/// Per-project state directory (`<root>/.devsync`)
pub fn state_dir(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR)
}

/// Installation ledger path (`<root>/.devsync/installations.json`)
pub fn ledger_path(project_root: &Path) -> PathBuf {
    state_dir(project_root).join(LEDGER_FILE)
}

/// Backups directory (`<root>/.devsync/backups`)
pub fn backups_dir(project_root: &Path) -> PathBuf {
    state_dir(project_root).join("backups")
}

/// Tool-agnostic resource directory (`<root>/.devsync/resources`)
pub fn resources_dir(project_root: &Path) -> PathBuf {
    state_dir(project_root).join("resources")
}

/// Tool-agnostic MCP config fallback directory (`<root>/.devsync/mcp`)
pub fn mcp_dir(project_root: &Path) -> PathBuf {
    state_dir(project_root).join("mcp")
}

/// User-scope state directory (`~/.devsync`), if a home directory exists
pub fn user_state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STATE_DIR))
}

/// Render a relative path with forward slashes for portable ledger storage
pub fn to_portable(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sanitize a string for use as a filename
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

/// Path with an integer rename suffix: `file.md` -> `file-2.md`
pub fn renamed_path(original: &Path, counter: u32) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let new_name = match original.extension() {
        Some(ext) => format!("{}-{}.{}", stem, counter, ext.to_string_lossy()),
        None => format!("{}-{}", stem, counter),
    };
    original.with_file_name(new_name)
}

/// First rename target not present on disk, scanning `-1`, `-2`, ... ascending
pub fn first_free_rename(original: &Path) -> PathBuf {
    let mut counter = 1;
    loop {
        let candidate = renamed_path(original, counter);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
