// src/section.rs

//! Marker-delimited spans inside shared instruction files
//!
//! Tools like Codex, Gemini CLI, and Aider read one flat file at the
//! project root (AGENTS.md, GEMINI.md, CONVENTIONS.md). Each installed
//! component owns exactly one span inside that file, delimited by an
//! HTML-comment marker pair embedding its identity:
//!
//! ```text
//! <!-- devsync:start:code-style -->
//! ... component content ...
//! <!-- devsync:end:code-style -->
//! ```
//!
//! Operations here locate, replace, append, or remove one span without
//! disturbing other spans or surrounding content.

use regex::Regex;

/// Start marker for a component identity
pub fn start_marker(identity: &str) -> String {
    format!("<!-- devsync:start:{} -->", identity)
}

/// End marker for a component identity
pub fn end_marker(identity: &str) -> String {
    format!("<!-- devsync:end:{} -->", identity)
}

fn span_regex(identity: &str) -> Regex {
    let pattern = format!(
        r"<!-- devsync:start:{id} -->\n(?s:.*?)\n<!-- devsync:end:{id} -->",
        id = regex::escape(identity)
    );
    // Escaped identity in a fixed template; the pattern is always valid
    Regex::new(&pattern).unwrap()
}

/// Whether the file contains a span for this identity
pub fn has_section(content: &str, identity: &str) -> bool {
    content.contains(&start_marker(identity))
}

/// The body of the identity's span, without the markers
pub fn extract<'a>(content: &'a str, identity: &str) -> Option<&'a str> {
    let found = span_regex(identity).find(content)?;
    let span = found.as_str();
    let start = start_marker(identity);
    let end = end_marker(identity);
    let body = span.strip_prefix(start.as_str())?.strip_suffix(end.as_str())?;
    Some(body.trim_matches('\n'))
}

/// Replace the identity's span in place, or append a new one.
///
/// Appended spans are separated from existing content by a blank line.
/// All other content is preserved byte for byte.
pub fn upsert(content: &str, identity: &str, body: &str) -> String {
    let section = format!(
        "{}\n{}\n{}",
        start_marker(identity),
        body,
        end_marker(identity)
    );

    if has_section(content, identity) {
        // NoExpand: component bodies may contain `$` sequences
        return span_regex(identity)
            .replace(content, regex::NoExpand(section.as_str()))
            .into_owned();
    }

    if content.is_empty() {
        return format!("{}\n", section);
    }
    let mut out = content.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&section);
    out.push('\n');
    out
}

/// Identities of all spans present in the file, in order of appearance
pub fn identities(content: &str) -> Vec<String> {
    let marker = Regex::new(r"<!-- devsync:start:(\S+) -->").unwrap();
    marker
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Remove the identity's span. Returns `None` if no span exists.
///
/// Runs of three or more newlines left behind are collapsed to two.
pub fn remove(content: &str, identity: &str) -> Option<String> {
    if !has_section(content, identity) {
        return None;
    }
    let stripped = span_regex(identity).replace(content, "").into_owned();
    let collapsed = Regex::new(r"\n{3,}").unwrap().replace_all(&stripped, "\n\n");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        Some(String::new())
    } else {
        Some(format!("{}\n", trimmed))
    }
}
