// src/commands/uninstall.rs

//! `devsync uninstall`: remove a tracked component

use std::path::Path;

use crate::component::ComponentKind;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::paths;

pub fn run(
    project: &Path,
    identity: &str,
    kind: Option<&str>,
    installed_path: Option<&str>,
    keep_file: bool,
) -> Result<()> {
    let engine = Engine::new(project);
    let mut ledger = Ledger::load(paths::ledger_path(project))?;

    let kind = match kind {
        Some(k) => k.parse::<ComponentKind>().map_err(Error::InvalidPath)?,
        None => infer_kind(&ledger, identity)?,
    };

    let removed_path = engine.uninstall(&mut ledger, identity, kind, installed_path, !keep_file)?;
    if keep_file {
        println!("Untracked '{}' ({}); file kept at {}", identity, kind, removed_path);
    } else {
        println!("Removed '{}' ({}) from {}", identity, kind, removed_path);
    }
    Ok(())
}

/// When no kind is given, it must be unambiguous across the ledger
fn infer_kind(ledger: &Ledger, identity: &str) -> Result<ComponentKind> {
    let kinds: Vec<ComponentKind> = ComponentKind::ALL
        .into_iter()
        .filter(|kind| !ledger.find_by_identity(identity, *kind).is_empty())
        .collect();
    match kinds.as_slice() {
        [] => Err(Error::NotFound(format!("nothing tracked as '{}'", identity))),
        [kind] => Ok(*kind),
        many => Err(Error::NotFound(format!(
            "'{}' is tracked as multiple kinds ({}); pass --kind",
            identity,
            many.iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
