// src/commands/list.rs

//! `devsync list`: print tracked installations

use std::path::Path;

use crate::error::Result;
use crate::ledger::Ledger;
use crate::paths;

pub fn run(project: &Path) -> Result<()> {
    let ledger = Ledger::load(paths::ledger_path(project))?;

    if ledger.entries().is_empty() {
        println!("No tracked installations.");
        return Ok(());
    }

    for entry in ledger.entries() {
        println!(
            "{:<12} {:<24} {}  ({} @ {}, installed {})",
            entry.kind.to_string(),
            entry.identity,
            entry.installed_path,
            entry.source,
            entry.source_ref,
            entry.installed_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!("\n{} tracked installation(s)", ledger.entries().len());
    Ok(())
}
