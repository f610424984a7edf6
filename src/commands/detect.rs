// src/commands/detect.rs

//! `devsync detect`: scan a project and print its component inventory

use std::path::Path;

use crate::component::{ComponentKind, Inventory};
use crate::detect::Detector;
use crate::error::{Error, Result};

pub fn run(project: &Path, tools: &[String], kinds: &[String], json: bool) -> Result<()> {
    let kind_filter: Vec<ComponentKind> = kinds
        .iter()
        .map(|k| {
            k.parse::<ComponentKind>()
                .map_err(Error::InvalidPath)
        })
        .collect::<Result<_>>()?;

    let mut detector = Detector::new(project);
    if !tools.is_empty() {
        detector = detector.with_tool_filter(tools);
    }
    let inventory = detector.detect_all().filter(tools, &kind_filter);

    if json {
        let rendered = serde_json::to_string_pretty(&inventory)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        println!("{}", rendered);
        return Ok(());
    }

    print_inventory(&inventory);
    Ok(())
}

fn print_inventory(inventory: &Inventory) {
    if inventory.components.is_empty() {
        println!("No components detected.");
    }

    let mut current_kind = None;
    for component in &inventory.components {
        if current_kind != Some(component.kind) {
            current_kind = Some(component.kind);
            println!("{}:", component.kind);
        }
        let mut line = format!(
            "  {}  ({}, {})",
            component.identity,
            component.source_tool,
            component.target_path.display()
        );
        if let Some(description) = &component.description {
            line.push_str(&format!(" - {}", description));
        }
        println!("{}", line);
    }

    if !inventory.warnings.is_empty() {
        println!();
        for warning in &inventory.warnings {
            println!("warning: {}", warning);
        }
    }
    println!();
    println!("{} component(s) detected", inventory.total());
}
