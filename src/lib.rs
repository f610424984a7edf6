// src/lib.rs

//! DevSync installation synchronization engine
//!
//! Distributes development-practice configuration (instructions, MCP
//! server configs, hooks, commands, skills, workflows, memory files,
//! resources) into target projects, adapting file layout per tool while
//! tracking every installed artifact so it can be updated, reconciled,
//! or removed safely.
//!
//! # Architecture
//!
//! - Detection: read-only scans materialize existing configuration as a
//!   normalized inventory
//! - Classification: three-way verdicts derived purely from checksums
//!   and tracked provenance
//! - Resolution: backup-before-overwrite, write, then commit to the
//!   ledger; one logical transaction per component
//! - Ledger: diff-friendly JSON provenance, atomic replacement, loud
//!   failures on corruption

pub mod backup;
pub mod cli;
pub mod commands;
pub mod component;
pub mod conflict;
pub mod detect;
pub mod engine;
mod error;
pub mod hash;
pub mod ledger;
pub mod paths;
pub mod registry;
pub mod section;

pub use backup::{BackupEntry, BackupStore};
pub use component::{
    Component, ComponentKind, DetectionWarning, IncomingComponent, Inventory, Layout,
    SectionMarker,
};
pub use conflict::{classify, content_verdict, Verdict};
pub use detect::Detector;
pub use engine::{
    BatchItemResult, ConflictContext, Decision, Engine, InstallOutcome, InstallStatus, Strategy,
};
pub use error::{Error, Result};
pub use hash::{content_digest, ContentHash, HashAlgorithm, Hasher};
pub use ledger::{Ledger, TrackingEntry};
