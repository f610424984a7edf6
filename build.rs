// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: project root
fn project_arg() -> Arg {
    Arg::new("project")
        .short('C')
        .long("project")
        .value_name("DIR")
        .default_value(".")
        .help("Target project root")
}

fn build_cli() -> Command {
    Command::new("devsync")
        .version(env!("CARGO_PKG_VERSION"))
        .author("DevSync Contributors")
        .about("Synchronizes AI coding tool configuration with conflict-safe, tracked installs")
        .subcommand_required(true)
        .subcommand(
            Command::new("detect")
                .about("Scan the project for existing configuration components")
                .arg(project_arg())
                .arg(Arg::new("tool").long("tool").help("Only scan these tools"))
                .arg(Arg::new("kind").long("kind").help("Only report these component kinds"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the inventory as JSON"),
                ),
        )
        .subcommand(
            Command::new("install")
                .about("Install components from a resolved source tree")
                .arg(Arg::new("source_dir").required(true).help("Source directory"))
                .arg(project_arg())
                .arg(Arg::new("source").long("source").help("Origin recorded in the ledger"))
                .arg(Arg::new("ref").long("ref").help("Version marker recorded in the ledger"))
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .help("Conflict strategy: skip, overwrite, or rename"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(clap::ArgAction::SetTrue)
                        .help("Classify and report without writing anything"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List tracked installations")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Remove a tracked component")
                .arg(Arg::new("identity").required(true).help("Component identity"))
                .arg(project_arg())
                .arg(Arg::new("kind").long("kind").help("Component kind"))
                .arg(Arg::new("path").long("path").help("Installed path"))
                .arg(
                    Arg::new("keep_file")
                        .long("keep-file")
                        .action(clap::ArgAction::SetTrue)
                        .help("Remove only the ledger entry, keep the file"),
                ),
        )
        .subcommand(
            Command::new("backups")
                .about("List stored backups")
                .arg(project_arg())
                .arg(Arg::new("days").long("days").help("Only show the last N days")),
        )
        .subcommand(
            Command::new("restore")
                .about("Restore one backup to its original location")
                .arg(Arg::new("bucket").required(true).help("Timestamp bucket"))
                .arg(Arg::new("path").required(true).help("Original relative path"))
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("prune")
                .about("Delete backups older than a threshold")
                .arg(project_arg())
                .arg(Arg::new("days").long("days").default_value("30").help("Age threshold in days")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("devsync.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
