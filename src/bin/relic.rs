//! # Relic CLI - Track and restore directory states
//!
//! Thin command-line front end over the `relic` library: argument parsing,
//! confirmation prompts for destructive operations, and human-readable
//! formatting of the core's data structures.
//!
//! ## Usage
//! ```bash
//! # Start tracking the current directory
//! relic init
//!
//! # See what changed since the last commit
//! relic status
//!
//! # Record the changes
//! relic commit -m "describe the change"
//!
//! # Inspect history
//! relic log
//!
//! # Line diff of one file against its last-committed content
//! relic diff src/main.rs
//!
//! # Roll the tree back toward a commit (asks for confirmation)
//! relic restore c1
//! ```
//!
//! Exit codes: 0 on success, 1 for user errors (unknown commit, clean tree,
//! not initialized), 2 for system errors (I/O failures, corrupt state).

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use relic::{RelicError, Repository, RestoreReport, StatusReport};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Relic - minimal change tracking and snapshot restore for directories
#[derive(Parser)]
#[command(name = "relic")]
#[command(version)]
#[command(about = "Track file changes and restore directory states")]
struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize tracking in a directory
    Init {
        /// Re-initialize, discarding existing tracking metadata
        #[arg(long)]
        force: bool,
    },

    /// Show changes since the last commit
    #[command(alias = "st")]
    Status,

    /// Record the current changes
    #[command(alias = "ci")]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show commit history, newest first
    Log,

    /// Line-level diff of a file against its last-committed content
    Diff {
        /// Tracked file path, relative to the repository root
        file: String,
    },

    /// Restore the tree toward a commit (destructive)
    Restore {
        /// Commit id (c3 or 3)
        commit: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Remove all tracking metadata from a directory
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("relic=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    let root = cli.path.unwrap_or_else(|| PathBuf::from("."));
    match run(root, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            let user_error = e
                .downcast_ref::<RelicError>()
                .is_some_and(RelicError::is_user_error);
            if user_error {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run(root: PathBuf, command: Commands) -> Result<()> {
    match command {
        Commands::Init { force } => cmd_init(root, force)?,
        Commands::Status => cmd_status(root)?,
        Commands::Commit { message } => cmd_commit(root, message.as_deref())?,
        Commands::Log => cmd_log(root)?,
        Commands::Diff { file } => cmd_diff(root, &file)?,
        Commands::Restore { commit, force } => cmd_restore(root, &commit, force)?,
        Commands::Destroy { force } => cmd_destroy(root, force)?,
    }
    Ok(())
}

fn cmd_init(root: PathBuf, force: bool) -> Result<(), RelicError> {
    if force && relic::storage::Storage::is_initialized(&root) {
        println!("Re-initializing, previous tracking metadata discarded.");
        Repository::destroy(&root)?;
    }
    let repo = Repository::init(root)?;
    println!(
        "{} tracking {} files",
        "Initialized".green().bold(),
        repo.scan()?.snapshot.len()
    );
    Ok(())
}

fn cmd_status(root: PathBuf) -> Result<(), RelicError> {
    let repo = Repository::open(root)?;
    let status = repo.status()?;
    print_status(&status);
    Ok(())
}

fn print_status(status: &StatusReport) {
    if status.is_clean() {
        println!("Working tree clean.");
    } else {
        println!("Changes not committed:\n");
        for path in &status.changes.modified {
            println!("  {} {}", "modified:".yellow(), path);
        }
        for path in &status.changes.added {
            println!("  {} {}", "added:   ".green(), path);
        }
        for path in &status.changes.deleted {
            println!("  {} {}", "deleted: ".red(), path);
        }
    }

    if !status.warnings.is_empty() {
        println!();
        for warning in &status.warnings {
            eprintln!(
                "{}: {} ({})",
                "warning".yellow(),
                warning.path,
                warning.message
            );
        }
    }
}

fn cmd_commit(root: PathBuf, message: Option<&str>) -> Result<(), RelicError> {
    let mut repo = Repository::open(root)?;
    let commit = repo.commit(message)?;
    println!("{} {}", "Committed".green().bold(), commit.label().bold());
    println!("  Added:    {}", commit.changes.added.len());
    println!("  Modified: {}", commit.changes.modified.len());
    println!("  Deleted:  {}", commit.changes.deleted.len());
    Ok(())
}

fn cmd_log(root: PathBuf) -> Result<(), RelicError> {
    let repo = Repository::open(root)?;
    if repo.log().is_empty() {
        println!("No commits yet.");
        return Ok(());
    }

    for commit in repo.log().iter().rev() {
        println!("{} {}", "commit".yellow(), commit.label().bold());
        println!("Date: {}", commit.timestamp.to_rfc3339());
        println!("\n    {}\n", commit.message);

        if !commit.changes.added.is_empty() {
            println!("    Added:");
            for path in &commit.changes.added {
                println!("      {}", path);
            }
        }
        if !commit.changes.modified.is_empty() {
            println!("    Modified:");
            for path in &commit.changes.modified {
                println!("      {}", path);
            }
        }
        if !commit.changes.deleted.is_empty() {
            println!("    Deleted:");
            for path in &commit.changes.deleted {
                println!("      {}", path);
            }
        }
        println!("{}", "-".repeat(40));
    }
    Ok(())
}

fn cmd_diff(root: PathBuf, file: &str) -> Result<(), RelicError> {
    let repo = Repository::open(root)?;
    let diff = repo.diff_file(file)?;

    if !diff.has_changes() {
        println!("No differences.");
        return Ok(());
    }

    for line in diff.to_unified().lines() {
        if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_restore(root: PathBuf, commit: &str, force: bool) -> Result<(), RelicError> {
    let mut repo = Repository::open(root)?;

    if !force {
        println!(
            "{} Restoring to {} will discard uncommitted changes.",
            "Warning:".yellow().bold(),
            commit
        );
        if !confirm("Proceed? [y/N]: ") {
            println!("Restore aborted.");
            return Ok(());
        }
    }

    let report = repo.restore(commit)?;
    print_restore_report(&report);
    Ok(())
}

fn print_restore_report(report: &RestoreReport) {
    println!(
        "{} to {}: {} kept ({} restored from the base snapshot), {} removed",
        "Restored".green().bold(),
        report.target.bold(),
        report.files_kept,
        report.resurrected,
        report.files_removed
    );

    if !report.not_reverted.is_empty() {
        println!(
            "\n{} kept with content differing from {} (no older version is stored):",
            "Note:".yellow(),
            report.target
        );
        for path in &report.not_reverted {
            println!("  {}", path);
        }
    }

    if !report.unreconstructable.is_empty() {
        println!(
            "\n{} present at {} but unreconstructable (added after init, content gone):",
            "Warning:".yellow().bold(),
            report.target
        );
        for path in &report.unreconstructable {
            println!("  {}", path);
        }
    }
}

fn cmd_destroy(root: PathBuf, force: bool) -> Result<(), RelicError> {
    if !force {
        println!(
            "{} This removes all tracking metadata (commits, snapshots).",
            "Warning:".yellow().bold()
        );
        if !confirm("Proceed? [y/N]: ") {
            println!("Destroy aborted.");
            return Ok(());
        }
    }
    Repository::destroy(&root)?;
    println!("{} tracking metadata removed", "Destroyed".green().bold());
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}
