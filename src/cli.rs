//! Command-line surface: argument parsing and per-command drivers.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use diskbroom_core::model::{format_count, format_size};
use diskbroom_core::ops;
use diskbroom_core::scanner::{ScanEvent, ScanMode, ScanOptions, ScanOutcome};
use diskbroom_core::trash::TrashManager;

#[derive(Parser)]
#[command(name = "diskbroom", version, about = "Disk scanner with a journaled trash")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory tree and report aggregated sizes.
    Scan {
        path: PathBuf,
        /// Recursion depth: 0 lists only immediate entries.
        #[arg(long, default_value_t = 64)]
        depth: usize,
        /// Produce a flat, categorized file listing instead of a tree.
        #[arg(long)]
        flat: bool,
    },
    /// List the immediate children of a directory.
    Ls { path: PathBuf },
    /// Rename a file or directory without overwriting.
    Rename { old: PathBuf, new: PathBuf },
    /// Manage the trash: soft delete, list, restore, purge.
    Trash {
        #[command(subcommand)]
        action: TrashAction,
    },
    /// Watch a directory and print change events until interrupted.
    Watch { path: PathBuf },
}

#[derive(Subcommand)]
enum TrashAction {
    /// Move a file or directory to the trash.
    Rm { path: PathBuf },
    /// List trashed items.
    Ls,
    /// Restore a trashed item to its original path.
    Restore { id: Uuid },
    /// Permanently remove a trashed item.
    Purge { id: Uuid },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Scan { path, depth, flat } => scan(path, depth, flat),
        Command::Ls { path } => ls(path),
        Command::Rename { old, new } => {
            ops::rename_entry(&old, &new)?;
            println!("{} -> {}", old.display(), new.display());
            Ok(())
        }
        Command::Trash { action } => trash(action),
        Command::Watch { path } => watch(path),
    }
}

fn scan(path: PathBuf, depth: usize, flat: bool) -> anyhow::Result<()> {
    let mode = if flat { ScanMode::Flat } else { ScanMode::Tree };
    let opts = ScanOptions::with_depth(depth);
    let handle = ops::start_scan(path.clone(), mode, opts);

    for event in handle.events.iter() {
        match event {
            ScanEvent::Update {
                files_seen,
                dirs_seen,
                bytes_seen,
                ..
            } => {
                eprint!(
                    "\r{} files, {} dirs, {}        ",
                    format_count(files_seen),
                    format_count(dirs_seen),
                    format_size(bytes_seen)
                );
            }
            ScanEvent::EntryError { path, message } => {
                eprintln!("\rskipped {}: {message}", path.display());
            }
            ScanEvent::Finished {
                outcome,
                duration,
                error_count,
            } => {
                eprintln!();
                match *outcome {
                    ScanOutcome::Tree(tree) => print_tree(&tree),
                    ScanOutcome::Flat(result) => print_flat(&result),
                }
                if error_count > 0 {
                    eprintln!("{error_count} entries could not be read");
                }
                eprintln!("scanned in {duration:.2?}");
                return Ok(());
            }
            ScanEvent::Failed(err) => {
                eprintln!();
                return Err(err).context(format!("scan of {} failed", path.display()));
            }
            ScanEvent::Cancelled => {
                eprintln!();
                bail!("scan cancelled");
            }
        }
    }
    bail!("scanner exited without a result");
}

fn print_tree(tree: &diskbroom_core::model::ScanTree) {
    let root = tree.root();
    println!(
        "{}  {}",
        format_size(tree.total_size),
        tree.root_path.display()
    );
    for child in tree.children_sorted_by_size(root) {
        let node = tree.node(child);
        let marker = if node.is_dir() { "/" } else { "" };
        println!("  {:>10}  {}{marker}", format_size(node.size), node.name);
    }
}

fn print_flat(result: &diskbroom_core::scanner::flat::FlatResult) {
    let mut categories: Vec<_> = result.by_category.iter().collect();
    categories.sort_by(|a, b| {
        let size = |entries: &Vec<diskbroom_core::model::Entry>| {
            entries.iter().map(|e| e.size_bytes).sum::<u64>()
        };
        size(b.1).cmp(&size(a.1))
    });
    for (category, entries) in categories {
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        println!(
            "{:>10}  {:>8}  {}",
            format_size(total),
            format_count(entries.len() as u64),
            category.label()
        );
    }
    println!(
        "{:>10}  {:>8}  total",
        format_size(result.total_size),
        format_count(result.total_count as u64)
    );
}

fn ls(path: PathBuf) -> anyhow::Result<()> {
    let entries = ops::list_directory(&path, None)?;
    for entry in entries {
        let marker = if entry.kind == diskbroom_core::model::EntryKind::Directory {
            "/"
        } else {
            ""
        };
        println!(
            "{:>10}  {:<12}  {}{marker}",
            format_size(entry.size_bytes),
            entry.category.label(),
            entry.name
        );
    }
    Ok(())
}

fn trash(action: TrashAction) -> anyhow::Result<()> {
    let manager = TrashManager::open(trash_dir()?)?;
    match action {
        TrashAction::Rm { path } => {
            let record = manager.soft_delete(&path)?;
            println!("{}  {}", record.id, record.original_path.display());
        }
        TrashAction::Ls => {
            for record in manager.list() {
                println!(
                    "{}  {:>10}  {}  {}",
                    record.id,
                    format_size(record.size_bytes),
                    record.deleted_at.format("%Y-%m-%d %H:%M"),
                    record.original_path.display()
                );
            }
        }
        TrashAction::Restore { id } => {
            let record = manager.restore(id)?;
            println!("restored {}", record.original_path.display());
        }
        TrashAction::Purge { id } => {
            let record = manager.purge(id)?;
            println!("purged {}", record.original_path.display());
        }
    }
    Ok(())
}

/// Trash storage root under the platform-standard local data directory.
fn trash_dir() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "diskbroom")
        .context("no home directory available")?;
    Ok(dirs.data_local_dir().join("trash"))
}

fn watch(path: PathBuf) -> anyhow::Result<()> {
    let handle = ops::start_watch(&path)?;
    eprintln!("watching {} (ctrl-c to stop)", path.display());
    for message in handle.receiver.iter() {
        let ops::WatchMessage::Changed(changed) = message;
        println!("{}", changed.display());
    }
    Ok(())
}
