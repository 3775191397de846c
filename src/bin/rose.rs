//! `rose` command-line entrypoint: cache maintenance, release mutation, rule
//! execution, and mounting the virtual filesystem.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rose_rs::{cache_update, releases, rules, vfs, vfs_fuse, Config};
use tracing::error;

#[derive(Parser)]
#[command(name = "rose", about = "A virtual filesystem for tagging and organizing music")]
struct Cli {
    /// Path to config.toml. Defaults to the platform config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rescan the music source directory and refresh the read cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Mount or manage the virtual filesystem.
    Fs {
        #[command(subcommand)]
        action: FsAction,
    },
    /// Mutate releases directly, bypassing the VFS.
    Releases {
        #[command(subcommand)]
        action: ReleaseAction,
    },
    /// Run metadata rules against the library.
    Rules {
        #[command(subcommand)]
        action: RuleAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Force a full rescan even for releases whose mtime hasn't changed.
    Update {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum FsAction {
    /// Mount the library at the configured (or given) mount point.
    Mount {
        #[arg(long)]
        mountpoint: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ReleaseAction {
    Delete { release_id: String },
    ToggleNew { release_id: String },
}

#[derive(Subcommand)]
enum RuleAction {
    /// Run all rules stored in config, in declaration order.
    RunStored {
        #[arg(long)]
        dry_run: bool,
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = rose_rs::common::initialize_logging(Some("rose"), "stderr") {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::parse(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Cache { action: CacheAction::Update { force } } => cache_update::update_cache(&config, force),
        Command::Fs { action: FsAction::Mount { mountpoint } } => {
            let mountpoint = mountpoint.unwrap_or_else(|| config.vfs.mount_dir.clone());
            vfs_fuse::mount(vfs::VfsCore::new(config), &mountpoint).map_err(|e| e.into())
        }
        Command::Releases { action: ReleaseAction::Delete { release_id } } => releases::delete_release(&config, &release_id),
        Command::Releases { action: ReleaseAction::ToggleNew { release_id } } => {
            releases::toggle_release_new(&config, &release_id)
        }
        Command::Rules { action: RuleAction::RunStored { dry_run, yes } } => {
            rules::execute_stored_metadata_rules(&config, dry_run, yes)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
