//! valmods - mod manager for a BepInEx game installation.
//!
//! # Commands
//!
//! - `install`: Fetch and unpack the download list into `raw_mods/`, then
//!   move every extracted mod into the game's plugin directory
//! - `copy`: Back up the plugin directory and the loader support files
//! - `remove`: Back up, then delete the loader support files from the game
//! - `reinstall`: Restore the loader support files from their backup
//! - `fetch`: Reserved
//!
//! `--dry-run` narrates every step without touching the filesystem.
//!
//! # Exit status
//!
//! 0 on success, 1 when a command precondition fails (for example a missing
//! plugin directory), 2 for unusable configuration.

use clap::Parser;
use std::process::ExitCode;
use valmods::cli::CommonArgs;
use valmods::services::{Command, Fetcher, HttpDownloader, ModManager};

#[derive(Parser)]
#[command(name = "valmods", version, about = "Back up, install and remove BepInEx mods", long_about = None)]
struct Cli {
    /// What to do
    #[arg(value_enum)]
    command: Command,

    /// Log what would happen without changing anything
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let session = match cli.common.bootstrap("valmods") {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let downloader = match HttpDownloader::new() {
        Ok(downloader) => downloader,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = Fetcher::new(downloader, &session.paths, session.style);
    let manager = ModManager::new(session.paths, fetcher, session.style, cli.dry_run);

    match runtime.block_on(manager.run(cli.command)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
