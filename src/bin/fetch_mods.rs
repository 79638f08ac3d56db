//! fetch-mods - download every archive on the download list into
//! `raw_mods/` and unpack it.
//!
//! Exits 2 when the download list is missing or unusable. Failed downloads
//! are reported but do not change the exit status.

use clap::Parser;
use std::process::ExitCode;
use valmods::cli::CommonArgs;
use valmods::services::{Fetcher, HttpDownloader};

#[derive(Parser)]
#[command(name = "fetch-mods", version, about = "Download and unpack the mods on the download list", long_about = None)]
struct Cli {
    /// Log what would be downloaded without touching the network or disk
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let session = match cli.common.bootstrap("fetch-mods") {
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
    match runtime.block_on(fetcher.fetch_and_unpack(cli.dry_run)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
