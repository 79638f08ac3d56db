//! unpack-mods - extract every archive in a directory into a sibling
//! directory named after the archive.

use camino::Utf8PathBuf;
use clap::Parser;
use std::process::ExitCode;
use valmods::cli::CommonArgs;
use valmods::logging::error_chain;
use valmods::services::{UnpackOptions, unpack_all};

#[derive(Parser)]
#[command(name = "unpack-mods", version, about = "Unpack zip and tar archives in place", long_about = None)]
struct Cli {
    /// Directory holding the archives [default: raw_mods/ in the tool home]
    directory: Option<Utf8PathBuf>,

    /// Delete each archive after it was extracted
    #[arg(long)]
    remove: bool,

    /// Log what would be extracted without writing anything
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let session = match cli.common.bootstrap("unpack-mods") {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let directory = cli.directory.unwrap_or(session.paths.staging_dir);
    let options = UnpackOptions {
        remove_archive: cli.remove,
        dry_run: cli.dry_run,
    };

    match unpack_all(&directory, options, &session.style) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", session.style.warn(&error_chain(&e)));
            ExitCode::from(e.exit_code())
        }
    }
}
