//! Services module - the work behind each of the command line tools.
//!
//! # Components
//!
//! - [`unpack`]: Extracts zip and tar-family archives in a directory, one
//!   subdirectory per archive ([`unpack_all`])
//! - [`fetch`]: Downloads every URL on the download list into the staging
//!   directory and unpacks it ([`Fetcher`])
//! - [`manager`]: Backs up, installs, removes and restores mods and the
//!   loader support files ([`ModManager`])
//! - [`fs_ops`]: Replace-not-merge copy, move and delete helpers shared by
//!   the above
//!
//! The services write nothing to stdout. Progress is reported through
//! `tracing`, and every operation also returns a report struct so callers
//! and tests can inspect what happened.
//!
//! # Usage Example
//!
//! ```ignore
//! use valmods::services::{Fetcher, HttpDownloader, ModManager, Command};
//!
//! let fetcher = Fetcher::new(HttpDownloader::new()?, &paths, style);
//! let manager = ModManager::new(paths, fetcher, style, false);
//! manager.run(Command::Install).await?;
//! ```

pub mod fetch;
pub mod fs_ops;
pub mod manager;
pub mod unpack;

pub use fetch::{Downloader, FailedDownload, FetchError, FetchReport, Fetcher, HttpDownloader};
pub use fs_ops::Relocation;
pub use manager::{
    Command, CommandReport, CopyReport, InstallReport, InstalledEntry, ManagerError, ModManager,
    RemoveReport, list_mods,
};
pub use unpack::{ArchiveFormat, UnpackError, UnpackOptions, UnpackReport, unpack_all, unpack_one};
