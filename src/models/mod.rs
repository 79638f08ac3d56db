//! Data models for valmods.
//!
//! - [`DownloadEntry`]: A URL from the download list and the file name it is saved under
//! - [`ModPaths`]: Every directory the tools touch, resolved once at startup
//!
//! Nothing here touches the filesystem; the services in [`crate::services`] do.

pub mod download;
pub mod paths;

pub use download::{DownloadEntry, basename_from_url};
pub use paths::{DEFAULT_INSTALL_ROOT, DEFAULT_SUPPORT_PATHS, ModPaths};
