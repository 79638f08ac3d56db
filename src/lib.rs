// valmods - Download, unpack, back up and install BepInEx game mods
//
// This is the library crate containing the core logic shared by the three
// binaries: `valmods` (mod manager), `fetch-mods` and `unpack-mods`.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod term;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, Settings};
pub use models::{DownloadEntry, ModPaths};
pub use term::TermStyle;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
