use crate::logging::error_chain;
use crate::models::ModPaths;
use crate::services::fetch::{Downloader, FetchReport, Fetcher};
use crate::services::fs_ops::{self, Relocation};
use crate::term::TermStyle;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Commands understood by the mod manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Command {
    /// Fetch and unpack the download list, then move extracted mods into the plugin directory
    Install,
    /// Back up the plugin directory and the core support files
    Copy,
    /// Back up, then delete the core support files from the game
    Remove,
    /// Restore the core support files from their backup
    Reinstall,
    /// Reserved; not implemented
    Fetch,
}

/// Errors that abort a whole command.
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("plugin directory {0} does not exist")]
    PluginDirMissing(Utf8PathBuf),

    #[error("support backup directory {0} does not exist")]
    SupportBackupMissing(Utf8PathBuf),

    #[error("{action} failed")]
    Filesystem {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ManagerError {
    /// Process exit status for a failed command.
    pub fn exit_code(&self) -> u8 {
        1
    }

    fn filesystem(action: impl Into<String>) -> impl FnOnce(anyhow::Error) -> Self {
        let action = action.into();
        move |source| ManagerError::Filesystem { action, source }
    }
}

/// Outcome of [`ModManager::copy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Top-level plugin directory entries copied into the backup
    pub plugins: Vec<String>,

    /// Core support paths copied into the support backup
    pub support_copied: Vec<String>,

    /// Core support paths that were not present in the installation root
    pub support_missing: Vec<String>,

    /// Mod names found in the plugin backup afterwards
    pub listed_mods: Vec<String>,
}

/// One staged entry moved (or copied) into the plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledEntry {
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,
    pub relocation: Relocation,
}

/// Outcome of [`ModManager::install`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// `None` when the fetch step could not run (e.g. no download list)
    pub fetch: Option<FetchReport>,
    pub installed: Vec<InstalledEntry>,

    /// Entries that could not be put in place, with the error
    pub failed: Vec<(Utf8PathBuf, String)>,

    /// Dry run only: source and destination of every entry a real run would move
    pub planned: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

/// Outcome of [`ModManager::remove`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    pub backup: CopyReport,
    pub removed: Vec<Utf8PathBuf>,
}

/// Outcome of [`ModManager::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReport {
    Install(InstallReport),
    Copy(CopyReport),
    Remove(RemoveReport),
    Reinstall(Vec<Utf8PathBuf>),
    Fetch,
}

/// Copies, installs and removes mods between the staging area, the backups
/// and the game installation.
///
/// With `dry_run` set every mutating filesystem call is replaced by its log
/// line; path resolution and narration are the same as in a real run.
pub struct ModManager<D> {
    paths: ModPaths,
    fetcher: Fetcher<D>,
    style: TermStyle,
    dry_run: bool,
}

impl<D: Downloader> ModManager<D> {
    pub fn new(paths: ModPaths, fetcher: Fetcher<D>, style: TermStyle, dry_run: bool) -> Self {
        Self {
            paths,
            fetcher,
            style,
            dry_run,
        }
    }

    pub async fn run(&self, command: Command) -> Result<CommandReport, ManagerError> {
        tracing::info!("{}", self.style.header(&format!("valmods {:?}", command).to_lowercase()));

        let result = match command {
            Command::Install => self.install().await.map(CommandReport::Install),
            Command::Copy => self.copy().map(CommandReport::Copy),
            Command::Remove => self.remove().map(CommandReport::Remove),
            Command::Reinstall => self.reinstall().map(CommandReport::Reinstall),
            Command::Fetch => {
                self.fetch();
                Ok(CommandReport::Fetch)
            }
        };
        result.inspect_err(|e| tracing::error!("{}", self.style.warn(&error_chain(e))))
    }

    /// Run the fetcher, then move every extracted mod into the plugin directory.
    pub async fn install(&self) -> Result<InstallReport, ManagerError> {
        // the fetcher already logged why it could not run
        let fetch = self.fetcher.fetch_and_unpack(self.dry_run).await.ok();

        let mut report = self.move_extracted()?;
        report.fetch = fetch;
        Ok(report)
    }

    /// Move the children of each extracted directory in the staging area into
    /// the plugin directory, replacing entries that are already there.
    ///
    /// Loose files in the staging area (the archives themselves) are ignored.
    pub fn move_extracted(&self) -> Result<InstallReport, ManagerError> {
        let staging_dir = &self.paths.staging_dir;
        let plugin_dir = &self.paths.plugin_dir;
        let mut report = InstallReport::default();

        if !staging_dir.is_dir() {
            tracing::info!("No staging directory found at {}, skipping move", staging_dir);
            return Ok(report);
        }

        let staged = fs_ops::sorted_entries(staging_dir)
            .map_err(ManagerError::filesystem(format!("reading {}", staging_dir)))?;

        for extracted in staged.iter().filter(|p| p.is_dir()) {
            tracing::info!(
                "{}",
                self.style.action(&format!("Moving contents of {} into {}", extracted, plugin_dir))
            );

            let children = fs_ops::sorted_entries(extracted)
                .map_err(ManagerError::filesystem(format!("reading {}", extracted)))?;

            for child in children {
                let Some(name) = child.file_name() else {
                    continue;
                };
                let destination = plugin_dir.join(name);
                tracing::info!("{}", self.style.note(&format!(" - {} -> {}", child, destination)));

                if self.dry_run {
                    report.planned.push((child, destination));
                    continue;
                }

                let moved = fs_ops::ensure_dir(plugin_dir).and_then(|_| fs_ops::relocate(&child, &destination));
                match moved {
                    Ok(relocation) => report.installed.push(InstalledEntry {
                        source: child,
                        destination,
                        relocation,
                    }),
                    Err(e) => {
                        tracing::error!("{}: {:#}", self.style.warn(&format!("Failed to install {}", child)), e);
                        report.failed.push((child, format!("{:#}", e)));
                    }
                }
            }
        }

        Ok(report)
    }

    /// Back up the plugin directory, then the core support files.
    pub fn copy(&self) -> Result<CopyReport, ManagerError> {
        let (plugins, listed_mods) = self.copy_plugin_mods()?;
        let (support_copied, support_missing) = self.copy_support_files()?;

        Ok(CopyReport {
            plugins,
            support_copied,
            support_missing,
            listed_mods,
        })
    }

    /// Copy every top-level entry of the plugin directory into the plugin backup.
    ///
    /// Fails before touching anything when the plugin directory is missing.
    /// Returns the copied entry names and the mod listing of the backup.
    pub fn copy_plugin_mods(&self) -> Result<(Vec<String>, Vec<String>), ManagerError> {
        let plugin_dir = &self.paths.plugin_dir;
        let backup_dir = &self.paths.plugin_backup_dir;

        if !plugin_dir.is_dir() {
            return Err(ManagerError::PluginDirMissing(plugin_dir.clone()));
        }

        if !backup_dir.exists() {
            tracing::info!("Creating copy of mods in {}", backup_dir);
            self.ensure_dir(backup_dir)?;
        }

        tracing::info!("Copying plugins from {} to {}", plugin_dir, backup_dir);
        let entries = fs_ops::sorted_entries(plugin_dir)
            .map_err(ManagerError::filesystem(format!("reading {}", plugin_dir)))?;

        let mut copied = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let destination = backup_dir.join(name);
            tracing::debug!(" - {} -> {}", entry, destination);

            if !self.dry_run {
                fs_ops::replace_with_copy(&entry, &destination)
                    .map_err(ManagerError::filesystem(format!("copying {}", entry)))?;
            }
            copied.push(name.to_string());
        }

        tracing::info!("Moved Mods:");
        let listed = list_mods(backup_dir);
        for name in &listed {
            tracing::info!("> {}", name);
        }

        Ok((copied, listed))
    }

    /// Copy each core support path from the installation root into the
    /// support backup. Paths missing from the installation are skipped with a
    /// warning. Returns the copied and the missing names.
    pub fn copy_support_files(&self) -> Result<(Vec<String>, Vec<String>), ManagerError> {
        let backup_dir = &self.paths.support_backup_dir;

        if !backup_dir.exists() {
            tracing::info!("Creating copy of core support files in {}", backup_dir);
            self.ensure_dir(backup_dir)?;
        }

        let mut copied = Vec::new();
        let mut missing = Vec::new();

        for (name, source) in self.paths.installed_support_paths() {
            let destination = backup_dir.join(name);
            tracing::info!("Copying {} -> {}", source, destination);

            if !source.exists() {
                tracing::warn!("Source {} does not exist, skipping", source);
                missing.push(name.to_string());
                continue;
            }

            if !self.dry_run {
                fs_ops::replace_with_copy(&source, &destination)
                    .map_err(ManagerError::filesystem(format!("copying {}", source)))?;
            }
            copied.push(name.to_string());
        }

        Ok((copied, missing))
    }

    /// Back everything up, then delete the core support paths from the
    /// installation root. Nothing is deleted if the backup fails.
    pub fn remove(&self) -> Result<RemoveReport, ManagerError> {
        let backup = self.copy()?;
        let mut removed = Vec::new();

        for (_, target) in self.paths.installed_support_paths() {
            tracing::info!("{}", self.style.action(&format!("Removing {}", target)));
            if self.dry_run || !target.exists() {
                continue;
            }

            fs_ops::remove_entry(&target).map_err(ManagerError::filesystem(format!("removing {}", target)))?;
            removed.push(target);
        }

        Ok(RemoveReport { backup, removed })
    }

    /// Copy every entry of the support backup back into the installation root.
    pub fn reinstall(&self) -> Result<Vec<Utf8PathBuf>, ManagerError> {
        let backup_dir = &self.paths.support_backup_dir;
        if !backup_dir.is_dir() {
            return Err(ManagerError::SupportBackupMissing(backup_dir.clone()));
        }

        let entries = fs_ops::sorted_entries(backup_dir)
            .map_err(ManagerError::filesystem(format!("reading {}", backup_dir)))?;

        let mut installed = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let destination = self.paths.install_root.join(name);
            tracing::info!("{}", self.style.action(&format!("Installing {} -> {}", entry, destination)));

            if !self.dry_run {
                fs_ops::replace_with_copy(&entry, &destination)
                    .map_err(ManagerError::filesystem(format!("installing {}", entry)))?;
            }
            installed.push(destination);
        }

        Ok(installed)
    }

    /// Placeholder for a future standalone fetch command.
    pub fn fetch(&self) {
        tracing::info!("Not Implemented");
    }

    fn ensure_dir(&self, dir: &Utf8Path) -> Result<(), ManagerError> {
        if self.dry_run {
            return Ok(());
        }
        fs_ops::ensure_dir(dir).map_err(ManagerError::filesystem(format!("creating {}", dir)))
    }
}

/// Names (without extension) of the `.dll` files in `backup_dir`.
///
/// Top-level files are listed first and then the whole tree is walked, which
/// lists top-level files a second time. This matches what the tool has
/// always printed after a copy.
pub fn list_mods(backup_dir: &Utf8Path) -> Vec<String> {
    let top_level = fs_ops::sorted_entries(backup_dir)
        .unwrap_or_default()
        .into_iter()
        .filter(|path| path.is_file() && is_dll(path))
        .filter_map(|path| path.file_stem().map(str::to_string));

    let recursive = WalkDir::new(backup_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| is_dll(path))
        .filter_map(|path| path.file_stem().map(str::to_string));

    top_level.chain(recursive).collect()
}

fn is_dll(path: &Utf8Path) -> bool {
    path.extension() == Some("dll")
}
