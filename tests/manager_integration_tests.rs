//! Integration tests for the mod manager commands
//!
//! Every test builds a fake game installation, tool home and user home in a
//! temporary directory, and downloads are served by an in-process fake.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use valmods::services::{Command, CommandReport, Downloader, Fetcher, ManagerError, ModManager};
use valmods::{ModPaths, TermStyle};

/// Serves a zip holding `<archive stem>.dll` for every URL.
struct ZipServer;

impl Downloader for ZipServer {
    async fn download(&self, url: &str, destination: &Utf8Path) -> Result<u64> {
        let stem = destination.file_stem().unwrap_or("mod");
        let mut zip = zip::ZipWriter::new(File::create(destination)?);
        zip.start_file(format!("{}.dll", stem), zip::write::SimpleFileOptions::default())?;
        zip.write_all(url.as_bytes())?;
        zip.finish()?;
        Ok(fs::metadata(destination)?.len())
    }
}

/// Log sink shared with a scoped `tracing` subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Sandbox {
    _temp_dir: TempDir,
    paths: ModPaths,
}

impl Sandbox {
    /// Game root with the loader installed but no plugin directory.
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let tool_home = root.join("tool");
        fs::create_dir_all(&tool_home).unwrap();
        let paths = ModPaths::for_install_root(root.join("game"), &tool_home, &root.join("home"));

        let game = &paths.install_root;
        fs::create_dir_all(game.join("BepInEx/core")).unwrap();
        fs::write(game.join("BepInEx/core/BepInEx.dll"), "loader").unwrap();
        fs::write(game.join("winhttp.dll"), "proxy").unwrap();
        fs::write(game.join("doorstop_config.ini"), "[General]").unwrap();

        Self {
            _temp_dir: temp_dir,
            paths,
        }
    }

    fn with_plugins(self) -> Self {
        let plugins = &self.paths.plugin_dir;
        fs::create_dir_all(plugins.join("Jotunn")).unwrap();
        fs::write(plugins.join("Jotunn/Jotunn.dll"), "jotunn").unwrap();
        fs::write(plugins.join("PlantEverything.dll"), "plants").unwrap();
        self
    }

    fn with_download_list(self, contents: &str) -> Self {
        fs::write(&self.paths.download_list, contents).unwrap();
        self
    }

    fn manager(&self, dry_run: bool) -> ModManager<ZipServer> {
        let fetcher = Fetcher::new(ZipServer, &self.paths, TermStyle::plain());
        ModManager::new(self.paths.clone(), fetcher, TermStyle::plain(), dry_run)
    }
}

fn file_names(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_install_twice_is_idempotent() {
    let sandbox = Sandbox::new().with_download_list(
        "- url: https://example.com/ModA.zip\n- url: https://example.com/ModB.zip\n",
    );
    let manager = sandbox.manager(false);

    let first = manager.install().await.unwrap();
    assert!(first.fetch.is_some());
    assert_eq!(first.installed.len(), 2);
    assert!(first.failed.is_empty());
    let after_first = file_names(&sandbox.paths.plugin_dir);

    let second = manager.install().await.unwrap();
    assert_eq!(second.installed.len(), 2);
    let after_second = file_names(&sandbox.paths.plugin_dir);

    assert_eq!(after_first, vec!["ModA.dll", "ModB.dll"]);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_install_without_download_list_still_moves_staged_mods() {
    let sandbox = Sandbox::new();
    let staged = sandbox.paths.staging_dir.join("Valheim+");
    fs::create_dir_all(staged.join("config")).unwrap();
    fs::write(staged.join("ValheimPlus.dll"), "vplus").unwrap();
    fs::write(sandbox.paths.staging_dir.join("Valheim+.zip"), "archive stays").unwrap();

    let report = sandbox.manager(false).install().await.unwrap();

    assert!(report.fetch.is_none());
    assert_eq!(file_names(&sandbox.paths.plugin_dir), vec!["ValheimPlus.dll", "config"]);
    // loose archives in the staging area are left alone
    assert!(sandbox.paths.staging_dir.join("Valheim+.zip").exists());
}

#[tokio::test]
async fn test_install_replaces_existing_plugin_dir_entries() {
    let sandbox = Sandbox::new().with_plugins();
    let staged = sandbox.paths.staging_dir.join("Jotunn-2.20");
    fs::create_dir_all(staged.join("Jotunn")).unwrap();
    fs::write(staged.join("Jotunn/Jotunn.dll"), "jotunn 2.20").unwrap();

    sandbox.manager(false).install().await.unwrap();

    let plugins = &sandbox.paths.plugin_dir;
    assert_eq!(fs::read_to_string(plugins.join("Jotunn/Jotunn.dll")).unwrap(), "jotunn 2.20");
    assert!(plugins.join("PlantEverything.dll").exists());
}

#[tokio::test]
async fn test_install_dry_run_changes_nothing() {
    let sandbox = Sandbox::new().with_download_list("- url: https://example.com/ModA.zip\n");
    let staged = sandbox.paths.staging_dir.join("Already");
    fs::create_dir_all(&staged).unwrap();
    fs::write(staged.join("Already.dll"), "x").unwrap();

    let report = sandbox.manager(true).install().await.unwrap();

    assert_eq!(report.fetch.unwrap().planned.len(), 1);
    assert_eq!(report.planned.len(), 1);
    assert!(report.installed.is_empty());
    assert!(staged.join("Already.dll").exists());
    assert!(!sandbox.paths.plugin_dir.exists());
}

#[test]
fn test_copy_without_plugin_dir_fails_without_mutation() {
    let sandbox = Sandbox::new();

    let err = sandbox.manager(false).copy().unwrap_err();

    assert!(matches!(err, ManagerError::PluginDirMissing(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(!sandbox.paths.plugin_backup_dir.exists());
    assert!(!sandbox.paths.support_backup_dir.exists());
}

#[test]
fn test_copy_backs_up_plugins_and_support_files() {
    let sandbox = Sandbox::new().with_plugins();
    let backup = &sandbox.paths.plugin_backup_dir;
    fs::create_dir_all(backup.join("Jotunn")).unwrap();
    fs::write(backup.join("Jotunn/Stale.dll"), "old").unwrap();

    let report = sandbox.manager(false).copy().unwrap();

    assert_eq!(report.plugins, vec!["Jotunn", "PlantEverything.dll"]);
    assert!(backup.join("Jotunn/Jotunn.dll").exists());
    assert!(!backup.join("Jotunn/Stale.dll").exists());
    assert_eq!(report.listed_mods, vec!["PlantEverything", "Jotunn", "PlantEverything"]);

    assert_eq!(report.support_copied, vec!["BepInEx", "doorstop_config.ini", "winhttp.dll"]);
    assert_eq!(report.support_missing, vec!["doorstop_libs"]);
    let support = &sandbox.paths.support_backup_dir;
    assert!(support.join("BepInEx/core/BepInEx.dll").exists());
    assert_eq!(fs::read_to_string(support.join("winhttp.dll")).unwrap(), "proxy");
}

#[test]
fn test_copy_dry_run_writes_nothing() {
    let sandbox = Sandbox::new().with_plugins();

    let report = sandbox.manager(true).copy().unwrap();

    assert_eq!(report.plugins.len(), 2);
    assert!(!sandbox.paths.plugin_backup_dir.exists());
    assert!(!sandbox.paths.support_backup_dir.exists());
}

#[test]
fn test_remove_backs_up_then_deletes_support_files() {
    let sandbox = Sandbox::new().with_plugins();

    let report = sandbox.manager(false).remove().unwrap();

    let game = &sandbox.paths.install_root;
    assert!(!game.join("BepInEx").exists());
    assert!(!game.join("winhttp.dll").exists());
    assert!(!game.join("doorstop_config.ini").exists());
    assert_eq!(report.removed.len(), 3);

    assert!(sandbox.paths.support_backup_dir.join("winhttp.dll").exists());
    assert!(sandbox.paths.plugin_backup_dir.join("PlantEverything.dll").exists());
}

#[test]
fn test_remove_without_plugin_dir_deletes_nothing() {
    let sandbox = Sandbox::new();

    let err = sandbox.manager(false).remove().unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(sandbox.paths.install_root.join("BepInEx").exists());
    assert!(sandbox.paths.install_root.join("winhttp.dll").exists());
}

#[test]
fn test_reinstall_restores_support_files() {
    let sandbox = Sandbox::new().with_plugins();
    let manager = sandbox.manager(false);
    manager.remove().unwrap();

    let restored = manager.reinstall().unwrap();

    let game = &sandbox.paths.install_root;
    assert_eq!(restored.len(), 3);
    assert!(game.join("BepInEx/core/BepInEx.dll").exists());
    assert!(game.join("BepInEx/plugins/Jotunn/Jotunn.dll").exists());
    assert_eq!(fs::read_to_string(game.join("winhttp.dll")).unwrap(), "proxy");
}

#[test]
fn test_reinstall_without_backup_fails() {
    let sandbox = Sandbox::new();

    let err = sandbox.manager(false).reinstall().unwrap_err();

    assert!(matches!(err, ManagerError::SupportBackupMissing(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_run_dispatches_commands() {
    let sandbox = Sandbox::new().with_plugins();
    let manager = sandbox.manager(false);

    assert_eq!(manager.run(Command::Fetch).await.unwrap(), CommandReport::Fetch);
    assert!(matches!(manager.run(Command::Copy).await.unwrap(), CommandReport::Copy(_)));
}

#[tokio::test]
async fn test_fatal_copy_failure_is_logged() {
    let sandbox = Sandbox::new().with_plugins();
    let mut paths = sandbox.paths.clone();
    paths.plugin_backup_dir = paths.install_root.join("backup_is_file");
    fs::write(&paths.plugin_backup_dir, "not a directory").unwrap();
    let fetcher = Fetcher::new(ZipServer, &paths, TermStyle::plain());
    let manager = ModManager::new(paths.clone(), fetcher, TermStyle::plain(), false);

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let err = manager.run(Command::Copy).await.unwrap_err();

    assert!(matches!(err, ManagerError::Filesystem { .. }));
    assert_eq!(err.exit_code(), 1);
    let logged = logs.contents();
    assert!(logged.contains("ERROR"), "no error line in: {}", logged);
    assert!(logged.contains("copying"), "no failed action in: {}", logged);
    assert!(logged.contains("backup_is_file"), "no path in: {}", logged);
}

#[tokio::test]
async fn test_missing_plugin_dir_is_logged() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(false);

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    manager.run(Command::Copy).await.unwrap_err();

    let logged = logs.contents();
    assert!(logged.contains("ERROR"));
    assert!(logged.contains("plugin directory"));
}
