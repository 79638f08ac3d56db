use crate::models::ModPaths;
use crate::models::paths::default_plugin_dir;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

pub mod download_list;

pub use download_list::{DownloadList, DownloadListError, DroppedRecord};

/// Settings file name inside the tool home.
pub const SETTINGS_FILE_NAME: &str = "valmods.yaml";

/// Prefix of environment variables that override settings, e.g. `VALMODS_INSTALL_ROOT`.
pub const ENV_PREFIX: &str = "VALMODS";

/// Environment variable naming the tool home.
pub const HOME_ENV: &str = "VALMODS_HOME";

/// User-adjustable locations. Every field falls back to the default layout
/// described on [`ModPaths::with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub install_root: Option<Utf8PathBuf>,
    pub plugin_dir: Option<Utf8PathBuf>,
    pub plugin_backup_dir: Option<Utf8PathBuf>,
    pub support_backup_dir: Option<Utf8PathBuf>,
    pub staging_dir: Option<Utf8PathBuf>,
    pub download_list: Option<Utf8PathBuf>,
    pub support_paths: Option<Vec<String>>,

    /// Directory for rotating log files; console only when unset
    pub log_dir: Option<Utf8PathBuf>,
}

impl Settings {
    /// Resolve into concrete paths, filling gaps from the default layout.
    pub fn resolve(&self, tool_home: &Utf8Path, user_home: &Utf8Path) -> ModPaths {
        let mut paths = match &self.install_root {
            Some(root) => ModPaths::for_install_root(root.clone(), tool_home, user_home),
            None => ModPaths::with_defaults(tool_home, user_home),
        };

        // an explicit install root moves the default plugin dir with it
        paths.plugin_dir = self
            .plugin_dir
            .clone()
            .unwrap_or_else(|| default_plugin_dir(&paths.install_root));

        if let Some(dir) = &self.plugin_backup_dir {
            paths.plugin_backup_dir = dir.clone();
        }
        if let Some(dir) = &self.support_backup_dir {
            paths.support_backup_dir = dir.clone();
        }
        if let Some(dir) = &self.staging_dir {
            paths.staging_dir = dir.clone();
        }
        if let Some(file) = &self.download_list {
            paths.download_list = file.clone();
        }
        if let Some(support_paths) = &self.support_paths {
            paths.support_paths = support_paths.clone();
        }

        paths
    }
}

/// Loads settings and resolves paths relative to the tool home.
///
/// The tool home is where the binaries are installed; it holds the download
/// list (`env.yaml`), the staging directory (`raw_mods/`) and the optional
/// settings file (`valmods.yaml`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    tool_home: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `tool_home`.
    pub fn new<P: AsRef<Utf8Path>>(tool_home: P) -> Self {
        let tool_home = tool_home.as_ref().to_path_buf();
        Self {
            settings_path: tool_home.join(SETTINGS_FILE_NAME),
            tool_home,
        }
    }

    /// Create a ConfigManager for the explicit `home` if given, otherwise
    /// for the directory holding the running executable.
    pub fn discover(home: Option<Utf8PathBuf>) -> Result<Self> {
        let tool_home = match home {
            Some(home) => home,
            None => executable_dir()?,
        };
        Ok(Self::new(tool_home))
    }

    /// Load settings from the settings file (if present) with environment
    /// overrides applied on top.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_settings_with_env(None)
    }

    /// Like [`ConfigManager::load_settings`], reading overrides from `env`
    /// instead of the process environment when given.
    pub fn load_settings_with_env(&self, env: Option<config::Map<String, String>>) -> Result<Settings> {
        let settings = config::Config::builder()
            .add_source(
                config::File::new(self.settings_path.as_str(), config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("support_paths")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to load settings: {}", self.settings_path))?
            .try_deserialize::<Settings>()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        if self.settings_path.exists() {
            tracing::debug!("Loaded settings from {}", self.settings_path);
        }
        Ok(settings)
    }

    /// Write `settings` to the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Resolve `settings` into concrete paths using the current user's home.
    pub fn resolve_paths(&self, settings: &Settings) -> Result<ModPaths> {
        Ok(settings.resolve(&self.tool_home, &user_home_dir()?))
    }

    pub fn tool_home(&self) -> &Utf8Path {
        &self.tool_home
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

fn executable_dir() -> Result<Utf8PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let exe = Utf8PathBuf::try_from(exe).context("Executable path is not valid UTF-8")?;
    exe.parent()
        .map(Utf8Path::to_path_buf)
        .with_context(|| format!("Executable has no parent directory: {}", exe))
}

fn user_home_dir() -> Result<Utf8PathBuf> {
    let dirs = directories::BaseDirs::new().context("Failed to determine the user home directory")?;
    Utf8PathBuf::try_from(dirs.home_dir().to_path_buf())
        .context("User home directory is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let home = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (ConfigManager::new(&home), temp_dir)
    }

    #[test]
    fn test_settings_path() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert_eq!(manager.settings_path(), manager.tool_home().join("valmods.yaml"));
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let settings = manager.load_settings().unwrap();
        assert_eq!(settings.install_root, None);
        assert_eq!(settings.log_dir, None);
    }

    #[test]
    fn test_save_and_load_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = Settings {
            install_root: Some("/games/valheim".into()),
            support_paths: Some(vec!["BepInEx".to_string(), "winhttp.dll".to_string()]),
            ..Settings::default()
        };
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.install_root, settings.install_root);
        assert_eq!(loaded.support_paths, settings.support_paths);
    }

    #[test]
    fn test_resolve_defaults() {
        let paths = Settings::default().resolve(Utf8Path::new("/tool"), Utf8Path::new("/home/u"));
        assert_eq!(paths, ModPaths::with_defaults(Utf8Path::new("/tool"), Utf8Path::new("/home/u")));
    }

    #[test]
    fn test_resolve_install_root_moves_plugin_dir() {
        let settings = Settings {
            install_root: Some("/games/valheim".into()),
            ..Settings::default()
        };
        let paths = settings.resolve(Utf8Path::new("/tool"), Utf8Path::new("/home/u"));

        assert_eq!(paths.plugin_dir, Utf8PathBuf::from("/games/valheim/BepInEx/plugins"));
        assert_eq!(paths.staging_dir, Utf8PathBuf::from("/tool/raw_mods"));
    }

    #[test]
    fn test_resolve_overrides() {
        let settings = Settings {
            plugin_dir: Some("/elsewhere/plugins".into()),
            staging_dir: Some("/scratch/raw".into()),
            plugin_backup_dir: Some("/bk/plugins".into()),
            ..Settings::default()
        };
        let paths = settings.resolve(Utf8Path::new("/tool"), Utf8Path::new("/home/u"));

        assert_eq!(paths.plugin_dir, Utf8PathBuf::from("/elsewhere/plugins"));
        assert_eq!(paths.staging_dir, Utf8PathBuf::from("/scratch/raw"));
        assert_eq!(paths.plugin_backup_dir, Utf8PathBuf::from("/bk/plugins"));
        assert_eq!(paths.support_backup_dir, Utf8PathBuf::from("/home/u/val/bepin"));
    }
}
