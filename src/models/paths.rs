use camino::{Utf8Path, Utf8PathBuf};

/// Default game installation root.
pub const DEFAULT_INSTALL_ROOT: &str = "/mnt/c/Program Files (x86)/Steam/steamapps/common/Valheim";

/// Loader framework files that must accompany any mod installation.
///
/// They are backed up, restored and removed together.
pub const DEFAULT_SUPPORT_PATHS: [&str; 4] = [
    "BepInEx",
    "doorstop_libs",
    "doorstop_config.ini",
    "winhttp.dll",
];

/// Download list file name inside the tool home.
pub const DOWNLOAD_LIST_FILE_NAME: &str = "env.yaml";

/// Staging directory name inside the tool home.
pub const STAGING_DIR_NAME: &str = "raw_mods";

/// Every location the tools read from or write to.
///
/// Built once at startup from [`crate::config::Settings`] and handed to each
/// component, so tests can point all of it into a temporary sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModPaths {
    /// Game installation root holding the core support paths
    pub install_root: Utf8PathBuf,

    /// Game-side directory where active plugins live
    pub plugin_dir: Utf8PathBuf,

    /// Backup copy of the plugin directory
    pub plugin_backup_dir: Utf8PathBuf,

    /// Backup copy of the core support paths
    pub support_backup_dir: Utf8PathBuf,

    /// Downloaded archives and their extraction subdirectories
    pub staging_dir: Utf8PathBuf,

    /// YAML list of download URLs
    pub download_list: Utf8PathBuf,

    /// Names of the core support paths, relative to `install_root`
    pub support_paths: Vec<String>,
}

impl ModPaths {
    /// Default layout for a tool installed at `tool_home`, with backups under
    /// `user_home/val`.
    pub fn with_defaults(tool_home: &Utf8Path, user_home: &Utf8Path) -> Self {
        Self::for_install_root(Utf8PathBuf::from(DEFAULT_INSTALL_ROOT), tool_home, user_home)
    }

    pub fn for_install_root(
        install_root: Utf8PathBuf,
        tool_home: &Utf8Path,
        user_home: &Utf8Path,
    ) -> Self {
        let backup_root = user_home.join("val");
        Self {
            plugin_dir: default_plugin_dir(&install_root),
            install_root,
            plugin_backup_dir: backup_root.join("plugins"),
            support_backup_dir: backup_root.join("bepin"),
            staging_dir: tool_home.join(STAGING_DIR_NAME),
            download_list: tool_home.join(DOWNLOAD_LIST_FILE_NAME),
            support_paths: DEFAULT_SUPPORT_PATHS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Core support paths as they sit in the installation root.
    pub fn installed_support_paths(&self) -> impl Iterator<Item = (&str, Utf8PathBuf)> {
        self.support_paths
            .iter()
            .map(|name| (name.as_str(), self.install_root.join(name)))
    }
}

/// The plugin directory the loader framework scans.
pub fn default_plugin_dir(install_root: &Utf8Path) -> Utf8PathBuf {
    install_root.join("BepInEx").join("plugins")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = ModPaths::with_defaults(Utf8Path::new("/opt/valmods"), Utf8Path::new("/home/viking"));

        assert_eq!(paths.install_root, Utf8PathBuf::from(DEFAULT_INSTALL_ROOT));
        assert!(paths.plugin_dir.as_str().ends_with("Valheim/BepInEx/plugins"));
        assert_eq!(paths.plugin_backup_dir, Utf8PathBuf::from("/home/viking/val/plugins"));
        assert_eq!(paths.support_backup_dir, Utf8PathBuf::from("/home/viking/val/bepin"));
        assert_eq!(paths.staging_dir, Utf8PathBuf::from("/opt/valmods/raw_mods"));
        assert_eq!(paths.download_list, Utf8PathBuf::from("/opt/valmods/env.yaml"));
        assert_eq!(paths.support_paths.len(), 4);
        assert_eq!(paths.support_paths[0], "BepInEx");
    }

    #[test]
    fn test_installed_support_paths() {
        let paths = ModPaths::for_install_root(
            Utf8PathBuf::from("/games/valheim"),
            Utf8Path::new("/tool"),
            Utf8Path::new("/home/u"),
        );

        let installed: Vec<_> = paths.installed_support_paths().collect();
        assert_eq!(installed[3], ("winhttp.dll", Utf8PathBuf::from("/games/valheim/winhttp.dll")));
    }
}
