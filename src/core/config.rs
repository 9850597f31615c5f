use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{InstallError, InstallResult};
use crate::core::platform::{default_arch_names, ArchMapping};

const APP_DIR_NAME: &str = "LauncherInstaller";
pub const CONFIG_FILE: &str = "installer_settings.json";

pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
pub const MOJANG_LAUNCHER_GAME: &str = "https://launcher.mojang.com/mc/game";
pub const MOJANG_RESOURCES: &str = "https://resources.download.minecraft.net";
const USER_AGENT: &str = "LauncherInstaller/0.1.0";

/// Installer settings persisted as JSON. Missing keys fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstallerConfig {
    /// Install root that `versions/`, `assets/`, `libraries/` and `natives/` live under.
    pub root: PathBuf,
    pub libraries_base_url: String,
    /// Base for client/server executables; canonical URLs are re-derived from it.
    pub launcher_base_url: String,
    pub resources_base_url: String,
    /// Maximum number of artifacts fetched in parallel.
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// How many resolved descriptors and asset indexes the cache keeps.
    pub cache_capacity: usize,
    /// `${arch}` substitution table for native classifiers.
    pub arch_names: BTreeMap<String, String>,
    pub unpack200_program: PathBuf,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            libraries_base_url: MOJANG_LIBRARIES.to_string(),
            launcher_base_url: MOJANG_LAUNCHER_GAME.to_string(),
            resources_base_url: MOJANG_RESOURCES.to_string(),
            concurrency: 8,
            fetch_timeout_secs: 120,
            user_agent: USER_AGENT.to_string(),
            cache_capacity: 16,
            arch_names: default_arch_names(),
            unpack200_program: PathBuf::from("unpack200"),
        }
    }
}

impl InstallerConfig {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> InstallResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(InstallError::io(path))?;
        let config: InstallerConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Read settings if the file exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> InstallResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No installer settings at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> InstallResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(InstallError::io(path))
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn arch_mapping(&self) -> ArchMapping {
        ArchMapping::new(self.arch_names.clone())
    }

    pub fn base_urls(&self) -> BaseUrls {
        BaseUrls {
            libraries: self.libraries_base_url.trim_end_matches('/').to_string(),
            launcher: self.launcher_base_url.trim_end_matches('/').to_string(),
            resources: self.resources_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Known base URLs canonical download locations are re-derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrls {
    pub libraries: String,
    pub launcher: String,
    pub resources: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        InstallerConfig::default().base_urls()
    }
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
