use std::path::{Path, PathBuf};

use crate::core::archive::contained_join;
use crate::core::error::InstallResult;

/// On-disk layout under an install root:
///
/// ```text
/// {root}/versions/{id}/{id}.{json,jar}
/// {root}/assets/indexes/{assetsId}.json
/// {root}/assets/objects/{hh}/{hash}
/// {root}/assets/virtual/{assetsId}/{resource}
/// {root}/libraries/{group}/{artifact}/{version}/...
/// {root}/natives/...
/// {root}/minecraft_server.{id}.jar
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.root.join("versions").join(id)
    }

    pub fn version_jar(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn asset_index(&self, assets_id: &str) -> PathBuf {
        self.indexes_dir().join(format!("{assets_id}.json"))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// A library's location; rejects relative paths that leave `libraries/`.
    pub fn library(&self, relative_path: &str) -> InstallResult<PathBuf> {
        contained_join(&self.libraries_dir(), relative_path)
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.root.join("natives")
    }

    pub fn server_jar(&self, id: &str) -> PathBuf {
        self.root.join(format!("minecraft_server.{id}.jar"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_launcher_layout() {
        let layout = InstallLayout::new("/games/mc");
        assert_eq!(layout.version_jar("1.8.9"), Path::new("/games/mc/versions/1.8.9/1.8.9.jar"));
        assert_eq!(layout.asset_index("1.8"), Path::new("/games/mc/assets/indexes/1.8.json"));
        assert_eq!(layout.server_jar("1.8.9"), Path::new("/games/mc/minecraft_server.1.8.9.jar"));
        assert_eq!(
            layout.library("com/mojang/realms/1.7.59/realms-1.7.59.jar").unwrap(),
            Path::new("/games/mc/libraries/com/mojang/realms/1.7.59/realms-1.7.59.jar")
        );
    }

    #[test]
    fn library_paths_stay_inside_libraries() {
        let layout = InstallLayout::new("/games/mc");
        assert!(layout.library("../../etc/cron.d/job").is_err());
    }
}
