use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::archive::contained_join;
use crate::core::error::{InstallError, InstallResult};
use crate::core::version::is_sha1_hex;

/// Asset index JSON: resource path → content-addressed object.
///
/// `virtual` indexes (pre-1.7.3 versions) are laid out by resource path
/// instead of by hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndex {
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    fn prefix(&self) -> &str {
        self.hash.get(..2).unwrap_or(&self.hash)
    }

    /// `{resources}/{hash[0:2]}/{hash}`
    pub fn url(&self, resources_base: &str) -> String {
        format!(
            "{}/{}/{}",
            resources_base.trim_end_matches('/'),
            self.prefix(),
            self.hash
        )
    }
}

impl AssetIndex {
    pub fn from_json(raw: &str) -> InstallResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Where an object lands under `assets/` for the index `assets_id`.
    pub fn object_path(
        &self,
        assets_dir: &Path,
        assets_id: &str,
        resource: &str,
        object: &AssetObject,
    ) -> InstallResult<PathBuf> {
        if self.is_virtual {
            contained_join(&assets_dir.join("virtual").join(assets_id), resource)
        } else {
            Ok(assets_dir
                .join("objects")
                .join(object.prefix())
                .join(&object.hash))
        }
    }

    pub fn validate(&self, assets_id: &str) -> InstallResult<()> {
        let problems: Vec<String> = self
            .objects
            .iter()
            .filter(|(_, object)| !is_sha1_hex(&object.hash))
            .map(|(resource, object)| format!("asset {resource}: bad hash {:?}", object.hash))
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(InstallError::Validation {
                id: assets_id.to_string(),
                problems,
            })
        }
    }

    pub fn total_size(&self) -> u64 {
        self.objects.values().map(|o| o.size).sum()
    }
}
