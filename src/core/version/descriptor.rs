// ─── Version Descriptor ───
// The `versions/{id}/{id}.json` document: what a version needs installed,
// how its fields inherit from a parent, and how it is checked against the
// canonical locations its contents imply.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::download::{Artifact, AssetIndexInfo, DownloadType};
use super::library::LibraryDescriptor;
use crate::core::archive::is_path_segment;
use crate::core::config::BaseUrls;
use crate::core::error::{InstallError, InstallResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    Snapshot,
    Release,
    OldBeta,
    OldAlpha,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub release_type: Option<ReleaseType>,
    /// Id of the asset index this version uses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub downloads: BTreeMap<DownloadType, Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    /// Legacy space-separated argument template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    /// Structured `{ game, jvm }` arguments of newer descriptors, kept as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_launcher_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    /// Version whose jar this one launches with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<DateTime<FixedOffset>>,
    /// Keys this model does not interpret (`javaVersion`, `logging`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VersionDescriptor {
    pub fn from_json(raw: &str) -> InstallResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> InstallResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Id of the version whose jar launches this one.
    pub fn resolve_jar(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    pub fn download(&self, kind: DownloadType) -> Option<&Artifact> {
        self.downloads.get(&kind)
    }

    /// Fold `parent` underneath `self`.
    ///
    /// - Unset scalars take the parent's value.
    /// - `downloads` and `extra` start from the parent's entries; the
    ///   child's entries override per key.
    /// - `libraries` keep the parent's order. A child library with the
    ///   same name replaces the next unreplaced parent entry of that name;
    ///   the rest are appended.
    /// - `inheritsFrom` defaults to the parent's id.
    ///
    /// Merging the result with the same parent again changes nothing.
    pub fn merge(&self, parent: &VersionDescriptor) -> VersionDescriptor {
        let mut downloads = parent.downloads.clone();
        downloads.extend(self.downloads.iter().map(|(k, v)| (*k, v.clone())));

        let mut extra = parent.extra.clone();
        extra.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        VersionDescriptor {
            id: self.id.clone(),
            release_type: self.release_type.or(parent.release_type),
            assets: self.assets.clone().or_else(|| parent.assets.clone()),
            asset_index: self.asset_index.clone().or_else(|| parent.asset_index.clone()),
            downloads,
            libraries: merge_libraries(&parent.libraries, &self.libraries),
            main_class: self.main_class.clone().or_else(|| parent.main_class.clone()),
            minecraft_arguments: self
                .minecraft_arguments
                .clone()
                .or_else(|| parent.minecraft_arguments.clone()),
            arguments: self.arguments.clone().or_else(|| parent.arguments.clone()),
            minimum_launcher_version: self
                .minimum_launcher_version
                .or(parent.minimum_launcher_version),
            inherits_from: self
                .inherits_from
                .clone()
                .or_else(|| Some(parent.id.clone())),
            jar: self.jar.clone().or_else(|| parent.jar.clone()),
            time: self.time.or(parent.time),
            release_time: self.release_time.or(parent.release_time),
            extra,
        }
    }

    /// Check a fully inherited descriptor, reporting every problem at once.
    pub fn validate(&self, expected_id: &str, base: &BaseUrls) -> InstallResult<()> {
        let mut problems = Vec::new();

        if self.id.is_empty() {
            problems.push("id is missing".to_string());
        } else if !is_path_segment(&self.id) {
            problems.push(format!("id {:?} is not a plain file name", self.id));
        } else if self.id != expected_id {
            problems.push(format!("id is {}, expected {expected_id}", self.id));
        }
        if self.release_type.is_none() {
            problems.push("type is missing".to_string());
        }

        match (&self.asset_index, &self.assets) {
            (None, _) => problems.push("assetIndex is missing".to_string()),
            (Some(_), None) => problems.push("assets id is missing".to_string()),
            (Some(index), Some(assets)) => {
                if !is_path_segment(assets) {
                    problems.push(format!("assets id {assets:?} is not a plain file name"));
                }
                index.check(assets, &mut problems)
            }
        }

        if !self.downloads.contains_key(&DownloadType::Client) {
            problems.push("no client download".to_string());
        }
        for (kind, artifact) in &self.downloads {
            artifact.check_executable(&self.id, *kind, &base.launcher, &mut problems);
        }

        for library in &self.libraries {
            library.check(&base.libraries, &mut problems);
        }

        if self.main_class.is_none() {
            problems.push("mainClass is missing".to_string());
        }
        if self.minecraft_arguments.is_none() && self.arguments.is_none() {
            problems.push("minecraftArguments is missing".to_string());
        }
        if self.time.is_none() {
            problems.push("time is missing".to_string());
        }
        if self.release_time.is_none() {
            problems.push("releaseTime is missing".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(InstallError::Validation {
                id: expected_id.to_string(),
                problems,
            })
        }
    }
}

fn merge_libraries(
    parent: &[LibraryDescriptor],
    child: &[LibraryDescriptor],
) -> Vec<LibraryDescriptor> {
    let mut merged = parent.to_vec();
    let mut replaced = vec![false; parent.len()];

    for lib in child {
        let slot = parent
            .iter()
            .enumerate()
            .position(|(i, p)| !replaced[i] && p.name == lib.name);
        match slot {
            Some(i) => {
                replaced[i] = true;
                merged[i] = lib.clone();
            }
            None => merged.push(lib.clone()),
        }
    }

    merged
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn lib(name: &str) -> LibraryDescriptor {
        LibraryDescriptor::java(name, None)
    }

    fn names(libs: &[LibraryDescriptor]) -> Vec<&str> {
        libs.iter().map(|l| l.name.as_str()).collect()
    }

    fn forge_child() -> VersionDescriptor {
        VersionDescriptor {
            id: "1.8.9-forge".into(),
            main_class: Some("net.minecraft.launchwrapper.Launch".into()),
            libraries: vec![lib("net.minecraftforge:forge:1.8.9-11.15.1.2318"), lib("a.b:shared:1")],
            ..VersionDescriptor::default()
        }
    }

    fn vanilla_parent() -> VersionDescriptor {
        let mut parent = descriptor("1.8.9");
        parent.libraries = vec![lib("a.b:shared:1"), lib("a.b:only-parent:1")];
        parent
    }

    #[test]
    fn child_fields_win_and_gaps_fill_from_parent() {
        let merged = forge_child().merge(&vanilla_parent());

        assert_eq!(merged.id, "1.8.9-forge");
        assert_eq!(merged.main_class.as_deref(), Some("net.minecraft.launchwrapper.Launch"));
        assert_eq!(merged.assets.as_deref(), Some("1.8"));
        assert_eq!(merged.inherits_from.as_deref(), Some("1.8.9"));
        assert!(merged.downloads.contains_key(&DownloadType::Client));
        assert_eq!(
            names(&merged.libraries),
            vec!["a.b:shared:1", "a.b:only-parent:1", "net.minecraftforge:forge:1.8.9-11.15.1.2318"]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let parent = vanilla_parent();
        let once = forge_child().merge(&parent);
        let twice = once.merge(&parent);
        assert_eq!(once, twice);
    }

    #[test]
    fn duplicate_names_keep_their_slots() {
        let mut parent = vanilla_parent();
        parent.libraries = vec![lib("x:y:1"), lib("x:y:1"), lib("x:z:1")];
        let child = VersionDescriptor {
            id: "child".into(),
            libraries: vec![lib("x:y:1"), lib("x:y:1"), lib("x:y:1")],
            ..VersionDescriptor::default()
        };

        let once = child.merge(&parent);
        assert_eq!(names(&once.libraries), vec!["x:y:1", "x:y:1", "x:z:1", "x:y:1"]);
        assert_eq!(once.merge(&parent), once);
    }

    #[test]
    fn child_downloads_override_per_key() {
        let parent = vanilla_parent();
        let replacement = Artifact::new("https://example/client.jar", CLIENT_SHA, 1);
        let mut child = forge_child();
        child.downloads.insert(DownloadType::Client, replacement.clone());

        let merged = child.merge(&parent);
        assert_eq!(merged.download(DownloadType::Client), Some(&replacement));
    }

    #[test]
    fn valid_descriptor_passes() {
        descriptor("1.8.9")
            .validate("1.8.9", &BaseUrls::default())
            .unwrap();
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut broken = descriptor("1.8.9");
        broken.main_class = None;
        broken.assets = Some("legacy".into());
        if let Some(client) = broken.downloads.get_mut(&DownloadType::Client) {
            client.url = "https://mirror.example/client.jar".into();
        }

        match broken.validate("1.8.9", &BaseUrls::default()) {
            Err(InstallError::Validation { id, problems }) => {
                assert_eq!(id, "1.8.9");
                assert_eq!(problems.len(), 3, "{problems:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn id_mismatch_is_rejected() {
        let err = descriptor("1.8.9")
            .validate("1.8.8", &BaseUrls::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn ids_that_leave_their_directory_are_rejected() {
        let base = BaseUrls::default();
        let tampered = descriptor("../../../tmp/pwn");
        match tampered.validate(&tampered.id, &base) {
            Err(InstallError::Validation { problems, .. }) => {
                assert!(problems.iter().any(|p| p.contains("not a plain file name")), "{problems:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut assets = descriptor("1.8.9");
        assets.assets = Some("../../escape".into());
        if let Some(index) = assets.asset_index.as_mut() {
            index.id = "../../escape".into();
        }
        match assets.validate("1.8.9", &base) {
            Err(InstallError::Validation { problems, .. }) => {
                assert_eq!(problems.len(), 1, "{problems:?}");
                assert!(problems[0].contains("assets id"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn jar_override_falls_back_to_id() {
        let mut version = descriptor("1.8.9");
        assert_eq!(version.resolve_jar(), "1.8.9");
        version.jar = Some("1.8.8".into());
        assert_eq!(version.resolve_jar(), "1.8.8");
    }

    #[test]
    fn unknown_keys_survive_a_rewrite() {
        let raw = r#"{
            "id": "1.20.1",
            "type": "release",
            "javaVersion": { "component": "java-runtime-gamma", "majorVersion": 17 },
            "complianceLevel": 1,
            "time": "2023-06-12T13:25:51+00:00"
        }"#;
        let version = VersionDescriptor::from_json(raw).unwrap();
        assert_eq!(version.release_type, Some(ReleaseType::Release));
        assert!(version.extra.contains_key("javaVersion"));

        let rewritten = VersionDescriptor::from_json(&version.to_json_pretty().unwrap()).unwrap();
        assert_eq!(rewritten, version);
    }
}
