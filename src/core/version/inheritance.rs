// ─── Inheritance Resolution ───
// Walks `inheritsFrom` from a version up to its root, folding each parent
// underneath the accumulated descriptor.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::descriptor::VersionDescriptor;
use crate::core::archive::is_path_segment;
use crate::core::error::{InstallError, InstallResult};

/// Where unresolved descriptors come from.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn load(&self, id: &str) -> InstallResult<VersionDescriptor>;
}

/// Descriptors stored as `{root}/versions/{id}/{id}.json`.
#[derive(Debug, Clone)]
pub struct VersionDirectory {
    root: PathBuf,
}

impl VersionDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join("versions").join(id).join(format!("{id}.json"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DescriptorSource for VersionDirectory {
    async fn load(&self, id: &str) -> InstallResult<VersionDescriptor> {
        if !is_path_segment(id) {
            return Err(InstallError::PathTraversal {
                base: self.root.clone(),
                entry: id.to_string(),
            });
        }
        let path = self.path_for(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InstallError::VersionNotFound(id.to_string()))
            }
            Err(source) => return Err(InstallError::Io { path, source }),
        };
        VersionDescriptor::from_json(&raw)
    }
}

#[async_trait]
impl DescriptorSource for HashMap<String, VersionDescriptor> {
    async fn load(&self, id: &str) -> InstallResult<VersionDescriptor> {
        self.get(id)
            .cloned()
            .ok_or_else(|| InstallError::VersionNotFound(id.to_string()))
    }
}

/// Load `id` and merge every ancestor into it.
///
/// A chain that revisits a version fails with `CyclicInheritance` instead
/// of recursing forever.
pub async fn resolve_inheritance(
    source: &dyn DescriptorSource,
    id: &str,
) -> InstallResult<VersionDescriptor> {
    let mut resolved = source.load(id).await?;
    let mut chain = vec![id.to_string()];
    let mut seen: HashSet<String> = chain.iter().cloned().collect();
    let mut next = resolved.inherits_from.clone();

    while let Some(parent_id) = next {
        chain.push(parent_id.clone());
        if !seen.insert(parent_id.clone()) {
            return Err(InstallError::CyclicInheritance { chain });
        }

        debug!("{} inherits from {}", id, parent_id);
        let parent = source.load(&parent_id).await?;
        next = parent.inherits_from.clone();
        resolved = resolved.merge(&parent);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::descriptor::fixtures::descriptor;

    fn child_of(id: &str, parent: &str) -> VersionDescriptor {
        VersionDescriptor {
            id: id.into(),
            inherits_from: Some(parent.into()),
            ..VersionDescriptor::default()
        }
    }

    fn source(versions: Vec<VersionDescriptor>) -> HashMap<String, VersionDescriptor> {
        versions.into_iter().map(|v| (v.id.clone(), v)).collect()
    }

    #[tokio::test]
    async fn chain_is_folded_to_the_root() {
        let versions = source(vec![
            descriptor("1.8.9"),
            child_of("forge", "1.8.9"),
            child_of("modpack", "forge"),
        ]);

        let resolved = resolve_inheritance(&versions, "modpack").await.unwrap();
        assert_eq!(resolved.id, "modpack");
        assert_eq!(resolved.inherits_from.as_deref(), Some("forge"));
        assert_eq!(resolved.assets.as_deref(), Some("1.8"));
    }

    #[tokio::test]
    async fn cycles_are_detected() {
        let versions = source(vec![child_of("a", "b"), child_of("b", "a")]);
        let err = resolve_inheritance(&versions, "a").await.unwrap_err();
        match err {
            InstallError::CyclicInheritance { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }

        let selfish = source(vec![child_of("a", "a")]);
        assert!(resolve_inheritance(&selfish, "a").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn missing_parent_is_reported() {
        let versions = source(vec![child_of("forge", "1.8.9")]);
        let err = resolve_inheritance(&versions, "forge").await.unwrap_err();
        assert!(matches!(err, InstallError::VersionNotFound(id) if id == "1.8.9"));
    }

    #[tokio::test]
    async fn directory_source_reads_version_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionDirectory::new(dir.path());
        let version = descriptor("1.8.9");
        let path = store.path_for("1.8.9");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, version.to_json_pretty().unwrap()).unwrap();

        assert_eq!(store.load("1.8.9").await.unwrap(), version);
        assert!(matches!(
            store.load("absent").await,
            Err(InstallError::VersionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn directory_source_refuses_ids_outside_versions() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionDirectory::new(dir.path().join("mc"));
        let outside = dir.path().join("pwn");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("pwn.json"), descriptor("pwn").to_json_pretty().unwrap()).unwrap();

        assert!(matches!(
            store.load("../../pwn").await,
            Err(InstallError::PathTraversal { .. })
        ));
    }
}
