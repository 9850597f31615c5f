// ─── Artifact Resolver ───
// Turns a library descriptor plus a target into the one file that target
// needs, or nothing when the library does not apply to it.

use tracing::{debug, warn};

use super::download::Artifact;
use super::library::{LibraryDescriptor, LibraryKind};
use super::rules::is_compatible;
use crate::core::archive::ExtractRules;
use crate::core::config::MOJANG_LIBRARIES;
use crate::core::maven::{library_path, MavenCoordinate};
use crate::core::platform::{ArchMapping, TargetDescriptor};

/// A library file chosen for a specific target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub name: String,
    /// Location under `libraries/`, `/`-separated.
    pub relative_path: String,
    pub url: String,
    /// `None` only when the descriptor had no download metadata and the
    /// location was derived from the library name.
    pub sha1: Option<String>,
    pub size: Option<u64>,
    /// Present for native bundles, which get unpacked into `natives/`.
    pub extract: Option<ExtractRules>,
    /// Hosted in a repository declared by the library itself.
    pub custom_repository: bool,
}

impl ResolvedArtifact {
    pub fn is_native(&self) -> bool {
        self.extract.is_some()
    }

    /// Custom repositories may publish an XZ/Pack200 container next to the
    /// jar. Only tried when nothing pins the jar's digest.
    pub fn packed_url(&self) -> Option<String> {
        (self.custom_repository && self.sha1.is_none()).then(|| format!("{}.pack.xz", self.url))
    }
}

/// Resolves libraries against a target using an injectable `${arch}` table
/// and the repository derived locations fall back to.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    arch: ArchMapping,
    libraries_base: String,
}

impl Default for ArtifactResolver {
    fn default() -> Self {
        Self::new(ArchMapping::default(), MOJANG_LIBRARIES)
    }
}

impl ArtifactResolver {
    pub fn new(arch: ArchMapping, libraries_base: impl Into<String>) -> Self {
        Self {
            arch,
            libraries_base: libraries_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(
        &self,
        lib: &LibraryDescriptor,
        target: &TargetDescriptor,
    ) -> Option<ResolvedArtifact> {
        if !is_compatible(lib.rules.as_deref(), target) {
            debug!("{} is not compatible with {}", lib.name, target);
            return None;
        }

        let repository = lib.repository(&self.libraries_base).trim_end_matches('/');
        let custom_repository = lib.url.is_some();

        match &lib.kind {
            LibraryKind::Java { artifact } => {
                self.plain(lib, artifact.as_ref(), repository, custom_repository)
            }
            LibraryKind::Native {
                natives,
                classifiers,
                extract,
                ..
            } => {
                let template = natives.get(&target.os)?;
                let classifier = self.arch.substitute(template, target);
                let extract = Some(extract.clone().unwrap_or_default());

                match classifiers {
                    Some(classifiers) => {
                        let artifact = classifiers.get(&classifier)?;
                        let relative_path = match &artifact.path {
                            Some(path) => path.clone(),
                            None => self.derive(&lib.name, Some(&classifier))?,
                        };
                        Some(ResolvedArtifact {
                            name: lib.name.clone(),
                            relative_path,
                            url: artifact.url.clone(),
                            sha1: Some(artifact.sha1.clone()),
                            size: Some(artifact.size),
                            extract,
                            custom_repository,
                        })
                    }
                    None => {
                        let relative_path = self.derive(&lib.name, Some(&classifier))?;
                        Some(ResolvedArtifact {
                            name: lib.name.clone(),
                            url: MavenCoordinate::parse(&lib.name)
                                .ok()?
                                .with_classifier(&classifier)
                                .url(repository),
                            relative_path,
                            sha1: None,
                            size: None,
                            extract,
                            custom_repository,
                        })
                    }
                }
            }
        }
    }

    /// Every file `lib` contributes on `target`: the plain jar a native
    /// library ships alongside its bundles, then what [`Self::resolve`]
    /// picks. Empty iff the library is incompatible with the target.
    pub fn resolve_all(
        &self,
        lib: &LibraryDescriptor,
        target: &TargetDescriptor,
    ) -> Vec<ResolvedArtifact> {
        let mut files = Vec::new();
        if let LibraryKind::Native {
            artifact: Some(artifact),
            ..
        } = &lib.kind
        {
            if is_compatible(lib.rules.as_deref(), target) {
                let repository = lib.repository(&self.libraries_base).trim_end_matches('/');
                files.extend(self.plain(lib, Some(artifact), repository, lib.url.is_some()));
            }
        }
        files.extend(self.resolve(lib, target));
        files
    }

    /// The non-native jar of `lib`, derived from its name when no metadata
    /// is given.
    fn plain(
        &self,
        lib: &LibraryDescriptor,
        artifact: Option<&Artifact>,
        repository: &str,
        custom_repository: bool,
    ) -> Option<ResolvedArtifact> {
        match artifact {
            Some(artifact) => {
                let relative_path = match &artifact.path {
                    Some(path) => path.clone(),
                    None => self.derive(&lib.name, None)?,
                };
                Some(ResolvedArtifact {
                    name: lib.name.clone(),
                    relative_path,
                    url: artifact.url.clone(),
                    sha1: Some(artifact.sha1.clone()),
                    size: Some(artifact.size),
                    extract: None,
                    custom_repository,
                })
            }
            None => {
                let coordinate = match MavenCoordinate::parse(&lib.name) {
                    Ok(coordinate) => coordinate,
                    Err(e) => {
                        warn!("Cannot derive a path for library {}: {}", lib.name, e);
                        return None;
                    }
                };
                Some(ResolvedArtifact {
                    name: lib.name.clone(),
                    relative_path: coordinate.relative_path(),
                    url: coordinate.url(repository),
                    sha1: None,
                    size: None,
                    extract: None,
                    custom_repository,
                })
            }
        }
    }

    fn derive(&self, name: &str, classifier: Option<&str>) -> Option<String> {
        match library_path(name, classifier) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Cannot derive a path for library {}: {}", name, e);
                None
            }
        }
    }
}

/// Resolve with the default `${arch}` table and library repository.
pub fn resolve_artifact(
    lib: &LibraryDescriptor,
    target: &TargetDescriptor,
) -> Option<ResolvedArtifact> {
    ArtifactResolver::default().resolve(lib, target)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::core::platform::OperatingSystem;
    use crate::core::version::rules::CompatibilityRule;

    const SHA: &str = "aa9aae879af8eb378e22cfc64db56ec2ca9a44d1";

    fn targets() -> Vec<TargetDescriptor> {
        let mut all = Vec::new();
        for os in [OperatingSystem::Linux, OperatingSystem::Windows, OperatingSystem::Osx] {
            for version in ["10.0", "10.5.8", "6.1.0"] {
                for arch in ["x86", "amd64", "aarch64"] {
                    all.push(TargetDescriptor::new(os, version, arch));
                }
            }
        }
        all
    }

    fn rule_sets() -> Vec<Option<Vec<CompatibilityRule>>> {
        vec![
            None,
            Some(vec![]),
            Some(vec![CompatibilityRule::allow()]),
            Some(vec![CompatibilityRule::disallow()]),
            Some(vec![CompatibilityRule::allow().for_os(OperatingSystem::Osx)]),
            Some(vec![
                CompatibilityRule::allow(),
                CompatibilityRule::disallow().for_os(OperatingSystem::Osx),
            ]),
            Some(vec![
                CompatibilityRule::allow(),
                CompatibilityRule::disallow()
                    .for_os(OperatingSystem::Osx)
                    .for_os_version("^10\\.5\\.\\d$"),
            ]),
            Some(vec![
                CompatibilityRule::disallow(),
                CompatibilityRule::allow().for_arch("x86|amd64"),
            ]),
        ]
    }

    /// A native library that has a classifier for every OS and arch name.
    fn covering_native() -> LibraryDescriptor {
        let natives = [
            (OperatingSystem::Linux, "natives-linux"),
            (OperatingSystem::Windows, "natives-windows-${arch}"),
            (OperatingSystem::Osx, "natives-osx"),
        ]
        .into_iter()
        .map(|(os, t)| (os, t.to_string()))
        .collect();
        let classifiers = [
            "natives-linux",
            "natives-osx",
            "natives-windows-32",
            "natives-windows-64",
            "natives-windows-aarch64",
        ]
        .into_iter()
        .map(|c| {
            let path = library_path("org.lwjgl.lwjgl:lwjgl-platform:2.9.1", Some(c)).unwrap();
            (
                c.to_string(),
                Artifact::new(format!("{MOJANG_LIBRARIES}/{path}"), SHA, 1).with_path(path),
            )
        })
        .collect();
        LibraryDescriptor::native(
            "org.lwjgl.lwjgl:lwjgl-platform:2.9.1",
            natives,
            Some(classifiers),
            None,
        )
    }

    #[test]
    fn resolves_iff_compatible() {
        let java = LibraryDescriptor::java("org.lwjgl.lwjgl:lwjgl_util:2.9.1", None);
        let native = covering_native();

        for rules in rule_sets() {
            for target in targets() {
                let expected = is_compatible(rules.as_deref(), &target);
                for lib in [&java, &native] {
                    let mut lib = lib.clone();
                    lib.rules = rules.clone();
                    assert_eq!(
                        resolve_artifact(&lib, &target).is_some(),
                        expected,
                        "{} with {:?} on {}",
                        lib.name,
                        rules,
                        target
                    );
                }
            }
        }
    }

    #[test]
    fn derived_java_location() {
        let lib = LibraryDescriptor::java("org.lwjgl.lwjgl:lwjgl_util:2.9.1", None);
        let target = TargetDescriptor::new(OperatingSystem::Linux, "6.1", "amd64");
        let resolved = resolve_artifact(&lib, &target).unwrap();
        assert_eq!(
            resolved.relative_path,
            "org/lwjgl/lwjgl/lwjgl_util/2.9.1/lwjgl_util-2.9.1.jar"
        );
        assert_eq!(
            resolved.url,
            "https://libraries.minecraft.net/org/lwjgl/lwjgl/lwjgl_util/2.9.1/lwjgl_util-2.9.1.jar"
        );
        assert_eq!(resolved.sha1, None);
        assert!(!resolved.is_native());
        assert_eq!(resolved.packed_url(), None);
    }

    #[test]
    fn native_classifier_uses_arch_mapping() {
        let lib = covering_native();
        let target = TargetDescriptor::new(OperatingSystem::Windows, "10.0", "amd64");

        let resolved = resolve_artifact(&lib, &target).unwrap();
        assert!(resolved.relative_path.ends_with("lwjgl-platform-2.9.1-natives-windows-64.jar"));
        assert_eq!(resolved.sha1.as_deref(), Some(SHA));
        assert_eq!(resolved.extract, Some(ExtractRules::default()));

        let passthrough = ArtifactResolver::new(ArchMapping::passthrough(), MOJANG_LIBRARIES);
        let arm = TargetDescriptor::new(OperatingSystem::Windows, "10.0", "aarch64");
        let resolved = passthrough.resolve(&lib, &arm).unwrap();
        assert!(resolved.relative_path.ends_with("natives-windows-aarch64.jar"));
    }

    #[test]
    fn native_without_entry_for_os_resolves_to_none() {
        let natives = BTreeMap::from([(OperatingSystem::Linux, "natives-linux".to_string())]);
        let lib = LibraryDescriptor::native("a.b:c:1", natives, None, None);
        let windows = TargetDescriptor::new(OperatingSystem::Windows, "10.0", "amd64");
        assert!(resolve_artifact(&lib, &windows).is_none());

        let linux = TargetDescriptor::new(OperatingSystem::Linux, "6.1", "amd64");
        let resolved = resolve_artifact(&lib, &linux).unwrap();
        assert_eq!(resolved.relative_path, "a/b/c/1/c-1-natives-linux.jar");
    }

    #[test]
    fn custom_repository_offers_packed_container() {
        let lib = LibraryDescriptor::java("net.minecraftforge:forge:1.7.10-10.13.4.1614", None)
            .with_repository("https://maven.minecraftforge.net/");
        let target = TargetDescriptor::new(OperatingSystem::Linux, "6.1", "amd64");
        let resolved = resolve_artifact(&lib, &target).unwrap();
        assert!(resolved.url.starts_with("https://maven.minecraftforge.net/net/minecraftforge/"));
        assert_eq!(resolved.packed_url(), Some(format!("{}.pack.xz", resolved.url)));
    }

    #[test]
    fn native_library_with_plain_jar_yields_both_files() {
        let jar = "org/lwjgl/lwjgl/3.2.2/lwjgl-3.2.2.jar";
        let lib = LibraryDescriptor::native(
            "org.lwjgl:lwjgl:3.2.2",
            BTreeMap::from([(OperatingSystem::Linux, "natives-linux".to_string())]),
            None,
            None,
        )
        .with_plain_artifact(
            Artifact::new(format!("{MOJANG_LIBRARIES}/{jar}"), SHA, 1).with_path(jar),
        );

        let linux = TargetDescriptor::new(OperatingSystem::Linux, "6.1", "amd64");
        let files = ArtifactResolver::default().resolve_all(&lib, &linux);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, jar);
        assert!(!files[0].is_native());
        assert_eq!(files[1].relative_path, "org/lwjgl/lwjgl/3.2.2/lwjgl-3.2.2-natives-linux.jar");
        assert!(files[1].is_native());

        // `resolve` alone still picks the native bundle.
        assert_eq!(resolve_artifact(&lib, &linux), Some(files[1].clone()));

        // No bundle for windows, but the Java jar is still needed.
        let windows = TargetDescriptor::new(OperatingSystem::Windows, "10.0", "amd64");
        let files = ArtifactResolver::default().resolve_all(&lib, &windows);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, jar);

        let excluded = lib.with_rules(vec![CompatibilityRule::disallow()]);
        assert!(ArtifactResolver::default().resolve_all(&excluded, &linux).is_empty());
    }
}
