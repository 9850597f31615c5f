// ─── Library Descriptor ───
// A library is either a plain Java jar or a native bundle selected per OS
// through a classifier. The JSON form decides by field presence; here it
// is an explicit variant. Classifiers or a natives map make a library
// native, even when it also ships a plain jar (LWJGL 3 entries do).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::download::Artifact;
use super::rules::CompatibilityRule;
use crate::core::archive::ExtractRules;
use crate::core::maven::library_path;
use crate::core::platform::OperatingSystem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLibrary", into = "RawLibrary")]
pub struct LibraryDescriptor {
    /// `group:artifact:version`
    pub name: String,
    /// Maven repository the library is hosted in, when not the default one.
    pub url: Option<String>,
    pub rules: Option<Vec<CompatibilityRule>>,
    pub kind: LibraryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryKind {
    /// `artifact` is `None` when the descriptor carries no download
    /// metadata; the path is then derived from the name.
    Java { artifact: Option<Artifact> },
    Native {
        /// Plain jar published next to the native bundles.
        artifact: Option<Artifact>,
        /// OS → classifier template, possibly containing `${arch}`.
        natives: BTreeMap<OperatingSystem, String>,
        classifiers: Option<BTreeMap<String, Artifact>>,
        extract: Option<ExtractRules>,
    },
}

impl LibraryDescriptor {
    pub fn java(name: impl Into<String>, artifact: Option<Artifact>) -> Self {
        Self {
            name: name.into(),
            url: None,
            rules: None,
            kind: LibraryKind::Java { artifact },
        }
    }

    pub fn native(
        name: impl Into<String>,
        natives: BTreeMap<OperatingSystem, String>,
        classifiers: Option<BTreeMap<String, Artifact>>,
        extract: Option<ExtractRules>,
    ) -> Self {
        Self {
            name: name.into(),
            url: None,
            rules: None,
            kind: LibraryKind::Native {
                artifact: None,
                natives,
                classifiers,
                extract,
            },
        }
    }

    /// Attach the plain jar of a native library.
    pub fn with_plain_artifact(mut self, plain: Artifact) -> Self {
        match &mut self.kind {
            LibraryKind::Java { artifact } | LibraryKind::Native { artifact, .. } => {
                *artifact = Some(plain)
            }
        }
        self
    }

    pub fn with_rules(mut self, rules: Vec<CompatibilityRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_repository(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, LibraryKind::Native { .. })
    }

    pub fn repository<'a>(&'a self, default_base: &'a str) -> &'a str {
        self.url.as_deref().unwrap_or(default_base)
    }

    /// Record every mismatch between this library's download metadata and
    /// the path/URL its name and repository imply.
    pub(crate) fn check(&self, libraries_base: &str, problems: &mut Vec<String>) {
        let label = format!("library {}", self.name);
        let repository = self.repository(libraries_base);

        let plain_path = match library_path(&self.name, None) {
            Ok(path) => path,
            Err(e) => {
                problems.push(format!("{label}: {e}"));
                return;
            }
        };

        match &self.kind {
            LibraryKind::Java { artifact } => {
                if let Some(artifact) = artifact {
                    artifact.check_library(&label, &plain_path, repository, problems);
                }
            }
            LibraryKind::Native {
                artifact,
                classifiers,
                ..
            } => {
                if let Some(artifact) = artifact {
                    artifact.check_library(&label, &plain_path, repository, problems);
                }
                for (classifier, artifact) in classifiers.iter().flatten() {
                    let label = format!("{label} [{classifier}]");
                    match library_path(&self.name, Some(classifier)) {
                        Ok(expected) => {
                            artifact.check_library(&label, &expected, repository, problems)
                        }
                        Err(e) => problems.push(format!("{label}: {e}")),
                    }
                }
            }
        }
    }
}

// ─── JSON shape ───

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLibrary {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<CompatibilityRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    natives: Option<BTreeMap<OperatingSystem, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extract: Option<ExtractRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    downloads: Option<RawLibraryDownloads>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawLibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    classifiers: Option<BTreeMap<String, Artifact>>,
}

impl From<RawLibrary> for LibraryDescriptor {
    fn from(raw: RawLibrary) -> Self {
        let RawLibraryDownloads {
            artifact,
            classifiers,
        } = raw.downloads.unwrap_or_default();

        let native = raw.natives.is_some() || classifiers.is_some();
        let kind = if native {
            LibraryKind::Native {
                artifact,
                natives: raw.natives.unwrap_or_default(),
                classifiers,
                extract: raw.extract,
            }
        } else {
            LibraryKind::Java { artifact }
        };

        Self {
            name: raw.name,
            url: raw.url,
            rules: raw.rules,
            kind,
        }
    }
}

impl From<LibraryDescriptor> for RawLibrary {
    fn from(lib: LibraryDescriptor) -> Self {
        let (natives, extract, downloads) = match lib.kind {
            LibraryKind::Java { artifact } => (
                None,
                None,
                artifact.map(|artifact| RawLibraryDownloads {
                    artifact: Some(artifact),
                    classifiers: None,
                }),
            ),
            LibraryKind::Native {
                artifact,
                natives,
                classifiers,
                extract,
            } => (
                Some(natives),
                extract,
                (artifact.is_some() || classifiers.is_some()).then_some(RawLibraryDownloads {
                    artifact,
                    classifiers,
                }),
            ),
        };

        Self {
            name: lib.name,
            url: lib.url,
            rules: lib.rules,
            natives,
            extract,
            downloads,
        }
    }
}
