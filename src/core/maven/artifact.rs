use serde::{Deserialize, Serialize};

use crate::core::error::{InstallError, InstallResult};

/// A library coordinate split into its Maven parts.
///
/// Supported formats:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///
/// The install path of a library is a pure function of its coordinate
/// and optional classifier, so the same coordinate always lands in the
/// same place under `libraries/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl MavenCoordinate {
    pub fn parse(name: &str) -> InstallResult<Self> {
        let parts: Vec<&str> = name.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(InstallError::InvalidCoordinate(name.to_string()));
        }

        match parts.as_slice() {
            [group, artifact, version] => Ok(Self {
                group_id: group.to_string(),
                artifact_id: artifact.to_string(),
                version: version.to_string(),
                classifier: None,
            }),
            [group, artifact, version, classifier] => Ok(Self {
                group_id: group.to_string(),
                artifact_id: artifact.to_string(),
                version: version.to_string(),
                classifier: Some(classifier.to_string()),
            }),
            _ => Err(InstallError::InvalidCoordinate(name.to_string())),
        }
    }

    /// Same coordinate with the classifier replaced.
    pub fn with_classifier(&self, classifier: &str) -> Self {
        Self {
            classifier: Some(classifier.to_string()),
            ..self.clone()
        }
    }

    /// `net.sf.jopt-simple` → `net/sf/jopt-simple`
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `artifact-version[-classifier].jar`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.jar", self.artifact_id, self.version, c),
            None => format!("{}-{}.jar", self.artifact_id, self.version),
        }
    }

    /// Path relative to the libraries directory, always `/`-separated.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Location of this artifact inside a Maven-layout repository.
    pub fn url(&self, repo_base: &str) -> String {
        format!("{}/{}", repo_base.trim_end_matches('/'), self.relative_path())
    }
}

/// Derive the library path for `name`, optionally with a classifier.
pub fn library_path(name: &str, classifier: Option<&str>) -> InstallResult<String> {
    let coordinate = MavenCoordinate::parse(name)?;
    Ok(match classifier {
        Some(c) => coordinate.with_classifier(c).relative_path(),
        None => coordinate.relative_path(),
    })
}
