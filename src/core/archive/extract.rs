// ─── Archive Extractor ───
// Incremental extraction of zip/jar containers (native library bundles).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::paths::contained_join;
use crate::core::error::{InstallError, InstallResult};

/// Which entries of a native bundle to leave out, by literal name prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ExtractRules {
    pub fn excluding<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn should_extract(&self, name: &str) -> bool {
        !self.exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub already_present: usize,
    pub excluded: usize,
}

/// Extract every file entry of `archive_path` into `dest`.
///
/// Directory entries and excluded names are skipped. An entry whose
/// destination already exists is left untouched, so re-running after a
/// partial extraction only fills in what is missing. Each file is written
/// to a temporary sibling first and renamed into place once complete.
pub fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    rules: &ExtractRules,
) -> InstallResult<ExtractSummary> {
    let file = std::fs::File::open(archive_path).map_err(InstallError::io(archive_path))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut summary = ExtractSummary::default();

    std::fs::create_dir_all(dest).map_err(InstallError::io(dest))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        if !rules.should_extract(&name) {
            summary.excluded += 1;
            continue;
        }

        let out_path = contained_join(dest, &name)?;
        if out_path.exists() {
            summary.already_present += 1;
            continue;
        }

        let parent = out_path.parent().unwrap_or(dest);
        std::fs::create_dir_all(parent).map_err(InstallError::io(parent))?;

        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(InstallError::io(parent))?;
        std::io::copy(&mut entry, staged.as_file_mut()).map_err(InstallError::io(&out_path))?;
        staged.persist(&out_path).map_err(|e| InstallError::Io {
            path: out_path.clone(),
            source: e.error,
        })?;

        debug!("Extracted {}", name);
        summary.extracted += 1;
    }

    info!(
        "Extracted {:?}: {} new, {} present, {} excluded",
        archive_path.file_name().unwrap_or_default(),
        summary.extracted,
        summary.already_present,
        summary.excluded
    );
    Ok(summary)
}
