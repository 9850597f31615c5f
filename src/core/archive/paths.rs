use std::path::{Component, Path, PathBuf};

use crate::core::error::{InstallError, InstallResult};

/// Join a `/`-separated relative entry name onto `base`, refusing anything
/// that could land outside of it (absolute paths, drive prefixes, `..`).
pub fn contained_join(base: &Path, entry: &str) -> InstallResult<PathBuf> {
    let traversal = || InstallError::PathTraversal {
        base: base.to_path_buf(),
        entry: entry.to_string(),
    };

    let mut relative = PathBuf::new();
    for component in Path::new(entry).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal())
            }
        }
    }

    // Backslashes are separators inside archives written on Windows.
    if entry.split(['/', '\\']).any(|part| part == "..") {
        return Err(traversal());
    }

    if relative.as_os_str().is_empty() {
        return Err(traversal());
    }

    Ok(base.join(relative))
}

/// Whether `name` can be used as one file name component: non-empty,
/// not `.` or `..`, and free of separators and drive markers.
pub fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}
