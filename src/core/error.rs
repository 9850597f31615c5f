use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Central error type for the installation engine.
/// Every module returns `Result<T, InstallError>`.
#[derive(Debug, Error)]
pub enum InstallError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Entry {entry:?} escapes destination {base:?}")]
    PathTraversal { base: PathBuf, entry: String },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    Network { url: String, status: u16 },

    #[error("Download of {url} did not finish within {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Installation cancelled")]
    Cancelled,

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        url: String,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    // ── Descriptors ─────────────────────────────────────
    #[error("Version {id} failed validation: {}", .problems.join("; "))]
    Validation { id: String, problems: Vec<String> },

    #[error("Cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("Version {0} not found")]
    VersionNotFound(String),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archives ────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed packed container: {0}")]
    Format(String),

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    // ── Aggregate ───────────────────────────────────────
    #[error("{} artifact(s) failed to install: {}", .0.len(), first_failure(.0))]
    Aggregate(Vec<JobFailure>),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallResult<T> = Result<T, InstallError>;

impl From<std::io::Error> for InstallError {
    fn from(source: std::io::Error) -> Self {
        InstallError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| InstallError::Io { path, source }
    }

    /// True for failures caused by a descriptor that is malformed or
    /// does not match its canonical form.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            InstallError::Validation { .. } | InstallError::CyclicInheritance { .. }
        )
    }
}

/// One failed per-artifact job inside an aggregate failure.
#[derive(Debug)]
pub struct JobFailure {
    pub label: String,
    pub error: InstallError,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

fn first_failure(failures: &[JobFailure]) -> String {
    match failures.first() {
        Some(failure) if failures.len() > 1 => format!("{failure} (and {} more)", failures.len() - 1),
        Some(failure) => failure.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_problem() {
        let err = InstallError::Validation {
            id: "1.8.9".into(),
            problems: vec!["main class is missing".into(), "time is missing".into()],
        };
        assert_eq!(
            err.to_string(),
            "Version 1.8.9 failed validation: main class is missing; time is missing"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn aggregate_message_mentions_remaining_count() {
        let err = InstallError::Aggregate(vec![
            JobFailure {
                label: "library a:b:1".into(),
                error: InstallError::Network {
                    url: "https://x/a".into(),
                    status: 404,
                },
            },
            JobFailure {
                label: "asset icon.png".into(),
                error: InstallError::Cancelled,
            },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 artifact(s) failed to install: library a:b:1"));
        assert!(text.ends_with("(and 1 more)"));
    }
}
