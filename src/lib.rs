pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::InstallerConfig;
pub use crate::core::error::{InstallError, InstallResult};
pub use crate::core::install::{InstallReport, Installer, Side};
pub use crate::core::platform::{OperatingSystem, TargetDescriptor};
pub use crate::core::version::{resolve_artifact, ResolvedArtifact, VersionDescriptor};

/// Install the structured logging subscriber.
///
/// Honors `RUST_LOG`; defaults to `info,installer_lib=debug`. Calling it a
/// second time is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,installer_lib=debug")),
        )
        .try_init();

    tracing::debug!("Installer logging initialised");
}
