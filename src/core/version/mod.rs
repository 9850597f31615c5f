pub mod cache;
pub mod descriptor;
pub mod download;
pub mod inheritance;
pub mod library;
pub mod resolve;
pub mod rules;

pub use cache::DescriptorCache;
pub use descriptor::{ReleaseType, VersionDescriptor};
pub use download::{is_sha1_hex, Artifact, AssetIndexInfo, DownloadType};
pub use inheritance::{resolve_inheritance, DescriptorSource, VersionDirectory};
pub use library::{LibraryDescriptor, LibraryKind};
pub use resolve::{resolve_artifact, ArtifactResolver, ResolvedArtifact};
pub use rules::{
    is_compatible, CompatibilityRule, OsRestriction, RuleAction, RulePattern, DEFAULT_RULE_ACTION,
};
