// ─── Installer Core ───
// Platform-aware artifact resolution and verified installation.
//
// Architecture:
//   core/
//     platform/   — Target (OS, version, arch) + ${arch} table
//     version/    — Descriptor model, rules, inheritance, resolver, cache
//     maven/      — Coordinate → library path / URL
//     assets/     — Asset index model
//     downloader/ — HTTP seam + idempotent, digest-verified fetch
//     archive/    — Native bundle extraction with containment checks
//     pack/       — .pack.xz container → jar
//     install/    — Client/server install orchestration

pub mod archive;
pub mod assets;
pub mod config;
pub mod downloader;
pub mod error;
pub mod install;
pub mod maven;
pub mod pack;
pub mod platform;
pub mod version;
