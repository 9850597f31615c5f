// ─── Target Descriptor ───
// Platform identity (OS, OS version, CPU architecture) that libraries are
// resolved against, plus the `${arch}` substitution table for classifiers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating systems a version descriptor can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
    Osx,
}

impl OperatingSystem {
    /// Identify an OS from a free-form name such as `"Windows 10"` or `"Mac OS X"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        const KEYWORDS: [(OperatingSystem, &[&str]); 3] = [
            (OperatingSystem::Linux, &["linux", "unix"]),
            (OperatingSystem::Windows, &["windows"]),
            (OperatingSystem::Osx, &["mac", "os x", "darwin"]),
        ];

        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(os, _)| *os)
    }

    /// The name used in descriptor JSON (`linux`, `windows`, `osx`).
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Windows => "windows",
            OperatingSystem::Osx => "osx",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (OS, OS version, architecture) tuple being installed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub os: OperatingSystem,
    pub os_version: String,
    pub arch: String,
}

impl TargetDescriptor {
    pub fn new(os: OperatingSystem, os_version: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os,
            os_version: os_version.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform this process runs on.
    ///
    /// Architecture names follow the JVM's `os.arch` convention because
    /// descriptor rules are written against it.
    pub fn current() -> Self {
        let os = OperatingSystem::from_name(std::env::consts::OS).unwrap_or(OperatingSystem::Linux);
        let os_version = sysinfo::System::os_version().unwrap_or_default();
        Self {
            os,
            os_version,
            arch: jvm_arch_name(std::env::consts::ARCH).to_string(),
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.os, self.os_version, self.arch)
    }
}

fn jvm_arch_name(rust_arch: &str) -> &str {
    match rust_arch {
        "x86_64" => "amd64",
        "x86" => "x86",
        other => other,
    }
}

/// Maps a target architecture to the value substituted for `${arch}` in
/// native classifier templates. Unmapped architectures pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchMapping {
    names: BTreeMap<String, String>,
}

pub const ARCH_PLACEHOLDER: &str = "${arch}";

impl ArchMapping {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// A mapping that substitutes the architecture unchanged.
    pub fn passthrough() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    pub fn arch_name<'a>(&'a self, arch: &'a str) -> &'a str {
        self.names.get(arch).map(String::as_str).unwrap_or(arch)
    }

    /// Expand `${arch}` in a classifier template for the given target.
    pub fn substitute(&self, template: &str, target: &TargetDescriptor) -> String {
        template.replace(ARCH_PLACEHOLDER, self.arch_name(&target.arch))
    }
}

impl Default for ArchMapping {
    fn default() -> Self {
        Self::new(default_arch_names())
    }
}

/// Bitness table used by the launcher for `natives-windows-${arch}` style classifiers.
pub fn default_arch_names() -> BTreeMap<String, String> {
    [
        ("amd64", "64"),
        ("x86_64", "64"),
        ("x64", "64"),
        ("x86", "32"),
        ("i386", "32"),
        ("i686", "32"),
    ]
    .into_iter()
    .map(|(arch, name)| (arch.to_string(), name.to_string()))
    .collect()
}
