use serde::{Deserialize, Serialize};

/// Keys of a descriptor's `downloads` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadType {
    Client,
    Server,
    WindowsServer,
    ClientMappings,
    ServerMappings,
}

impl DownloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadType::Client => "client",
            DownloadType::Server => "server",
            DownloadType::WindowsServer => "windows_server",
            DownloadType::ClientMappings => "client_mappings",
            DownloadType::ServerMappings => "server_mappings",
        }
    }

    /// Executables whose URL is re-derived from the launcher base during validation.
    pub fn is_executable(&self) -> bool {
        matches!(
            self,
            DownloadType::Client | DownloadType::Server | DownloadType::WindowsServer
        )
    }

    fn extension(&self) -> &'static str {
        match self {
            DownloadType::WindowsServer => "exe",
            DownloadType::ClientMappings | DownloadType::ServerMappings => "txt",
            _ => "jar",
        }
    }

    /// `{launcher}/{id}/{type}/{sha1}/{type}.{jar|exe}`
    pub fn canonical_url(&self, launcher_base: &str, id: &str, sha1: &str) -> String {
        let kind = self.as_str();
        format!(
            "{}/{id}/{kind}/{sha1}/{kind}.{}",
            launcher_base.trim_end_matches('/'),
            self.extension()
        )
    }
}

/// A concrete downloadable file.
///
/// `path` is only present for library artifacts, where it is the location
/// relative to the libraries directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

impl Artifact {
    pub fn new(url: impl Into<String>, sha1: impl Into<String>, size: u64) -> Self {
        Self {
            path: None,
            sha1: sha1.into(),
            size,
            url: url.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Checks shared by every download: a well-formed digest and a URL.
    pub(crate) fn check_base(&self, label: &str, problems: &mut Vec<String>) {
        if !is_sha1_hex(&self.sha1) {
            problems.push(format!(
                "{label}: sha1 {:?} is not 40 lowercase hex characters",
                self.sha1
            ));
        }
        if self.url.is_empty() {
            problems.push(format!("{label}: url is missing"));
        }
    }

    pub(crate) fn check_executable(
        &self,
        id: &str,
        kind: DownloadType,
        launcher_base: &str,
        problems: &mut Vec<String>,
    ) {
        let label = format!("downloads.{}", kind.as_str());
        self.check_base(&label, problems);
        if kind.is_executable() {
            let expected = kind.canonical_url(launcher_base, id, &self.sha1);
            if self.url != expected {
                problems.push(format!(
                    "{label}: url {} does not match expected {expected}",
                    self.url
                ));
            }
        }
    }

    pub(crate) fn check_library(
        &self,
        label: &str,
        expected_path: &str,
        repository: &str,
        problems: &mut Vec<String>,
    ) {
        self.check_base(label, problems);
        match self.path.as_deref() {
            None => problems.push(format!("{label}: path is missing")),
            Some(path) if path != expected_path => problems.push(format!(
                "{label}: path {path} does not match expected {expected_path}"
            )),
            Some(_) => {}
        }
        let expected = format!("{}/{expected_path}", repository.trim_end_matches('/'));
        if self.url != expected {
            problems.push(format!(
                "{label}: url {} does not match expected {expected}",
                self.url
            ));
        }
    }
}

/// Reference to the asset index a version uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub total_size: u64,
    pub url: String,
}

impl AssetIndexInfo {
    pub fn artifact(&self) -> Artifact {
        Artifact::new(self.url.clone(), self.sha1.clone(), self.size)
    }

    pub(crate) fn check(&self, assets_id: &str, problems: &mut Vec<String>) {
        self.artifact().check_base("assetIndex", problems);
        if self.id != assets_id {
            problems.push(format!(
                "assetIndex: id {} does not match assets {assets_id}",
                self.id
            ));
        }
    }
}

pub fn is_sha1_hex(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "3737db93722a9e39eeada7c27e7aca28b144ffa7";

    #[test]
    fn sha1_format() {
        assert!(is_sha1_hex(SHA));
        assert!(!is_sha1_hex(&SHA.to_uppercase()));
        assert!(!is_sha1_hex(&SHA[1..]));
        assert!(!is_sha1_hex("zz37db93722a9e39eeada7c27e7aca28b144ffa7"));
    }

    #[test]
    fn executable_urls() {
        let base = "https://launcher.mojang.com/mc/game";
        assert_eq!(
            DownloadType::Client.canonical_url(base, "1.8.9", SHA),
            format!("{base}/1.8.9/client/{SHA}/client.jar")
        );
        assert_eq!(
            DownloadType::WindowsServer.canonical_url(base, "1.8.9", SHA),
            format!("{base}/1.8.9/windows_server/{SHA}/windows_server.exe")
        );
    }

    #[test]
    fn tampered_executable_is_reported() {
        let base = "https://launcher.mojang.com/mc/game";
        let artifact = Artifact::new("https://evil.example/client.jar", SHA, 10);
        let mut problems = Vec::new();
        artifact.check_executable("1.8.9", DownloadType::Client, base, &mut problems);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("does not match expected"));
    }

    #[test]
    fn mappings_only_need_base_checks() {
        let artifact = Artifact::new("https://piston-data.mojang.com/v1/objects/x/client.txt", SHA, 1);
        let mut problems = Vec::new();
        artifact.check_executable(
            "1.20.1",
            DownloadType::ClientMappings,
            "https://launcher.mojang.com/mc/game",
            &mut problems,
        );
        assert!(problems.is_empty());
    }

    #[test]
    fn download_keys_use_snake_case() {
        let key: DownloadType = serde_json::from_str("\"windows_server\"").unwrap();
        assert_eq!(key, DownloadType::WindowsServer);
    }
}
