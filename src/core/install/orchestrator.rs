// ─── Installation Orchestrator ───
// Drives a version install: validate, lay out directories, then run every
// independent artifact job through a bounded pool and report what happened.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::layout::InstallLayout;
use super::side::Side;
use crate::core::archive::extract_archive;
use crate::core::assets::AssetIndex;
use crate::core::config::{BaseUrls, InstallerConfig};
use crate::core::downloader::{Digests, Downloader, FetchOutcome, HttpFetch, ReqwestFetcher};
use crate::core::error::{InstallError, InstallResult, JobFailure};
use crate::core::pack::{ContainerTranscoder, ExternalUnpack200, Pack200Unpacker};
use crate::core::platform::TargetDescriptor;
use crate::core::version::{
    resolve_inheritance, ArtifactResolver, DescriptorCache, DescriptorSource, DownloadType,
    ResolvedArtifact, VersionDescriptor,
};

/// What an install run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub downloaded: usize,
    pub already_present: usize,
    /// Libraries that resolved to nothing for the target.
    pub skipped_libraries: usize,
    pub extracted_natives: usize,
    pub bytes_downloaded: u64,
}

impl InstallReport {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome.fetch {
            FetchOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes_downloaded += bytes;
            }
            FetchOutcome::AlreadyPresent => self.already_present += 1,
        }
        self.extracted_natives += outcome.extracted;
    }
}

/// One independent unit of install work.
#[derive(Debug)]
enum Job {
    Fetch {
        label: String,
        url: String,
        dest: PathBuf,
        digests: Digests,
    },
    Library(ResolvedArtifact),
}

impl Job {
    fn label(&self) -> String {
        match self {
            Job::Fetch { label, .. } => label.clone(),
            Job::Library(artifact) => format!("library {}", artifact.name),
        }
    }
}

struct JobOutcome {
    fetch: FetchOutcome,
    extracted: usize,
}

pub struct Installer {
    config: InstallerConfig,
    base: BaseUrls,
    downloader: Downloader,
    resolver: ArtifactResolver,
    transcoder: ContainerTranscoder,
    cache: DescriptorCache,
    cancel: CancellationToken,
}

impl Installer {
    /// Installer backed by reqwest and the external `unpack200` tool.
    pub fn new(config: InstallerConfig) -> InstallResult<Self> {
        let http = Arc::new(ReqwestFetcher::new(&config.user_agent)?);
        let unpacker = Arc::new(ExternalUnpack200::new(config.unpack200_program.clone()));
        Ok(Self::with_parts(config, http, unpacker))
    }

    pub fn with_parts(
        config: InstallerConfig,
        http: Arc<dyn HttpFetch>,
        unpacker: Arc<dyn Pack200Unpacker>,
    ) -> Self {
        let base = config.base_urls();
        let cancel = CancellationToken::new();
        let downloader = Downloader::new(http)
            .with_timeout(config.fetch_timeout())
            .with_cancellation(cancel.clone());

        Self {
            resolver: ArtifactResolver::new(config.arch_mapping(), base.libraries.clone()),
            transcoder: ContainerTranscoder::new(unpacker),
            cache: DescriptorCache::new(config.cache_capacity),
            downloader,
            base,
            cancel,
            config,
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ArtifactResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// Token that aborts in-flight and pending work when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolve `id` through its inheritance chain and install it under the
    /// configured root.
    pub async fn install_version(
        &self,
        source: &dyn DescriptorSource,
        id: &str,
        side: Side,
        target: &TargetDescriptor,
    ) -> InstallResult<InstallReport> {
        let descriptor = match self.cache.version(id) {
            Some(cached) => cached,
            None => {
                let resolved = resolve_inheritance(source, id).await?;
                resolved.validate(id, &self.base)?;
                self.cache.insert_version(resolved)
            }
        };

        let root = self.config.root.clone();
        self.install(&descriptor, side, target, &root).await
    }

    /// Install one side of a fully resolved descriptor under `root`.
    ///
    /// The descriptor is validated before anything touches the network.
    /// Independent artifacts are fetched concurrently; when some of them
    /// fail, the rest still complete and the failures come back together
    /// as [`InstallError::Aggregate`]. Re-running resumes where it stopped.
    #[instrument(skip_all, fields(id = %descriptor.id, side = %side, target = %target))]
    pub async fn install(
        &self,
        descriptor: &VersionDescriptor,
        side: Side,
        target: &TargetDescriptor,
        root: &Path,
    ) -> InstallResult<InstallReport> {
        descriptor.validate(&descriptor.id, &self.base)?;
        let layout = InstallLayout::new(root);

        info!("Installing {} {} into {:?}", side, descriptor.id, root);
        let report = match side {
            Side::Client => self.install_client(descriptor, target, &layout).await?,
            Side::Server => self.install_server(descriptor, &layout).await?,
        };

        info!(
            "Installed {} {}: {} downloaded, {} present, {} libraries skipped, {} natives extracted",
            side,
            descriptor.id,
            report.downloaded,
            report.already_present,
            report.skipped_libraries,
            report.extracted_natives
        );
        Ok(report)
    }

    /// Blocking form of [`Installer::install`] for callers without a runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn install_blocking(
        &self,
        descriptor: &VersionDescriptor,
        side: Side,
        target: &TargetDescriptor,
        root: &Path,
    ) -> InstallResult<InstallReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.install(descriptor, side, target, root))
    }

    async fn install_server(
        &self,
        descriptor: &VersionDescriptor,
        layout: &InstallLayout,
    ) -> InstallResult<InstallReport> {
        let id = &descriptor.id;
        let server = descriptor
            .download(DownloadType::Server)
            .ok_or_else(|| InstallError::Validation {
                id: id.clone(),
                problems: vec!["no server download".into()],
            })?;

        let outcome = self
            .downloader
            .fetch(&server.url, &layout.server_jar(id), &Digests::sha1(&server.sha1))
            .await?;

        let mut report = InstallReport::default();
        report.record(&JobOutcome {
            fetch: outcome,
            extracted: 0,
        });
        Ok(report)
    }

    async fn install_client(
        &self,
        descriptor: &VersionDescriptor,
        target: &TargetDescriptor,
        layout: &InstallLayout,
    ) -> InstallResult<InstallReport> {
        let id = &descriptor.id;
        let mut report = InstallReport::default();
        let mut jobs = Vec::new();

        // 1. Version directory, client jar and descriptor
        let version_dir = layout.version_dir(id);
        tokio::fs::create_dir_all(&version_dir)
            .await
            .map_err(InstallError::io(&version_dir))?;

        let client = descriptor
            .download(DownloadType::Client)
            .ok_or_else(|| InstallError::Validation {
                id: id.clone(),
                problems: vec!["no client download".into()],
            })?;
        jobs.push(Job::Fetch {
            label: format!("{id}.jar"),
            url: client.url.clone(),
            dest: layout.version_jar(id),
            digests: Digests::sha1(&client.sha1),
        });

        let json_path = layout.version_json(id);
        tokio::fs::write(&json_path, descriptor.to_json_pretty()?)
            .await
            .map_err(InstallError::io(&json_path))?;

        // 2. Asset index, then one job per object
        for dir in [layout.indexes_dir(), layout.objects_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(InstallError::io(&dir))?;
        }
        let (assets_id, index) = self.asset_index(descriptor, layout, &mut report).await?;

        let assets_dir = layout.assets_dir();
        let mut seen = HashSet::new();
        for (resource, object) in &index.objects {
            let dest = index.object_path(&assets_dir, &assets_id, resource, object)?;
            if !seen.insert(dest.clone()) {
                continue;
            }
            jobs.push(Job::Fetch {
                label: format!("asset {resource}"),
                url: object.url(&self.base.resources),
                dest,
                digests: Digests::sha1(&object.hash),
            });
        }

        // 3. Libraries resolved for this target
        for library in &descriptor.libraries {
            let files = self.resolver.resolve_all(library, target);
            if files.is_empty() {
                debug!("Skipping library {} for {}", library.name, target);
                report.skipped_libraries += 1;
            }
            jobs.extend(files.into_iter().map(Job::Library));
        }

        // 4. Run everything through the pool
        info!(
            "Running {} install jobs, concurrency={}",
            jobs.len(),
            self.config.concurrency
        );
        let results: Vec<(String, InstallResult<JobOutcome>)> = stream::iter(jobs)
            .map(|job| async move {
                let label = job.label();
                let result = self.run_job(job, layout).await;
                (label, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut failures = Vec::new();
        for (label, result) in results {
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(error) => {
                    warn!("{} failed: {}", label, error);
                    failures.push(JobFailure { label, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(InstallError::Aggregate(failures))
        }
    }

    /// Fetch (or reuse) the version's asset index and parse it.
    async fn asset_index(
        &self,
        descriptor: &VersionDescriptor,
        layout: &InstallLayout,
        report: &mut InstallReport,
    ) -> InstallResult<(String, Arc<AssetIndex>)> {
        let (assets_id, info) = match (&descriptor.assets, &descriptor.asset_index) {
            (Some(assets_id), Some(info)) => (assets_id.clone(), info),
            _ => {
                return Err(InstallError::Validation {
                    id: descriptor.id.clone(),
                    problems: vec!["assetIndex is missing".into()],
                })
            }
        };

        let path = layout.asset_index(&assets_id);
        let outcome = self
            .downloader
            .fetch(&info.url, &path, &Digests::sha1(&info.sha1))
            .await?;
        report.record(&JobOutcome {
            fetch: outcome,
            extracted: 0,
        });

        if let Some(cached) = self.cache.asset_index(&assets_id) {
            return Ok((assets_id, cached));
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(InstallError::io(&path))?;
        let index = AssetIndex::from_json(&raw)?;
        index.validate(&assets_id)?;
        let total = index.total_size();
        if info.total_size != 0 && total != info.total_size {
            warn!(
                "Asset index {} lists {} bytes of objects, descriptor says {}",
                assets_id, total, info.total_size
            );
        }
        debug!(
            "Asset index {} lists {} objects ({} bytes)",
            assets_id,
            index.objects.len(),
            total
        );
        Ok((assets_id.clone(), self.cache.insert_asset_index(&assets_id, index)))
    }

    async fn run_job(&self, job: Job, layout: &InstallLayout) -> InstallResult<JobOutcome> {
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        match job {
            Job::Fetch {
                url, dest, digests, ..
            } => {
                let fetch = self.downloader.fetch(&url, &dest, &digests).await?;
                Ok(JobOutcome { fetch, extracted: 0 })
            }
            Job::Library(artifact) => self.install_library(artifact, layout).await,
        }
    }

    async fn install_library(
        &self,
        artifact: ResolvedArtifact,
        layout: &InstallLayout,
    ) -> InstallResult<JobOutcome> {
        let dest = layout.library(&artifact.relative_path)?;

        let packed = match artifact.packed_url() {
            Some(packed_url) if !tokio::fs::try_exists(&dest).await.unwrap_or(false) => {
                self.fetch_packed(&packed_url, &dest).await?
            }
            _ => None,
        };
        let fetch = match packed {
            Some(outcome) => outcome,
            None => {
                let digests = artifact
                    .sha1
                    .as_ref()
                    .map(Digests::sha1)
                    .unwrap_or_default();
                self.downloader.fetch(&artifact.url, &dest, &digests).await?
            }
        };

        let extracted = match artifact.extract {
            Some(rules) => {
                let natives = layout.natives_dir();
                let jar = dest.clone();
                tokio::task::spawn_blocking(move || extract_archive(&jar, &natives, &rules))
                    .await
                    .map_err(|e| InstallError::Other(format!("Task join error: {e}")))??
                    .extracted
            }
            None => 0,
        };

        Ok(JobOutcome { fetch, extracted })
    }

    /// Try the `.pack.xz` container of a library. `Ok(None)` means the
    /// repository has none and the plain jar should be fetched instead.
    async fn fetch_packed(
        &self,
        packed_url: &str,
        dest: &Path,
    ) -> InstallResult<Option<FetchOutcome>> {
        let parent = dest
            .parent()
            .ok_or_else(|| InstallError::Other(format!("{dest:?} has no parent directory")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(InstallError::io(parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".packed-")
            .tempdir_in(parent)
            .map_err(InstallError::io(parent))?;
        let container = staging.path().join("library.pack.xz");

        let outcome = match self
            .downloader
            .fetch(packed_url, &container, &Digests::none())
            .await
        {
            Ok(outcome) => outcome,
            Err(InstallError::Network { status, .. }) => {
                debug!("No packed container at {} (HTTP {})", packed_url, status);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let transcoder = self.transcoder.clone();
        let jar = dest.to_path_buf();
        tokio::task::spawn_blocking(move || transcoder.unpack_file(&container, &jar))
            .await
            .map_err(|e| InstallError::Other(format!("Task join error: {e}")))??;

        Ok(Some(outcome))
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
