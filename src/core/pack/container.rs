// ─── Packed Library Container ───
// `.pack.xz` libraries: an XZ stream wrapping
//   [pack200 data][checksum manifest][u32 LE manifest length]["SIGN"]
// Unpacking yields the original jar plus a `checksums.sha1` entry carrying
// the manifest.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, info, warn};
use xz2::read::XzDecoder;
use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipArchive, ZipWriter};

use crate::core::archive::contained_join;
use crate::core::error::{InstallError, InstallResult};

const SIGNATURE: &[u8; 4] = b"SIGN";
const TRAILER_LEN: u64 = 8;
pub const CHECKSUMS_ENTRY: &str = "checksums.sha1";

/// Newline-delimited SHA-1 digests, one per original jar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumManifest {
    raw: Vec<u8>,
}

impl ChecksumManifest {
    pub fn parse(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn digests(&self) -> Vec<&str> {
        std::str::from_utf8(&self.raw)
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Reverses the pack200 transform: `packed` in, jar at `jar` out.
pub trait Pack200Unpacker: Send + Sync {
    fn unpack(&self, packed: &Path, jar: &Path) -> InstallResult<()>;
}

/// Runs the JDK's `unpack200` tool.
#[derive(Debug, Clone)]
pub struct ExternalUnpack200 {
    program: PathBuf,
}

impl ExternalUnpack200 {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExternalUnpack200 {
    fn default() -> Self {
        Self::new("unpack200")
    }
}

impl Pack200Unpacker for ExternalUnpack200 {
    fn unpack(&self, packed: &Path, jar: &Path) -> InstallResult<()> {
        let output = Command::new(&self.program)
            .arg(packed)
            .arg(jar)
            .output()
            .map_err(|e| InstallError::Transcode(format!("cannot run {:?}: {e}", self.program)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(InstallError::Transcode(format!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[derive(Clone)]
pub struct ContainerTranscoder {
    unpacker: Arc<dyn Pack200Unpacker>,
}

impl ContainerTranscoder {
    pub fn new(unpacker: Arc<dyn Pack200Unpacker>) -> Self {
        Self { unpacker }
    }

    pub fn unpack_file(&self, container: &Path, dest: &Path) -> InstallResult<ChecksumManifest> {
        let file = std::fs::File::open(container).map_err(InstallError::io(container))?;
        self.unpack(file, dest)
    }

    /// Decode `container` into a jar at `dest` and return its manifest.
    ///
    /// All intermediate files live next to `dest` and are removed on every
    /// exit path; `dest` itself only appears once the jar is complete.
    pub fn unpack<R: Read>(&self, container: R, dest: &Path) -> InstallResult<ChecksumManifest> {
        let dir = dest
            .parent()
            .ok_or_else(|| InstallError::Other(format!("{dest:?} has no parent directory")))?;
        std::fs::create_dir_all(dir).map_err(InstallError::io(dir))?;

        let mut payload = tempfile::Builder::new()
            .prefix(".unpack-")
            .suffix(".pack")
            .tempfile_in(dir)
            .map_err(InstallError::io(dir))?;
        std::io::copy(&mut XzDecoder::new(container), payload.as_file_mut())
            .map_err(|e| InstallError::Transcode(format!("XZ decompression failed: {e}")))?;

        let manifest = split_trailer(payload.as_file_mut())?;
        debug!("Packed container carries {} checksums", manifest.digests().len());

        let jar = tempfile::Builder::new()
            .prefix(".unpack-")
            .suffix(".jar")
            .tempfile_in(dir)
            .map_err(InstallError::io(dir))?
            .into_temp_path();
        self.unpacker.unpack(payload.path(), &jar)?;
        drop(payload);

        append_checksums(&jar, &manifest)?;

        jar.persist(dest).map_err(|e| InstallError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;
        info!("Unpacked {:?}", dest.file_name().unwrap_or_default());
        Ok(manifest)
    }
}

impl std::fmt::Debug for ContainerTranscoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerTranscoder").finish_non_exhaustive()
    }
}

/// Read and strip `[manifest][len]["SIGN"]` off the end of `file`,
/// leaving only the pack200 data.
fn split_trailer(file: &mut std::fs::File) -> InstallResult<ChecksumManifest> {
    let transcode = |e: std::io::Error| InstallError::Transcode(e.to_string());

    let len = file.metadata().map_err(transcode)?.len();
    if len < TRAILER_LEN {
        return Err(InstallError::Format(format!(
            "container is {len} bytes, shorter than its trailer"
        )));
    }

    let mut trailer = [0u8; TRAILER_LEN as usize];
    file.seek(SeekFrom::Start(len - TRAILER_LEN)).map_err(transcode)?;
    file.read_exact(&mut trailer).map_err(transcode)?;

    if &trailer[4..] != SIGNATURE {
        return Err(InstallError::Format("no signature".into()));
    }
    let manifest_len = u64::from(u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]));
    if manifest_len > len - TRAILER_LEN {
        return Err(InstallError::Format("invalid checksum length".into()));
    }

    let packed_len = len - TRAILER_LEN - manifest_len;
    let mut manifest = vec![0u8; manifest_len as usize];
    file.seek(SeekFrom::Start(packed_len)).map_err(transcode)?;
    file.read_exact(&mut manifest).map_err(transcode)?;
    file.set_len(packed_len).map_err(transcode)?;
    file.rewind().map_err(transcode)?;

    Ok(ChecksumManifest::parse(manifest))
}

fn append_checksums(jar: &Path, manifest: &ChecksumManifest) -> InstallResult<()> {
    let transcode = |e: zip::result::ZipError| InstallError::Transcode(e.to_string());
    let open = || {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(jar)
            .map_err(|e| InstallError::Transcode(format!("cannot open unpacked jar: {e}")))
    };

    let entries = {
        let archive = ZipArchive::new(open()?).map_err(transcode)?;
        for name in archive.file_names() {
            contained_join(jar, name)?;
        }
        archive.len()
    };
    let listed = manifest.digests().len();
    if listed != entries {
        warn!(
            "Checksum manifest lists {} digests for {} jar entries",
            listed, entries
        );
    }

    let mut writer = ZipWriter::new_append(open()?).map_err(transcode)?;
    let options = SimpleFileOptions::default().last_modified_time(DateTime::default());
    writer
        .start_file(CHECKSUMS_ENTRY, options)
        .map_err(transcode)?;
    writer
        .write_all(manifest.as_bytes())
        .map_err(|e| InstallError::Transcode(e.to_string()))?;
    writer.finish().map_err(transcode)?;
    Ok(())
}
