//! Release archive extraction
//!
//! Go releases ship as `.tar.gz` everywhere except Windows, which uses `.zip`.
//! Tarballs are decompressed as they stream in; zips need random access, so
//! they are handed to `unzip` once fully on disk.

use camino::Utf8Path;
use std::io::Read;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum TarballError {
    #[error("failed to read tarball: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to unpack {entry}: {source}")]
    Unpack {
        entry: String,
        source: std::io::Error,
    },

    #[error("{program} could not be started: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ToolFailed {
        program: String,
        status: std::process::ExitStatus,
    },

    #[error("spawn_blocking failed: {0}")]
    SpawnBlocking(#[from] tokio::task::JoinError),
}

/// Archive format, chosen by URL suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    pub fn from_url(url: &str) -> Self {
        if url.ends_with(".zip") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }
}

/// Extract a gzip-compressed tar stream into `dest` (must exist).
///
/// The stream is consumed on a blocking thread as it arrives, so the archive
/// is never held in memory as a whole.
pub async fn extract_tar_gz<R>(reader: R, dest: &Utf8Path) -> Result<(), TarballError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let bridge = tokio_util::io::SyncIoBridge::new(reader);
    let dest = dest.to_owned();
    tokio::task::spawn_blocking(move || unpack_tar_gz(bridge, &dest)).await?
}

/// Blocking tar.gz extraction.
///
/// Permissions and modification times are preserved. Entries that would land
/// outside `dest` are skipped.
pub fn unpack_tar_gz<R: Read>(reader: R, dest: &Utf8Path) -> Result<(), TarballError> {
    let decoder = flate2::read::GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);

    let mut count = 0usize;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();

        let unpacked = entry
            .unpack_in(dest.as_std_path())
            .map_err(|e| TarballError::Unpack {
                entry: name.clone(),
                source: e,
            })?;
        if !unpacked {
            warn!(entry = %name, "skipping tarball entry outside destination");
            continue;
        }
        count += 1;
    }

    debug!(dest = %dest, entries = count, "unpacked tarball");
    Ok(())
}

/// Extract a zip archive already on disk into `dest` using `unzip`.
pub async fn extract_zip(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), TarballError> {
    let program = "unzip";
    let status = tokio::process::Command::new(program)
        .arg("-q")
        .arg(archive.as_std_path())
        .arg("-d")
        .arg(dest.as_std_path())
        .status()
        .await
        .map_err(|e| TarballError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

    if !status.success() {
        return Err(TarballError::ToolFailed {
            program: program.to_string(),
            status,
        });
    }

    debug!(archive = %archive, dest = %dest, "unzipped archive");
    Ok(())
}
