use camino::{Utf8Path, Utf8PathBuf};
use gn_toolchain::{GoVersion, Platform};
use tracing::warn;

use crate::BuildError;

/// What to build. Fixed for the duration of a run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    version: GoVersion,
    source: Option<Utf8PathBuf>,
    target: Utf8PathBuf,
    platforms: Vec<Platform>,
}

impl BuildRequest {
    /// Validate a request.
    ///
    /// `target` must be absolute. Repeated platforms are collapsed, since two
    /// tasks for one platform would write the same files.
    pub fn new(
        version: &str,
        source: Option<Utf8PathBuf>,
        target: Utf8PathBuf,
        platforms: Vec<Platform>,
    ) -> Result<Self, BuildError> {
        let version = GoVersion::parse(version).map_err(|e| BuildError::InvalidRequest(e.to_string()))?;

        if !target.is_absolute() {
            return Err(BuildError::InvalidRequest(format!(
                "target path must be absolute: {}",
                target
            )));
        }

        if platforms.is_empty() {
            return Err(BuildError::InvalidRequest("no platforms requested".to_string()));
        }

        let mut unique: Vec<Platform> = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if unique.contains(&platform) {
                continue;
            }
            if !platform.is_supported() {
                warn!(platform = %platform, "platform is not in the supported set");
            }
            unique.push(platform);
        }

        Ok(Self {
            version,
            source,
            target,
            platforms: unique,
        })
    }

    /// Like [`BuildRequest::new`], with platforms given as a space-separated
    /// `os_arch` list (empty means all supported platforms).
    pub fn from_tokens(
        version: &str,
        source: Option<Utf8PathBuf>,
        target: Utf8PathBuf,
        platforms: &str,
    ) -> Result<Self, BuildError> {
        let platforms =
            Platform::parse_list(platforms).map_err(|e| BuildError::InvalidRequest(e.to_string()))?;
        Self::new(version, source, target, platforms)
    }

    pub fn version(&self) -> &GoVersion {
        &self.version
    }

    /// Local Go source tree; `None` means fetch it
    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }
}
