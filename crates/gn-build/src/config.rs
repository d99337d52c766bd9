use camino::{Utf8Path, Utf8PathBuf};
use gn_toolchain::Platform;

use crate::BuildError;

/// Environment variable overriding where scratch directories are created
pub const SCRATCH_DIR_ENV: &str = "GONATIVE_SCRATCH_DIR";

/// Machine-level settings that are not part of a request
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Parent of every scratch directory
    pub scratch_root: Utf8PathBuf,
    /// Platform the host build runs on
    pub host: Platform,
}

impl BuildConfig {
    /// Resolve settings: an explicit scratch root wins, then
    /// `GONATIVE_SCRATCH_DIR`, then `cwd`.
    pub fn resolve(scratch_root: Option<Utf8PathBuf>, cwd: &Utf8Path) -> Result<Self, BuildError> {
        let scratch_root = scratch_root
            .or_else(|| std::env::var(SCRATCH_DIR_ENV).ok().map(Utf8PathBuf::from))
            .unwrap_or_else(|| cwd.to_owned());
        let scratch_root = if scratch_root.is_absolute() {
            scratch_root
        } else {
            cwd.join(scratch_root)
        };

        let host = Platform::host().map_err(|e| BuildError::InvalidRequest(e.to_string()))?;

        Ok(Self { scratch_root, host })
    }
}
