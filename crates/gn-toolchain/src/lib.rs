//! Go toolchain knowledge for gonative
//!
//! - Platforms (`os_arch` pairs) and the fixed set gonative knows how to merge
//! - Distribution URLs for the per-platform binary releases and the source archive
//! - The host build (`make.bash`) and per-platform `dist bootstrap` invocations
//!
//! Running the commands is delegated to a [`ToolRunner`] so orchestration can be
//! exercised without a real Go checkout.

pub mod dist;
pub mod platform;
pub mod tool;

use thiserror::Error;

pub use dist::GoVersion;
pub use platform::Platform;
pub use tool::{ProcessRunner, ToolCommand, ToolRunner, bootstrap_command, host_build_command};

/// Errors that can occur while resolving toolchain inputs
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("invalid platform string: {0:?} (expected os_arch)")]
    InvalidPlatform(String),

    #[error("unsupported host platform: {os}-{arch}")]
    UnsupportedHost { os: String, arch: String },

    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),

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
}

#[cfg(test)]
mod tests;
