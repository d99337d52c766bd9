//! gn-build: assemble a cross-compiling Go toolchain
//!
//! The [`Orchestrator`] starts one task per requested platform to download
//! that platform's binary release, while it prepares the target GOROOT
//! itself: source in place, host build, one `dist bootstrap` per platform.
//! Tasks block on a [`ReadinessBarrier`] until the GOROOT exists, then merge
//! their `pkg/<os_arch>` libraries and runtime fragments into it.

mod barrier;
mod config;
mod failure;
mod layout;
mod orchestrator;
mod request;
mod task;

use gn_fetch::FetchError;
use gn_io::TreeError;
use gn_toolchain::{Platform, ToolchainError};
use thiserror::Error;

pub use barrier::{BarrierWaiter, Cancelled, ReadinessBarrier};
pub use config::BuildConfig;
pub use failure::FailureSlot;
pub use layout::{Claim, GoRootLayout};
pub use orchestrator::{BuildReport, Orchestrator};
pub use request::BuildRequest;
pub use task::TaskOutcome;

/// Errors that end a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to fetch {what}: {source}")]
    Fetch { what: String, source: FetchError },

    #[error("{step} failed: {source}")]
    ExternalTool {
        step: String,
        source: ToolchainError,
    },

    #[error("failed to merge {what}: {source}")]
    Merge { what: String, source: TreeError },

    #[error("failed to normalize timestamps for {platform}: {source}")]
    Timestamp {
        platform: Platform,
        source: TreeError,
    },

    #[error("task for {platform} panicked")]
    TaskPanicked { platform: Platform },
}
