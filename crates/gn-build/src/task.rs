//! Per-platform fetch and merge

use std::sync::Arc;

use gn_fetch::{FetchError, Fetcher};
use gn_toolchain::{GoVersion, Platform};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{BarrierWaiter, BuildError, FailureSlot, GoRootLayout};

/// How a platform task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Libraries and runtime fragments merged, `files` written in total
    Merged { files: usize },
    /// An error was handed to the failure slot
    Failed,
    /// The run was abandoned before this task could merge
    Cancelled,
}

enum Stop {
    Failed(BuildError),
    Cancelled,
}

pub(crate) struct PlatformTask<F> {
    pub(crate) platform: Platform,
    pub(crate) version: GoVersion,
    pub(crate) target: GoRootLayout,
    pub(crate) fetcher: Arc<F>,
    pub(crate) barrier: BarrierWaiter,
    pub(crate) failures: Arc<FailureSlot>,
    pub(crate) cancel: CancellationToken,
}

impl<F: Fetcher> PlatformTask<F> {
    #[tracing::instrument(name = "platform", skip(self), fields(platform = %self.platform))]
    pub(crate) async fn run(mut self) -> TaskOutcome {
        match self.execute().await {
            Ok(files) => {
                info!(files, "platform merged");
                TaskOutcome::Merged { files }
            }
            Err(Stop::Cancelled) => {
                info!("platform cancelled");
                TaskOutcome::Cancelled
            }
            Err(Stop::Failed(error)) => {
                self.failures.record(error);
                TaskOutcome::Failed
            }
        }
    }

    async fn execute(&mut self) -> Result<usize, Stop> {
        let name = self.platform.to_string();
        let url = self.platform.dist_url(&self.version);

        // Dropped on every return below, which removes the download.
        let scratch = match self.fetcher.fetch(&url, &name, &self.cancel).await {
            Ok(scratch) => scratch,
            Err(FetchError::Cancelled { .. }) => return Err(Stop::Cancelled),
            Err(e) => {
                return Err(Stop::Failed(BuildError::Fetch {
                    what: name.clone(),
                    source: e,
                }));
            }
        };

        debug!("waiting for target");
        let instant = self
            .barrier
            .wait()
            .await
            .map_err(|_| Stop::Cancelled)?;

        let dist = GoRootLayout::new(scratch.path());
        let merge_err = |what: &str| {
            let what = format!("{} {}", name, what);
            move |e| Stop::Failed(BuildError::Merge { what, source: e })
        };

        let pkg_dst = self.target.platform_pkg_dir(&self.platform);
        let mut files = gn_io::merge_tree(&dist.platform_pkg_dir(&self.platform), &pkg_dst)
            .await
            .map_err(merge_err("packages"))?;

        let fragments = gn_io::runtime_fragments(&dist.runtime_dir(), &name)
            .map_err(merge_err("runtime fragments"))?;
        files += gn_io::merge_files(fragments, &self.target.runtime_dir())
            .await
            .map_err(merge_err("runtime fragments"))?;

        gn_io::normalize_timestamps(&pkg_dst, instant)
            .await
            .map_err(|e| {
                Stop::Failed(BuildError::Timestamp {
                    platform: self.platform.clone(),
                    source: e,
                })
            })?;

        drop(scratch);
        Ok(files)
    }
}
