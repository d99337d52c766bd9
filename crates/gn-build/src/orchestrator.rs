//! Run orchestration

use std::sync::Arc;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use gn_fetch::Fetcher;
use gn_io::ScratchDir;
use gn_toolchain::{Platform, ToolRunner, bootstrap_command, host_build_command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::task::PlatformTask;
use crate::{BuildConfig, BuildError, BuildRequest, FailureSlot, GoRootLayout, ReadinessBarrier, TaskOutcome};

/// A successful run
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The assembled GOROOT
    pub goroot: Utf8PathBuf,
    /// Platforms merged into it
    pub platforms: Vec<Platform>,
    /// Access and modification time of every merged library artifact
    pub merge_instant: SystemTime,
}

/// Builds a cross-compiling GOROOT from a [`BuildRequest`].
pub struct Orchestrator<F, R> {
    fetcher: Arc<F>,
    runner: R,
    host: Platform,
}

impl<F: Fetcher, R: ToolRunner> Orchestrator<F, R> {
    pub fn new(fetcher: F, runner: R, config: &BuildConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            runner,
            host: config.host.clone(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run a build to completion.
    ///
    /// Every platform task has finished (merged, failed or cancelled) by the
    /// time this returns. The first failure recorded anywhere in the run is
    /// the one returned; the target may then hold a partially merged tree.
    pub async fn run(&self, request: &BuildRequest) -> Result<BuildReport, BuildError> {
        let target = GoRootLayout::new(request.target());
        target.check_disjoint(request.platforms())?;

        info!(
            version = %request.version(),
            source = %request.source().map_or("(from internet)".to_string(), |p| p.to_string()),
            target = %request.target(),
            platforms = ?request.platforms().iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            "building go"
        );

        let barrier = ReadinessBarrier::new();
        let failures = Arc::new(FailureSlot::new());
        let cancel = CancellationToken::new();

        let tasks: Vec<(Platform, JoinHandle<TaskOutcome>)> = request
            .platforms()
            .iter()
            .map(|platform| {
                let task = PlatformTask {
                    platform: platform.clone(),
                    version: request.version().clone(),
                    target: target.clone(),
                    fetcher: Arc::clone(&self.fetcher),
                    barrier: barrier.waiter(),
                    failures: Arc::clone(&failures),
                    cancel: cancel.clone(),
                };
                (platform.clone(), tokio::spawn(task.run()))
            })
            .collect();

        let mut source_scratch = None;
        let prepared = match self
            .prepare_target(request, &target, &cancel, &mut source_scratch)
            .await
        {
            Ok(()) => {
                let instant = SystemTime::now();
                barrier.open(instant);
                info!("target ready, merging platforms");
                Ok(instant)
            }
            Err(e) => {
                error!(error = %e, "preparing target failed, cancelling platforms");
                cancel.cancel();
                barrier.cancel();
                // A platform that already failed keeps precedence
                match failures.take() {
                    Some(earlier) => {
                        warn!(error = %e, "discarding failure, an earlier one will be reported");
                        Err(earlier)
                    }
                    None => Err(e),
                }
            }
        };

        for (platform, handle) in tasks {
            match handle.await {
                Ok(outcome) => info!(platform = %platform, outcome = ?outcome, "platform finished"),
                Err(e) => {
                    error!(platform = %platform, error = %e, "platform task did not complete");
                    failures.record(BuildError::TaskPanicked { platform });
                }
            }
        }

        if let Some(scratch) = source_scratch.take() {
            if let Err(e) = scratch.close() {
                warn!(error = %e, "failed to remove fetched source");
            }
        }

        let later = failures.take();
        let merge_instant = match prepared {
            Ok(instant) => instant,
            Err(e) => {
                if let Some(later) = later {
                    warn!(error = %later, "discarding failure, an earlier one will be reported");
                }
                return Err(e);
            }
        };
        if let Some(e) = later {
            return Err(e);
        }

        Ok(BuildReport {
            goroot: target.goroot().to_owned(),
            platforms: request.platforms().to_vec(),
            merge_instant,
        })
    }

    /// Put host-built Go at the target: source, `make.bash`, then one
    /// `dist bootstrap` per platform. Stops at the first failure.
    async fn prepare_target(
        &self,
        request: &BuildRequest,
        target: &GoRootLayout,
        cancel: &CancellationToken,
        source_scratch: &mut Option<ScratchDir>,
    ) -> Result<(), BuildError> {
        let source: Utf8PathBuf = match request.source() {
            Some(path) => path.to_owned(),
            None => {
                let url = request.version().source_url();
                info!(url = %url, "fetching Go sources");
                let scratch = self
                    .fetcher
                    .fetch(&url, "src", cancel)
                    .await
                    .map_err(|e| BuildError::Fetch {
                        what: "src".to_string(),
                        source: e,
                    })?;
                let root = GoRootLayout::new(scratch.path()).goroot().to_owned();
                *source_scratch = Some(scratch);
                root
            }
        };

        self.copy_source(&source, target.goroot()).await?;

        let goroot = target.goroot();
        let build = host_build_command(goroot, &self.host);
        self.runner
            .run(&build)
            .await
            .map_err(|e| BuildError::ExternalTool {
                step: "host build".to_string(),
                source: e,
            })?;

        info!("bootstrapping Go compilers");
        for platform in request.platforms() {
            let bootstrap = bootstrap_command(goroot, &self.host, platform);
            self.runner
                .run(&bootstrap)
                .await
                .map_err(|e| BuildError::ExternalTool {
                    step: format!("bootstrap for {}", platform),
                    source: e,
                })?;
        }

        Ok(())
    }

    async fn copy_source(&self, source: &Utf8Path, goroot: &Utf8Path) -> Result<(), BuildError> {
        info!(from = %source, to = %goroot, "copying source");
        gn_io::merge_tree(source, goroot)
            .await
            .map_err(|e| BuildError::Merge {
                what: "source".to_string(),
                source: e,
            })?;
        Ok(())
    }
}
