//! Archive fetching
//!
//! Downloads a release archive and unpacks it into a fresh [`ScratchDir`].
//! The body is streamed straight into extraction; nothing is verified.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use futures_util::{Stream, StreamExt};
use gn_io::{ScratchDir, TreeError};
use gn_tarball::{ArchiveKind, TarballError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to download {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("bad response for download {url}: {status}")]
    BadResponse { url: String, status: u16 },

    #[error("failed to extract {url}: {source}")]
    Extraction { url: String, source: TarballError },

    #[error("failed to spool {url}: {source}")]
    Spool { url: String, source: std::io::Error },

    #[error(transparent)]
    Scratch(#[from] TreeError),

    #[error("download of {url} was cancelled")]
    Cancelled { url: String },
}

/// Retrieves an archive and unpacks it into a scratch directory owned by the
/// caller.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch `url` and extract it into a scratch directory prefixed `name`.
    ///
    /// Resolves to [`FetchError::Cancelled`] once `cancel` fires.
    fn fetch(
        &self,
        url: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ScratchDir, FetchError>> + Send;
}

/// Fetches over HTTP(S) with reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    scratch_root: Utf8PathBuf,
}

type BodyStream = std::pin::Pin<Box<dyn Stream<Item = std::io::Result<bytes::Bytes>> + Send>>;

impl HttpFetcher {
    /// A fetcher placing scratch directories under `scratch_root`.
    pub fn new(scratch_root: impl Into<Utf8PathBuf>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gonative/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            scratch_root: scratch_root.into(),
        })
    }

    /// A fetcher using a preconfigured client.
    pub fn with_client(client: reqwest::Client, scratch_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            client,
            scratch_root: scratch_root.into(),
        }
    }

    pub fn scratch_root(&self) -> &Utf8Path {
        &self.scratch_root
    }

    async fn extract(
        &self,
        url: &str,
        name: &str,
        body: BodyStream,
        dest: &Utf8Path,
    ) -> Result<(), FetchError> {
        match ArchiveKind::from_url(url) {
            ArchiveKind::TarGz => {
                let reader = tokio_util::io::StreamReader::new(body);
                gn_tarball::extract_tar_gz(reader, dest)
                    .await
                    .map_err(|e| FetchError::Extraction {
                        url: url.to_string(),
                        source: e,
                    })
            }
            ArchiveKind::Zip => {
                let spool_err = |e| FetchError::Spool {
                    url: url.to_string(),
                    source: e,
                };

                // unzip needs the whole archive on disk
                let spool = tempfile::Builder::new()
                    .prefix(&format!("{}-", name))
                    .suffix(".zip")
                    .tempfile_in(&self.scratch_root)
                    .map_err(spool_err)?;
                let mut file = tokio::fs::File::from_std(spool.reopen().map_err(spool_err)?);

                let mut body = body;
                while let Some(chunk) = body.next().await {
                    file.write_all(&chunk.map_err(spool_err)?)
                        .await
                        .map_err(spool_err)?;
                }
                file.flush().await.map_err(spool_err)?;
                drop(file);

                let spool_path = Utf8Path::from_path(spool.path())
                    .ok_or_else(|| TreeError::NonUtf8Path(spool.path().to_path_buf()))?;
                gn_tarball::extract_zip(spool_path, dest)
                    .await
                    .map_err(|e| FetchError::Extraction {
                        url: url.to_string(),
                        source: e,
                    })
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ScratchDir, FetchError> {
        let cancelled = || FetchError::Cancelled {
            url: url.to_string(),
        };

        info!(url = %url, "downloading");
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(cancelled()),
            response = self.client.get(url).send() => response.map_err(|e| FetchError::Network {
                url: url.to_string(),
                source: e,
            })?,
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::BadResponse {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        info!(url = %url, "OK, streaming response");
        let scratch = ScratchDir::create(&self.scratch_root, name)?;

        // The extractor only sees io errors; the transport error behind a
        // failed read is kept here so it can be reported as such.
        let transport: Arc<Mutex<Option<reqwest::Error>>> = Arc::default();
        let seen = Arc::clone(&transport);

        // A cancelled download looks like a truncated body to the extractor.
        let body: BodyStream = Box::pin(
            response
                .bytes_stream()
                .map(move |chunk| {
                    chunk.map_err(|e| {
                        let io = std::io::Error::other(e.to_string());
                        let mut first = seen.lock().unwrap_or_else(PoisonError::into_inner);
                        if first.is_none() {
                            *first = Some(e);
                        }
                        io
                    })
                })
                .take_until(cancel.clone().cancelled_owned()),
        );
        let extracted = self.extract(url, name, body, scratch.path()).await;
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        if extracted.is_err() {
            let source = transport
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(source) = source {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    source,
                });
            }
        }
        extracted?;

        info!(url = %url, dest = %scratch.path(), "download complete");
        debug!(name = %name, "scratch directory handed to caller");
        Ok(scratch)
    }
}
