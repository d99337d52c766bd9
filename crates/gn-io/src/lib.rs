//! Filesystem utilities for gonative
//!
//! Async entry points run the blocking work from [`sync`] on tokio's blocking
//! pool.

use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

mod scratch;
pub mod sync;

pub use scratch::ScratchDir;
pub use sync::runtime_fragments;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to create scratch directory under {root}: {source}")]
    Scratch {
        root: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to merge {path}: {source}")]
    Merge {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("non-UTF8 path: {0}")]
    NonUtf8Path(std::path::PathBuf),

    #[error("failed to set timestamps on {} entries under {root}", failures.len())]
    Timestamps {
        root: Utf8PathBuf,
        failures: Vec<(Utf8PathBuf, std::io::Error)>,
    },

    #[error("spawn_blocking failed: {0}")]
    SpawnBlocking(#[from] tokio::task::JoinError),
}

/// Overlay the tree at `src` onto `dst`. See [`sync::merge_tree`].
pub async fn merge_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<usize, TreeError> {
    let (src, dst) = (src.to_owned(), dst.to_owned());
    tokio::task::spawn_blocking(move || sync::merge_tree(&src, &dst)).await?
}

/// Copy individual files into `dst_dir`. See [`sync::merge_files`].
pub async fn merge_files(files: Vec<Utf8PathBuf>, dst_dir: &Utf8Path) -> Result<usize, TreeError> {
    let dst_dir = dst_dir.to_owned();
    tokio::task::spawn_blocking(move || sync::merge_files(&files, &dst_dir)).await?
}

/// Set access and modification time of everything under `root` to `instant`.
/// See [`sync::normalize_timestamps`].
pub async fn normalize_timestamps(root: &Utf8Path, instant: SystemTime) -> Result<usize, TreeError> {
    let root = root.to_owned();
    tokio::task::spawn_blocking(move || sync::normalize_timestamps(&root, instant)).await?
}
