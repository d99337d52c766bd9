use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::TreeError;

/// A temporary directory owned by exactly one fetch.
///
/// Removed recursively when dropped. Use [`ScratchDir::close`] to observe
/// removal errors instead of only logging them.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<tempfile::TempDir>,
    path: Utf8PathBuf,
}

impl ScratchDir {
    /// Create `<root>/<name>-XXXXXX`, creating `root` if needed.
    pub fn create(root: &Utf8Path, name: &str) -> Result<Self, TreeError> {
        let scratch_err = |e| TreeError::Scratch {
            root: root.to_owned(),
            source: e,
        };

        std::fs::create_dir_all(root).map_err(scratch_err)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", name))
            .tempdir_in(root)
            .map_err(scratch_err)?;
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf())
            .map_err(|e| TreeError::NonUtf8Path(e.into_path_buf()))?;

        debug!(path = %path, "created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the directory now.
    pub fn close(mut self) -> Result<(), TreeError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| TreeError::Remove {
                path: self.path.clone(),
                source: e,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path, error = %e, "failed to remove scratch directory");
            } else {
                debug!(path = %self.path, "removed scratch directory");
            }
        }
    }
}

impl AsRef<Utf8Path> for ScratchDir {
    fn as_ref(&self) -> &Utf8Path {
        &self.path
    }
}
