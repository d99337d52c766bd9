//! GOROOT layout
//!
//! After the barrier opens, every platform task writes into the shared target
//! GOROOT without locking. That is only sound because each task's writes are
//! confined to paths derived from its own platform; [`GoRootLayout::claims`]
//! spells those paths out and [`GoRootLayout::check_disjoint`] verifies them
//! before any task is started.

use camino::{Utf8Path, Utf8PathBuf};
use gn_toolchain::Platform;

use crate::BuildError;

/// Paths inside a Go tree rooted at `<root>/go`.
///
/// Used for the target tree and for every unpacked release archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoRootLayout {
    goroot: Utf8PathBuf,
}

/// A region of the target tree written by one platform task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Everything below a directory
    Tree(Utf8PathBuf),
    /// Files in `dir` whose names end with `suffix`
    Suffix { dir: Utf8PathBuf, suffix: String },
}

impl Claim {
    fn overlaps(&self, other: &Claim) -> bool {
        match (self, other) {
            (Claim::Tree(a), Claim::Tree(b)) => a.starts_with(b) || b.starts_with(a),
            (Claim::Suffix { dir: da, suffix: sa }, Claim::Suffix { dir: db, suffix: sb }) => {
                da == db && (sa.ends_with(sb.as_str()) || sb.ends_with(sa.as_str()))
            }
            (Claim::Tree(tree), Claim::Suffix { dir, .. })
            | (Claim::Suffix { dir, .. }, Claim::Tree(tree)) => dir.starts_with(tree),
        }
    }
}

impl GoRootLayout {
    /// Layout of the Go tree under `root` (GOROOT is `root/go`)
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            goroot: root.join("go"),
        }
    }

    pub fn goroot(&self) -> &Utf8Path {
        &self.goroot
    }

    /// Compiled package archives for `platform`
    pub fn platform_pkg_dir(&self, platform: &Platform) -> Utf8PathBuf {
        self.goroot.join("pkg").join(platform.to_string())
    }

    /// Home of the auto-generated `z*_<os>_<arch>` runtime files
    pub fn runtime_dir(&self) -> Utf8PathBuf {
        self.goroot.join("src").join("pkg").join("runtime")
    }

    /// Everything a task for `platform` may write
    pub fn claims(&self, platform: &Platform) -> Vec<Claim> {
        vec![
            Claim::Tree(self.platform_pkg_dir(platform)),
            Claim::Suffix {
                dir: self.runtime_dir(),
                suffix: format!("_{}", platform),
            },
        ]
    }

    /// Fail if any two platforms would write to the same place.
    pub fn check_disjoint(&self, platforms: &[Platform]) -> Result<(), BuildError> {
        for (i, a) in platforms.iter().enumerate() {
            for b in &platforms[i + 1..] {
                let collides = self
                    .claims(a)
                    .iter()
                    .any(|ca| self.claims(b).iter().any(|cb| ca.overlaps(cb)));
                if collides {
                    return Err(BuildError::InvalidRequest(format!(
                        "platforms {} and {} would write to the same files",
                        a, b
                    )));
                }
            }
        }
        Ok(())
    }
}
