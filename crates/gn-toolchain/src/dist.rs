//! Distribution URLs
//!
//! Go release hosting moved from Google Code to Google Cloud Storage after
//! 1.2.1. Both hosts use the same `go<version>.<dist>.tar.gz` naming.

use std::cmp::Ordering;

use crate::{Platform, ToolchainError};

/// Known limitation: there is no official linux/arm 1.2.1 release, so this
/// GOARM=6 build is used for that one combination regardless of host.
pub const LINUX_ARM_1_2_1_URL: &str = "https://inconshreveable.com/dl/go1.2.1.linux-arm.tar.gz";

const OLD_DIST_BASE: &str = "https://go.googlecode.com/files";
const NEW_DIST_BASE: &str = "https://storage.googleapis.com/golang";

/// A Go release version such as `1.2.1` or `1.4rc1`
#[derive(Debug, Clone)]
pub struct GoVersion {
    raw: String,
    parts: Vec<u64>,
    pre: Option<String>,
}

impl GoVersion {
    pub fn parse(s: &str) -> Result<Self, ToolchainError> {
        let invalid = || ToolchainError::InvalidVersion(s.to_string());

        let mut parts = Vec::new();
        let mut pre = None;
        for component in s.split('.') {
            if pre.is_some() {
                return Err(invalid());
            }
            let digits_end = component
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(component.len());
            if digits_end == 0 {
                return Err(invalid());
            }
            let number = component[..digits_end].parse().map_err(|_| invalid())?;
            parts.push(number);
            if digits_end < component.len() {
                pre = Some(component[digits_end..].to_string());
            }
        }

        Ok(Self {
            raw: s.to_string(),
            parts,
            pre,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// False for pre-releases (`beta1`, `rc2`, ...)
    pub fn is_release(&self) -> bool {
        self.pre.is_none()
    }

    /// Archive location template base for this version
    fn dist_base(&self) -> &'static str {
        let last_old = [1, 2, 1];
        if self.cmp_parts(&last_old) == Ordering::Greater {
            NEW_DIST_BASE
        } else {
            OLD_DIST_BASE
        }
    }

    fn cmp_parts(&self, other: &[u64]) -> Ordering {
        let len = self.parts.len().max(other.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    fn archive_url(&self, dist: &str) -> String {
        format!("{}/go{}.{}.tar.gz", self.dist_base(), self.raw, dist)
    }

    /// URL of the source archive for this version
    pub fn source_url(&self) -> String {
        self.archive_url("src")
    }
}

impl PartialEq for GoVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GoVersion {}

impl PartialOrd for GoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_parts(&other.parts).then_with(|| match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        })
    }
}

impl std::fmt::Display for GoVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for GoVersion {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Platform {
    /// URL of the official binary distribution of `version` for this platform
    pub fn dist_url(&self, version: &GoVersion) -> String {
        if self.os == "linux" && self.arch == "arm" && version.as_str() == "1.2.1" {
            return LINUX_ARM_1_2_1_URL.to_string();
        }

        let mut dist = format!("{}-{}", self.os, self.arch);
        if self.os == "darwin" {
            dist.push_str("-osx10.8");
        }

        let url = version.archive_url(&dist);
        if self.os == "windows" {
            url.replacen(".tar.gz", ".zip", 1)
        } else {
            url
        }
    }
}
