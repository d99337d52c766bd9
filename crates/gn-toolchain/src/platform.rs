//! Target platforms

use crate::ToolchainError;

/// Platforms with an official binary distribution that gonative can merge.
pub const SUPPORTED: [(&str, &str); 9] = [
    ("linux", "386"),
    ("linux", "amd64"),
    ("linux", "arm"),
    ("darwin", "386"),
    ("darwin", "amd64"),
    ("windows", "386"),
    ("windows", "amd64"),
    ("freebsd", "386"),
    ("freebsd", "amd64"),
];

/// A Go build target, identified by `GOOS` and `GOARCH`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Platform {
    /// GOOS: "linux", "darwin", "windows", "freebsd"
    pub os: String,
    /// GOARCH: "386", "amd64", "arm"
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Parse an `os_arch` token.
    ///
    /// The token must split on `_` into exactly two non-empty parts.
    pub fn parse(token: &str) -> Result<Self, ToolchainError> {
        let mut parts = token.split('_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(os), Some(arch), None) if !os.is_empty() && !arch.is_empty() => {
                Ok(Self::new(os, arch))
            }
            _ => Err(ToolchainError::InvalidPlatform(token.to_string())),
        }
    }

    /// Parse a space-separated list of tokens. An empty list means every
    /// supported platform.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ToolchainError> {
        let tokens: Vec<&str> = list.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Self::all());
        }
        tokens.into_iter().map(Self::parse).collect()
    }

    /// Every supported platform
    pub fn all() -> Vec<Self> {
        SUPPORTED
            .iter()
            .map(|(os, arch)| Self::new(*os, *arch))
            .collect()
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED
            .iter()
            .any(|(os, arch)| self.os == *os && self.arch == *arch)
    }

    /// The platform this process is running on, in Go's naming
    pub fn host() -> Result<Self, ToolchainError> {
        Self::from_rust_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn from_rust_names(os: &str, arch: &str) -> Result<Self, ToolchainError> {
        let unsupported = || ToolchainError::UnsupportedHost {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let go_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            _ => return Err(unsupported()),
        };

        let go_arch = match arch {
            "x86" => "386",
            "x86_64" => "amd64",
            "arm" => "arm",
            "aarch64" => "arm64",
            _ => return Err(unsupported()),
        };

        Ok(Self::new(go_os, go_arch))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

impl std::str::FromStr for Platform {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
