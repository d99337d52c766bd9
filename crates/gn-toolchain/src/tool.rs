//! External build tools
//!
//! The host build script and the bootstrap tool are invoked, never
//! reimplemented. [`ToolRunner`] is the seam between the command description
//! and its execution.

use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::{Platform, ToolchainError};

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: Utf8PathBuf,
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Utf8PathBuf,
    /// Added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<Utf8PathBuf>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external commands to completion
pub trait ToolRunner: Send + Sync {
    /// Run `cmd`, failing with [`ToolchainError::ToolFailed`] on a non-zero exit.
    fn run(&self, cmd: &ToolCommand) -> impl Future<Output = Result<(), ToolchainError>> + Send;
}

/// Runs commands as child processes with inherited stdio
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, cmd: &ToolCommand) -> Result<(), ToolchainError> {
        info!(command = %cmd, cwd = %cmd.cwd, "running");

        let status = tokio::process::Command::new(cmd.program.as_std_path())
            .args(&cmd.args)
            .current_dir(cmd.cwd.as_std_path())
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .await
            .map_err(|e| ToolchainError::Spawn {
                program: cmd.program.to_string(),
                source: e,
            })?;

        if !status.success() {
            return Err(ToolchainError::ToolFailed {
                program: cmd.program.to_string(),
                status,
            });
        }

        debug!(program = %cmd.program, "command finished");
        Ok(())
    }
}

/// The command that builds Go for `host` from the source under `goroot`.
///
/// `make.bash` (or `make.bat` on Windows) is run from `goroot/src`.
pub fn host_build_command(goroot: &Utf8Path, host: &Platform) -> ToolCommand {
    let script = if host.os == "windows" {
        "make.bat"
    } else {
        "make.bash"
    };
    let src = goroot.join("src");
    ToolCommand::new(src.join(script), src)
}

/// The command that bootstraps a cross compiler for `target`.
///
/// The `dist` tool is produced by the host build under
/// `goroot/pkg/tool/<host>`, but has to run from `goroot/src`.
pub fn bootstrap_command(goroot: &Utf8Path, host: &Platform, target: &Platform) -> ToolCommand {
    let dist = goroot
        .join("pkg")
        .join("tool")
        .join(host.to_string())
        .join("dist");
    ToolCommand::new(dist, goroot.join("src"))
        .arg("bootstrap")
        .arg("-v")
        .env("GOOS", &target.os)
        .env("GOARCH", &target.arch)
}
