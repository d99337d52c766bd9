//! Test harness for orchestration tests
//!
//! Fakes for the two external capabilities: fetching release archives and
//! running the Go build tools. Neither touches the network or spawns processes.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use gn_build::{BuildConfig, Orchestrator};
use gn_fetch::{FetchError, Fetcher};
use gn_io::ScratchDir;
use gn_toolchain::{Platform, ToolCommand, ToolRunner, ToolchainError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const HOST: (&str, &str) = ("linux", "amd64");

pub fn write(path: &Utf8Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Isolated scratch, source and target directories
pub struct TestEnv {
    _dir: TempDir,
    pub root: Utf8PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("scratch")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        Self { _dir: dir, root }
    }

    pub fn scratch(&self) -> Utf8PathBuf {
        self.root.join("scratch")
    }

    pub fn target(&self) -> Utf8PathBuf {
        self.root.join("target")
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig {
            scratch_root: self.scratch(),
            host: Platform::new(HOST.0, HOST.1),
        }
    }

    /// A local Go source tree, as `--src` would point at
    pub fn local_source(&self) -> Utf8PathBuf {
        let go = self.root.join("source/go");
        populate_source(&go);
        go
    }

    /// A Go source tree already at `<target>/go`
    pub fn source_in_target(&self) -> Utf8PathBuf {
        let go = self.target().join("go");
        populate_source(&go);
        go
    }

    pub fn scratch_entries(&self) -> Vec<String> {
        std::fs::read_dir(self.scratch())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub fn orchestrator(
        &self,
        fetcher: FakeFetcher,
        runner: FakeRunner,
    ) -> Orchestrator<FakeFetcher, FakeRunner> {
        Orchestrator::new(fetcher, runner, &self.config())
    }
}

fn populate_source(go: &Utf8Path) {
    write(&go.join("VERSION"), "go1.2.1");
    write(&go.join("src/make.bash"), "#!/bin/sh\n");
    write(&go.join("src/pkg/runtime/runtime.c"), "// runtime");
    write(&go.join("src/pkg/fmt/print.go"), "package fmt");
}

/// Lay out an unpacked binary release for `platform` under `go`
fn populate_dist(go: &Utf8Path, platform: &str) {
    write(&go.join(format!("pkg/{platform}/fmt.a")), &format!("fmt for {platform}"));
    write(
        &go.join(format!("pkg/{platform}/net/http.a")),
        &format!("net/http for {platform}"),
    );
    write(
        &go.join(format!("src/pkg/runtime/zasm_{platform}")),
        &format!("asm for {platform}"),
    );
    write(
        &go.join(format!("src/pkg/runtime/zgoos_{platform}")),
        &format!("goos for {platform}"),
    );
    write(&go.join("src/pkg/runtime/zunrelated_plan9_386"), "not merged");
    write(&go.join("bin/go"), "binary release go tool");
}

#[derive(Debug, Clone)]
enum Scripted {
    Status(u16),
    /// Never completes until cancelled
    Hang,
    /// Archive without the runtime source directory
    NoRuntime,
}

/// Produces scratch directories shaped like unpacked Go releases
pub struct FakeFetcher {
    scratch_root: Utf8PathBuf,
    scripted: HashMap<String, Scripted>,
    delay: Duration,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(env: &TestEnv) -> Self {
        Self {
            scratch_root: env.scratch(),
            scripted: HashMap::new(),
            delay: Duration::ZERO,
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Respond to the fetch named `name` with HTTP `status`
    pub fn fail(mut self, name: &str, status: u16) -> Self {
        self.scripted.insert(name.to_string(), Scripted::Status(status));
        self
    }

    pub fn hang(mut self, name: &str) -> Self {
        self.scripted.insert(name.to_string(), Scripted::Hang);
        self
    }

    pub fn without_runtime(mut self, name: &str) -> Self {
        self.scripted.insert(name.to_string(), Scripted::NoRuntime);
        self
    }

    /// Delay every successful fetch
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        let mut fetched = self.fetched.lock().unwrap().clone();
        fetched.sort();
        fetched
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(
        &self,
        url: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ScratchDir, FetchError> {
        self.fetched.lock().unwrap().push(name.to_string());

        match self.scripted.get(name) {
            Some(Scripted::Status(status)) => {
                return Err(FetchError::BadResponse {
                    url: url.to_string(),
                    status: *status,
                });
            }
            Some(Scripted::Hang) => {
                cancel.cancelled().await;
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        let scratch = ScratchDir::create(&self.scratch_root, name)?;
        let go = scratch.path().join("go");
        if name == "src" {
            populate_source(&go);
        } else {
            populate_dist(&go, name);
            if matches!(self.scripted.get(name), Some(Scripted::NoRuntime)) {
                std::fs::remove_dir_all(go.join("src/pkg/runtime")).unwrap();
            }
        }
        Ok(scratch)
    }
}

/// Records commands; "runs" the host build by writing host artifacts
pub struct FakeRunner {
    commands: Mutex<Vec<ToolCommand>>,
    fail_step: Option<String>,
    host_build_time: Duration,
    premature_merge: AtomicBool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_step: None,
            host_build_time: Duration::ZERO,
            premature_merge: AtomicBool::new(false),
        }
    }

    /// Fail the command whose program file name is `program`, or the bootstrap
    /// whose GOOS_GOARCH is `program`
    pub fn fail_on(mut self, program: &str) -> Self {
        self.fail_step = Some(program.to_string());
        self
    }

    pub fn host_build_time(mut self, time: Duration) -> Self {
        self.host_build_time = time;
        self
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Whether any platform's libraries showed up in the target before the
    /// host build finished
    pub fn saw_premature_merge(&self) -> bool {
        self.premature_merge.load(Ordering::SeqCst)
    }

    fn step_name(cmd: &ToolCommand) -> String {
        match (cmd.env_var("GOOS"), cmd.env_var("GOARCH")) {
            (Some(os), Some(arch)) => format!("{os}_{arch}"),
            _ => cmd.program.file_name().unwrap_or_default().to_string(),
        }
    }

    fn check_no_merges(&self, goroot: &Utf8Path) {
        let pkg = goroot.join("pkg");
        let Ok(entries) = std::fs::read_dir(&pkg) else {
            return;
        };
        for entry in entries {
            let dir = entry.unwrap().path();
            if dir.join("fmt.a").exists() {
                self.premature_merge.store(true, Ordering::SeqCst);
            }
        }
    }
}

impl ToolRunner for FakeRunner {
    async fn run(&self, cmd: &ToolCommand) -> Result<(), ToolchainError> {
        self.commands.lock().unwrap().push(cmd.clone());
        let step = Self::step_name(cmd);

        // cwd is always GOROOT/src
        let goroot = cmd.cwd.parent().unwrap().to_owned();
        if step == "make.bash" {
            let deadline = tokio::time::Instant::now() + self.host_build_time;
            while tokio::time::Instant::now() < deadline {
                self.check_no_merges(&goroot);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        if self.fail_step.as_deref() == Some(step.as_str()) {
            return Err(ToolchainError::Spawn {
                program: cmd.program.to_string(),
                source: std::io::Error::other("scripted failure"),
            });
        }

        if step == "make.bash" {
            let host = format!("{}_{}", HOST.0, HOST.1);
            write(&goroot.join("bin/go"), "host go tool");
            write(&goroot.join(format!("pkg/tool/{host}/dist")), "dist tool");
            write(&goroot.join(format!("pkg/{host}/runtime.a")), "host runtime");
        }
        self.check_no_merges(&goroot);
        Ok(())
    }
}
