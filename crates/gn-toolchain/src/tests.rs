use super::*;
use camino::Utf8Path;

#[test]
fn parse_platform_token() {
    let p = Platform::parse("linux_amd64").unwrap();
    assert_eq!(p.os, "linux");
    assert_eq!(p.arch, "amd64");
    assert_eq!(p.to_string(), "linux_amd64");
}

#[test]
fn reject_malformed_platform_tokens() {
    for token in ["linux", "linux_amd64_v2", "_amd64", "linux_", "", "linux-amd64"] {
        assert!(
            matches!(Platform::parse(token), Err(ToolchainError::InvalidPlatform(_))),
            "{token:?} should be rejected"
        );
    }
}

#[test]
fn parse_platform_list() {
    let list = Platform::parse_list("linux_amd64 darwin_amd64").unwrap();
    assert_eq!(
        list,
        vec![
            Platform::new("linux", "amd64"),
            Platform::new("darwin", "amd64")
        ]
    );

    assert_eq!(Platform::parse_list("").unwrap(), Platform::all());
    assert!(Platform::parse_list("linux_amd64 windows").is_err());
}

#[test]
fn version_ordering_is_numeric() {
    let v = |s: &str| GoVersion::parse(s).unwrap();
    assert!(v("1.10") > v("1.2.1"));
    assert!(v("1.2.2") > v("1.2.1"));
    assert!(v("1.2") < v("1.2.1"));
    assert_eq!(v("1.2"), v("1.2.0"));
    assert!(v("1.4rc1") < v("1.4"));
    assert!(!v("1.4rc1").is_release());
}

#[test]
fn reject_invalid_versions() {
    assert!(GoVersion::parse("").is_err());
    assert!(GoVersion::parse("go1.2").is_err());
    assert!(GoVersion::parse("1..2").is_err());
    assert!(GoVersion::parse("1.4rc1.2").is_err());
}

#[test]
fn dist_urls_old_hosting() {
    let v = GoVersion::parse("1.2.1").unwrap();
    assert_eq!(
        Platform::new("linux", "amd64").dist_url(&v),
        "https://go.googlecode.com/files/go1.2.1.linux-amd64.tar.gz"
    );
    assert_eq!(
        Platform::new("darwin", "386").dist_url(&v),
        "https://go.googlecode.com/files/go1.2.1.darwin-386-osx10.8.tar.gz"
    );
    assert_eq!(
        Platform::new("windows", "amd64").dist_url(&v),
        "https://go.googlecode.com/files/go1.2.1.windows-amd64.zip"
    );
    assert_eq!(
        Platform::new("linux", "arm").dist_url(&v),
        dist::LINUX_ARM_1_2_1_URL
    );
    assert_eq!(
        v.source_url(),
        "https://go.googlecode.com/files/go1.2.1.src.tar.gz"
    );
}

#[test]
fn dist_urls_new_hosting() {
    let v = GoVersion::parse("1.3").unwrap();
    assert_eq!(
        Platform::new("freebsd", "amd64").dist_url(&v),
        "https://storage.googleapis.com/golang/go1.3.freebsd-amd64.tar.gz"
    );
    assert_eq!(
        Platform::new("linux", "arm").dist_url(&v),
        "https://storage.googleapis.com/golang/go1.3.linux-arm.tar.gz"
    );
}

#[test]
fn host_build_script_depends_on_host_os() {
    let goroot = Utf8Path::new("/work/go");

    let unix = host_build_command(goroot, &Platform::new("linux", "amd64"));
    assert_eq!(unix.program, "/work/go/src/make.bash");
    assert_eq!(unix.cwd, "/work/go/src");

    let windows = host_build_command(goroot, &Platform::new("windows", "amd64"));
    assert_eq!(windows.program, "/work/go/src/make.bat");
}

#[test]
fn bootstrap_runs_host_dist_tool_with_target_env() {
    let cmd = bootstrap_command(
        Utf8Path::new("/work/go"),
        &Platform::new("linux", "amd64"),
        &Platform::new("windows", "386"),
    );
    assert_eq!(cmd.program, "/work/go/pkg/tool/linux_amd64/dist");
    assert_eq!(cmd.args, vec!["bootstrap", "-v"]);
    assert_eq!(cmd.cwd, "/work/go/src");
    assert_eq!(cmd.env_var("GOOS"), Some("windows"));
    assert_eq!(cmd.env_var("GOARCH"), Some("386"));
}

#[cfg(unix)]
#[tokio::test]
async fn process_runner_reports_exit_status() {
    let ok = ToolCommand::new("/bin/sh", "/").arg("-c").arg("exit 0");
    ProcessRunner.run(&ok).await.unwrap();

    let failing = ToolCommand::new("/bin/sh", "/").arg("-c").arg("exit 3");
    match ProcessRunner.run(&failing).await {
        Err(ToolchainError::ToolFailed { program, status }) => {
            assert_eq!(program, "/bin/sh");
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }

    let missing = ToolCommand::new("/nonexistent/tool", "/");
    assert!(matches!(
        ProcessRunner.run(&missing).await,
        Err(ToolchainError::Spawn { .. })
    ));
}
