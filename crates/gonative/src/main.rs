//! gonative - build a Go toolchain that cross compiles with native libraries
//!
//! Builds Go from source for the host, bootstraps a cross compiler for each
//! target platform, then merges the standard library packages from each
//! platform's official binary release into the same GOROOT.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use eyre::Result;
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gn_build::{BuildConfig, BuildRequest, Orchestrator};
use gn_fetch::HttpFetcher;
use gn_toolchain::ProcessRunner;

/// Build a Go toolchain with native standard libraries for every platform
#[derive(Parser, Debug)]
#[command(name = "gonative", disable_version_flag = true)]
struct Cli {
    /// Show version information
    #[arg(short = 'V', long = "app-version")]
    app_version: bool,

    /// Version of Go to build
    #[arg(long, default_value = "1.2.1")]
    version: String,

    /// Path to Go source, downloaded if omitted
    #[arg(long)]
    src: Option<Utf8PathBuf>,

    /// Directory to build the toolchain in, the GOROOT is `<target>/go`
    #[arg(long, default_value = ".")]
    target: Utf8PathBuf,

    /// Space separated os_arch platforms, all supported platforms if omitted
    #[arg(long, default_value = "")]
    platforms: String,

    /// Where downloads are unpacked [env: GONATIVE_SCRATCH_DIR]
    #[arg(long)]
    scratch_dir: Option<Utf8PathBuf>,
}

const DEFAULT_FILTER: &str = "gonative=info,gn_build=info,gn_fetch=info,gn_toolchain=info";

#[tokio::main]
async fn main() {
    // RUST_LOG overrides, e.g. RUST_LOG=gn_fetch=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.app_version {
        println!("gonative {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    match cmd_build(cli).await {
        Ok(target) => {
            println!("{} {}", "Successfully built Go in".green().bold(), target);
        }
        Err(e) => {
            eprintln!("{} {:?}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn cmd_build(cli: Cli) -> Result<Utf8PathBuf> {
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)?;
    let target = absolute(&cwd, &cli.target);
    let source = cli.src.map(|src| absolute(&cwd, &src));

    let config = BuildConfig::resolve(cli.scratch_dir, &cwd)?;
    debug!(scratch_root = %config.scratch_root, host = %config.host, "resolved configuration");

    let request = BuildRequest::from_tokens(&cli.version, source, target.clone(), &cli.platforms)?;

    let fetcher = HttpFetcher::new(config.scratch_root.clone())?;
    let orchestrator = Orchestrator::new(fetcher, ProcessRunner, &config);
    orchestrator.run(&request).await?;

    Ok(target)
}

fn absolute(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.join(path)
    }
}
