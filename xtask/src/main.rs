use std::fs;
use std::path::PathBuf;
use std::process::Command;

const BINARY: &str = "gonative";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo xtask <command>");
        eprintln!("\nAvailable commands:");
        eprintln!("  install    Build and install gonative to ~/.cargo/bin");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "install" => install(),
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
}

fn install() -> Result<(), Box<dyn std::error::Error>> {
    println!("Building {} in release mode...\n", BINARY);

    let status = Command::new("cargo")
        .args(["build", "--release", "-p", BINARY])
        .status()?;

    if !status.success() {
        eprintln!("Failed to build {}", BINARY);
        std::process::exit(1);
    }

    let cargo_bin = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".cargo")
        .join("bin");
    fs::create_dir_all(&cargo_bin)?;

    let file_name = format!("{}{}", BINARY, std::env::consts::EXE_SUFFIX);
    let src = PathBuf::from("target/release").join(&file_name);
    if !src.exists() {
        return Err(format!("{} not found in target/release", file_name).into());
    }

    let dst = cargo_bin.join(&file_name);
    fs::copy(&src, &dst)?;
    println!("✓ {} installed to {}", BINARY, dst.display());
    Ok(())
}
