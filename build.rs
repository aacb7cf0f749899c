//! Build script for spotctl.
//!
//! Copies the `.env.example` template into the local data directory, next to
//! where the binary looks for its `.env` file:
//! - Linux: `~/.local/share/spotctl/.env.example`
//! - macOS: `~/Library/Application Support/spotctl/.env.example`
//! - Windows: `%LOCALAPPDATA%/spotctl/.env.example`
//!
//! A missing template is a warning, not a build failure.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    if !env_example_path.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("spotctl");

    // Sandboxed builds may not write outside the target directory.
    if let Err(e) = fs::create_dir_all(&out_dir)
        .and_then(|_| fs::copy(&env_example_path, out_dir.join(".env.example")))
    {
        println!(
            "cargo:warning=cannot copy .env.example to {}: {}",
            out_dir.display(),
            e
        );
    }

    Ok(())
}
