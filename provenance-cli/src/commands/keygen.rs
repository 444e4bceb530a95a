//! Keygen command implementation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use provenance_core::generate_keypair;
use tracing::info;

/// Execute the keygen command.
///
/// Refuses to overwrite existing keys unless `force` is set.
pub fn execute(private_key: &Path, public_key: &Path, force: bool, quiet: bool) -> Result<()> {
    if !force {
        for path in [private_key, public_key] {
            if path.exists() {
                bail!(
                    "Key file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    let (signing, verifying) = generate_keypair().context("Failed to generate key pair")?;

    write_pem(private_key, &signing.to_pem()?)?;
    write_pem(public_key, &verifying.to_pem()?)?;

    info!(
        private_key = %private_key.display(),
        public_key = %public_key.display(),
        "Generated ECDSA P-256 key pair"
    );

    if !quiet {
        println!();
        println!("{}", "Key pair generated (ECDSA P-256)".green().bold());
        println!();
        println!("   {} {}", "Private key:".dimmed(), private_key.display());
        println!("   {} {}", "Public key:".dimmed(), public_key.display());
    }
    Ok(())
}

fn write_pem(path: &Path, pem: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to write key directory: {}", parent.display()))?;
    }
    std::fs::write(path, pem).with_context(|| format!("Failed to write key: {}", path.display()))
}
