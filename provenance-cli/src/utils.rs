//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use colored::{ColoredString, Colorize};
use provenance_core::{ArtifactKind, GridSpec, SigningKey, VerificationStatus, VerifyingKey};
use tracing::debug;

/// Parse a grid argument of the form `ROWSxCOLS` (e.g. `8x8`).
pub fn parse_grid(value: &str) -> std::result::Result<GridSpec, String> {
    let (rows, cols) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{value}'"))?;
    let rows: u32 = rows
        .trim()
        .parse()
        .map_err(|_| format!("invalid row count '{rows}'"))?;
    let cols: u32 = cols
        .trim()
        .parse()
        .map_err(|_| format!("invalid column count '{cols}'"))?;
    let grid = GridSpec::new(rows, cols);
    grid.validate().map_err(|e| e.to_string())?;
    Ok(grid)
}

/// Parse an explicit `--kind` argument.
pub fn parse_kind(value: &str) -> std::result::Result<ArtifactKind, String> {
    value.parse().map_err(|e: provenance_core::ProvenanceError| e.to_string())
}

/// Use the explicit kind if given, otherwise detect it from the extension.
pub fn resolve_kind(file: &Path, explicit: Option<ArtifactKind>) -> Result<ArtifactKind> {
    if let Some(kind) = explicit {
        return Ok(kind);
    }
    let kind = ArtifactKind::from_path(file).ok_or_else(|| {
        anyhow!(
            "Cannot detect artifact kind of {}: pass --kind image|video|pdf",
            file.display()
        )
    })?;
    debug!(kind = %kind, "Detected artifact kind");
    Ok(kind)
}

pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    SigningKey::from_file(path)
        .with_context(|| format!("Failed to load private key: {}", path.display()))
}

pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey> {
    VerifyingKey::from_file(path)
        .with_context(|| format!("Failed to load public key: {}", path.display()))
}

/// Status label colored for terminal output.
pub fn status_label(status: VerificationStatus) -> ColoredString {
    let label = format!("{status:?}").to_uppercase();
    match status {
        VerificationStatus::Verified => label.green().bold(),
        VerificationStatus::Tampered | VerificationStatus::Failed => label.red().bold(),
        VerificationStatus::Error | VerificationStatus::Unknown => label.yellow().bold(),
    }
}
