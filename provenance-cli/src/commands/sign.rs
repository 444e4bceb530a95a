//! Sign command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use provenance_core::{sign_artifact, ArtifactKind, GridSpec, ProvenanceConfig, ProvenanceStore};
use tracing::{debug, info};

use crate::utils::{load_signing_key, resolve_kind};

/// Execute the sign command.
pub fn execute(
    file: PathBuf,
    kind: Option<ArtifactKind>,
    grid: Option<GridSpec>,
    config: &ProvenanceConfig,
    quiet: bool,
) -> Result<()> {
    let kind = resolve_kind(&file, kind)?;
    let grid = grid.unwrap_or(config.grid);
    debug!(kind = %kind, rows = grid.rows, cols = grid.cols, "Signing");

    let key = load_signing_key(&config.private_key_path)?;
    let store = ProvenanceStore::open(&config.store_dir).with_context(|| {
        format!(
            "Failed to open provenance store: {}",
            config.store_dir.display()
        )
    })?;

    let outcome = sign_artifact(kind, &file, grid, &key, &store)
        .with_context(|| format!("Failed to sign {}", file.display()))?;

    info!(
        path = %file.display(),
        kind = %kind,
        record_id = ?outcome.record_id,
        frames = ?outcome.frames,
        "Artifact signed"
    );

    if !quiet {
        println!();
        println!("{}", format!("Signed {kind} provenance").green().bold());
        println!();
        println!("   {} {}", "File:".dimmed(), file.display());
        println!("   {} {}", "Store:".dimmed(), store.root().display());
        if let Some(id) = &outcome.record_id {
            println!("   {} {}", "Record id:".dimmed(), id);
        }
        if kind == ArtifactKind::Image {
            println!("   {} {}x{}", "Grid:".dimmed(), grid.rows, grid.cols);
        }
        if let Some(frames) = outcome.frames {
            println!("   {} {}", "Frames chained:".dimmed(), frames);
        }
        println!("   {} ECDSA-P256", "Signature:".dimmed());
    }
    Ok(())
}
