//! Runtime configuration.
//!
//! Loaded from environment variables with defaults matching the on-disk layout
//! the CLI expects when run from a project directory.

use std::path::PathBuf;

use crate::partition::{GridSpec, DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS};

pub const DEFAULT_STORE_DIR: &str = "provenance";
pub const DEFAULT_PRIVATE_KEY: &str = "keys/private_key.pem";
pub const DEFAULT_PUBLIC_KEY: &str = "keys/public_key.pem";

/// Paths and parameters shared by signing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceConfig {
    /// Provenance store directory (default: provenance)
    pub store_dir: PathBuf,
    /// PEM private key used for signing (default: keys/private_key.pem)
    pub private_key_path: PathBuf,
    /// PEM public key used for verification (default: keys/public_key.pem)
    pub public_key_path: PathBuf,
    /// Block grid for new image records (default: 8x8)
    pub grid: GridSpec,
    /// Concurrent verification jobs (default: 4)
    pub max_workers: usize,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            private_key_path: PathBuf::from(DEFAULT_PRIVATE_KEY),
            public_key_path: PathBuf::from(DEFAULT_PUBLIC_KEY),
            grid: GridSpec::default(),
            max_workers: 4,
        }
    }
}

impl ProvenanceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset or unparsable values fall back to their defaults; a grid with a
    /// zero dimension is treated as unparsable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let path = |name: &str, default: PathBuf| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let rows = lookup("PROVENANCE_GRID_ROWS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_GRID_ROWS);
        let cols = lookup("PROVENANCE_GRID_COLS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_GRID_COLS);
        let grid = Some(GridSpec::new(rows, cols))
            .filter(|grid| grid.validate().is_ok())
            .unwrap_or_default();

        let max_workers = lookup("PROVENANCE_MAX_WORKERS")
            .and_then(|v| v.trim().parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.max_workers);

        Self {
            store_dir: path("PROVENANCE_DIR", defaults.store_dir),
            private_key_path: path("PROVENANCE_PRIVATE_KEY", defaults.private_key_path),
            public_key_path: path("PROVENANCE_PUBLIC_KEY", defaults.public_key_path),
            grid,
            max_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProvenanceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ProvenanceConfig::default());
        assert_eq!(config.store_dir, PathBuf::from("provenance"));
        assert_eq!(config.grid.block_count(), 64);
    }

    #[test]
    fn test_overrides() {
        let config = ProvenanceConfig::from_lookup(lookup(&[
            ("PROVENANCE_DIR", "/var/lib/prov"),
            ("PROVENANCE_PUBLIC_KEY", "pub.pem"),
            ("PROVENANCE_GRID_ROWS", "4"),
            ("PROVENANCE_GRID_COLS", "16"),
            ("PROVENANCE_MAX_WORKERS", "2"),
        ]));
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/prov"));
        assert_eq!(config.public_key_path, PathBuf::from("pub.pem"));
        assert_eq!(config.private_key_path, PathBuf::from(DEFAULT_PRIVATE_KEY));
        assert_eq!((config.grid.rows, config.grid.cols), (4, 16));
        assert_eq!(config.max_workers, 2);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ProvenanceConfig::from_lookup(lookup(&[
            ("PROVENANCE_DIR", "  "),
            ("PROVENANCE_GRID_ROWS", "0"),
            ("PROVENANCE_GRID_COLS", "eight"),
            ("PROVENANCE_MAX_WORKERS", "0"),
        ]));
        assert_eq!(config, ProvenanceConfig::default());
    }
}
