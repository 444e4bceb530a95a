//! Artifact kinds and per-kind dispatch.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};
use crate::imaging::{sign_image_file, verify_image_file};
use crate::partition::GridSpec;
use crate::pdf::{sign_pdf_file, verify_pdf_file};
use crate::report::VerificationReport;
use crate::signature::{SigningKey, VerifyingKey};
use crate::store::ProvenanceStore;
use crate::video::{sign_video_file, verify_video_file};

/// Kind of media artifact, selecting the provenance mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Still image: per-block hashes over a grid.
    Image,
    /// Animated GIF: hash chain over decoded frames.
    Video,
    /// Document: one hash over the whole file.
    Pdf,
}

impl ArtifactKind {
    /// Guess the kind from a file extension.
    ///
    /// `.gif` is treated as video since GIFs are decoded frame by frame.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "webp" => Some(ArtifactKind::Image),
            "gif" => Some(ArtifactKind::Video),
            "pdf" => Some(ArtifactKind::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
            ArtifactKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(ArtifactKind::Image),
            "video" => Ok(ArtifactKind::Video),
            "pdf" => Ok(ArtifactKind::Pdf),
            other => Err(ProvenanceError::UnknownArtifactKind(other.to_string())),
        }
    }
}

/// What a signing run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutcome {
    pub kind: ArtifactKind,
    /// Record id for images and documents; `None` for video.
    pub record_id: Option<String>,
    /// Frames chained, for video.
    pub frames: Option<usize>,
}

/// Sign the artifact at `path` with the mechanism for `kind`.
///
/// `grid` only applies to images.
pub fn sign_artifact(
    kind: ArtifactKind,
    path: &Path,
    grid: GridSpec,
    key: &SigningKey,
    store: &ProvenanceStore,
) -> Result<SignOutcome> {
    let outcome = match kind {
        ArtifactKind::Image => SignOutcome {
            kind,
            record_id: Some(sign_image_file(path, grid, key, store)?.id().to_string()),
            frames: None,
        },
        ArtifactKind::Video => SignOutcome {
            kind,
            record_id: None,
            frames: Some(sign_video_file(path, key, store)?.len()),
        },
        ArtifactKind::Pdf => SignOutcome {
            kind,
            record_id: Some(sign_pdf_file(path, key, store)?.id().to_string()),
            frames: None,
        },
    };
    Ok(outcome)
}

/// Verify the artifact at `path`. Never fails: errors become `ERROR` reports.
pub fn verify_artifact(
    kind: ArtifactKind,
    path: &Path,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> VerificationReport {
    match kind {
        ArtifactKind::Image => verify_image_file(path, key, store).into(),
        ArtifactKind::Video => verify_video_file(path, key, store).into(),
        ArtifactKind::Pdf => verify_pdf_file(path, key, store).into(),
    }
}
