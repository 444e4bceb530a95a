//! Verification outcomes.
//!
//! Each artifact kind has its own result struct; all of them share
//! [`VerificationStatus`] and [`FailureType`]. [`VerificationReport`] wraps
//! the three so callers (CLI, job queue) can persist or match on any of them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ProvenanceError;
use crate::signature::SIGNATURE_ALGORITHM;

/// Overall outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Content matches a validly signed record.
    Verified,
    /// A validly signed record exists but the content no longer matches it.
    Tampered,
    /// The run completed but found no valid provenance or an integrity violation.
    Failed,
    /// Environment or precondition failure (keys, artifact, store).
    Error,
    /// Not yet evaluated.
    Unknown,
}

impl VerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationStatus::Verified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    NoValidProvenanceFound,
    BlockHashMismatch,
    FrameHashMismatch,
    SignatureMismatch,
    HashMismatchOrNoRecord,
    KeyLoadFailed,
    ProvenanceScanFailed,
    ArtifactReadFailed,
    InternalError,
}

/// Result of verifying an image against its block-hash records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVerification {
    pub file: Option<String>,
    pub status: VerificationStatus,
    pub failure_type: Option<FailureType>,
    /// Detail for `ERROR` outcomes.
    pub detail: Option<String>,
    /// Id of the best-scoring signature-valid candidate.
    pub candidate_id: Option<String>,
    /// Fraction of matching blocks for that candidate.
    pub score: Option<f64>,
    /// Row-major indices of mismatched blocks.
    pub mismatched_blocks: Vec<usize>,
    pub tamper_map: Option<PathBuf>,
    /// Candidates whose signature verified.
    pub candidates_considered: usize,
    pub signed_by: Option<String>,
}

impl ImageVerification {
    pub(crate) fn new(file: Option<String>) -> Self {
        Self {
            file,
            status: VerificationStatus::Unknown,
            failure_type: None,
            detail: None,
            candidate_id: None,
            score: None,
            mismatched_blocks: Vec::new(),
            tamper_map: None,
            candidates_considered: 0,
            signed_by: None,
        }
    }

    /// `ERROR` report for a run that could not complete.
    pub fn from_error(file: Option<String>, err: &ProvenanceError) -> Self {
        Self {
            status: VerificationStatus::Error,
            failure_type: Some(err.failure_type()),
            detail: Some(err.to_string()),
            ..Self::new(file)
        }
    }
}

/// Result of verifying a video against its hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoVerification {
    pub file: Option<String>,
    pub status: VerificationStatus,
    pub failure_type: Option<FailureType>,
    pub detail: Option<String>,
    pub first_mismatched_frame: Option<usize>,
    pub total_frames_checked: usize,
    pub total_expected_frames: usize,
    pub evidence_path: Option<PathBuf>,
    pub signed_by: String,
}

impl VideoVerification {
    pub(crate) fn new(file: Option<String>) -> Self {
        Self {
            file,
            status: VerificationStatus::Unknown,
            failure_type: None,
            detail: None,
            first_mismatched_frame: None,
            total_frames_checked: 0,
            total_expected_frames: 0,
            evidence_path: None,
            signed_by: SIGNATURE_ALGORITHM.to_string(),
        }
    }

    pub fn from_error(file: Option<String>, err: &ProvenanceError) -> Self {
        Self {
            status: VerificationStatus::Error,
            failure_type: Some(err.failure_type()),
            detail: Some(err.to_string()),
            ..Self::new(file)
        }
    }
}

/// Result of verifying a document against its whole-file records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfVerification {
    pub file: Option<String>,
    pub status: VerificationStatus,
    pub failure_type: Option<FailureType>,
    pub detail: Option<String>,
    pub candidate_id: Option<String>,
    pub signed_by: Option<String>,
}

impl PdfVerification {
    pub(crate) fn new(file: Option<String>) -> Self {
        Self {
            file,
            status: VerificationStatus::Unknown,
            failure_type: None,
            detail: None,
            candidate_id: None,
            signed_by: None,
        }
    }

    pub fn from_error(file: Option<String>, err: &ProvenanceError) -> Self {
        Self {
            status: VerificationStatus::Error,
            failure_type: Some(err.failure_type()),
            detail: Some(err.to_string()),
            ..Self::new(file)
        }
    }
}

/// Verification outcome for any artifact kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VerificationReport {
    Image(ImageVerification),
    Video(VideoVerification),
    Pdf(PdfVerification),
}

impl VerificationReport {
    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationReport::Image(r) => r.status,
            VerificationReport::Video(r) => r.status,
            VerificationReport::Pdf(r) => r.status,
        }
    }

    pub fn failure_type(&self) -> Option<FailureType> {
        match self {
            VerificationReport::Image(r) => r.failure_type,
            VerificationReport::Video(r) => r.failure_type,
            VerificationReport::Pdf(r) => r.failure_type,
        }
    }
}

impl From<ImageVerification> for VerificationReport {
    fn from(report: ImageVerification) -> Self {
        VerificationReport::Image(report)
    }
}

impl From<VideoVerification> for VerificationReport {
    fn from(report: VideoVerification) -> Self {
        VerificationReport::Video(report)
    }
}

impl From<PdfVerification> for VerificationReport {
    fn from(report: PdfVerification) -> Self {
        VerificationReport::Pdf(report)
    }
}
