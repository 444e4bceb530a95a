//! Provenance Core - signed content provenance for images, video and documents
//!
//! At creation time an artifact is hashed and the hashes are signed into a
//! record kept in a plain directory store. Later a candidate artifact is
//! re-hashed and checked against every signed record, localizing tampering
//! where the artifact kind allows it.
//!
//! # Mechanisms
//!
//! - Images: the RGB pixels are split into a `rows × cols` grid and every
//!   block is hashed with SHA-256. Verification scores each signature-valid
//!   record and renders a tamper map of mismatched blocks.
//! - Video: decoded frames form a hash chain seeded with a zero digest; only
//!   the terminal digest is signed. Verification reports the first frame at
//!   which the stream diverges.
//! - PDF: one SHA-256 over the whole file; the outcome is binary.
//!
//! Records are signed over a canonical JSON encoding with ECDSA P-256.
//!
//! # Example
//!
//! ```no_run
//! use provenance_core::{generate_keypair, sign_image, verify_image, GridSpec, ProvenanceStore};
//!
//! # fn example() -> provenance_core::Result<()> {
//! let (signing_key, verifying_key) = generate_keypair()?;
//! let store = ProvenanceStore::open("provenance")?;
//!
//! let image = image::open("photo.png")?;
//! let signed = sign_image(&image, GridSpec::default(), &signing_key, &store)?;
//!
//! let report = verify_image(&image, &verifying_key, &store)?;
//! assert!(report.status.is_verified());
//! assert_eq!(report.candidate_id.as_deref(), Some(signed.id()));
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod hashing;
pub mod imaging;
pub mod partition;
pub mod pdf;
pub mod record;
pub mod report;
pub mod signature;
pub mod store;
pub mod video;

#[cfg(feature = "jobs")]
pub mod jobs;

// Re-export main types for convenience
pub use artifact::{sign_artifact, verify_artifact, ArtifactKind, SignOutcome};
pub use config::ProvenanceConfig;
pub use error::{ProvenanceError, Result};
pub use hashing::{chained_hash, content_hash, Digest32, GENESIS_DIGEST};
pub use imaging::{
    render_tamper_map, sign_image, sign_image_file, verify_image, verify_image_file,
    CandidateScore,
};
pub use partition::{block_hashes, partition, BlockRegion, GridSpec};
pub use pdf::{sign_pdf, sign_pdf_file, verify_pdf, verify_pdf_file};
pub use record::{ImageRecord, PdfRecord, ProvenanceRecord, RecordKind};
pub use report::{
    FailureType, ImageVerification, PdfVerification, VerificationReport, VerificationStatus,
    VideoVerification,
};
pub use signature::{generate_keypair, SigningKey, VerifyingKey, SIGNATURE_ALGORITHM};
pub use store::{Candidate, ProvenanceStore, SignedRecord};
pub use video::{
    build_chain, sign_video, sign_video_file, verify_video, verify_video_file, ChainOutcome,
    ChainState, ChainVerifier, VideoChain,
};

#[cfg(feature = "jobs")]
pub use jobs::{JobQueue, JobSnapshot, JobStatus};
