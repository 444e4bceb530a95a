//! Process exit status for `provenance`.
//!
//! A tampered artifact and a missing record both exit 65 (EX_DATAERR). Unreadable
//! inputs and keys exit 66, store I/O failures 74. Numbers come from sysexits.h.

use provenance_core::{FailureType, ProvenanceError, VerificationStatus};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (tampered content, no valid provenance).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file or key.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot read or write the provenance store).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Exit code table appended to `--help`.
pub const HELP_TEXT: &str = "Exit codes:
  0   Success (artifact verified)
  1   General error
  64  Usage error
  65  Verification failed (tampered or no valid provenance)
  66  Input file or key could not be read
  74  Provenance store I/O error";

/// Status to exit with, plus the error line to print first (if any).
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    /// Code for a completed verification run.
    pub fn from_report(status: VerificationStatus, failure: Option<FailureType>) -> i32 {
        match status {
            VerificationStatus::Verified => SUCCESS,
            VerificationStatus::Tampered | VerificationStatus::Failed => VERIFICATION_FAILED,
            VerificationStatus::Error | VerificationStatus::Unknown => match failure {
                Some(FailureType::ArtifactReadFailed | FailureType::KeyLoadFailed) => INPUT_ERROR,
                Some(FailureType::ProvenanceScanFailed) => IO_ERROR,
                _ => GENERAL_ERROR,
            },
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed core errors first, anywhere in the chain
        let typed = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ProvenanceError>())
            .map(|e| match e {
                ProvenanceError::KeyLoad { .. }
                | ProvenanceError::UnsupportedKey(_)
                | ProvenanceError::ArtifactRead { .. } => INPUT_ERROR,
                ProvenanceError::InvalidGrid { .. } | ProvenanceError::UnknownArtifactKind(_) => {
                    USAGE_ERROR
                }
                ProvenanceError::Store { .. } | ProvenanceError::Io(_) => IO_ERROR,
                _ => GENERAL_ERROR,
            });

        let code = typed.unwrap_or_else(|| {
            if message.contains("Failed to read file") || message.contains("Failed to load") {
                INPUT_ERROR
            } else if message.contains("Cannot detect artifact kind") {
                USAGE_ERROR
            } else if message.contains("Failed to write") {
                IO_ERROR
            } else {
                GENERAL_ERROR
            }
        });

        Self {
            code,
            message: Some(message),
        }
    }
}
