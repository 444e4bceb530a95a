//! Whole-document provenance.
//!
//! A PDF is covered by one content hash of its full byte stream. Candidates
//! are pre-filtered by exact hash equality and only the matching ones have
//! their signature checked; the outcome is binary.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ProvenanceError, Result};
use crate::hashing::content_hash;
use crate::record::{build_pdf_record, ProvenanceRecord, RecordKind};
use crate::report::{FailureType, PdfVerification, VerificationStatus};
use crate::signature::{SigningKey, VerifyingKey, SIGNATURE_ALGORITHM};
use crate::store::{ProvenanceStore, SignedRecord};

fn read_document(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ProvenanceError::ArtifactRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Hash, sign and persist a document.
pub fn sign_pdf(content: &[u8], key: &SigningKey, store: &ProvenanceStore) -> Result<SignedRecord> {
    let record = build_pdf_record(&content_hash(content));
    let signature = key.sign(&record.canonical_bytes()?)?;
    let record_path = store.write_record(&record, &signature)?;

    info!(id = %record.id(), bytes = content.len(), "Document signed");
    Ok(SignedRecord {
        signature_path: store.signature_path(record.id()),
        record,
        record_path,
    })
}

pub fn sign_pdf_file(path: &Path, key: &SigningKey, store: &ProvenanceStore) -> Result<SignedRecord> {
    sign_pdf(&read_document(path)?, key, store)
}

/// Verify a document against every pdf record in `store`.
pub fn verify_pdf(
    content: &[u8],
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<PdfVerification> {
    verify_pdf_named(content, None, key, store)
}

/// Read a document from disk and verify it. Failures become `ERROR` reports.
pub fn verify_pdf_file(path: &Path, key: &VerifyingKey, store: &ProvenanceStore) -> PdfVerification {
    let file = Some(path.display().to_string());
    read_document(path)
        .and_then(|content| verify_pdf_named(&content, file.clone(), key, store))
        .unwrap_or_else(|err| PdfVerification::from_error(file, &err))
}

fn verify_pdf_named(
    content: &[u8],
    file: Option<String>,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<PdfVerification> {
    let candidates = store.discover_candidates(RecordKind::Pdf)?;
    let target = hex::encode(content_hash(content));

    let mut report = PdfVerification::new(file);
    let matched = candidates.iter().find(|candidate| {
        let ProvenanceRecord::Pdf(record) = &candidate.record else {
            return false;
        };
        if record.hash != target {
            return false;
        }
        let valid = key.verify(&candidate.signature, &candidate.canonical);
        if !valid {
            debug!(id = %candidate.id, "Hash matched but signature invalid");
        }
        valid
    });

    match matched {
        Some(candidate) => {
            info!(id = %candidate.id, "Document verified");
            report.status = VerificationStatus::Verified;
            report.candidate_id = Some(candidate.id.clone());
            report.signed_by = Some(SIGNATURE_ALGORITHM.to_string());
        }
        None => {
            warn!(candidates = candidates.len(), "No signed record matches document");
            report.status = VerificationStatus::Tampered;
            report.failure_type = Some(FailureType::HashMismatchOrNoRecord);
        }
    }
    Ok(report)
}
