//! Image signing and multi-candidate verification.
//!
//! # Algorithm
//!
//! Verification considers every image record in the store. A candidate whose
//! signature does not verify over its own canonical bytes is dropped before it
//! can influence anything. Each remaining candidate is scored with its own
//! grid: the image is re-partitioned, every block re-hashed, and
//! `score = matched / total`. The best score wins (ties go to the candidate
//! discovered first) and a perfect score ends the search.
//!
//! A best score below 1.0 yields `TAMPERED` with the mismatched block indices
//! and a tamper map: every mismatched block blended 60/40 with solid red and
//! outlined in red. The map and a copy of the report are written to the
//! store; the input is untouched.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use tracing::{debug, info, warn};

use crate::error::{ProvenanceError, Result};
use crate::partition::{block_hashes, normalize, partition, BlockRegion, GridSpec};
use crate::record::{build_image_record, ProvenanceRecord, RecordKind};
use crate::report::{FailureType, ImageVerification, VerificationStatus};
use crate::signature::{SigningKey, VerifyingKey, SIGNATURE_ALGORITHM};
use crate::store::{Candidate, ProvenanceStore, SignedRecord};

/// Border thickness in pixels around each mismatched block.
pub const TAMPER_BORDER: u32 = 2;

const TAMPER_RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLEND_ORIGINAL: f64 = 0.6;
const BLEND_RED: f64 = 0.4;

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| ProvenanceError::ArtifactRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Hash `image` under `grid`, sign the record and persist it.
pub fn sign_image(
    image: &DynamicImage,
    grid: GridSpec,
    key: &SigningKey,
    store: &ProvenanceStore,
) -> Result<SignedRecord> {
    let rgb = normalize(image);
    let hashes = block_hashes(&rgb, grid)?;
    let record = build_image_record(&hashes, grid)?;

    let signature = key.sign(&record.canonical_bytes()?)?;
    let record_path = store.write_record(&record, &signature)?;

    info!(
        id = %record.id(),
        rows = grid.rows,
        cols = grid.cols,
        width = rgb.width(),
        height = rgb.height(),
        "Image signed"
    );

    Ok(SignedRecord {
        signature_path: store.signature_path(record.id()),
        record,
        record_path,
    })
}

/// Load an image from disk and sign it.
pub fn sign_image_file(
    path: &Path,
    grid: GridSpec,
    key: &SigningKey,
    store: &ProvenanceStore,
) -> Result<SignedRecord> {
    sign_image(&load_image(path)?, grid, key, store)
}

/// Block-level comparison of an image against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateScore {
    pub candidate_id: String,
    pub grid: GridSpec,
    pub matched: usize,
    pub total: usize,
    pub mismatched_blocks: Vec<usize>,
}

impl CandidateScore {
    pub fn score(&self) -> f64 {
        self.matched as f64 / self.total as f64
    }

    pub fn is_perfect(&self) -> bool {
        self.matched == self.total
    }

    /// Strictly higher score than `other`, compared exactly.
    fn beats(&self, other: &CandidateScore) -> bool {
        self.matched * other.total > other.matched * self.total
    }
}

/// Compare `image` block by block against `candidate`'s stored hashes.
///
/// Returns `None` for non-image candidates and for records whose hash count
/// does not equal `rows * cols`.
pub fn score_candidate(image: &RgbImage, candidate: &Candidate) -> Option<CandidateScore> {
    let ProvenanceRecord::Image(record) = &candidate.record else {
        return None;
    };
    if !record.is_well_formed() {
        return None;
    }

    let computed = block_hashes(image, record.grid).ok()?;
    let mismatched_blocks: Vec<usize> = computed
        .iter()
        .zip(record.hashes.iter())
        .enumerate()
        .filter(|(_, (digest, stored))| hex::encode(digest) != **stored)
        .map(|(index, _)| index)
        .collect();

    let total = computed.len();
    Some(CandidateScore {
        candidate_id: candidate.id.clone(),
        grid: record.grid,
        matched: total - mismatched_blocks.len(),
        total,
        mismatched_blocks,
    })
}

/// Verify `image` against every image record in `store`.
pub fn verify_image(
    image: &DynamicImage,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<ImageVerification> {
    verify_image_named(image, None, key, store)
}

/// Load an image from disk and verify it.
///
/// Every failure, including an unreadable file, is reported as an `ERROR`
/// outcome rather than returned.
pub fn verify_image_file(
    path: &Path,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> ImageVerification {
    let file = Some(path.display().to_string());
    load_image(path)
        .and_then(|image| verify_image_named(&image, file.clone(), key, store))
        .unwrap_or_else(|err| ImageVerification::from_error(file, &err))
}

fn verify_image_named(
    image: &DynamicImage,
    file: Option<String>,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<ImageVerification> {
    let candidates = store.discover_candidates(RecordKind::Image)?;
    let rgb = normalize(image);

    let mut report = ImageVerification::new(file);
    let mut best: Option<CandidateScore> = None;

    for candidate in &candidates {
        if !key.verify(&candidate.signature, &candidate.canonical) {
            debug!(id = %candidate.id, "Candidate signature invalid, dropped");
            continue;
        }
        report.candidates_considered += 1;

        let Some(score) = score_candidate(&rgb, candidate) else {
            debug!(id = %candidate.id, "Candidate record malformed, skipped");
            continue;
        };
        debug!(id = %candidate.id, score = score.score(), "Candidate scored");

        if best.as_ref().map_or(true, |b| score.beats(b)) {
            let perfect = score.is_perfect();
            best = Some(score);
            if perfect {
                break;
            }
        }
    }

    let Some(best) = best else {
        info!(
            candidates = candidates.len(),
            "No signature-valid provenance record found"
        );
        report.status = VerificationStatus::Failed;
        report.failure_type = Some(FailureType::NoValidProvenanceFound);
        return Ok(report);
    };

    report.candidate_id = Some(best.candidate_id.clone());
    report.score = Some(best.score());
    report.signed_by = Some(SIGNATURE_ALGORITHM.to_string());

    if best.is_perfect() {
        info!(id = %best.candidate_id, "Image verified");
        report.status = VerificationStatus::Verified;
        return Ok(report);
    }

    warn!(
        id = %best.candidate_id,
        score = best.score(),
        mismatched = best.mismatched_blocks.len(),
        "Image tampered"
    );
    let regions = partition(rgb.width(), rgb.height(), best.grid)?;
    let tamper_map = render_tamper_map(&rgb, &regions, &best.mismatched_blocks);
    let map_name = format!("tamper_map_{}.png", best.candidate_id);
    let map_path = store.write_png(&map_name, &tamper_map)?;

    report.status = VerificationStatus::Tampered;
    report.failure_type = Some(FailureType::BlockHashMismatch);
    report.mismatched_blocks = best.mismatched_blocks;
    report.tamper_map = Some(map_path);
    store.write_report(&format!("tamper_report_{}.json", best.candidate_id), &report)?;
    Ok(report)
}

/// Copy of `image` with every region in `mismatched` blended toward red and
/// outlined with a [`TAMPER_BORDER`]-pixel red border drawn inside the region.
pub fn render_tamper_map(
    image: &RgbImage,
    regions: &[BlockRegion],
    mismatched: &[usize],
) -> RgbImage {
    let mut map = image.clone();

    for region in mismatched.iter().filter_map(|&i| regions.get(i)) {
        for y in region.y1..region.y2 {
            for x in region.x1..region.x2 {
                let pixel = map.get_pixel_mut(x, y);
                for (channel, red) in pixel.0.iter_mut().zip(TAMPER_RED.0) {
                    *channel = (*channel as f64 * BLEND_ORIGINAL + red as f64 * BLEND_RED) as u8;
                }
            }
        }

        let top = region.y1..(region.y1 + TAMPER_BORDER).min(region.y2);
        let bottom = region.y2.saturating_sub(TAMPER_BORDER).max(region.y1)..region.y2;
        let left = region.x1..(region.x1 + TAMPER_BORDER).min(region.x2);
        let right = region.x2.saturating_sub(TAMPER_BORDER).max(region.x1)..region.x2;

        for y in top.chain(bottom) {
            for x in region.x1..region.x2 {
                map.put_pixel(x, y, TAMPER_RED);
            }
        }
        for x in left.chain(right) {
            for y in region.y1..region.y2 {
                map.put_pixel(x, y, TAMPER_RED);
            }
        }
    }

    map
}
