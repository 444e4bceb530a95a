//! Frame-ordered hash chaining for video.
//!
//! Signing streams frames in playback order and links them with
//! [`chained_hash`], starting from [`GENESIS_DIGEST`]. The full digest
//! sequence is stored; only the terminal digest is signed.
//!
//! Verification is a small state machine driven by [`ChainVerifier`]:
//!
//! ```text
//! Streaming ──► MismatchFound      (computed digest differs at index i)
//!     │    └──► ChainExhausted     (video has more frames than the chain)
//!     └──────► ChainComplete       (video ended, every digest matched)
//!                   │
//!                   └──► signature check over the computed terminal digest
//!                            ├──► VERIFIED
//!                            └──► SIGNATURE_MISMATCH
//! ```
//!
//! A video cut short ends in `ChainComplete` but fails the signature check,
//! because the shorter prefix's terminal digest is not the one that was signed.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Rgb, RgbImage};
use tracing::{info, warn};

use crate::error::{ProvenanceError, Result};
use crate::hashing::{chained_hash, Digest32, DIGEST_SIZE, GENESIS_DIGEST};
use crate::report::{FailureType, VerificationStatus, VideoVerification};
use crate::signature::{SigningKey, VerifyingKey};
use crate::store::{ProvenanceStore, VIDEO_REPORT_FILE};

/// Border thickness in pixels drawn around an evidence frame.
pub const EVIDENCE_BORDER: u32 = 10;

const EVIDENCE_RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Ordered per-frame digests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoChain {
    digests: Vec<Digest32>,
}

impl VideoChain {
    pub fn from_digests(digests: Vec<Digest32>) -> Self {
        Self { digests }
    }

    pub fn digests(&self) -> &[Digest32] {
        &self.digests
    }

    pub fn get(&self, index: usize) -> Option<&Digest32> {
        self.digests.get(index)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Last digest, or the genesis digest for an empty chain. This is the
    /// signed value.
    pub fn terminal(&self) -> Digest32 {
        self.digests.last().copied().unwrap_or(GENESIS_DIGEST)
    }

    /// Concatenated digests, 32 bytes each.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.digests.concat()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % DIGEST_SIZE != 0 {
            return Err(ProvenanceError::InvalidChain(format!(
                "{} bytes is not a multiple of {}",
                bytes.len(),
                DIGEST_SIZE
            )));
        }
        let digests = bytes
            .chunks_exact(DIGEST_SIZE)
            .map(|chunk| {
                let mut digest = GENESIS_DIGEST;
                digest.copy_from_slice(chunk);
                digest
            })
            .collect();
        Ok(Self { digests })
    }
}

/// Builds a chain one frame at a time.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    digests: Vec<Digest32>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame and return its digest.
    pub fn push(&mut self, frame: &[u8]) -> Digest32 {
        let prev = self.digests.last().copied().unwrap_or(GENESIS_DIGEST);
        let digest = chained_hash(frame, &prev);
        self.digests.push(digest);
        digest
    }

    pub fn finish(self) -> VideoChain {
        VideoChain::from_digests(self.digests)
    }
}

/// Chain every frame of a video in order.
pub fn build_chain<I>(frames: I) -> Result<VideoChain>
where
    I: IntoIterator<Item = Result<RgbImage>>,
{
    let mut builder = ChainBuilder::new();
    for frame in frames {
        builder.push(frame?.as_raw());
    }
    Ok(builder.finish())
}

/// Streaming state of a chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Streaming { next_index: usize },
    MismatchFound { index: usize },
    ChainExhausted { index: usize },
}

/// Terminal state once the video has ended or a mismatch stopped the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    MismatchFound { index: usize },
    ChainExhausted { index: usize },
    ChainComplete { frames: usize, terminal: Digest32 },
}

/// Recomputes a chain frame by frame against a stored one.
#[derive(Debug)]
pub struct ChainVerifier<'a> {
    expected: &'a VideoChain,
    prev: Digest32,
    state: ChainState,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(expected: &'a VideoChain) -> Self {
        Self {
            expected,
            prev: GENESIS_DIGEST,
            state: ChainState::Streaming { next_index: 0 },
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Feed the next frame. Once the state has left `Streaming`, further
    /// frames are ignored.
    pub fn feed(&mut self, frame: &[u8]) -> ChainState {
        let ChainState::Streaming { next_index: index } = self.state else {
            return self.state;
        };

        self.state = match self.expected.get(index) {
            None => ChainState::ChainExhausted { index },
            Some(stored) => {
                let digest = chained_hash(frame, &self.prev);
                if digest == *stored {
                    self.prev = digest;
                    ChainState::Streaming {
                        next_index: index + 1,
                    }
                } else {
                    ChainState::MismatchFound { index }
                }
            }
        };
        self.state
    }

    pub fn finish(self) -> ChainOutcome {
        match self.state {
            ChainState::Streaming { next_index } => ChainOutcome::ChainComplete {
                frames: next_index,
                terminal: self.prev,
            },
            ChainState::MismatchFound { index } => ChainOutcome::MismatchFound { index },
            ChainState::ChainExhausted { index } => ChainOutcome::ChainExhausted { index },
        }
    }
}

/// Chain `frames`, sign the terminal digest and persist chain and signature.
pub fn sign_video<I>(frames: I, key: &SigningKey, store: &ProvenanceStore) -> Result<VideoChain>
where
    I: IntoIterator<Item = Result<RgbImage>>,
{
    let chain = build_chain(frames)?;
    let signature = key.sign(&chain.terminal())?;
    store.write_video_chain(&chain, &signature)?;
    info!(frames = chain.len(), "Video signed");
    Ok(chain)
}

/// Sign an animated GIF from disk.
pub fn sign_video_file(
    path: &Path,
    key: &SigningKey,
    store: &ProvenanceStore,
) -> Result<VideoChain> {
    sign_video(open_gif_frames(path)?, key, store)
}

/// Verify `frames` against the stored chain and signature.
///
/// The report is always written to the store; on failure the offending frame
/// (when it exists in the stream) is written as an evidence image.
pub fn verify_video<I>(
    frames: I,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<VideoVerification>
where
    I: IntoIterator<Item = Result<RgbImage>>,
{
    verify_video_named(frames, None, key, store)
}

/// Verify an animated GIF from disk. Failures become `ERROR` reports.
pub fn verify_video_file(
    path: &Path,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> VideoVerification {
    let file = Some(path.display().to_string());
    let result = open_gif_frames(path)
        .and_then(|frames| verify_video_named(frames, file.clone(), key, store));

    match result {
        Ok(report) => report,
        Err(err) => {
            let report = VideoVerification::from_error(file, &err);
            if let Err(e) = store.write_report(VIDEO_REPORT_FILE, &report) {
                warn!(error = %e, "Failed to persist video error report");
            }
            report
        }
    }
}

fn verify_video_named<I>(
    frames: I,
    file: Option<String>,
    key: &VerifyingKey,
    store: &ProvenanceStore,
) -> Result<VideoVerification>
where
    I: IntoIterator<Item = Result<RgbImage>>,
{
    let mut report = VideoVerification::new(file);

    let Some((expected, signature)) = store.load_video_chain()? else {
        report.status = VerificationStatus::Failed;
        report.failure_type = Some(FailureType::NoValidProvenanceFound);
        store.write_report(VIDEO_REPORT_FILE, &report)?;
        return Ok(report);
    };
    report.total_expected_frames = expected.len();

    let mut verifier = ChainVerifier::new(&expected);
    let mut offending: Option<RgbImage> = None;
    for frame in frames {
        let frame = frame?;
        report.total_frames_checked += 1;
        if !matches!(verifier.feed(frame.as_raw()), ChainState::Streaming { .. }) {
            offending = Some(frame);
            break;
        }
    }

    match verifier.finish() {
        ChainOutcome::MismatchFound { index } | ChainOutcome::ChainExhausted { index } => {
            report.status = VerificationStatus::Failed;
            report.failure_type = Some(FailureType::FrameHashMismatch);
            report.first_mismatched_frame = Some(index);
        }
        ChainOutcome::ChainComplete { frames, terminal } => {
            if key.verify(&signature, &terminal) {
                report.status = VerificationStatus::Verified;
            } else {
                report.status = VerificationStatus::Failed;
                report.failure_type = Some(FailureType::SignatureMismatch);
                report.first_mismatched_frame = Some(frames);
            }
        }
    }

    if report.status.is_verified() {
        info!(frames = report.total_frames_checked, "Video verified");
    } else {
        warn!(
            reason = ?report.failure_type,
            frame = ?report.first_mismatched_frame,
            "Video verification failed"
        );
        if let (Some(index), Some(frame)) = (report.first_mismatched_frame, offending) {
            let evidence = render_evidence_frame(&frame);
            let name = format!("mismatch_frame_{index}.png");
            report.evidence_path = Some(store.write_png(&name, &evidence)?);
        }
    }

    store.write_report(VIDEO_REPORT_FILE, &report)?;
    Ok(report)
}

/// Copy of `frame` with an [`EVIDENCE_BORDER`]-pixel red border around its
/// full extent.
pub fn render_evidence_frame(frame: &RgbImage) -> RgbImage {
    let mut evidence = frame.clone();
    let (width, height) = evidence.dimensions();

    for (x, y, pixel) in evidence.enumerate_pixels_mut() {
        let on_border = y < EVIDENCE_BORDER
            || y >= height.saturating_sub(EVIDENCE_BORDER)
            || x < EVIDENCE_BORDER
            || x >= width.saturating_sub(EVIDENCE_BORDER);
        if on_border {
            *pixel = EVIDENCE_RED;
        }
    }
    evidence
}

/// Decoded frames of an animated GIF, as RGB.
pub fn gif_frames<'a, R>(reader: R) -> Result<impl Iterator<Item = Result<RgbImage>> + 'a>
where
    R: BufRead + Seek + 'a,
{
    let decoder = GifDecoder::new(reader)?;
    Ok(decoder.into_frames().map(|frame| -> Result<RgbImage> {
        let frame = frame?;
        Ok(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8())
    }))
}

/// Open an animated GIF from disk as a frame stream.
pub fn open_gif_frames(path: &Path) -> Result<impl Iterator<Item = Result<RgbImage>>> {
    let artifact_err = |reason: String| ProvenanceError::ArtifactRead {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|e| artifact_err(e.to_string()))?;
    gif_frames(BufReader::new(file)).map_err(|e| artifact_err(e.to_string()))
}
