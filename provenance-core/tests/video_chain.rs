//! End-to-end video hash-chain tests.

use std::fs::File;

use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Frame, Rgb, RgbImage};
use provenance_core::store::{VIDEO_CHAIN_FILE, VIDEO_REPORT_FILE, VIDEO_SIGNATURE_FILE};
use provenance_core::{
    generate_keypair, sign_video, sign_video_file, verify_video, verify_video_file, FailureType,
    ProvenanceStore, VerificationStatus, VideoVerification,
};
use tempfile::TempDir;

fn create_frames(count: u8) -> Vec<RgbImage> {
    (0..count)
        .map(|i| RgbImage::from_fn(32, 24, |x, y| Rgb([i * 40, x as u8 * 8, y as u8 * 10])))
        .collect()
}

fn stream(frames: &[RgbImage]) -> impl Iterator<Item = provenance_core::Result<RgbImage>> + '_ {
    frames.iter().cloned().map(Ok)
}

fn read_report(store: &ProvenanceStore) -> VideoVerification {
    let raw = std::fs::read(store.root().join(VIDEO_REPORT_FILE)).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

// ============================================================================
// In-memory frame streams
// ============================================================================

#[test]
fn test_unmodified_video_verifies() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let frames = create_frames(5);

    let chain = sign_video(stream(&frames), &signing, &store).unwrap();
    assert_eq!(chain.len(), 5);
    let chain_file = std::fs::read(store.root().join(VIDEO_CHAIN_FILE)).unwrap();
    assert_eq!(chain_file.len(), 5 * 32);
    assert!(store.root().join(VIDEO_SIGNATURE_FILE).exists());

    let report = verify_video(stream(&frames), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Verified);
    assert_eq!(report.first_mismatched_frame, None);
    assert_eq!(report.total_frames_checked, 5);
    assert_eq!(report.total_expected_frames, 5);
    assert_eq!(report.signed_by, "ECDSA-P256");
    assert!(report.evidence_path.is_none());

    assert_eq!(read_report(&store), report);
}

#[test]
fn test_modified_frame_is_located() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let frames = create_frames(5);
    sign_video(stream(&frames), &signing, &store).unwrap();

    let mut tampered = frames.clone();
    tampered[2].put_pixel(3, 3, Rgb([255, 255, 255]));

    let report = verify_video(stream(&tampered), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::FrameHashMismatch));
    assert_eq!(report.first_mismatched_frame, Some(2));
    assert_eq!(report.total_frames_checked, 3);

    let evidence_path = report.evidence_path.clone().expect("evidence frame must be written");
    assert!(evidence_path.ends_with("mismatch_frame_2.png"));
    let evidence = image::open(&evidence_path).unwrap().to_rgb8();
    assert_eq!(evidence.dimensions(), (32, 24));
    assert_eq!(evidence.get_pixel(0, 0), &Rgb([255, 0, 0]));
    assert_eq!(evidence.get_pixel(31, 23), &Rgb([255, 0, 0]));
    assert_eq!(evidence.get_pixel(12, 12), tampered[2].get_pixel(12, 12));

    assert_eq!(read_report(&store), report);
}

#[test]
fn test_swapped_frames_are_detected() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let frames = create_frames(4);
    sign_video(stream(&frames), &signing, &store).unwrap();

    let mut reordered = frames.clone();
    reordered.swap(1, 3);

    let report = verify_video(stream(&reordered), &verifying, &store).unwrap();
    assert_eq!(report.first_mismatched_frame, Some(1));
}

#[test]
fn test_appended_frame_exhausts_chain() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let frames = create_frames(5);
    sign_video(stream(&frames), &signing, &store).unwrap();

    let mut extended = frames.clone();
    extended.push(frames[0].clone());

    let report = verify_video(stream(&extended), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::FrameHashMismatch));
    assert_eq!(report.first_mismatched_frame, Some(5));
    assert!(report.evidence_path.unwrap().ends_with("mismatch_frame_5.png"));
}

#[test]
fn test_truncated_video_fails_signature() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let frames = create_frames(5);
    sign_video(stream(&frames), &signing, &store).unwrap();

    let report = verify_video(stream(&frames[..3]), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::SignatureMismatch));
    assert_eq!(report.first_mismatched_frame, Some(3));
    assert_eq!(report.total_frames_checked, 3);
    assert!(report.evidence_path.is_none());
}

#[test]
fn test_wrong_key_fails_signature() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, _) = generate_keypair().unwrap();
    let (_, other) = generate_keypair().unwrap();
    let frames = create_frames(3);
    sign_video(stream(&frames), &signing, &store).unwrap();

    let report = verify_video(stream(&frames), &other, &store).unwrap();
    assert_eq!(report.failure_type, Some(FailureType::SignatureMismatch));
}

#[test]
fn test_missing_chain_has_no_provenance() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (_, verifying) = generate_keypair().unwrap();

    let report = verify_video(stream(&create_frames(2)), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::NoValidProvenanceFound));
    assert!(store.root().join(VIDEO_REPORT_FILE).exists());
}

#[test]
fn test_resign_overwrites_chain() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path()).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let first = create_frames(3);
    let second = create_frames(6);

    sign_video(stream(&first), &signing, &store).unwrap();
    sign_video(stream(&second), &signing, &store).unwrap();

    let report = verify_video(stream(&second), &verifying, &store).unwrap();
    assert_eq!(report.status, VerificationStatus::Verified);
    let report = verify_video(stream(&first), &verifying, &store).unwrap();
    assert_eq!(report.failure_type, Some(FailureType::SignatureMismatch));
}

// ============================================================================
// Animated GIF files
// ============================================================================

fn write_gif(path: &std::path::Path, colors: &[[u8; 3]]) {
    let file = File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    let frames = colors.iter().map(|&color| {
        let rgb = RgbImage::from_pixel(16, 16, Rgb(color));
        Frame::new(DynamicImage::ImageRgb8(rgb).to_rgba8())
    });
    encoder.encode_frames(frames).unwrap();
}

#[test]
fn test_gif_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = dir.path().join("clip.gif");
    write_gif(&path, &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);

    let chain = sign_video_file(&path, &signing, &store).unwrap();
    assert_eq!(chain.len(), 3);

    let report = verify_video_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
    assert_eq!(report.file.as_deref(), Some(path.display().to_string().as_str()));
}

#[test]
fn test_gif_with_replaced_frame() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let original = dir.path().join("clip.gif");
    let edited = dir.path().join("edited.gif");
    write_gif(&original, &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
    write_gif(&edited, &[[255, 0, 0], [255, 255, 255], [0, 0, 255]]);

    sign_video_file(&original, &signing, &store).unwrap();
    let report = verify_video_file(&edited, &verifying, &store);
    assert_eq!(report.failure_type, Some(FailureType::FrameHashMismatch));
    assert_eq!(report.first_mismatched_frame, Some(1));
}

#[test]
fn test_unreadable_video_is_error_report() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (_, verifying) = generate_keypair().unwrap();
    let path = dir.path().join("not_a.gif");
    std::fs::write(&path, b"plain text").unwrap();

    let report = verify_video_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Error);
    assert_eq!(report.failure_type, Some(FailureType::ArtifactReadFailed));
    assert_eq!(read_report(&store).status, VerificationStatus::Error);
}
