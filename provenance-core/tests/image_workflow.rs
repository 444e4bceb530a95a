//! End-to-end image provenance tests.
//!
//! Sign images into a store on disk, then verify untouched, edited and
//! re-signed copies through the file-based entry points.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use provenance_core::partition::{normalize, partition};
use provenance_core::store::{LEGACY_ID, LEGACY_RECORD_FILE, LEGACY_SIGNATURE_FILE};
use provenance_core::{
    generate_keypair, sign_image_file, verify_image_file, FailureType, GridSpec,
    ImageVerification, ProvenanceStore, VerificationStatus,
};
use tempfile::TempDir;

/// 64x64 image with distinct content in every 8x8 block.
fn create_test_image() -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        Rgb([(x * 4) as u8, (y * 4) as u8, ((x / 8 + y / 8) * 16) as u8])
    })
}

fn save_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("Failed to write PNG");
    path
}

/// Paint block (row, col) of an 8x8 grid over a 64x64 image.
fn recolor_block(image: &mut RgbImage, row: u32, col: u32) {
    for y in row * 8..(row + 1) * 8 {
        for x in col * 8..(col + 1) * 8 {
            image.put_pixel(x, y, Rgb([0, 255, 0]));
        }
    }
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_unmodified_image_verifies() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());

    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();
    assert!(signed.record_path.exists());
    assert!(signed.signature_path.exists());

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
    assert_eq!(report.failure_type, None);
    assert_eq!(report.candidate_id.as_deref(), Some(signed.id()));
    assert_eq!(report.score, Some(1.0));
    assert!(report.mismatched_blocks.is_empty());
    assert!(report.tamper_map.is_none());
    assert_eq!(report.signed_by.as_deref(), Some("ECDSA-P256"));
}

#[test]
fn test_grayscale_image_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();

    let gray = DynamicImage::ImageRgb8(create_test_image()).to_luma8();
    let path = dir.path().join("gray.png");
    gray.save(&path).unwrap();

    sign_image_file(&path, GridSpec::new(4, 4), &signing, &store).unwrap();
    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
}

// ============================================================================
// Tamper localization
// ============================================================================

#[test]
fn test_single_block_edit_is_localized() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let original = create_test_image();
    let path = save_png(dir.path(), "photo.png", &original);
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let mut edited = original.clone();
    recolor_block(&mut edited, 2, 5);
    let edited_path = save_png(dir.path(), "edited.png", &edited);

    let report = verify_image_file(&edited_path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Tampered);
    assert_eq!(report.failure_type, Some(FailureType::BlockHashMismatch));
    assert_eq!(report.candidate_id.as_deref(), Some(signed.id()));
    assert_eq!(report.mismatched_blocks, vec![2 * 8 + 5]);
    assert_eq!(report.score, Some(63.0 / 64.0));

    let map_path = report.tamper_map.expect("tamper map must be written");
    assert_eq!(
        map_path.file_name().unwrap().to_str().unwrap(),
        format!("tamper_map_{}.png", signed.id())
    );
    let map = image::open(&map_path).unwrap().to_rgb8();
    assert_eq!(map.dimensions(), (64, 64));

    // Border of the mismatched block is solid red, the rest is untouched.
    assert_eq!(map.get_pixel(5 * 8, 2 * 8), &Rgb([255, 0, 0]));
    assert_eq!(map.get_pixel(5 * 8 + 7, 2 * 8 + 7), &Rgb([255, 0, 0]));
    // Interior: green 255 * 0.6 = 153, red 255 * 0.4 = 102.
    assert_eq!(map.get_pixel(5 * 8 + 4, 2 * 8 + 4), &Rgb([102, 153, 0]));
    assert_eq!(map.get_pixel(0, 0), edited.get_pixel(0, 0));
    assert_eq!(map.get_pixel(63, 63), edited.get_pixel(63, 63));

    // The artifact being verified is never modified.
    assert_eq!(image::open(&edited_path).unwrap().to_rgb8(), edited);

    // The report is persisted next to the map.
    let saved = std::fs::read(
        store
            .root()
            .join(format!("tamper_report_{}.json", signed.id())),
    )
    .unwrap();
    let saved: ImageVerification = serde_json::from_slice(&saved).unwrap();
    assert_eq!(saved.status, VerificationStatus::Tampered);
    assert_eq!(saved.mismatched_blocks, vec![2 * 8 + 5]);
    assert_eq!(saved.tamper_map.as_deref(), Some(map_path.as_path()));
}

#[test]
fn test_multiple_edits_reported_in_row_major_order() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let original = create_test_image();
    let path = save_png(dir.path(), "photo.png", &original);
    sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let mut edited = original;
    recolor_block(&mut edited, 7, 0);
    recolor_block(&mut edited, 0, 7);
    recolor_block(&mut edited, 3, 3);
    let edited_path = save_png(dir.path(), "edited.png", &edited);

    let report = verify_image_file(&edited_path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Tampered);
    assert_eq!(report.mismatched_blocks, vec![7, 27, 56]);
}

#[test]
fn test_tamper_map_uses_winning_candidate_grid() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let original = create_test_image();
    let path = save_png(dir.path(), "photo.png", &original);
    sign_image_file(&path, GridSpec::new(2, 2), &signing, &store).unwrap();

    let mut edited = original;
    edited.put_pixel(40, 10, Rgb([1, 2, 3]));
    let edited_path = save_png(dir.path(), "edited.png", &edited);

    let report = verify_image_file(&edited_path, &verifying, &store);
    assert_eq!(report.mismatched_blocks, vec![1]);
    assert_eq!(report.score, Some(0.75));

    let map = image::open(report.tamper_map.unwrap()).unwrap().to_rgb8();
    let regions = partition(64, 64, GridSpec::new(2, 2)).unwrap();
    assert_eq!(map.get_pixel(regions[1].x1, regions[1].y1), &Rgb([255, 0, 0]));
    assert_eq!(map.get_pixel(10, 40), edited.get_pixel(10, 40));
}

// ============================================================================
// Candidate discovery
// ============================================================================

#[test]
fn test_best_candidate_is_selected() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();

    let unrelated = RgbImage::from_pixel(64, 64, Rgb([9, 9, 9]));
    let unrelated_path = save_png(dir.path(), "unrelated.png", &unrelated);
    sign_image_file(&unrelated_path, GridSpec::default(), &signing, &store).unwrap();

    let original = create_test_image();
    let path = save_png(dir.path(), "photo.png", &original);
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let mut edited = original;
    recolor_block(&mut edited, 4, 4);
    let edited_path = save_png(dir.path(), "edited.png", &edited);

    let report = verify_image_file(&edited_path, &verifying, &store);
    assert_eq!(report.candidates_considered, 2);
    assert_eq!(report.candidate_id.as_deref(), Some(signed.id()));
    assert_eq!(report.mismatched_blocks, vec![36]);
}

#[test]
fn test_corrupted_signature_drops_candidate() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let mut signature = std::fs::read(&signed.signature_path).unwrap();
    signature[8] ^= 0x40;
    std::fs::write(&signed.signature_path, signature).unwrap();

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::NoValidProvenanceFound));
    assert_eq!(report.candidates_considered, 0);
    assert!(report.tamper_map.is_none());
}

#[test]
fn test_edited_record_invalidates_signature() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    // Rewrite the record with one hash replaced; the signature no longer covers it.
    let mut record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&signed.record_path).unwrap()).unwrap();
    record["hashes"][0] = serde_json::Value::String("00".repeat(32));
    std::fs::write(&signed.record_path, serde_json::to_vec(&record).unwrap()).unwrap();

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Failed);
}

#[test]
fn test_record_whitespace_does_not_matter() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&signed.record_path).unwrap()).unwrap();
    std::fs::write(
        &signed.record_path,
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
}

#[test]
fn test_legacy_pair_is_a_candidate() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());
    let signed = sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    std::fs::rename(&signed.record_path, store.root().join(LEGACY_RECORD_FILE)).unwrap();
    std::fs::rename(
        &signed.signature_path,
        store.root().join(LEGACY_SIGNATURE_FILE),
    )
    .unwrap();

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
    assert_eq!(report.candidate_id.as_deref(), Some(LEGACY_ID));
}

#[test]
fn test_empty_store_has_no_provenance() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (_, verifying) = generate_keypair().unwrap();
    let path = save_png(dir.path(), "photo.png", &create_test_image());

    let report = verify_image_file(&path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Failed);
    assert_eq!(report.failure_type, Some(FailureType::NoValidProvenanceFound));
}

#[test]
fn test_alpha_only_edit_is_invisible() {
    let dir = TempDir::new().unwrap();
    let store = ProvenanceStore::open(dir.path().join("provenance")).unwrap();
    let (signing, verifying) = generate_keypair().unwrap();

    let rgba = DynamicImage::ImageRgb8(create_test_image()).to_rgba8();
    let path = dir.path().join("alpha.png");
    rgba.save(&path).unwrap();
    sign_image_file(&path, GridSpec::default(), &signing, &store).unwrap();

    let mut translucent = rgba.clone();
    for pixel in translucent.pixels_mut() {
        pixel.0[3] = 10;
    }
    let edited_path = dir.path().join("alpha_edit.png");
    translucent.save(&edited_path).unwrap();

    assert_eq!(
        normalize(&DynamicImage::ImageRgba8(translucent)),
        normalize(&DynamicImage::ImageRgba8(rgba))
    );
    let report = verify_image_file(&edited_path, &verifying, &store);
    assert_eq!(report.status, VerificationStatus::Verified);
}
