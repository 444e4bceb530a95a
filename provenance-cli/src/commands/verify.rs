//! Verify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use provenance_core::{
    verify_artifact, ArtifactKind, ImageVerification, PdfVerification, ProvenanceConfig,
    ProvenanceStore, VerificationReport, VerificationStatus, VideoVerification,
};
use tracing::{error, info, warn};

use crate::exit_codes::ExitCode;
use crate::utils::{load_verifying_key, resolve_kind, status_label};

/// Execute the verify command and return the process exit code.
///
/// Key and store problems are returned as errors; everything the core
/// reports (including `ERROR` outcomes for unreadable artifacts) is printed
/// and mapped to an exit code.
pub fn execute(
    file: PathBuf,
    kind: Option<ArtifactKind>,
    config: &ProvenanceConfig,
    json: bool,
    quiet: bool,
) -> Result<i32> {
    let kind = resolve_kind(&file, kind)?;
    let key = load_verifying_key(&config.public_key_path)?;
    let store = ProvenanceStore::open(&config.store_dir).with_context(|| {
        format!(
            "Failed to open provenance store: {}",
            config.store_dir.display()
        )
    })?;

    let report = verify_artifact(kind, &file, &key, &store);
    let status = report.status();

    match status {
        VerificationStatus::Verified => info!(path = %file.display(), "Verification successful"),
        VerificationStatus::Error | VerificationStatus::Unknown => {
            error!(path = %file.display(), failure = ?report.failure_type(), "Verification error")
        }
        _ => warn!(
            path = %file.display(),
            status = ?status,
            failure = ?report.failure_type(),
            "Verification failed"
        ),
    }

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else if !quiet {
        print_banner(status);
        match &report {
            VerificationReport::Image(r) => print_image(r),
            VerificationReport::Video(r) => print_video(r),
            VerificationReport::Pdf(r) => print_pdf(r),
        }
    }

    Ok(ExitCode::from_report(status, report.failure_type()))
}

fn print_banner(status: VerificationStatus) {
    let line = "════════════════════════════════════════";
    let title = format!("{:^40}", format!("{status:?}").to_uppercase());
    let paint = |s: &str| match status {
        VerificationStatus::Verified => s.green(),
        VerificationStatus::Tampered | VerificationStatus::Failed => s.red(),
        _ => s.yellow(),
    };

    println!();
    println!("{}", paint(&format!("╔{line}╗")));
    println!("{}", paint(&format!("║{title}║")).bold());
    println!("{}", paint(&format!("╚{line}╝")));
    println!();
    println!("   {} {}", "Status:".dimmed(), status_label(status));
}

fn print_failure(failure: Option<provenance_core::FailureType>, detail: Option<&str>) {
    if let Some(failure) = failure {
        println!("   {} {:?}", "Reason:".dimmed(), failure);
    }
    if let Some(detail) = detail {
        println!("   {} {}", "Detail:".dimmed(), detail.red());
    }
}

fn print_image(report: &ImageVerification) {
    print_failure(report.failure_type, report.detail.as_deref());
    if let Some(id) = &report.candidate_id {
        println!("   {} {}", "Record:".dimmed(), id);
    }
    if let Some(score) = report.score {
        println!("   {} {:.2}%", "Blocks matched:".dimmed(), score * 100.0);
    }
    println!(
        "   {} {}",
        "Candidates:".dimmed(),
        report.candidates_considered
    );
    if !report.mismatched_blocks.is_empty() {
        let blocks: Vec<String> = report.mismatched_blocks.iter().map(|b| b.to_string()).collect();
        println!("   {} {}", "Mismatched blocks:".dimmed(), blocks.join(", ").red());
    }
    if let Some(map) = &report.tamper_map {
        println!("   {} {}", "Tamper map:".dimmed(), map.display());
    }
    if let Some(signed_by) = &report.signed_by {
        println!("   {} {}", "Signature:".dimmed(), signed_by);
    }
}

fn print_video(report: &VideoVerification) {
    print_failure(report.failure_type, report.detail.as_deref());
    println!(
        "   {} {}/{}",
        "Frames checked:".dimmed(),
        report.total_frames_checked,
        report.total_expected_frames
    );
    if let Some(frame) = report.first_mismatched_frame {
        println!("   {} {}", "First mismatch:".dimmed(), frame.to_string().red());
    }
    if let Some(path) = &report.evidence_path {
        println!("   {} {}", "Evidence frame:".dimmed(), path.display());
    }
    println!("   {} {}", "Signature:".dimmed(), report.signed_by);
}

fn print_pdf(report: &PdfVerification) {
    print_failure(report.failure_type, report.detail.as_deref());
    if let Some(id) = &report.candidate_id {
        println!("   {} {}", "Record:".dimmed(), id);
    }
    if let Some(signed_by) = &report.signed_by {
        println!("   {} {}", "Signature:".dimmed(), signed_by);
    }
}
