//! Directory-backed, append-only provenance store.
//!
//! Layout under the store root:
//!
//! | file                              | contents                              |
//! |-----------------------------------|---------------------------------------|
//! | `hashes_<id>.json`                | canonical record bytes                |
//! | `sig_<id>.bin`                    | raw signature over those bytes        |
//! | `image_hashes.json`               | legacy image record (id `legacy`)     |
//! | `image_sig.bin`                   | legacy image signature                |
//! | `video_chain.bin`                 | 32-byte digests in frame order        |
//! | `video_sig.bin`                   | signature over the terminal digest    |
//! | `video_verification_report.json`  | last video verification report        |
//! | `tamper_map_<id>.png`             | tamper map against record `<id>`      |
//! | `tamper_report_<id>.json`         | image report that produced the map    |
//!
//! Every file is written to a temporary name and renamed into place, and a
//! record's signature lands before the record itself. A reader therefore never
//! sees a half-written file, and a record without a signature is simply not a
//! candidate.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};
use crate::record::{canonical_json, ProvenanceRecord, RecordKind};
use crate::video::VideoChain;

const RECORD_PREFIX: &str = "hashes_";
const RECORD_SUFFIX: &str = ".json";
const SIGNATURE_PREFIX: &str = "sig_";
const SIGNATURE_SUFFIX: &str = ".bin";

pub const LEGACY_RECORD_FILE: &str = "image_hashes.json";
pub const LEGACY_SIGNATURE_FILE: &str = "image_sig.bin";
pub const LEGACY_ID: &str = "legacy";

pub const VIDEO_CHAIN_FILE: &str = "video_chain.bin";
pub const VIDEO_SIGNATURE_FILE: &str = "video_sig.bin";
pub const VIDEO_REPORT_FILE: &str = "video_verification_report.json";

/// A record/signature pair found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Id taken from the file name (`legacy` for the legacy pair).
    pub id: String,
    pub record: ProvenanceRecord,
    /// Canonical re-encoding of the stored record; the signed message.
    pub canonical: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Why a discovered record is not a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSkip {
    MissingSignature { id: String },
    Unreadable { id: String, reason: String },
    Malformed { id: String, reason: String },
    OtherKind { id: String, kind: RecordKind },
}

/// Outcome of loading one discovered record.
pub type CandidateEntry = std::result::Result<Candidate, CandidateSkip>;

/// A record that has been signed and written.
#[derive(Debug, Clone)]
pub struct SignedRecord {
    pub record: ProvenanceRecord,
    pub record_path: PathBuf,
    pub signature_path: PathBuf,
}

impl SignedRecord {
    pub fn id(&self) -> &str {
        self.record.id()
    }
}

#[derive(Debug, Clone)]
pub struct ProvenanceStore {
    root: PathBuf,
}

impl ProvenanceStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ProvenanceError::Store {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{RECORD_PREFIX}{id}{RECORD_SUFFIX}"))
    }

    pub fn signature_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{SIGNATURE_PREFIX}{id}{SIGNATURE_SUFFIX}"))
    }

    /// Path for a derived artifact (tamper map, evidence frame, report).
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Persist a record's canonical bytes and its signature under the record id.
    ///
    /// Returns the record path.
    pub fn write_record(&self, record: &ProvenanceRecord, signature: &[u8]) -> Result<PathBuf> {
        let id = record.id();
        validate_id(id)?;

        let canonical = record.canonical_bytes()?;
        let record_path = self.record_path(id);

        self.write_atomic(&self.signature_path(id), signature)?;
        self.write_atomic(&record_path, &canonical)?;

        info!(id = %id, kind = ?record.kind(), path = %record_path.display(), "Record written");
        Ok(record_path)
    }

    /// Load every record in the store, reporting per-record skips explicitly.
    ///
    /// Entries are ordered by id, with the legacy image pair (if present and
    /// `kind` is image) last. Only a failure to list the directory is an error.
    pub fn scan(&self, kind: RecordKind) -> Result<Vec<CandidateEntry>> {
        let listing = fs::read_dir(&self.root).map_err(|source| ProvenanceError::Store {
            path: self.root.clone(),
            source,
        })?;

        let mut ids: Vec<String> = listing
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(RECORD_PREFIX)
                    .and_then(|rest| rest.strip_suffix(RECORD_SUFFIX))
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned)
            })
            .collect();
        ids.sort();

        let mut entries: Vec<CandidateEntry> = ids
            .into_iter()
            .map(|id| {
                let record_path = self.record_path(&id);
                let signature_path = self.signature_path(&id);
                load_candidate(id, &record_path, &signature_path, kind)
            })
            .collect();

        if kind == RecordKind::Image {
            let legacy_record = self.root.join(LEGACY_RECORD_FILE);
            if legacy_record.is_file() {
                let legacy_signature = self.root.join(LEGACY_SIGNATURE_FILE);
                entries.push(load_candidate(
                    LEGACY_ID.to_string(),
                    &legacy_record,
                    &legacy_signature,
                    kind,
                ));
            }
        }

        Ok(entries)
    }

    /// Candidates of `kind`, with every skipped entry logged and dropped.
    pub fn discover_candidates(&self, kind: RecordKind) -> Result<Vec<Candidate>> {
        let candidates = self
            .scan(kind)?
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(candidate) => Some(candidate),
                Err(skip) => {
                    debug!(?skip, "Skipping provenance entry");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(kind = ?kind, count = candidates.len(), "Discovered candidates");
        Ok(candidates)
    }

    /// Persist a video hash chain and the signature over its terminal digest.
    pub fn write_video_chain(&self, chain: &VideoChain, signature: &[u8]) -> Result<()> {
        self.write_atomic(&self.root.join(VIDEO_SIGNATURE_FILE), signature)?;
        self.write_atomic(&self.root.join(VIDEO_CHAIN_FILE), &chain.to_bytes())?;
        info!(frames = chain.len(), "Video chain written");
        Ok(())
    }

    /// Stored video chain and signature, or `None` if either file is absent.
    pub fn load_video_chain(&self) -> Result<Option<(VideoChain, Vec<u8>)>> {
        let Some(chain_bytes) = self.read_optional(&self.root.join(VIDEO_CHAIN_FILE))? else {
            return Ok(None);
        };
        let Some(signature) = self.read_optional(&self.root.join(VIDEO_SIGNATURE_FILE))? else {
            return Ok(None);
        };
        Ok(Some((VideoChain::from_bytes(&chain_bytes)?, signature)))
    }

    /// Write `value` as pretty JSON to `name` inside the store.
    pub fn write_report<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        let json = serde_json::to_vec_pretty(value)?;
        self.write_atomic(&path, &json)?;
        Ok(path)
    }

    /// Encode `image` as PNG under `name` inside the store.
    pub fn write_png(&self, name: &str, image: &RgbImage) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        self.write_atomic(&path, png.get_ref())?;
        Ok(path)
    }

    /// Write `bytes` to a temporary sibling and rename it over `path`.
    pub(crate) fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        // Concurrent writers of one name never share a temp file.
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

        let store_err = |source: io::Error| ProvenanceError::Store {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, bytes).map_err(store_err)?;
        fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            store_err(source)
        })
    }

    fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProvenanceError::Store {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ProvenanceError::InvalidRecord(format!(
            "record id {:?} is not a non-empty alphanumeric token",
            id
        )));
    }
    Ok(())
}

fn load_candidate(
    id: String,
    record_path: &Path,
    signature_path: &Path,
    kind: RecordKind,
) -> CandidateEntry {
    if !signature_path.is_file() {
        return Err(CandidateSkip::MissingSignature { id });
    }

    let raw = match fs::read(record_path) {
        Ok(raw) => raw,
        Err(e) => {
            return Err(CandidateSkip::Unreadable {
                id,
                reason: e.to_string(),
            })
        }
    };
    let signature = match fs::read(signature_path) {
        Ok(signature) => signature,
        Err(e) => {
            return Err(CandidateSkip::Unreadable {
                id,
                reason: e.to_string(),
            })
        }
    };

    let parsed = serde_json::from_slice::<Value>(&raw)
        .map_err(ProvenanceError::from)
        .and_then(|value| {
            let canonical = canonical_json(&value)?;
            let record = serde_json::from_value::<ProvenanceRecord>(value)?;
            Ok((record, canonical))
        });
    let (record, canonical) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            return Err(CandidateSkip::Malformed {
                id,
                reason: e.to_string(),
            })
        }
    };

    if record.kind() != kind {
        return Err(CandidateSkip::OtherKind {
            id,
            kind: record.kind(),
        });
    }

    Ok(Candidate {
        id,
        record,
        canonical,
        signature,
    })
}
