//! Provenance records and their canonical serialization.
//!
//! Two record shapes exist on disk:
//!
//! - image: `{"grid": [rows, cols], "hashes": [hex, ...], "id": "<8 hex>"}`
//! - pdf:   `{"hash": hex, "id": "<8 hex>", "type": "pdf"}`
//!
//! The canonical encoding is what gets signed. Keys are sorted at every
//! nesting level, items are separated by `", "`, keys from values by `": "`,
//! and every character outside printable ASCII is written as a `\uXXXX`
//! escape. Any change to this layout invalidates every signature already in a
//! store.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::ser::Formatter;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};
use crate::hashing::Digest32;
use crate::partition::GridSpec;

/// Length of a record id in hex characters.
pub const RECORD_ID_LEN: usize = 8;

/// Artifact kind a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Image,
    Pdf,
}

/// Block-hash record for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Legacy records may omit the id.
    #[serde(default)]
    pub id: String,
    pub grid: GridSpec,
    /// Lowercase hex digests, one per block, row-major.
    pub hashes: Vec<String>,
}

impl ImageRecord {
    /// `hashes.len() == rows * cols` and the grid has no zero dimension.
    pub fn is_well_formed(&self) -> bool {
        self.grid.validate().is_ok() && self.hashes.len() == self.grid.block_count()
    }
}

/// Marker serialized as `"type": "pdf"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfMarker {
    #[serde(rename = "pdf")]
    Pdf,
}

/// Whole-document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub marker: PdfMarker,
    /// Lowercase hex digest of the full file.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProvenanceRecord {
    Pdf(PdfRecord),
    Image(ImageRecord),
}

impl ProvenanceRecord {
    pub fn id(&self) -> &str {
        match self {
            ProvenanceRecord::Pdf(record) => &record.id,
            ProvenanceRecord::Image(record) => &record.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            ProvenanceRecord::Pdf(_) => RecordKind::Pdf,
            ProvenanceRecord::Image(_) => RecordKind::Image,
        }
    }

    /// Canonical bytes of this record; see [`canonical_json`].
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_json(&serde_json::to_value(self)?)
    }
}

/// Fresh random record id of [`RECORD_ID_LEN`] lowercase hex characters.
pub fn new_record_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RECORD_ID_LEN);
    id
}

/// Build an image record from row-major block digests.
pub fn build_image_record(block_hashes: &[Digest32], grid: GridSpec) -> Result<ProvenanceRecord> {
    grid.validate()?;
    if block_hashes.len() != grid.block_count() {
        return Err(ProvenanceError::InvalidRecord(format!(
            "{} block hashes for a {}x{} grid",
            block_hashes.len(),
            grid.rows,
            grid.cols
        )));
    }

    Ok(ProvenanceRecord::Image(ImageRecord {
        id: new_record_id(),
        grid,
        hashes: block_hashes.iter().map(hex::encode).collect(),
    }))
}

/// Build a whole-document record.
pub fn build_pdf_record(file_hash: &Digest32) -> ProvenanceRecord {
    ProvenanceRecord::Pdf(PdfRecord {
        id: new_record_id(),
        marker: PdfMarker::Pdf,
        hash: hex::encode(file_hash),
    })
}

/// Canonical encoding of an arbitrary JSON value.
///
/// Stored records are parsed into a [`Value`] and re-encoded through this
/// function, so fields the typed structs do not know about still take part in
/// signature verification.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    SortedValue(value).serialize(&mut serializer)?;
    Ok(out)
}

/// Serializes a value with object keys in sorted order, whatever map type
/// `serde_json` was compiled with.
struct SortedValue<'a>(&'a Value);

impl Serialize for SortedValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&SortedValue(item))?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let sorted: BTreeMap<&String, &Value> = map.iter().collect();
                let mut out = serializer.serialize_map(Some(sorted.len()))?;
                for (key, value) in sorted {
                    out.serialize_entry(key, &SortedValue(value))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
