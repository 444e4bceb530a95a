use std::path::PathBuf;

use thiserror::Error;

use crate::report::FailureType;

#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error("Key load failed for {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },

    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("Job failed: {0}")]
    Job(String),

    #[error("Invalid grid {rows}x{cols}: rows and cols must be at least 1")]
    InvalidGrid { rows: u32, cols: u32 },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid hash chain: {0}")]
    InvalidChain(String),

    #[error("Unknown artifact kind '{0}': expected image, video or pdf")]
    UnknownArtifactKind(String),

    #[error("Artifact read failed for {path}: {reason}")]
    ArtifactRead { path: PathBuf, reason: String },

    #[error("Provenance store error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvenanceError {
    /// Failure classification used when this error is turned into an `ERROR` report.
    pub fn failure_type(&self) -> FailureType {
        match self {
            ProvenanceError::KeyLoad { .. } | ProvenanceError::UnsupportedKey(_) => {
                FailureType::KeyLoadFailed
            }
            ProvenanceError::Store { .. } => FailureType::ProvenanceScanFailed,
            ProvenanceError::ArtifactRead { .. } | ProvenanceError::Image(_) => {
                FailureType::ArtifactReadFailed
            }
            _ => FailureType::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvenanceError>;
