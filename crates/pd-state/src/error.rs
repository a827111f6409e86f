//! Store errors

use pd_core::DrawError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Snapshot schema {0} is newer than this build supports")]
    UnsupportedSchema(u32),

    #[error("Snapshot is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Write failed after {attempts} attempts: {last}")]
    WriteFailed { attempts: u32, last: String },

    #[error("Snapshot exists but no readable copy was found")]
    NoValidSnapshot,
}

impl From<StoreError> for DrawError {
    fn from(err: StoreError) -> Self {
        DrawError::Persistence(err.to_string())
    }
}
