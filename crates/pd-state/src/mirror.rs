//! Secondary snapshot copies
//!
//! The mirror is best-effort: the store logs a failed mirror write and
//! carries on, the local copy stays authoritative.

use std::path::PathBuf;

use crate::error::StoreError;
use crate::snapshot::SessionSnapshot;
use crate::store::write_atomic;

/// A durable blob destination addressed by name
pub trait BlobStore: Send + Sync {
    /// Human-readable destination, for logs
    fn label(&self) -> String;

    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Mirrors snapshots into a second directory, e.g. a synced network drive
#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    dir: PathBuf,
}

impl DirectoryMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BlobStore for DirectoryMirror {
    fn label(&self) -> String {
        self.dir.display().to_string()
    }

    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.dir.join(sanitize_filename(name)), bytes)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.dir.join(sanitize_filename(name));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Result of the best-effort secondary write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Disabled,
    Mirrored { name: String },
    Failed { reason: String },
}

/// Name the mirror copy so an operator can find it by event
pub fn mirror_name(snapshot: &SessionSnapshot) -> String {
    format!(
        "{}_{}.json",
        sanitize_filename(&snapshot.event_name),
        snapshot.session_id
    )
}

/// Sanitize filename for cross-platform compatibility.
/// Also strips directory separators and ".." so names cannot escape the target dir.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '-',
            _ => c,
        })
        .collect();

    let mut result = sanitized.replace("..", "");
    result = result.trim_matches(|c| c == '.' || c == '-').to_string();

    if result.is_empty() {
        result = "unnamed".to_string();
    }
    if result.len() > 200 {
        let mut cut = 200;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
    }
    result
}
