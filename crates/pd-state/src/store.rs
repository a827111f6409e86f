//! Snapshot Store
//!
//! Crash-safe persistence of the session snapshot:
//! - Temp file + fsync + rename for every write
//! - SHA-256 checksummed envelope, schema-versioned
//! - Numbered history copies with rotation
//! - Recovery from the newest valid copy on startup
//! - Best-effort mirror through [`BlobStore`]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::mirror::{BlobStore, DirectoryMirror, MirrorOutcome, mirror_name};
use crate::snapshot::{SNAPSHOT_SCHEMA, SessionSnapshot};

// ============ Store Config ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the primary snapshot and its history
    pub dir: PathBuf,
    /// Primary snapshot file name
    pub file_name: String,
    /// Number of history copies to keep
    pub history_limit: usize,
    /// Extra attempts after a failed local write
    pub retries: u32,
    /// Optional secondary copy location
    pub mirror_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            file_name: "session.json".to_string(),
            history_limit: 10,
            retries: 2,
            mirror_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("PrizeDraw")
}

// ============ Envelope ============

/// On-disk document. The checksum covers the canonical JSON of `snapshot`.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    schema: u32,
    checksum: String,
    snapshot: serde_json::Value,
}

fn checksum(value: &serde_json::Value) -> Result<String, StoreError> {
    let canonical = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Serialize a snapshot into its checksummed envelope
pub fn encode_snapshot(snapshot: &SessionSnapshot) -> Result<Vec<u8>, StoreError> {
    let value = serde_json::to_value(snapshot)?;
    let document = SnapshotDocument {
        schema: snapshot.schema,
        checksum: checksum(&value)?,
        snapshot: value,
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Parse and validate an envelope
pub fn decode_snapshot(bytes: &[u8]) -> Result<SessionSnapshot, StoreError> {
    let document: SnapshotDocument = serde_json::from_slice(bytes)?;
    if document.schema > SNAPSHOT_SCHEMA {
        return Err(StoreError::UnsupportedSchema(document.schema));
    }

    let actual = checksum(&document.snapshot)?;
    if actual != document.checksum {
        return Err(StoreError::ChecksumMismatch {
            expected: document.checksum,
            actual,
        });
    }

    let snapshot: SessionSnapshot = serde_json::from_value(document.snapshot)?;
    snapshot.verify().map_err(StoreError::Inconsistent)?;
    Ok(snapshot)
}

fn read_snapshot(path: &Path) -> Result<SessionSnapshot, StoreError> {
    decode_snapshot(&fs::read(path)?)
}

// ============ Atomic Write ============

/// Write `bytes` to `path` so that readers see either the old or the new file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = dir.join(tmp_name);

    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    sync_dir(dir);
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

// ============ Snapshot Store ============

/// Outcome of a successful local save
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub path: PathBuf,
    pub sequence: u64,
    pub mirror: MirrorOutcome,
}

/// Durable home of the session snapshot
pub struct SnapshotStore {
    config: StoreConfig,
    mirror: Option<Box<dyn BlobStore>>,
}

impl SnapshotStore {
    pub fn new(config: StoreConfig) -> Self {
        let mirror = config
            .mirror_dir
            .clone()
            .map(|dir| Box::new(DirectoryMirror::new(dir)) as Box<dyn BlobStore>);
        Self { config, mirror }
    }

    /// Replace the secondary destination
    pub fn with_mirror(mut self, mirror: Box<dyn BlobStore>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn primary_path(&self) -> PathBuf {
        self.config.dir.join(&self.config.file_name)
    }

    pub fn history_dir(&self) -> PathBuf {
        self.config.dir.join("history")
    }

    fn history_stem(&self) -> String {
        Path::new(&self.config.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string())
    }

    /// Whether any snapshot copy exists on disk
    pub fn exists(&self) -> bool {
        self.primary_path().exists() || !self.history_files().is_empty()
    }

    /// Durably write `snapshot`.
    ///
    /// Succeeds only once the primary copy is on disk. History and mirror
    /// copies are written afterwards and their failures are logged, not
    /// returned.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<SaveReport, StoreError> {
        let bytes = encode_snapshot(snapshot)?;
        let primary = self.primary_path();

        let attempts = self.config.retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match write_atomic(&primary, &bytes) {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    log::warn!(
                        "Snapshot write attempt {}/{} to {} failed: {}",
                        attempt,
                        attempts,
                        primary.display(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        if let Some(e) = last_error {
            return Err(StoreError::WriteFailed {
                attempts,
                last: e.to_string(),
            });
        }

        let history = self.history_dir().join(format!(
            "{}.{:08}.json",
            self.history_stem(),
            snapshot.sequence
        ));
        if let Err(e) = write_atomic(&history, &bytes) {
            log::warn!("Failed to write history copy {}: {}", history.display(), e);
        } else {
            self.rotate_history();
        }

        let mirror = self.write_mirror(snapshot, &bytes);

        log::info!(
            "Snapshot #{} saved to {}",
            snapshot.sequence,
            primary.display()
        );
        Ok(SaveReport {
            path: primary,
            sequence: snapshot.sequence,
            mirror,
        })
    }

    fn write_mirror(&self, snapshot: &SessionSnapshot, bytes: &[u8]) -> MirrorOutcome {
        let Some(mirror) = &self.mirror else {
            return MirrorOutcome::Disabled;
        };
        let name = mirror_name(snapshot);
        match mirror.put(&name, bytes) {
            Ok(()) => MirrorOutcome::Mirrored { name },
            Err(e) => {
                log::warn!("Mirror copy to {} failed: {}", mirror.label(), e);
                MirrorOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// History copies, newest first
    fn history_files(&self) -> Vec<PathBuf> {
        let prefix = format!("{}.", self.history_stem());
        let mut files: Vec<PathBuf> = fs::read_dir(self.history_dir())
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| {
                        let n = n.to_string_lossy();
                        n.starts_with(&prefix) && n.ends_with(".json")
                    })
                    .unwrap_or(false)
            })
            .collect();
        // Zero-padded sequence numbers sort lexicographically
        files.sort();
        files.reverse();
        files
    }

    fn rotate_history(&self) {
        for old in self.history_files().iter().skip(self.config.history_limit) {
            if let Err(e) = fs::remove_file(old) {
                log::warn!("Failed to remove old history copy {:?}: {}", old, e);
            }
        }
    }

    /// Load the newest valid snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet. When copies exist
    /// but none of them validates, returns [`StoreError::NoValidSnapshot`]
    /// rather than pretending the session never started.
    pub fn load_latest(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        let primary = self.primary_path();
        let mut found_any = false;

        if primary.exists() {
            found_any = true;
            match read_snapshot(&primary) {
                Ok(snapshot) => {
                    log::info!(
                        "Loaded snapshot #{} of session {}",
                        snapshot.sequence,
                        snapshot.session_id
                    );
                    return Ok(Some(snapshot));
                }
                Err(e) => log::warn!("Primary snapshot {} is invalid: {}", primary.display(), e),
            }
        }

        for path in self.history_files() {
            found_any = true;
            match read_snapshot(&path) {
                Ok(snapshot) => {
                    log::warn!(
                        "Recovered snapshot #{} from history copy {}",
                        snapshot.sequence,
                        path.display()
                    );
                    return Ok(Some(snapshot));
                }
                Err(e) => log::warn!("History copy {} is invalid: {}", path.display(), e),
            }
        }

        if found_any {
            Err(StoreError::NoValidSnapshot)
        } else {
            Ok(None)
        }
    }

    /// Delete the primary snapshot and all history copies
    pub fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        let primary = self.primary_path();
        if primary.exists() {
            fs::remove_file(&primary)?;
            removed += 1;
        }
        for path in self.history_files() {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }
}
