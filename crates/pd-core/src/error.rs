//! Error types for PrizeDraw

use thiserror::Error;

use crate::stage::StageKind;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// Requested draw size exceeds the remaining pool. Recoverable.
    #[error("Insufficient pool: requested {requested}, only {available} remaining")]
    InsufficientPool { requested: usize, available: usize },

    /// Roster is missing a required identifying field.
    #[error("Malformed roster: missing field '{missing}' (found: {})", found.join(", "))]
    MalformedRoster { missing: String, found: Vec<String> },

    /// Committed ticket is not in the pool. Implies corrupted state.
    #[error("Pool consistency violated: ticket {0} is not drawable")]
    PoolConsistency(String),

    /// Durable write failed; the round was not committed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Stage {requested} cannot start while {blocking} is incomplete")]
    StageOrder {
        requested: StageKind,
        blocking: StageKind,
    },

    #[error("Stage {0} is already complete")]
    StageClosed(StageKind),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Set after a fatal consistency error; only a reset clears it.
    #[error("Session halted after a consistency error; reset required")]
    SessionHalted,
}

impl DrawError {
    /// Whether the session must stop and wait for the operator
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolConsistency(_) | Self::SessionHalted)
    }
}

/// Result type alias
pub type DrawResult<T> = Result<T, DrawError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_roster_lists_found_fields() {
        let err = DrawError::MalformedRoster {
            missing: "Nomor Undian".into(),
            found: vec!["Nama".into(), "No HP".into()],
        };
        assert_eq!(
            err.to_string(),
            "Malformed roster: missing field 'Nomor Undian' (found: Nama, No HP)"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DrawError::PoolConsistency("001".into()).is_fatal());
        assert!(DrawError::SessionHalted.is_fatal());
        assert!(
            !DrawError::InsufficientPool {
                requested: 5,
                available: 2
            }
            .is_fatal()
        );
    }
}
