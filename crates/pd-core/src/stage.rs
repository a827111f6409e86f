//! Draw stages, rounds and committed winners

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::TicketNumber;

/// The three sequential draw stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    FullPool,
    Batch,
    Single,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::FullPool, StageKind::Batch, StageKind::Single];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullPool => "full-pool",
            Self::Batch => "batch",
            Self::Single => "single",
        }
    }

    /// Stage that must be complete before this one may start
    pub fn predecessor(self) -> Option<StageKind> {
        match self {
            Self::FullPool => None,
            Self::Batch => Some(Self::FullPool),
            Self::Single => Some(Self::Batch),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::FullPool => 0,
            Self::Batch => 1,
            Self::Single => 2,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full-pool" | "full_pool" | "fullpool" | "full" => Ok(Self::FullPool),
            "batch" => Ok(Self::Batch),
            "single" => Ok(Self::Single),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        })
    }
}

/// One committed `(ticket, prize, rank)` tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub ticket: TicketNumber,
    pub prize: String,
    /// 1-based position within the stage (full-pool) or round (batch/single)
    pub rank: u32,
}

/// A committed sub-round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRound {
    pub name: String,
    /// Operator-supplied label; `None` for the rank-tiered full-pool round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    /// Index of the plan entry this round fulfils; `None` for ad-hoc rounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned: Option<usize>,
    pub requested: usize,
    /// The pool was smaller than the request and the draw was reduced
    pub shortfall: bool,
    pub winners: Vec<WinnerRecord>,
    pub committed_at: DateTime<Utc>,
}

impl DrawRound {
    pub fn drawn(&self) -> usize {
        self.winners.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawStage {
    pub kind: StageKind,
    pub status: StageStatus,
    #[serde(default)]
    pub rounds: Vec<DrawRound>,
}

impl DrawStage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            status: StageStatus::Pending,
            rounds: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == StageStatus::Complete
    }

    pub fn winners(&self) -> impl Iterator<Item = (&DrawRound, &WinnerRecord)> {
        self.rounds
            .iter()
            .flat_map(|round| round.winners.iter().map(move |w| (round, w)))
    }

    pub fn winner_count(&self) -> usize {
        self.rounds.iter().map(DrawRound::drawn).sum()
    }

    /// Whether plan entry `index` already has a committed round
    pub fn fulfils(&self, index: usize) -> bool {
        self.rounds.iter().any(|r| r.planned == Some(index))
    }

    /// First of `planned` plan entries without a committed round
    pub fn next_planned(&self, planned: usize) -> Option<usize> {
        (0..planned).find(|i| !self.fulfils(*i))
    }
}

/// Fresh, all-pending stage list in execution order
pub fn initial_stages() -> Vec<DrawStage> {
    StageKind::ALL.iter().copied().map(DrawStage::new).collect()
}
