//! Session Snapshot
//!
//! The complete durable record of a draw session: roster, eligible set,
//! live pool, stage statuses with every committed round, and the active
//! plan. The orchestrator owns exactly one of these and replaces it only
//! after a successful save.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pd_core::{
    DrawPlan, DrawRound, DrawStage, Participant, StageKind, TicketNumber, initial_stages,
};

// ============ Constants ============

/// Current snapshot schema
pub const SNAPSHOT_SCHEMA: u32 = 1;

// ============ Snapshot ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub schema: u32,
    pub session_id: String,
    pub event_name: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// Incremented on every durable write
    pub sequence: u64,
    pub roster: Vec<Participant>,
    /// Tickets that passed the eligibility filter, sorted
    pub eligible: Vec<TicketNumber>,
    /// Eligible tickets that have not won yet, sorted
    pub pool: Vec<TicketNumber>,
    pub stages: Vec<DrawStage>,
    pub plan: DrawPlan,
}

impl SessionSnapshot {
    /// Start a new session over `roster`
    pub fn new(event_name: impl Into<String>, roster: Vec<Participant>, plan: DrawPlan) -> Self {
        let now = Utc::now();
        let eligible: Vec<TicketNumber> = roster
            .iter()
            .filter(|p| p.eligible)
            .map(|p| p.ticket.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            schema: SNAPSHOT_SCHEMA,
            session_id: uuid::Uuid::new_v4().to_string(),
            event_name: event_name.into(),
            created_at: now,
            saved_at: now,
            sequence: 0,
            roster,
            pool: eligible.clone(),
            eligible,
            stages: initial_stages(),
            plan,
        }
    }

    pub fn stage(&self, kind: StageKind) -> &DrawStage {
        &self.stages[kind.index()]
    }

    pub fn stage_mut(&mut self, kind: StageKind) -> &mut DrawStage {
        &mut self.stages[kind.index()]
    }

    /// Every committed round, tagged with its stage, in commit order per stage
    pub fn rounds(&self) -> impl Iterator<Item = (StageKind, &DrawRound)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.rounds.iter().map(move |r| (stage.kind, r)))
    }

    pub fn total_winners(&self) -> usize {
        self.stages.iter().map(DrawStage::winner_count).sum()
    }

    /// Stamp the snapshot for its next durable write
    pub fn touch(&mut self) {
        self.sequence += 1;
        self.saved_at = Utc::now();
    }

    /// Check `pool == eligible - winners`.
    ///
    /// A snapshot that fails this was not produced by a clean commit and
    /// must not be resumed from.
    pub fn verify(&self) -> Result<(), String> {
        let eligible: BTreeSet<&TicketNumber> = self.eligible.iter().collect();
        let winners: BTreeSet<&TicketNumber> = self
            .rounds()
            .flat_map(|(_, round)| round.winners.iter().map(|w| &w.ticket))
            .collect();

        let expected: BTreeSet<&TicketNumber> = eligible.difference(&winners).copied().collect();
        let pool: BTreeSet<&TicketNumber> = self.pool.iter().collect();

        if pool.len() != self.pool.len() {
            return Err("pool contains repeated tickets".to_string());
        }
        if let Some(stray) = winners.iter().find(|t| !eligible.contains(*t)) {
            return Err(format!("winner {} is not an eligible ticket", stray));
        }
        if pool != expected {
            return Err(format!(
                "pool holds {} tickets, eligible minus winners is {}",
                pool.len(),
                expected.len()
            ));
        }
        if self.stages.len() != StageKind::ALL.len()
            || self
                .stages
                .iter()
                .zip(StageKind::ALL)
                .any(|(stage, kind)| stage.kind != kind)
        {
            return Err("stage list is out of order".to_string());
        }
        Ok(())
    }
}
