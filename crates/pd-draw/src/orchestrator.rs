//! Stage Orchestrator: the draw session state machine
//!
//! Runs Full-Pool → Batch → Single strictly in order. Every sub-round is one
//! transaction: sample, assign prizes, stage the pool change on a copy of
//! the snapshot, save it, and only then adopt it. A failed save leaves the
//! in-memory session exactly as it was before the round.

use std::collections::HashMap;

use chrono::Utc;
use rand::CryptoRng;
use serde::{Deserialize, Serialize};

use pd_core::{
    DrawError, DrawPlan, DrawResult, DrawRound, Participant, RoundPlan, ShortfallPolicy,
    StageKind, StageStatus, TicketNumber, WinnerRecord, initial_stages,
};
use pd_state::{MirrorOutcome, SessionSnapshot, SnapshotStore};

use crate::pool::DrawPool;
use crate::sampler::{DrawSampler, SystemRng};
use crate::tiers::{PrizeCount, assign, prize_summary};
use crate::validator::{ValidationReport, validate};

/// Round name recorded for the single full-pool pass
pub const FULL_POOL_ROUND: &str = "full-pool";

// ═══════════════════════════════════════════════════════════════════════════
// COMMANDS & OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════

/// Operator request for one batch or single sub-round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRequest {
    pub name: String,
    pub prize: String,
    pub count: usize,
}

impl RoundRequest {
    pub fn new(name: impl Into<String>, prize: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            prize: prize.into(),
            count,
        }
    }
}

impl From<&RoundPlan> for RoundRequest {
    fn from(plan: &RoundPlan) -> Self {
        Self::new(plan.name.clone(), plan.prize.clone(), plan.count)
    }
}

/// What [`StageOrchestrator::advance`] would do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    FullPool,
    Round {
        stage: StageKind,
        /// Position of the round in the stage's plan
        index: usize,
        request: RoundRequest,
    },
    /// Stage has no planned rounds left and is waiting to be closed
    Close(StageKind),
    Finished,
}

#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub stage: StageKind,
    pub round: DrawRound,
    pub stage_status: StageStatus,
    /// Pool size after the commit
    pub remaining: usize,
    pub mirror: MirrorOutcome,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Drew(RoundOutcome),
    Closed(StageKind),
    Finished,
}

/// One line of a stage's result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRow {
    pub stage: StageKind,
    /// 1-based position across the whole stage
    pub sequence: usize,
    pub round: String,
    pub rank: u32,
    pub ticket: TicketNumber,
    pub name: String,
    pub contact: String,
    pub prize: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Check the plan and roster and build the first snapshot of a new session.
/// Nothing is written.
pub fn prepare_session(
    event_name: &str,
    roster: Vec<Participant>,
    plan: DrawPlan,
) -> DrawResult<SessionSnapshot> {
    plan.validate()?;

    let mut tickets: Vec<&TicketNumber> = roster.iter().map(|p| &p.ticket).collect();
    tickets.sort();
    if let Some(pair) = tickets.windows(2).find(|w| w[0] == w[1]) {
        return Err(DrawError::Config(format!(
            "ticket {} appears more than once in the roster",
            pair[0]
        )));
    }

    let snapshot = SessionSnapshot::new(event_name, roster, plan);
    if snapshot.eligible.is_empty() {
        log::warn!("No eligible participants; every round will come up short");
    }
    Ok(snapshot)
}

pub struct StageOrchestrator<R: CryptoRng = SystemRng> {
    snapshot: SessionSnapshot,
    pool: DrawPool,
    store: SnapshotStore,
    sampler: DrawSampler<R>,
    halted: bool,
}

impl<R: CryptoRng> std::fmt::Debug for StageOrchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageOrchestrator")
            .field("snapshot", &self.snapshot)
            .field("pool", &self.pool)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl StageOrchestrator<SystemRng> {
    /// Start a new session with the OS random source
    pub fn start(
        event_name: &str,
        roster: Vec<Participant>,
        plan: DrawPlan,
        store: SnapshotStore,
    ) -> DrawResult<Self> {
        Self::start_with(event_name, roster, plan, store, DrawSampler::system())
    }

    /// Save a session built by [`prepare_session`] and run it
    /// with the OS random source
    pub fn begin(snapshot: SessionSnapshot, store: SnapshotStore) -> DrawResult<Self> {
        Self::begin_with(snapshot, store, DrawSampler::system())
    }

    /// Resume the session recorded in `store`, if any
    pub fn resume(store: SnapshotStore) -> DrawResult<Option<Self>> {
        Self::resume_with(store, DrawSampler::system())
    }

    /// Resume when a snapshot exists, otherwise start fresh.
    ///
    /// Returns `true` alongside the orchestrator when a session was resumed.
    pub fn open(
        event_name: &str,
        roster: Vec<Participant>,
        plan: DrawPlan,
        store: SnapshotStore,
    ) -> DrawResult<(Self, bool)> {
        match store.load_latest()? {
            Some(snapshot) => {
                if snapshot.plan != plan {
                    log::warn!("Configured plan differs from the saved session; using the saved plan");
                }
                Ok((
                    Self::from_snapshot(snapshot, store, DrawSampler::system()),
                    true,
                ))
            }
            None => Ok((Self::start(event_name, roster, plan, store)?, false)),
        }
    }
}

impl<R: CryptoRng> StageOrchestrator<R> {
    pub fn start_with(
        event_name: &str,
        roster: Vec<Participant>,
        plan: DrawPlan,
        store: SnapshotStore,
        sampler: DrawSampler<R>,
    ) -> DrawResult<Self> {
        let snapshot = prepare_session(event_name, roster, plan)?;
        Self::begin_with(snapshot, store, sampler)
    }

    /// Save the first snapshot of a prepared session and take it over
    pub fn begin_with(
        mut snapshot: SessionSnapshot,
        store: SnapshotStore,
        sampler: DrawSampler<R>,
    ) -> DrawResult<Self> {
        snapshot.touch();
        store.save(&snapshot)?;

        log::info!(
            "Session {} started: {} participants, {} eligible",
            snapshot.session_id,
            snapshot.roster.len(),
            snapshot.eligible.len()
        );
        Ok(Self::from_snapshot(snapshot, store, sampler))
    }

    pub fn resume_with(store: SnapshotStore, sampler: DrawSampler<R>) -> DrawResult<Option<Self>> {
        let Some(snapshot) = store.load_latest()? else {
            return Ok(None);
        };
        log::info!(
            "Resuming session {} at snapshot #{} ({} winners, {} in pool)",
            snapshot.session_id,
            snapshot.sequence,
            snapshot.total_winners(),
            snapshot.pool.len()
        );
        Ok(Some(Self::from_snapshot(snapshot, store, sampler)))
    }

    fn from_snapshot(snapshot: SessionSnapshot, store: SnapshotStore, sampler: DrawSampler<R>) -> Self {
        let pool = DrawPool::initialize(snapshot.pool.iter().cloned());
        Self {
            snapshot,
            pool,
            store,
            sampler,
            halted: false,
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn plan(&self) -> &DrawPlan {
        &self.snapshot.plan
    }

    pub fn status(&self, kind: StageKind) -> StageStatus {
        self.snapshot.stage(kind).status
    }

    pub fn remaining_pool(&self) -> Vec<TicketNumber> {
        self.pool.current_pool()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    // ───────────────────────────────────────────────────────────────────────
    // Guards
    // ───────────────────────────────────────────────────────────────────────

    fn ensure_running(&self) -> DrawResult<()> {
        if self.halted {
            return Err(DrawError::SessionHalted);
        }
        Ok(())
    }

    /// `kind` may take a new round: earlier stages complete, itself open
    fn ensure_open(&self, kind: StageKind) -> DrawResult<()> {
        self.ensure_running()?;
        if let Some(blocking) = StageKind::ALL
            .iter()
            .copied()
            .take_while(|k| *k < kind)
            .find(|k| !self.snapshot.stage(*k).is_complete())
        {
            return Err(DrawError::StageOrder {
                requested: kind,
                blocking,
            });
        }
        if self.snapshot.stage(kind).is_complete() {
            return Err(DrawError::StageClosed(kind));
        }
        Ok(())
    }

    fn halt(&mut self, err: &DrawError) {
        self.halted = true;
        log::error!("Session {} halted: {}", self.snapshot.session_id, err);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Draws
    // ───────────────────────────────────────────────────────────────────────

    /// Rank the whole pool in one pass and award the full-pool tiers
    pub fn draw_full_pool(&mut self) -> DrawResult<RoundOutcome> {
        self.ensure_open(StageKind::FullPool)?;

        let total = self.snapshot.plan.full_pool_total();
        let mut order = self.pool.current_pool();
        let available = order.len();
        let shortfall = available < total;
        if shortfall {
            if self.snapshot.plan.shortfall == ShortfallPolicy::Abort {
                return Err(DrawError::InsufficientPool {
                    requested: total,
                    available,
                });
            }
            log::warn!(
                "Full-pool draw wants {} winners but only {} are eligible; all of them win",
                total,
                available
            );
        }

        self.sampler.shuffle_permutation(&mut order);
        order.truncate(total);

        let tiers = &self.snapshot.plan.full_pool;
        let winners: Vec<WinnerRecord> = order
            .into_iter()
            .zip(1u32..)
            .map(|(ticket, rank)| WinnerRecord {
                prize: assign(rank, tiers).to_string(),
                ticket,
                rank,
            })
            .collect();

        let round = DrawRound {
            name: FULL_POOL_ROUND.to_string(),
            prize: None,
            planned: Some(0),
            requested: total,
            shortfall,
            winners,
            committed_at: Utc::now(),
        };
        self.commit_round(StageKind::FullPool, round)
    }

    pub fn draw_batch(&mut self, request: RoundRequest) -> DrawResult<RoundOutcome> {
        self.draw_round(StageKind::Batch, request)
    }

    pub fn draw_single(
        &mut self,
        name: impl Into<String>,
        prize: impl Into<String>,
    ) -> DrawResult<RoundOutcome> {
        self.draw_round(StageKind::Single, RoundRequest::new(name, prize, 1))
    }

    /// Draw one ad-hoc batch or single sub-round with an operator-supplied
    /// prize. Ad-hoc rounds never stand in for a planned round.
    pub fn draw_round(&mut self, kind: StageKind, request: RoundRequest) -> DrawResult<RoundOutcome> {
        if kind == StageKind::FullPool {
            return self.draw_full_pool();
        }
        self.draw_sub_round(kind, request, None)
    }

    fn draw_sub_round(
        &mut self,
        kind: StageKind,
        request: RoundRequest,
        planned: Option<usize>,
    ) -> DrawResult<RoundOutcome> {
        self.ensure_open(kind)?;

        if request.prize.trim().is_empty() {
            return Err(DrawError::Config(format!(
                "round '{}' needs a prize label",
                request.name
            )));
        }
        if request.count == 0 {
            return Err(DrawError::Config(format!(
                "round '{}' must draw at least one winner",
                request.name
            )));
        }
        if kind == StageKind::Single && request.count != 1 {
            return Err(DrawError::Config(format!(
                "single round '{}' draws exactly one winner",
                request.name
            )));
        }

        let pool = self.pool.current_pool();
        let (picked, shortfall) = match self.sampler.sample_without_replacement(&pool, request.count)
        {
            Ok(picked) => (picked, false),
            Err(DrawError::InsufficientPool { requested, available })
                if self.snapshot.plan.shortfall == ShortfallPolicy::DrawRemaining =>
            {
                log::warn!(
                    "Round '{}' requested {} winners, only {} remain; drawing the rest of the pool",
                    request.name,
                    requested,
                    available
                );
                (self.sampler.sample_without_replacement(&pool, available)?, true)
            }
            Err(e) => return Err(e),
        };

        let winners: Vec<WinnerRecord> = picked
            .into_iter()
            .zip(1u32..)
            .map(|(ticket, rank)| WinnerRecord {
                ticket,
                prize: request.prize.clone(),
                rank,
            })
            .collect();

        let round = DrawRound {
            name: request.name,
            prize: Some(request.prize),
            planned,
            requested: request.count,
            shortfall,
            winners,
            committed_at: Utc::now(),
        };
        self.commit_round(kind, round)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Transaction boundary
    // ───────────────────────────────────────────────────────────────────────

    fn commit_round(&mut self, kind: StageKind, round: DrawRound) -> DrawResult<RoundOutcome> {
        let tickets: Vec<TicketNumber> = round.winners.iter().map(|w| w.ticket.clone()).collect();

        let mut pool = self.pool.clone();
        if let Err(e) = pool.commit_winners(&tickets) {
            self.halt(&e);
            return Err(e);
        }

        let mut next = self.snapshot.clone();
        next.pool = pool.current_pool();
        let planned = next.plan.planned_rounds(kind);
        let stage = next.stage_mut(kind);
        stage.rounds.push(round.clone());
        stage.status = if planned > 0 && stage.next_planned(planned).is_none() {
            StageStatus::Complete
        } else {
            StageStatus::InProgress
        };
        let stage_status = stage.status;

        let mirror = self.persist(next)?;
        self.pool = pool;

        log::info!(
            "Committed {} round '{}': {} winners{}, {} remain",
            kind,
            round.name,
            round.drawn(),
            if round.shortfall { " (short)" } else { "" },
            self.pool.len()
        );

        Ok(RoundOutcome {
            stage: kind,
            round,
            stage_status,
            remaining: self.pool.len(),
            mirror,
        })
    }

    /// Save `next` and adopt it. On failure the current snapshot is kept.
    fn persist(&mut self, mut next: SessionSnapshot) -> DrawResult<MirrorOutcome> {
        next.touch();
        let report = self.store.save(&next)?;
        self.snapshot = next;
        Ok(report.mirror)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Stage control
    // ───────────────────────────────────────────────────────────────────────

    /// Mark `kind` complete, ending any remaining planned rounds early
    pub fn close_stage(&mut self, kind: StageKind) -> DrawResult<()> {
        self.ensure_open(kind)?;

        let mut next = self.snapshot.clone();
        next.stage_mut(kind).status = StageStatus::Complete;
        self.persist(next)?;

        log::info!("Stage {} closed", kind);
        Ok(())
    }

    /// Next action implied by the plan and the recorded progress
    pub fn next_step(&self) -> PlannedStep {
        for kind in StageKind::ALL {
            let stage = self.snapshot.stage(kind);
            if stage.is_complete() {
                continue;
            }
            if kind == StageKind::FullPool {
                return PlannedStep::FullPool;
            }
            let plan = self.snapshot.plan.rounds(kind);
            return match stage.next_planned(plan.len()) {
                Some(index) => PlannedStep::Round {
                    stage: kind,
                    index,
                    request: (&plan[index]).into(),
                },
                None => PlannedStep::Close(kind),
            };
        }
        PlannedStep::Finished
    }

    /// Run the next planned step
    pub fn advance(&mut self) -> DrawResult<StepOutcome> {
        self.ensure_running()?;
        match self.next_step() {
            PlannedStep::FullPool => self.draw_full_pool().map(StepOutcome::Drew),
            PlannedStep::Round {
                stage,
                index,
                request,
            } => self
                .draw_sub_round(stage, request, Some(index))
                .map(StepOutcome::Drew),
            PlannedStep::Close(stage) => {
                self.close_stage(stage)?;
                Ok(StepOutcome::Closed(stage))
            }
            PlannedStep::Finished => Ok(StepOutcome::Finished),
        }
    }

    /// Swap the plan. Only allowed before anything has been drawn.
    pub fn replace_plan(&mut self, plan: DrawPlan) -> DrawResult<()> {
        self.ensure_running()?;
        plan.validate()?;
        if let Some(stage) = self
            .snapshot
            .stages
            .iter()
            .find(|s| s.status != StageStatus::Pending)
        {
            return Err(DrawError::Config(format!(
                "plan cannot change once stage {} has started",
                stage.kind
            )));
        }

        let mut next = self.snapshot.clone();
        next.plan = plan;
        self.persist(next)?;
        Ok(())
    }

    /// Operator full reset: discard every result and refill the pool
    pub fn reset(&mut self) -> DrawResult<()> {
        let discarded = self.snapshot.total_winners();

        let mut next = self.snapshot.clone();
        next.stages = initial_stages();
        next.pool = next.eligible.clone();
        self.persist(next)?;

        self.pool = DrawPool::initialize(self.snapshot.eligible.iter().cloned());
        self.halted = false;
        log::warn!(
            "Session {} reset by operator: {} winners discarded",
            self.snapshot.session_id,
            discarded
        );
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Outputs
    // ───────────────────────────────────────────────────────────────────────

    /// Ordered winner list of one stage, joined with roster details
    pub fn results(&self, kind: StageKind) -> Vec<WinnerRow> {
        let directory: HashMap<&TicketNumber, &Participant> = self
            .snapshot
            .roster
            .iter()
            .map(|p| (&p.ticket, p))
            .collect();

        self.snapshot
            .stage(kind)
            .winners()
            .enumerate()
            .map(|(i, (round, winner))| {
                let person = directory.get(&winner.ticket);
                WinnerRow {
                    stage: kind,
                    sequence: i + 1,
                    round: round.name.clone(),
                    rank: winner.rank,
                    ticket: winner.ticket.clone(),
                    name: person.map(|p| p.name.clone()).unwrap_or_default(),
                    contact: person.map(|p| p.contact.clone()).unwrap_or_default(),
                    prize: winner.prize.clone(),
                }
            })
            .collect()
    }

    /// Winners per full-pool tier
    pub fn prize_summary(&self) -> Vec<PrizeCount> {
        let stage = self.snapshot.stage(StageKind::FullPool);
        prize_summary(
            stage.winners().map(|(_, w)| w),
            &self.snapshot.plan.full_pool,
        )
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.snapshot.stages)
    }
}
