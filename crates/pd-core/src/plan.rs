//! Draw plan: the active tier and round configuration of a session

use serde::{Deserialize, Serialize};

use crate::error::{DrawError, DrawResult};
use crate::prize::{PrizeTier, TierSpec, resolve_tiers, total_ranks};
use crate::stage::StageKind;

/// What to do when a round asks for more winners than the pool holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortfallPolicy {
    /// Reduce the request to the pool size and flag the shortfall
    #[default]
    DrawRemaining,
    /// Fail the round with `InsufficientPool`
    Abort,
}

/// One planned batch or single sub-round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub name: String,
    pub prize: String,
    #[serde(default = "default_round_count")]
    pub count: usize,
}

fn default_round_count() -> usize {
    1
}

impl RoundPlan {
    pub fn new(name: impl Into<String>, prize: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            prize: prize.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPlan {
    /// Full-pool tiers, contiguous from rank 1
    pub full_pool: Vec<PrizeTier>,
    #[serde(default)]
    pub batch: Vec<RoundPlan>,
    #[serde(default)]
    pub single: Vec<RoundPlan>,
    #[serde(default)]
    pub shortfall: ShortfallPolicy,
}

impl DrawPlan {
    pub fn new(full_pool: Vec<PrizeTier>) -> Self {
        Self {
            full_pool,
            batch: Vec::new(),
            single: Vec::new(),
            shortfall: ShortfallPolicy::default(),
        }
    }

    /// Build a plan from configured tier specs and round lists
    pub fn from_specs(
        tiers: &[TierSpec],
        batch: Vec<RoundPlan>,
        single: Vec<RoundPlan>,
    ) -> DrawResult<Self> {
        let plan = Self {
            full_pool: resolve_tiers(tiers)?,
            batch,
            single,
            shortfall: ShortfallPolicy::default(),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn with_shortfall(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall = policy;
        self
    }

    /// Winners the full-pool stage is configured to produce
    pub fn full_pool_total(&self) -> usize {
        total_ranks(&self.full_pool) as usize
    }

    pub fn rounds(&self, kind: StageKind) -> &[RoundPlan] {
        match kind {
            StageKind::FullPool => &[],
            StageKind::Batch => &self.batch,
            StageKind::Single => &self.single,
        }
    }

    /// Plan entries `kind` must fulfil before it is complete
    pub fn planned_rounds(&self, kind: StageKind) -> usize {
        match kind {
            StageKind::FullPool => 1,
            other => self.rounds(other).len(),
        }
    }

    pub fn validate(&self) -> DrawResult<()> {
        let mut expected = Some(1);
        for tier in &self.full_pool {
            let Some(rank) = expected else {
                return Err(DrawError::Config(format!(
                    "tier '{}' follows the last possible rank",
                    tier.name
                )));
            };
            if tier.start != rank || tier.end < tier.start {
                return Err(DrawError::Config(format!(
                    "tier '{}' does not continue the rank range at {}",
                    tier.name, rank
                )));
            }
            expected = tier.end.checked_add(1);
        }
        for round in self.batch.iter().chain(&self.single) {
            if round.prize.trim().is_empty() {
                return Err(DrawError::Config(format!(
                    "round '{}' has no prize label",
                    round.name
                )));
            }
            if round.count == 0 {
                return Err(DrawError::Config(format!(
                    "round '{}' draws zero winners",
                    round.name
                )));
            }
        }
        if let Some(round) = self.single.iter().find(|r| r.count != 1) {
            return Err(DrawError::Config(format!(
                "single round '{}' must draw exactly one winner",
                round.name
            )));
        }
        Ok(())
    }
}
