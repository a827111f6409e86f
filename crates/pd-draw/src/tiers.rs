//! Prize Tier Assigner: rank to prize lookup and prize summaries

use serde::{Deserialize, Serialize};

use pd_core::{PrizeTier, WinnerRecord};

/// Label given to a rank that no tier covers
pub const NO_PRIZE: &str = "Tidak Ada Hadiah";

/// Tier whose inclusive range contains `rank`
pub fn find_tier(rank: u32, tiers: &[PrizeTier]) -> Option<&PrizeTier> {
    tiers.iter().find(|t| t.contains(rank))
}

/// Prize name for a 1-based `rank`.
///
/// A rank outside every tier is a configuration problem; it is logged and
/// mapped to [`NO_PRIZE`] so a running draw is not aborted.
pub fn assign(rank: u32, tiers: &[PrizeTier]) -> &str {
    match find_tier(rank, tiers) {
        Some(tier) => &tier.name,
        None => {
            log::warn!("Rank {} is not covered by any prize tier", rank);
            NO_PRIZE
        }
    }
}

/// Winners per prize, one line of the prize summary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeCount {
    pub prize: String,
    pub winners: usize,
}

/// Count winners per prize, ordered by tier declaration; unknown labels last
pub fn prize_summary<'a, I>(winners: I, tiers: &[PrizeTier]) -> Vec<PrizeCount>
where
    I: IntoIterator<Item = &'a WinnerRecord>,
{
    let mut summary: Vec<PrizeCount> = Vec::new();
    for winner in winners {
        match summary.iter_mut().find(|c| c.prize == winner.prize) {
            Some(count) => count.winners += 1,
            None => summary.push(PrizeCount {
                prize: winner.prize.clone(),
                winners: 1,
            }),
        }
    }

    let order = |prize: &str| {
        tiers
            .iter()
            .position(|t| t.name == prize)
            .unwrap_or(usize::MAX)
    };
    // Stable sort keeps first-seen order among unknown labels
    summary.sort_by_key(|c| order(&c.prize));
    summary
}
