//! Prize Tiers: rank ranges and their configuration form

use serde::{Deserialize, Serialize};

use crate::error::{DrawError, DrawResult};

/// Configured tier, as written in the event file.
///
/// Either a plain count (`{ name, count }`) whose range follows the previous
/// tier, or an explicit inclusive range (`{ name, start, end }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierSpec {
    Range {
        name: String,
        start: u32,
        end: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    Count {
        name: String,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
}

impl TierSpec {
    pub fn count(name: impl Into<String>, count: u32) -> Self {
        Self::Count {
            name: name.into(),
            count,
            icon: None,
        }
    }

    pub fn range(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self::Range {
            name: name.into(),
            start,
            end,
            icon: None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Range { name, .. } | Self::Count { name, .. } => name,
        }
    }
}

/// A named prize covering the inclusive 1-based rank range `[start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    pub name: String,
    /// Cosmetic label, passed through to the presentation layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub start: u32,
    pub end: u32,
}

impl PrizeTier {
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            icon: None,
            start,
            end,
        }
    }

    pub fn count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, rank: u32) -> bool {
        rank >= self.start && rank <= self.end
    }
}

/// Turn configured specs into contiguous tiers starting at rank 1.
///
/// Count specs take the next `count` ranks; range specs must begin exactly
/// where the previous tier ended.
pub fn resolve_tiers(specs: &[TierSpec]) -> DrawResult<Vec<PrizeTier>> {
    let mut tiers = Vec::with_capacity(specs.len());
    // `None` once a tier has claimed rank u32::MAX
    let mut next_rank: Option<u32> = Some(1);

    for spec in specs {
        let next_start = next_rank.ok_or_else(|| {
            DrawError::Config(format!(
                "tier '{}' follows a tier that ends at the last possible rank",
                spec.name()
            ))
        })?;
        let (name, icon, start, end) = match spec {
            TierSpec::Count { name, count, icon } => {
                if *count == 0 {
                    return Err(DrawError::Config(format!(
                        "tier '{}' has a zero count",
                        name
                    )));
                }
                let end = next_start
                    .checked_add(count - 1)
                    .ok_or_else(|| DrawError::Config(format!("tier '{}' overflows", name)))?;
                (name, icon, next_start, end)
            }
            TierSpec::Range {
                name,
                start,
                end,
                icon,
            } => {
                if end < start {
                    return Err(DrawError::Config(format!(
                        "tier '{}' ends ({}) before it starts ({})",
                        name, end, start
                    )));
                }
                if *start != next_start {
                    let problem = if *start > next_start { "gap" } else { "overlap" };
                    return Err(DrawError::Config(format!(
                        "tier '{}' starts at rank {} but rank {} is next ({})",
                        name, start, next_start, problem
                    )));
                }
                (name, icon, *start, *end)
            }
        };

        if name.trim().is_empty() {
            return Err(DrawError::Config("tier name cannot be empty".to_string()));
        }

        tiers.push(PrizeTier {
            name: name.clone(),
            icon: icon.clone(),
            start,
            end,
        });
        next_rank = end.checked_add(1);
    }

    Ok(tiers)
}

/// Total number of ranks covered by a resolved tier list
pub fn total_ranks(tiers: &[PrizeTier]) -> u32 {
    tiers.iter().map(PrizeTier::count).sum()
}

/// The Move & Groove tier table: nine tiers of 100 ranks each
pub fn standard_tiers() -> Vec<TierSpec> {
    ["100.000", "150.000", "200.000"]
        .iter()
        .flat_map(|amount| {
            ["Bensin", "Top100", "SNL"]
                .into_iter()
                .map(move |kind| TierSpec::count(format!("{} Rp.{},-", kind, amount), 100))
        })
        .collect()
}
