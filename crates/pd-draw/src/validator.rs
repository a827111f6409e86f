//! Duplicate Validator
//!
//! Read-only audit over every committed round. Conflicts are reported,
//! never corrected: fixing one would mean a silent re-draw.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pd_core::{DrawStage, StageKind, TicketNumber};

/// Where a ticket was recorded as a winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub stage: StageKind,
    pub round: String,
    pub prize: String,
}

/// A ticket that won more than once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub ticket: TicketNumber,
    pub occurrences: Vec<Occurrence>,
}

impl Conflict {
    pub fn stages(&self) -> Vec<StageKind> {
        let mut stages: Vec<StageKind> = self.occurrences.iter().map(|o| o.stage).collect();
        stages.dedup();
        stages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_winners: usize,
    pub unique_winners: usize,
    pub conflicts: Vec<Conflict>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Scan all stages for tickets recorded more than once
pub fn validate(stages: &[DrawStage]) -> ValidationReport {
    let mut seen: BTreeMap<&TicketNumber, Vec<Occurrence>> = BTreeMap::new();
    let mut total = 0;

    for stage in stages {
        for (round, winner) in stage.winners() {
            total += 1;
            seen.entry(&winner.ticket).or_default().push(Occurrence {
                stage: stage.kind,
                round: round.name.clone(),
                prize: winner.prize.clone(),
            });
        }
    }

    let unique = seen.len();
    let conflicts: Vec<Conflict> = seen
        .into_iter()
        .filter(|(_, occurrences)| occurrences.len() > 1)
        .map(|(ticket, occurrences)| Conflict {
            ticket: ticket.clone(),
            occurrences,
        })
        .collect();

    if !conflicts.is_empty() {
        log::warn!("Validator found {} duplicate winners", conflicts.len());
    }

    ValidationReport {
        total_winners: total,
        unique_winners: unique,
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pd_core::{DrawRound, WinnerRecord, initial_stages};

    fn round(name: &str, tickets: &[&str]) -> DrawRound {
        DrawRound {
            name: name.to_string(),
            prize: Some(format!("{} prize", name)),
            planned: None,
            requested: tickets.len(),
            shortfall: false,
            winners: tickets
                .iter()
                .enumerate()
                .map(|(i, t)| WinnerRecord {
                    ticket: TicketNumber::new(*t),
                    prize: format!("{} prize", name),
                    rank: i as u32 + 1,
                })
                .collect(),
            committed_at: Utc::now(),
        }
    }

    #[test]
    fn test_clean_session() {
        let mut stages = initial_stages();
        stages[0].rounds.push(round("full-pool", &["001", "002"]));
        stages[1].rounds.push(round("Batch 1", &["003"]));

        let report = validate(&stages);
        assert!(report.is_clean());
        assert_eq!(report.total_winners, 3);
        assert_eq!(report.unique_winners, 3);
    }

    #[test]
    fn test_cross_stage_duplicate_reported() {
        let mut stages = initial_stages();
        stages[0].rounds.push(round("full-pool", &["001", "002"]));
        stages[2].rounds.push(round("Grand", &["002"]));

        let report = validate(&stages);
        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.ticket.as_str(), "002");
        assert_eq!(conflict.stages(), vec![StageKind::FullPool, StageKind::Single]);
        assert_eq!(conflict.occurrences[1].round, "Grand");
        // Reported, not removed
        assert_eq!(stages[2].winner_count(), 1);
    }

    #[test]
    fn test_empty_session() {
        let report = validate(&initial_stages());
        assert!(report.is_clean());
        assert_eq!(report.total_winners, 0);
    }
}
