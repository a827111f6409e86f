//! Terminal tables and the export documents

use chrono::{DateTime, Utc};
use serde::Serialize;

use pd_core::{StageKind, StageStatus, TicketNumber};
use pd_draw::{PrizeCount, RoundOutcome, StageOrchestrator, ValidationReport, WinnerRow};
use pd_state::MirrorOutcome;

pub fn print_rows(rows: &[WinnerRow]) {
    if rows.is_empty() {
        println!("  (no winners)");
        return;
    }
    println!(
        "  {:>5}  {:<14} {:<20} {:<24} {:<16} Prize",
        "#", "Round", "Ticket", "Name", "Contact"
    );
    for row in rows {
        println!(
            "  {:>5}  {:<14} {:<20} {:<24} {:<16} {}",
            if row.stage == StageKind::FullPool {
                row.rank as usize
            } else {
                row.sequence
            },
            row.round,
            row.ticket,
            row.name,
            row.contact,
            row.prize
        );
    }
}

pub fn print_summary(summary: &[PrizeCount]) {
    for line in summary {
        println!("  {:<32} {:>5}", line.prize, line.winners);
    }
}

pub fn print_outcome(orch: &StageOrchestrator, outcome: &RoundOutcome) {
    let round = &outcome.round;
    println!(
        "🎉 {} / {}: {} winner(s){}",
        outcome.stage,
        round.name,
        round.drawn(),
        if round.shortfall {
            format!(" (requested {}, pool ran short)", round.requested)
        } else {
            String::new()
        }
    );

    // Only this round's rows: the tail of the stage list
    let rows = orch.results(outcome.stage);
    let start = rows.len().saturating_sub(round.drawn());
    print_rows(&rows[start..]);

    println!(
        "  Stage {} is {}, {} ticket(s) left in the pool",
        outcome.stage, outcome.stage_status, outcome.remaining
    );
    match &outcome.mirror {
        MirrorOutcome::Failed { reason } => println!("  ⚠️  Mirror copy failed: {}", reason),
        MirrorOutcome::Mirrored { name } => log::debug!("Mirrored as {}", name),
        MirrorOutcome::Disabled => {}
    }
}

pub fn print_validation(report: &ValidationReport) {
    println!(
        "Winners: {} total, {} unique",
        report.total_winners, report.unique_winners
    );
    if report.is_clean() {
        println!("✅ No ticket won more than once");
        return;
    }
    println!("❌ {} duplicate winner(s):", report.conflicts.len());
    for conflict in &report.conflicts {
        let places: Vec<String> = conflict
            .occurrences
            .iter()
            .map(|o| format!("{}/{} ({})", o.stage, o.round, o.prize))
            .collect();
        println!("  {}: {}", conflict.ticket, places.join(", "));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct StageExport {
    pub stage: StageKind,
    pub status: StageStatus,
    pub winners: Vec<WinnerRow>,
}

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub event_name: String,
    pub session_id: String,
    pub exported_at: DateTime<Utc>,
    pub stages: Vec<StageExport>,
    pub prize_summary: Vec<PrizeCount>,
    pub remaining_pool: Vec<TicketNumber>,
    pub validation: ValidationReport,
}

impl ExportDocument {
    pub fn build(orch: &StageOrchestrator) -> Self {
        let snapshot = orch.snapshot();
        Self {
            event_name: snapshot.event_name.clone(),
            session_id: snapshot.session_id.clone(),
            exported_at: Utc::now(),
            stages: StageKind::ALL
                .iter()
                .map(|kind| StageExport {
                    stage: *kind,
                    status: orch.status(*kind),
                    winners: orch.results(*kind),
                })
                .collect(),
            prize_summary: orch.prize_summary(),
            remaining_pool: orch.remaining_pool(),
            validation: orch.validate(),
        }
    }
}

/// Header of the full-pool results table
pub const CSV_HEADER: [&str; 3] = ["Peringkat", "Nomor Undian", "Hadiah"];

/// Suggested file name for the CSV export
pub const DEFAULT_CSV_FILE: &str = "hasil_undian_move_groove.csv";

/// Full-pool winners as comma-separated rank, ticket and prize, in rank order
pub fn full_pool_csv(orch: &StageOrchestrator) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for row in orch.results(StageKind::FullPool) {
        let rank = row.rank.to_string();
        let fields = [rank.as_str(), row.ticket.as_str(), row.prize.as_str()];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field holding a delimiter, quote or line break; quotes double
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
