//! Console commands
//!
//! Each command takes the loaded [`EventConfig`] and returns what it did, so
//! the binary only parses arguments and prints.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;

use pd_core::{DrawError, StageKind};
use pd_draw::{RoundOutcome, RoundRequest, StageOrchestrator, StepOutcome, prepare_session};
use pd_ingest::RosterLoader;
use pd_state::SnapshotStore;

use crate::config::EventConfig;
use crate::report::{DEFAULT_CSV_FILE, ExportDocument, full_pool_csv};

/// File layout written by `export`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Winners, remaining pool and validation report
    #[default]
    Json,
    /// Full-pool rank, ticket and prize table
    Csv,
}

impl ExportFormat {
    /// File written when `--out` is not given
    pub fn default_file(self) -> &'static str {
        match self {
            Self::Json => "hasil_undian.json",
            Self::Csv => DEFAULT_CSV_FILE,
        }
    }
}

/// A freshly started session and what went into it
#[derive(Debug)]
pub struct SessionStart {
    pub orch: StageOrchestrator,
    pub participants: usize,
    pub eligible: usize,
    /// Roster rows without a ticket
    pub skipped: usize,
    /// Snapshot files of a previous session removed by `--force`
    pub discarded: usize,
}

pub fn open_store(config: &EventConfig) -> SnapshotStore {
    SnapshotStore::new(config.storage.clone())
}

pub fn resume(config: &EventConfig) -> Result<StageOrchestrator> {
    let store = open_store(config);
    let dir = store.config().dir.clone();
    StageOrchestrator::resume(store)
        .with_context(|| format!("Failed to load session from {}", dir.display()))?
        .ok_or_else(|| {
            anyhow!(
                "No session in {}; run `prizedraw init` first",
                dir.display()
            )
        })
}

/// Whether `err` leaves the session stopped until the operator steps in
pub fn requires_operator(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<DrawError>())
        .any(DrawError::is_fatal)
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════

/// Start a new session from `roster` (or the configured roster).
///
/// An existing session is only discarded with `force`, and only after the
/// new roster and plan have been accepted.
pub fn init(config: &EventConfig, roster: Option<&Path>, force: bool) -> Result<SessionStart> {
    let path: PathBuf = roster
        .map(Path::to_path_buf)
        .or_else(|| config.roster.clone())
        .context("No roster given; pass --roster or set `roster` in the config")?;

    let store = open_store(config);
    let existing = store.exists();
    if existing && !force {
        bail!(
            "A session already exists in {}; use --force to discard it",
            store.config().dir.display()
        );
    }

    let roster = RosterLoader::new(config.ingest.clone())
        .load_path(&path)
        .with_context(|| format!("Failed to load roster {}", path.display()))?;
    let (participants, eligible, skipped) =
        (roster.len(), roster.eligible_count(), roster.skipped);
    let plan = config.plan()?;
    let snapshot = prepare_session(&config.event_name, roster.into_participants(), plan)?;

    let discarded = if existing {
        let removed = store.clear()?;
        log::warn!("Discarded {} snapshot file(s) of the previous session", removed);
        removed
    } else {
        0
    };
    let orch = StageOrchestrator::begin(snapshot, store)?;

    Ok(SessionStart {
        orch,
        participants,
        eligible,
        skipped,
        discarded,
    })
}

pub fn reset(config: &EventConfig, yes: bool) -> Result<StageOrchestrator> {
    if !yes {
        bail!("Reset discards every result; re-run with --yes to confirm");
    }
    let mut orch = resume(config)?;
    orch.reset()?;
    Ok(orch)
}

// ═══════════════════════════════════════════════════════════════════════════
// DRAWS
// ═══════════════════════════════════════════════════════════════════════════

pub fn advance(config: &EventConfig) -> Result<(StageOrchestrator, StepOutcome)> {
    let mut orch = resume(config)?;
    let step = orch.advance()?;
    Ok((orch, step))
}

/// Ad-hoc round; unnamed rounds are numbered after the stage's rounds so far
pub fn draw(
    config: &EventConfig,
    stage: StageKind,
    prize: String,
    count: usize,
    name: Option<String>,
) -> Result<(StageOrchestrator, RoundOutcome)> {
    let mut orch = resume(config)?;
    let name = name.unwrap_or_else(|| {
        let next = orch.snapshot().stage(stage).rounds.len() + 1;
        match stage {
            StageKind::Single => format!("Single {}", next),
            _ => format!("Batch {}", next),
        }
    });

    let outcome = orch.draw_round(stage, RoundRequest::new(name, prize, count))?;
    Ok((orch, outcome))
}

pub fn close(config: &EventConfig, stage: StageKind) -> Result<()> {
    let mut orch = resume(config)?;
    orch.close_stage(stage)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════

/// Write the session results to `out`; returns the number of winner rows
pub fn export(config: &EventConfig, out: &Path, format: ExportFormat) -> Result<usize> {
    let orch = resume(config)?;
    let (text, rows) = match format {
        ExportFormat::Json => {
            let document = ExportDocument::build(&orch);
            let rows: usize = document.stages.iter().map(|s| s.winners.len()).sum();
            (serde_json::to_string_pretty(&document)?, rows)
        }
        ExportFormat::Csv => (
            full_pool_csv(&orch),
            orch.snapshot().stage(StageKind::FullPool).winner_count(),
        ),
    };
    fs::write(out, text).with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(rows)
}
