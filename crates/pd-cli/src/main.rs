//! PrizeDraw operator console
//!
//! Usage:
//!   prizedraw init --roster peserta.csv   - Start a new session
//!   prizedraw status                      - Stage progress and next step
//!   prizedraw advance                     - Run the next planned step
//!   prizedraw draw batch --prize Voucher --count 30
//!   prizedraw draw single --prize Motor
//!   prizedraw results [stage]             - Winner lists
//!   prizedraw validate                    - Duplicate check
//!   prizedraw export --out hasil.json     - Winners, pool and report as JSON
//!   prizedraw export --format csv         - Full-pool rank table as CSV

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use pd_cli::{
    EventConfig, ExportFormat, SessionStart, print_outcome, print_rows, print_summary,
    print_validation, requires_operator,
};
use pd_core::StageKind;
use pd_draw::{PlannedStep, StepOutcome};

#[derive(Parser)]
#[command(name = "prizedraw", version, about = "Multi-stage prize draw console")]
struct Cli {
    /// Event configuration file (defaults to ./prizedraw.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session from a roster file
    Init {
        /// Roster file (CSV or JSON); falls back to `roster` in the config
        #[arg(short, long)]
        roster: Option<PathBuf>,
        /// Discard an existing session
        #[arg(long)]
        force: bool,
    },
    /// Show stage progress and the next planned step
    Status,
    /// Run the next planned step
    Advance,
    /// Draw an ad-hoc batch or single round
    Draw {
        #[arg(value_enum)]
        stage: RoundStage,
        /// Prize label for every winner of the round
        #[arg(short, long)]
        prize: String,
        /// Winners to draw (batch only)
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Round name shown in results
        #[arg(long)]
        name: Option<String>,
    },
    /// End a stage early
    Close {
        stage: StageKind,
    },
    /// Show winners, for one stage or all
    Results {
        stage: Option<StageKind>,
    },
    /// List tickets still in the pool
    Pool,
    /// Check that no ticket won twice
    Validate,
    /// Write the results to a file
    Export {
        /// Output file; defaults to a name per format in the working directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t)]
        format: ExportFormat,
    },
    /// Discard all results and refill the pool
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoundStage {
    Batch,
    Single,
}

impl From<RoundStage> for StageKind {
    fn from(stage: RoundStage) -> Self {
        match stage {
            RoundStage::Batch => StageKind::Batch,
            RoundStage::Single => StageKind::Single,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = EventConfig::load(cli.config.as_deref())?;

    let result = run(&config, cli.command);
    if result.as_ref().is_err_and(|e| requires_operator(e)) {
        eprintln!("⛔ The session is stopped. Check the snapshot, then run `prizedraw reset --yes`.");
    }
    result
}

fn run(config: &EventConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Init { roster, force } => init(config, roster, force),
        Commands::Status => status(config),
        Commands::Advance => advance(config),
        Commands::Draw {
            stage,
            prize,
            count,
            name,
        } => {
            let (orch, outcome) = pd_cli::draw(config, stage.into(), prize, count, name)?;
            print_outcome(&orch, &outcome);
            Ok(())
        }
        Commands::Close { stage } => {
            pd_cli::close(config, stage)?;
            println!("Stage {} closed", stage);
            Ok(())
        }
        Commands::Results { stage } => results(config, stage),
        Commands::Pool => pool(config),
        Commands::Validate => validate(config),
        Commands::Export { out, format } => {
            let out = out.unwrap_or_else(|| PathBuf::from(format.default_file()));
            let rows = pd_cli::export(config, &out, format)?;
            println!("✅ Exported {} winner(s) to {}", rows, out.display());
            Ok(())
        }
        Commands::Reset { yes } => {
            let orch = pd_cli::reset(config, yes)?;
            println!(
                "Session {} reset, {} ticket(s) back in the pool",
                orch.snapshot().session_id,
                orch.remaining_pool().len()
            );
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PRINTING
// ═══════════════════════════════════════════════════════════════════════════

fn init(config: &EventConfig, roster: Option<PathBuf>, force: bool) -> Result<()> {
    let SessionStart {
        orch,
        participants,
        eligible,
        skipped,
        discarded,
    } = pd_cli::init(config, roster.as_deref(), force)?;

    println!("✅ Session {} started for {}", orch.snapshot().session_id, config.event_name);
    if discarded > 0 {
        println!("  Previous session discarded ({} file(s))", discarded);
    }
    println!("  Participants: {}", participants);
    println!("  Eligible:     {}", eligible);
    println!("  Excluded:     {}", participants - eligible);
    if skipped > 0 {
        println!("  Skipped:      {} row(s) without a ticket", skipped);
    }
    println!(
        "  Full-pool draw awards {} prize(s)",
        orch.plan().full_pool_total()
    );
    Ok(())
}

fn status(config: &EventConfig) -> Result<()> {
    let orch = pd_cli::resume(config)?;
    let snapshot = orch.snapshot();

    println!("{} (session {})", snapshot.event_name, snapshot.session_id);
    println!(
        "  Saved {} as snapshot #{}",
        snapshot.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.sequence
    );
    for kind in StageKind::ALL {
        let stage = snapshot.stage(kind);
        let planned = orch.plan().planned_rounds(kind);
        let fulfilled = (0..planned).filter(|i| stage.fulfils(*i)).count();
        println!(
            "  {:<10} {:<12} planned {}/{}  rounds {}  winners {}",
            kind,
            stage.status,
            fulfilled,
            planned,
            stage.rounds.len(),
            stage.winner_count()
        );
    }
    println!("  Pool: {} ticket(s)", orch.remaining_pool().len());

    match orch.next_step() {
        PlannedStep::FullPool => println!("Next: full-pool draw"),
        PlannedStep::Round { stage, request, .. } => println!(
            "Next: {} round '{}' ({} x {})",
            stage, request.name, request.count, request.prize
        ),
        PlannedStep::Close(stage) => {
            println!("Next: close {} (no planned rounds left)", stage)
        }
        PlannedStep::Finished => println!("Next: nothing, all stages complete"),
    }
    Ok(())
}

fn advance(config: &EventConfig) -> Result<()> {
    let (orch, step) = pd_cli::advance(config)?;
    match step {
        StepOutcome::Drew(outcome) => print_outcome(&orch, &outcome),
        StepOutcome::Closed(stage) => println!("Stage {} closed", stage),
        StepOutcome::Finished => println!("All stages are complete"),
    }
    Ok(())
}

fn results(config: &EventConfig, stage: Option<StageKind>) -> Result<()> {
    let orch = pd_cli::resume(config)?;
    let stages: Vec<StageKind> = match stage {
        Some(kind) => vec![kind],
        None => StageKind::ALL.to_vec(),
    };

    for kind in stages {
        println!("── {} ({}) ──", kind, orch.status(kind));
        print_rows(&orch.results(kind));
        if kind == StageKind::FullPool {
            println!();
            print_summary(&orch.prize_summary());
        }
        println!();
    }
    Ok(())
}

fn pool(config: &EventConfig) -> Result<()> {
    let orch = pd_cli::resume(config)?;
    let pool = orch.remaining_pool();
    for ticket in &pool {
        println!("{}", ticket);
    }
    println!("{} ticket(s) remaining", pool.len());
    Ok(())
}

fn validate(config: &EventConfig) -> Result<()> {
    let orch = pd_cli::resume(config)?;
    let report = orch.validate();
    print_validation(&report);
    if !report.is_clean() {
        bail!("{} duplicate winner(s) found", report.conflicts.len());
    }
    Ok(())
}
