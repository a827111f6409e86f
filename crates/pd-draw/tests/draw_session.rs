//! End-to-end draw session tests
//!
//! Full-pool → batch → single with persistence, resume and failure paths.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use pd_core::{
    DrawError, DrawPlan, EligibilityFilter, Participant, RoundPlan, ShortfallPolicy, StageKind,
    StageStatus, TicketNumber, TierSpec,
};
use pd_draw::{
    DrawSampler, PlannedStep, RoundRequest, StageOrchestrator, StepOutcome, validate,
};
use pd_state::{SnapshotStore, StoreConfig};

// ═══════════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn roster(n: usize) -> Vec<Participant> {
    let filter = EligibilityFilter::new(["F", "Panitia"]);
    (1..=n)
        .map(|i| {
            Participant::new(
                TicketNumber::padded(&i.to_string(), 4),
                format!("Peserta {}", i),
                format!("08{:09}", i),
                &filter,
            )
        })
        .collect()
}

fn four_tiers() -> Vec<TierSpec> {
    vec![
        TierSpec::count("Hadiah 1", 175),
        TierSpec::count("Hadiah 2", 175),
        TierSpec::count("Hadiah 3", 175),
        TierSpec::count("Hadiah 4", 175),
    ]
}

fn event_plan() -> DrawPlan {
    DrawPlan::from_specs(
        &four_tiers(),
        (1..=3)
            .map(|i| RoundPlan::new(format!("Batch {}", i), "Voucher Belanja", 30))
            .collect(),
        (1..=10)
            .map(|i| RoundPlan::new(format!("Grand {}", i), "Sepeda Motor", 1))
            .collect(),
    )
    .unwrap()
}

fn store(dir: &Path) -> SnapshotStore {
    SnapshotStore::new(StoreConfig::in_dir(dir))
}

fn seeded(
    dir: &Path,
    people: Vec<Participant>,
    plan: DrawPlan,
    seed: u64,
) -> StageOrchestrator<StdRng> {
    StageOrchestrator::start_with(
        "Undian Tahunan",
        people,
        plan,
        store(dir),
        DrawSampler::with_rng(StdRng::seed_from_u64(seed)),
    )
    .unwrap()
}

fn run_to_end<R: rand::CryptoRng>(orch: &mut StageOrchestrator<R>) {
    loop {
        match orch.advance().unwrap() {
            StepOutcome::Finished => break,
            StepOutcome::Drew(_) | StepOutcome::Closed(_) => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FULL SESSION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_pool_thousand_tickets() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(1000), event_plan(), 7);

    let outcome = orch.draw_full_pool().unwrap();
    assert_eq!(outcome.round.drawn(), 700);
    assert_eq!(outcome.remaining, 300);
    assert!(!outcome.round.shortfall);

    for winner in &outcome.round.winners {
        let expected = match winner.rank {
            1..=175 => "Hadiah 1",
            176..=350 => "Hadiah 2",
            351..=525 => "Hadiah 3",
            526..=700 => "Hadiah 4",
            other => panic!("unexpected rank {}", other),
        };
        assert_eq!(winner.prize, expected, "rank {}", winner.rank);
    }

    let ranks: Vec<u32> = outcome.round.winners.iter().map(|w| w.rank).collect();
    assert_eq!(ranks, (1..=700).collect::<Vec<u32>>());

    let remaining: HashSet<TicketNumber> = orch.remaining_pool().into_iter().collect();
    assert!(outcome
        .round
        .winners
        .iter()
        .all(|w| !remaining.contains(&w.ticket)));
}

#[test]
fn test_whole_event_has_no_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(1000), event_plan(), 11);

    run_to_end(&mut orch);

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.total_winners(), 700 + 3 * 30 + 10);
    assert_eq!(orch.remaining_pool().len(), 1000 - 800);
    assert!(StageKind::ALL
        .iter()
        .all(|k| orch.status(*k) == StageStatus::Complete));

    let report = orch.validate();
    assert!(report.is_clean());
    assert_eq!(report.unique_winners, 800);

    assert_eq!(orch.results(StageKind::Batch).len(), 90);
    assert_eq!(orch.results(StageKind::Single).len(), 10);
    assert!(orch
        .results(StageKind::Single)
        .iter()
        .all(|row| row.prize == "Sepeda Motor" && row.rank == 1));
}

#[test]
fn test_excluded_names_never_win() {
    let dir = tempfile::tempdir().unwrap();
    let mut people = roster(40);
    let filter = EligibilityFilter::new(["F", "Panitia"]);
    people.push(Participant::new(TicketNumber::new("9001"), "F", "", &filter));
    people.push(Participant::new(TicketNumber::new("9002"), "Panitia Acara", "", &filter));
    people.push(Participant::new(TicketNumber::new("9003"), "Firman", "", &filter));

    let plan = DrawPlan::from_specs(&[TierSpec::count("Semua", 41)], vec![], vec![]).unwrap();
    let mut orch = seeded(dir.path(), people, plan, 3);
    assert_eq!(orch.snapshot().eligible.len(), 41);

    let outcome = orch.draw_full_pool().unwrap();
    let winners: HashSet<&str> = outcome
        .round
        .winners
        .iter()
        .map(|w| w.ticket.as_str())
        .collect();
    assert!(!winners.contains("9001"));
    assert!(!winners.contains("9002"));
    assert!(winners.contains("9003"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH & SHORTFALL
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_batch_from_small_pool() {
    let dir = tempfile::tempdir().unwrap();
    let plan = DrawPlan::from_specs(&[TierSpec::count("Hadiah", 10)], vec![], vec![]).unwrap();
    let mut orch = seeded(dir.path(), roster(60), plan, 5);
    orch.draw_full_pool().unwrap();
    assert_eq!(orch.remaining_pool().len(), 50);

    let outcome = orch
        .draw_batch(RoundRequest::new("Batch A", "Payung", 30))
        .unwrap();
    assert_eq!(outcome.round.drawn(), 30);
    assert_eq!(outcome.remaining, 20);
    assert!(orch.validate().is_clean());
}

#[test]
fn test_shortfall_draws_remaining() {
    let dir = tempfile::tempdir().unwrap();
    let plan = DrawPlan::from_specs(&[TierSpec::count("Hadiah", 5)], vec![], vec![]).unwrap();
    let mut orch = seeded(dir.path(), roster(25), plan, 9);
    orch.draw_full_pool().unwrap();

    let outcome = orch
        .draw_batch(RoundRequest::new("Big", "Kaos", 30))
        .unwrap();
    assert!(outcome.round.shortfall);
    assert_eq!(outcome.round.requested, 30);
    assert_eq!(outcome.round.drawn(), 20);
    assert!(orch.remaining_pool().is_empty());

    // Empty pool: the next round is flagged and draws nobody
    let outcome = orch
        .draw_batch(RoundRequest::new("After", "Kaos", 1))
        .unwrap();
    assert!(outcome.round.shortfall);
    assert_eq!(outcome.round.drawn(), 0);
}

#[test]
fn test_shortfall_abort_policy() {
    let dir = tempfile::tempdir().unwrap();
    let plan = DrawPlan::from_specs(&[TierSpec::count("Hadiah", 5)], vec![], vec![])
        .unwrap()
        .with_shortfall(ShortfallPolicy::Abort);
    let mut orch = seeded(dir.path(), roster(25), plan, 9);
    orch.draw_full_pool().unwrap();
    let before = orch.snapshot().sequence;

    let err = orch
        .draw_batch(RoundRequest::new("Big", "Kaos", 30))
        .unwrap_err();
    assert_eq!(
        err,
        DrawError::InsufficientPool {
            requested: 30,
            available: 20
        }
    );
    assert_eq!(orch.remaining_pool().len(), 20);
    assert_eq!(orch.snapshot().sequence, before);
    assert_eq!(orch.status(StageKind::Batch), StageStatus::Pending);
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORDERING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_stage_order_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(1000), event_plan(), 1);

    assert!(matches!(
        orch.draw_single("Grand", "Mobil"),
        Err(DrawError::StageOrder {
            requested: StageKind::Single,
            blocking: StageKind::FullPool
        })
    ));

    orch.draw_full_pool().unwrap();
    orch.draw_batch(RoundRequest::new("Batch 1", "Voucher", 30))
        .unwrap();

    assert!(matches!(
        orch.draw_single("Grand", "Mobil"),
        Err(DrawError::StageOrder {
            requested: StageKind::Single,
            blocking: StageKind::Batch
        })
    ));

    // Closing the batch stage early unblocks the singles
    orch.close_stage(StageKind::Batch).unwrap();
    assert!(orch.draw_single("Grand", "Mobil").is_ok());
    assert_eq!(
        orch.draw_batch(RoundRequest::new("Late", "Voucher", 1))
            .unwrap_err(),
        DrawError::StageClosed(StageKind::Batch)
    );
}

#[test]
fn test_single_round_draws_one() {
    let dir = tempfile::tempdir().unwrap();
    let plan = DrawPlan::from_specs(&[TierSpec::count("Hadiah", 2)], vec![], vec![]).unwrap();
    let mut orch = seeded(dir.path(), roster(10), plan, 2);
    orch.draw_full_pool().unwrap();
    orch.close_stage(StageKind::Batch).unwrap();

    assert!(orch
        .draw_round(StageKind::Single, RoundRequest::new("Grand", "Mobil", 2))
        .is_err());
    let outcome = orch.draw_single("Grand", "Mobil").unwrap();
    assert_eq!(outcome.round.drawn(), 1);
    assert_eq!(outcome.remaining, 7);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE & RESUME
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_resume_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let (pool, statuses, winners) = {
        let mut orch = seeded(dir.path(), roster(1000), event_plan(), 21);
        orch.advance().unwrap();
        orch.advance().unwrap();
        (
            orch.remaining_pool(),
            StageKind::ALL.map(|k| orch.status(k)),
            orch.snapshot().total_winners(),
        )
    };

    let resumed = StageOrchestrator::resume(store(dir.path()))
        .unwrap()
        .expect("session on disk");
    assert_eq!(resumed.remaining_pool(), pool);
    assert_eq!(StageKind::ALL.map(|k| resumed.status(k)), statuses);
    assert_eq!(resumed.snapshot().total_winners(), winners);
    assert_eq!(
        resumed.next_step(),
        PlannedStep::Round {
            stage: StageKind::Batch,
            index: 1,
            request: RoundRequest::new("Batch 2", "Voucher Belanja", 30),
        }
    );
}

#[test]
fn test_resume_without_session() {
    let dir = tempfile::tempdir().unwrap();
    assert!(StageOrchestrator::resume(store(dir.path())).unwrap().is_none());
}

#[test]
fn test_open_prefers_saved_session() {
    let dir = tempfile::tempdir().unwrap();
    let session_id = {
        let mut orch = seeded(dir.path(), roster(1000), event_plan(), 4);
        orch.draw_full_pool().unwrap();
        orch.snapshot().session_id.clone()
    };

    let (orch, resumed) =
        StageOrchestrator::open("Undian Tahunan", roster(5), event_plan(), store(dir.path()))
            .unwrap();
    assert!(resumed);
    assert_eq!(orch.snapshot().session_id, session_id);
    assert_eq!(orch.snapshot().roster.len(), 1000);
}

#[test]
fn test_failed_save_discards_round() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(100), event_plan(), 8);
    let before = orch.snapshot().clone();

    // A directory where the primary file should be makes every rename fail
    let primary = orch.store().primary_path();
    fs::remove_file(&primary).unwrap();
    fs::create_dir(&primary).unwrap();

    let err = orch.draw_full_pool().unwrap_err();
    assert!(matches!(err, DrawError::Persistence(_)));
    assert_eq!(orch.snapshot(), &before);
    assert_eq!(orch.remaining_pool().len(), 100);
    assert_eq!(orch.status(StageKind::FullPool), StageStatus::Pending);
    assert!(!orch.is_halted());

    // Once storage is back the same round can run
    fs::remove_dir(&primary).unwrap();
    let outcome = orch.draw_full_pool().unwrap();
    assert_eq!(outcome.round.drawn(), 100);
}

#[test]
fn test_every_commit_is_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(1000), event_plan(), 13);
    orch.advance().unwrap();

    let on_disk = store(dir.path()).load_latest().unwrap().unwrap();
    assert_eq!(&on_disk, orch.snapshot());
    assert!(validate(&on_disk.stages).is_clean());
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESET
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_reset_clears_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = seeded(dir.path(), roster(1000), event_plan(), 17);
    run_to_end(&mut orch);
    let session_id = orch.snapshot().session_id.clone();

    orch.reset().unwrap();
    assert_eq!(orch.snapshot().total_winners(), 0);
    assert_eq!(orch.remaining_pool().len(), 1000);
    assert_eq!(orch.snapshot().session_id, session_id);
    assert_eq!(orch.next_step(), PlannedStep::FullPool);

    let on_disk = store(dir.path()).load_latest().unwrap().unwrap();
    assert_eq!(on_disk.total_winners(), 0);
}
