use phase_league::aggregate::{aggregate, period_points, player_phase_points, squad_points};
use phase_league::config::TrackerConfig;
use phase_league::context::RunContext;
use phase_league::error::{DiagnosticKind, Diagnostics, TrackerError};
use phase_league::model::{
    PeriodScores, Player, PlayerDirectory, PlayerId, PointAdjustment, Position, Roster, Team,
};
use phase_league::phases::{PhaseId, PhaseSpan, PhaseTable};

fn config(spans: &[(PhaseId, u32, u32)], adjustments: Vec<PointAdjustment>) -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.phases = PhaseTable::new(
        spans
            .iter()
            .map(|&(id, first, last)| PhaseSpan { id, first, last })
            .collect(),
    )
    .expect("valid phase table");
    config.adjustments = adjustments;
    config
}

fn players(ids: &[PlayerId]) -> PlayerDirectory {
    ids.iter()
        .map(|&id| Player {
            id,
            name: format!("Player {id}"),
            position: Position::Midfielder,
            team: Team::from_api_id(1),
            cost: 50,
            season_points: 0,
        })
        .collect()
}

fn scores(periods: &[(u32, &[(PlayerId, i32)])]) -> PeriodScores {
    let mut scores = PeriodScores::new();
    for (period, points) in periods {
        scores.insert_period(*period, points.iter().copied().collect());
    }
    scores
}

fn roster(rows: &[(&str, PhaseId, &[PlayerId])]) -> Roster {
    let mut roster = Roster::new();
    for (manager, phase, ids) in rows {
        roster.set_squad(manager, *phase, ids.to_vec());
    }
    roster
}

fn context(
    config: &TrackerConfig,
    directory: &[PlayerId],
    periods: &[(u32, &[(PlayerId, i32)])],
    rows: &[(&str, PhaseId, &[PlayerId])],
    current_period: u32,
) -> RunContext {
    RunContext::new(
        config,
        players(directory),
        scores(periods),
        roster(rows),
        current_period,
    )
}

#[test]
fn single_phase_scenario_sums_both_periods() {
    let config = config(&[(1, 1, 2)], vec![]);
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 5), (11, 3)]), (2, &[(10, 2)])],
        &[("Alice", 1, &[10, 11])],
        2,
    );
    let mut diags = Diagnostics::new();
    let table = aggregate(&ctx, 2, &mut diags).expect("aggregate");

    let alice = table.get("Alice").expect("alice scored");
    assert_eq!(alice.phase_total(1), Some(10));
    assert_eq!(alice.total(), 10);
}

#[test]
fn adjustment_only_reaches_holders_in_that_phase() {
    let config = config(
        &[(1, 1, 1), (2, 2, 2)],
        vec![PointAdjustment { player: 10, phase: 1, delta: 8 }],
    );
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 1), (11, 1)]), (2, &[(10, 1), (11, 1)])],
        &[
            ("Alice", 1, &[10]),
            ("Alice", 2, &[10]),
            ("Bob", 1, &[11]),
            ("Bob", 2, &[10]),
        ],
        2,
    );
    let table = aggregate(&ctx, 2, &mut Diagnostics::new()).unwrap();

    let alice = table.get("Alice").unwrap();
    assert_eq!(alice.phase_total(1), Some(9));
    assert_eq!(alice.phase_total(2), Some(1));
    // Bob holds 10 only in phase 2, so the phase-1 correction skips him.
    let bob = table.get("Bob").unwrap();
    assert_eq!(bob.phase_total(1), Some(1));
    assert_eq!(bob.phase_total(2), Some(1));
}

#[test]
fn adjustment_applies_in_full_to_every_holder() {
    let config = config(
        &[(1, 1, 1)],
        vec![PointAdjustment { player: 10, phase: 1, delta: 8 }],
    );
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 2), (11, 0)])],
        &[("A", 1, &[10]), ("B", 1, &[10]), ("C", 1, &[11])],
        1,
    );
    let table = aggregate(&ctx, 1, &mut Diagnostics::new()).unwrap();

    assert_eq!(table.get("A").unwrap().total(), 10);
    assert_eq!(table.get("B").unwrap().total(), 10);
    assert_eq!(table.get("C").unwrap().total(), 0);
}

#[test]
fn grand_total_is_sum_of_phase_totals() {
    let config = config(
        &[(1, 1, 2), (2, 3, 4)],
        vec![PointAdjustment { player: 12, phase: 2, delta: -3 }],
    );
    let ctx = context(
        &config,
        &[10, 11, 12],
        &[
            (1, &[(10, 4), (11, 2), (12, 9)]),
            (2, &[(10, 1), (11, 7), (12, 0)]),
            (3, &[(10, 3), (11, 3), (12, 5)]),
            (4, &[(10, -2), (11, 6), (12, 8)]),
        ],
        &[("Alice", 1, &[10, 11]), ("Alice", 2, &[11, 12])],
        4,
    );
    let table = aggregate(&ctx, 4, &mut Diagnostics::new()).unwrap();
    let alice = table.get("Alice").unwrap();

    assert_eq!(alice.phase_total(1), Some(14));
    assert_eq!(alice.phase_total(2), Some(3 + 5 + 6 + 8 - 3));
    assert_eq!(alice.total(), alice.phase_totals().values().sum::<i64>());
}

#[test]
fn aggregation_is_idempotent() {
    let config = config(&[(1, 1, 3)], vec![]);
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 5)]), (2, &[(11, 2)]), (3, &[(10, 1), (11, 1)])],
        &[("Alice", 1, &[10, 11]), ("Bob", 1, &[11])],
        3,
    );
    let first = aggregate(&ctx, 3, &mut Diagnostics::new()).unwrap();
    let second = aggregate(&ctx, 3, &mut Diagnostics::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_score_counts_zero_and_is_reported_for_current_period_only() {
    let config = config(&[(1, 1, 2)], vec![]);
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 5)]), (2, &[(10, 1)])],
        &[("Alice", 1, &[10, 11])],
        2,
    );
    let mut diags = Diagnostics::new();
    let table = aggregate(&ctx, 2, &mut diags).unwrap();

    assert_eq!(table.get("Alice").unwrap().total(), 6);
    assert_eq!(diags.count(DiagnosticKind::MissingScore), 1);
}

#[test]
fn unknown_player_is_skipped_and_reported() {
    let config = config(&[(1, 1, 1)], vec![]);
    let ctx = context(
        &config,
        &[10],
        &[(1, &[(10, 3), (99, 50)])],
        &[("Alice", 1, &[10, 99])],
        1,
    );
    let mut diags = Diagnostics::new();
    let table = aggregate(&ctx, 1, &mut diags).unwrap();

    assert_eq!(table.get("Alice").unwrap().total(), 3);
    assert_eq!(diags.count(DiagnosticKind::UnknownPlayer), 1);
    assert_eq!(diags.count(DiagnosticKind::MissingScore), 0);
}

#[test]
fn empty_roster_yields_empty_table() {
    let config = config(&[(1, 1, 1)], vec![]);
    let ctx = context(&config, &[10], &[(1, &[(10, 3)])], &[], 1);
    let table = aggregate(&ctx, 1, &mut Diagnostics::new()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
}

#[test]
fn period_outside_phase_table_is_fatal() {
    let config = config(&[(1, 1, 2)], vec![]);
    let ctx = context(&config, &[10], &[], &[("Alice", 1, &[10])], 3);
    let err = aggregate(&ctx, 3, &mut Diagnostics::new()).unwrap_err();
    assert!(matches!(err, TrackerError::PeriodOutsidePhases { period: 3 }));
}

#[test]
fn earlier_cutoff_ignores_later_periods() {
    let config = config(&[(1, 1, 3)], vec![]);
    let ctx = context(
        &config,
        &[10],
        &[(1, &[(10, 2)]), (2, &[(10, 3)]), (3, &[(10, 40)])],
        &[("Alice", 1, &[10])],
        3,
    );
    let table = aggregate(&ctx, 2, &mut Diagnostics::new()).unwrap();
    assert_eq!(table.through_period, 2);
    assert_eq!(table.get("Alice").unwrap().total(), 5);
}

#[test]
fn period_points_use_containing_phase_and_pick_top_scorer() {
    let config = config(
        &[(1, 1, 1), (2, 2, 2)],
        vec![PointAdjustment { player: 11, phase: 2, delta: 2 }],
    );
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 1), (11, 1)]), (2, &[(10, 4), (11, 2)])],
        &[
            ("Alice", 1, &[10]),
            ("Alice", 2, &[10]),
            ("Bob", 1, &[11]),
            ("Bob", 2, &[11]),
            ("Carol", 1, &[10]),
        ],
        2,
    );
    let mut diags = Diagnostics::new();
    let result = period_points(&ctx, 2, &mut diags).unwrap();

    assert_eq!(result.get("Alice"), Some(4));
    assert_eq!(result.get("Bob"), Some(4));
    assert_eq!(result.get("Carol"), Some(0));
    assert_eq!(diags.count(DiagnosticKind::MissingPhaseRoster), 1);
    // Tied on 4; the first manager in roster order wins.
    assert_eq!(result.top_scorer(), Some(("Alice", 4)));
}

#[test]
fn no_top_scorer_when_nobody_scores() {
    let config = config(&[(1, 1, 1)], vec![]);
    let ctx = context(
        &config,
        &[10],
        &[(1, &[(10, 0)])],
        &[("Alice", 1, &[10])],
        1,
    );
    let result = period_points(&ctx, 1, &mut Diagnostics::new()).unwrap();
    assert_eq!(result.top_scorer(), None);
}

#[test]
fn player_and_squad_points() {
    let config = config(
        &[(1, 1, 2), (2, 3, 3)],
        vec![PointAdjustment { player: 10, phase: 1, delta: -1 }],
    );
    let ctx = context(
        &config,
        &[10, 11],
        &[(1, &[(10, 2)]), (2, &[(10, 3)]), (3, &[(10, 7), (11, 1)])],
        &[("Alice", 1, &[10])],
        3,
    );
    assert_eq!(player_phase_points(&ctx, 10, 1, 3), 4);
    assert_eq!(player_phase_points(&ctx, 10, 2, 3), 7);
    assert_eq!(player_phase_points(&ctx, 10, 2, 2), 0);
    // Raw points across all periods, no phases and no corrections.
    assert_eq!(squad_points(&ctx, &[10, 11, 99], 3), 13);
}
