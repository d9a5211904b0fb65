use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use phase_league::aggregate::{aggregate, period_points};
use phase_league::config::TrackerConfig;
use phase_league::context::RunContext;
use phase_league::error::Diagnostics;
use phase_league::feed::parse_period_json;
use phase_league::model::{PeriodScores, Player, PlayerDirectory, Position, Roster, Team};
use phase_league::phases::PhaseTable;
use phase_league::standings::{compare, rank};

const PLAYERS: u32 = 700;
const MANAGERS: u32 = 40;
const SEASON: u32 = 38;

fn synthetic_league() -> RunContext {
    let config = TrackerConfig::default();
    let players: PlayerDirectory = (1..=PLAYERS)
        .map(|id| Player {
            id,
            name: format!("Player {id}"),
            position: Position::from_element_type(u64::from(id % 4 + 1)),
            team: Team::from_api_id(u64::from(id % 20 + 1)),
            cost: 50,
            season_points: 0,
        })
        .collect();

    let mut scores = PeriodScores::new();
    for period in 1..=SEASON {
        let points: HashMap<u32, i32> = (1..=PLAYERS)
            .map(|id| (id, ((id * 7 + period * 13) % 15) as i32 - 2))
            .collect();
        scores.insert_period(period, points);
    }

    let mut roster = Roster::new();
    for manager in 0..MANAGERS {
        for span in PhaseTable::reference().spans() {
            let squad = (0..15)
                .map(|slot| (manager * 17 + u32::from(span.id) * 31 + slot * 11) % PLAYERS + 1)
                .collect();
            roster.set_squad(&format!("Manager {manager}"), span.id, squad);
        }
    }

    RunContext::new(&config, players, scores, roster, SEASON)
}

fn bench_aggregate(c: &mut Criterion) {
    let ctx = synthetic_league();
    c.bench_function("aggregate_full_season", |b| {
        b.iter(|| {
            let table = aggregate(black_box(&ctx), SEASON, &mut Diagnostics::quiet()).unwrap();
            black_box(table.len());
        })
    });
}

fn bench_rank_and_compare(c: &mut Criterion) {
    let ctx = synthetic_league();
    let current = aggregate(&ctx, SEASON, &mut Diagnostics::quiet()).unwrap();
    let previous = rank(&aggregate(&ctx, SEASON - 1, &mut Diagnostics::quiet()).unwrap());
    c.bench_function("rank_and_compare", |b| {
        b.iter(|| {
            let standings = rank(black_box(&current));
            let rows = compare(&standings, Some(&previous));
            black_box(rows.len());
        })
    });
}

fn bench_period_points(c: &mut Criterion) {
    let ctx = synthetic_league();
    c.bench_function("period_points", |b| {
        b.iter(|| {
            let result = period_points(black_box(&ctx), SEASON, &mut Diagnostics::quiet()).unwrap();
            black_box(result.top_scorer());
        })
    });
}

fn bench_period_parse(c: &mut Criterion) {
    let raw = {
        let elements: Vec<String> = (1..=PLAYERS)
            .map(|id| format!(r#"{{"id":{id},"stats":{{"total_points":{}}}}}"#, id % 12))
            .collect();
        format!(r#"{{"elements":[{}]}}"#, elements.join(","))
    };
    c.bench_function("period_parse", |b| {
        b.iter(|| {
            let points = parse_period_json(black_box(&raw)).unwrap();
            black_box(points.map(|p| p.len()));
        })
    });
}

criterion_group!(
    benches,
    bench_aggregate,
    bench_rank_and_compare,
    bench_period_points,
    bench_period_parse
);
criterion_main!(benches);
