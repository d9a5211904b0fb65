use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{ScoreTable, squad_points};
use crate::context::RunContext;

/// Rank per manager at a given period. Rank 1 is the top of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsSnapshot {
    #[serde(alias = "gameweek")]
    pub period: u32,
    pub standings: BTreeMap<String, u32>,
}

impl StandingsSnapshot {
    pub fn empty(period: u32) -> Self {
        Self {
            period,
            standings: BTreeMap::new(),
        }
    }

    pub fn rank_of(&self, manager: &str) -> Option<u32> {
        self.standings.get(manager).copied()
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    /// Managers ordered by rank.
    pub fn ordered(&self) -> Vec<(&str, u32)> {
        let mut rows: Vec<(&str, u32)> = self
            .standings
            .iter()
            .map(|(name, rank)| (name.as_str(), *rank))
            .collect();
        rows.sort_by_key(|(_, rank)| *rank);
        rows
    }

    /// True when ranks are exactly `1..=len` with no repeats.
    pub fn is_bijective(&self) -> bool {
        let mut ranks: Vec<u32> = self.standings.values().copied().collect();
        ranks.sort_unstable();
        ranks.iter().enumerate().all(|(idx, r)| *r as usize == idx + 1)
    }
}

/// Ranks managers by grand total, highest first. The sort is stable, so
/// equal totals keep roster order.
pub fn rank(scores: &ScoreTable) -> StandingsSnapshot {
    let standings = ranked_order(scores)
        .into_iter()
        .enumerate()
        .map(|(idx, (name, _))| (name.to_string(), idx as u32 + 1))
        .collect();
    StandingsSnapshot {
        period: scores.through_period,
        standings,
    }
}

/// Managers in ranking order, with their totals.
pub fn ranked_order<'a>(scores: &'a ScoreTable) -> Vec<(&'a str, i64)> {
    let mut ordered: Vec<(&str, i64)> = scores
        .iter()
        .map(|s| (s.manager.as_str(), s.total()))
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    New,
    Up,
    Down,
    Unchanged,
}

impl Movement {
    pub fn symbol(self) -> &'static str {
        match self {
            Movement::New => "NEW",
            Movement::Up => "▲",
            Movement::Down => "▼",
            Movement::Unchanged => "–",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRow {
    pub manager: String,
    pub rank: u32,
    pub previous_rank: Option<u32>,
    pub movement: Movement,
}

pub fn movement_between(current_rank: u32, previous_rank: Option<u32>) -> Movement {
    match previous_rank {
        None => Movement::New,
        Some(prev) if prev > current_rank => Movement::Up,
        Some(prev) if prev < current_rank => Movement::Down,
        Some(_) => Movement::Unchanged,
    }
}

/// Movement of every manager in `current` relative to `baseline`, in current
/// rank order. Without a baseline everyone is new.
pub fn compare(current: &StandingsSnapshot, baseline: Option<&StandingsSnapshot>) -> Vec<MovementRow> {
    current
        .ordered()
        .into_iter()
        .map(|(manager, rank)| {
            let previous_rank = baseline.and_then(|b| b.rank_of(manager));
            let movement = movement_between(rank, previous_rank);
            debug!(
                manager,
                rank,
                previous = ?previous_rank,
                movement = ?movement,
                "standings movement"
            );
            MovementRow {
                manager: manager.to_string(),
                rank,
                previous_rank,
                movement,
            }
        })
        .collect()
}

/// A manager's actual total against what their first-phase squad would have
/// scored had it been kept all season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalSquadRow {
    pub manager: String,
    pub actual_points: i64,
    pub original_squad_points: i64,
    pub difference: i64,
    pub rank: u32,
}

/// Ranks managers by `actual - original squad` (highest first, stable on
/// roster order). Supplementary only; it never feeds the main standings.
pub fn original_squad_ranking(ctx: &RunContext, scores: &ScoreTable) -> Vec<OriginalSquadRow> {
    let mut rows: Vec<OriginalSquadRow> = ctx
        .roster
        .managers()
        .iter()
        .filter_map(|entry| {
            let actual_points = scores.get(&entry.name)?.total();
            let original_squad_points = entry
                .first_phase()
                .and_then(|phase| entry.squad(phase))
                .map(|squad| squad_points(ctx, squad, scores.through_period))
                .unwrap_or(0);
            Some(OriginalSquadRow {
                manager: entry.name.clone(),
                actual_points,
                original_squad_points,
                difference: actual_points - original_squad_points,
                rank: 0,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.difference.cmp(&a.difference));
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx as u32 + 1;
    }
    rows
}

/// Shuffles a stored baseline so movement indicators can be eyeballed.
///
/// With at least four managers two random managers swap places; with at
/// least five a third manager (not already first) also moves up one place,
/// swapping with whoever held it. Ranks stay a bijection.
pub fn perturb_baseline<R: Rng + ?Sized>(snapshot: &mut StandingsSnapshot, rng: &mut R) -> Vec<String> {
    let mut notes = Vec::new();
    let managers: Vec<String> = snapshot.standings.keys().cloned().collect();
    if managers.len() < 4 {
        return notes;
    }

    let picked: Vec<&String> = managers.choose_multiple(rng, 2).collect();
    let (a, b) = (picked[0].clone(), picked[1].clone());
    let (rank_a, rank_b) = (snapshot.standings[&a], snapshot.standings[&b]);
    snapshot.standings.insert(a.clone(), rank_b);
    snapshot.standings.insert(b.clone(), rank_a);
    notes.push(format!("swapped {a} (now {rank_b}) and {b} (now {rank_a})"));

    if managers.len() >= 5 {
        let rest: Vec<&String> = managers.iter().filter(|m| **m != a && **m != b).collect();
        if let Some(c) = rest.choose(rng).map(|m| (*m).clone()) {
            let rank_c = snapshot.standings[&c];
            if rank_c > 1 {
                let displaced = snapshot
                    .standings
                    .iter()
                    .find(|(name, rank)| **rank == rank_c - 1 && **name != c)
                    .map(|(name, _)| name.clone());
                if let Some(d) = displaced {
                    snapshot.standings.insert(c.clone(), rank_c - 1);
                    snapshot.standings.insert(d.clone(), rank_c);
                    notes.push(format!("moved {c} up to {}, {d} down to {rank_c}", rank_c - 1));
                }
            }
        }
    }
    notes
}
