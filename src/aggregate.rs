use std::collections::BTreeMap;

use crate::context::RunContext;
use crate::error::{DiagnosticKind, Diagnostics, TrackerError};
use crate::model::{ManagerEntry, PlayerId};
use crate::phases::PhaseId;

/// One manager's points. The grand total is always derived from the phase
/// totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerScore {
    pub manager: String,
    phase_totals: BTreeMap<PhaseId, i64>,
}

impl ManagerScore {
    pub fn new(manager: impl Into<String>) -> Self {
        Self {
            manager: manager.into(),
            phase_totals: BTreeMap::new(),
        }
    }

    pub fn phase_total(&self, phase: PhaseId) -> Option<i64> {
        self.phase_totals.get(&phase).copied()
    }

    pub fn phase_totals(&self) -> &BTreeMap<PhaseId, i64> {
        &self.phase_totals
    }

    pub fn total(&self) -> i64 {
        self.phase_totals.values().sum()
    }
}

/// Scores for every manager, in roster (first-seen) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreTable {
    pub through_period: u32,
    scores: Vec<ManagerScore>,
}

impl ScoreTable {
    pub fn new(through_period: u32, scores: Vec<ManagerScore>) -> Self {
        Self {
            through_period,
            scores,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagerScore> {
        self.scores.iter()
    }

    pub fn get(&self, manager: &str) -> Option<&ManagerScore> {
        self.scores.iter().find(|s| s.manager == manager)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when no managers were scored, as opposed to everyone on zero.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Aggregates every manager's phase totals over periods `..= through_period`.
///
/// Unknown players are skipped and reported; a missing score counts as zero
/// and is reported only for the run's current period. Adjustments are applied
/// after all raw sums, once per manager holding the player in that phase.
pub fn aggregate(
    ctx: &RunContext,
    through_period: u32,
    diags: &mut Diagnostics,
) -> Result<ScoreTable, TrackerError> {
    ctx.phases.ensure_covers(through_period)?;

    let mut scores = Vec::with_capacity(ctx.roster.len());
    for entry in ctx.roster.managers() {
        let mut score = ManagerScore::new(entry.name.clone());
        for (&phase, squad) in &entry.phases {
            let Some(span) = ctx.phases.get(phase) else {
                diags.push(
                    DiagnosticKind::SkippedSquadRow,
                    format!("{}: phase {phase} is not in the phase table", entry.name),
                );
                continue;
            };
            report_unknown_players(ctx, entry, phase, squad, diags);

            let mut total = 0i64;
            for period in span.first..=span.last.min(through_period) {
                let Some(points) = ctx.scores.period(period) else {
                    continue;
                };
                for &id in squad {
                    if !ctx.players.contains(id) {
                        continue;
                    }
                    match points.get(&id) {
                        Some(&p) => total += i64::from(p),
                        None if period == ctx.current_period => diags.push(
                            DiagnosticKind::MissingScore,
                            format!(
                                "{}: player {} has no points for period {period}",
                                entry.name,
                                ctx.players.label(id)
                            ),
                        ),
                        None => {}
                    }
                }
            }
            score.phase_totals.insert(phase, total);
        }
        scores.push(score);
    }

    for adj in &ctx.adjustments {
        for (entry, score) in ctx.roster.managers().iter().zip(scores.iter_mut()) {
            if !entry.holds(adj.phase, adj.player) {
                continue;
            }
            if let Some(total) = score.phase_totals.get_mut(&adj.phase) {
                *total += i64::from(adj.delta);
            }
        }
    }

    Ok(ScoreTable::new(through_period, scores))
}

fn report_unknown_players(
    ctx: &RunContext,
    entry: &ManagerEntry,
    phase: PhaseId,
    squad: &[PlayerId],
    diags: &mut Diagnostics,
) {
    for &id in squad.iter().filter(|id| !ctx.players.contains(**id)) {
        diags.push(
            DiagnosticKind::UnknownPlayer,
            format!(
                "{}: player id {id} in phase {phase} is not in the player directory (stale squad data?)",
                entry.name
            ),
        );
    }
}

/// Points each manager scored in a single period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodResult {
    pub period: u32,
    points: Vec<(String, i64)>,
}

impl PeriodResult {
    pub fn get(&self, manager: &str) -> Option<i64> {
        self.points
            .iter()
            .find(|(name, _)| name == manager)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.points.iter().map(|(name, p)| (name.as_str(), *p))
    }

    /// Strictly highest scorer; first-seen wins ties. `None` when nobody
    /// scored above zero.
    pub fn top_scorer(&self) -> Option<(&str, i64)> {
        let mut best: Option<(&str, i64)> = None;
        for (name, points) in self.iter() {
            if points > best.map(|(_, p)| p).unwrap_or(0) {
                best = Some((name, points));
            }
        }
        best
    }
}

/// Each manager's points for `period`, using the squad of the phase that
/// contains it plus that phase's adjustments.
pub fn period_points(
    ctx: &RunContext,
    period: u32,
    diags: &mut Diagnostics,
) -> Result<PeriodResult, TrackerError> {
    let phase = ctx.phases.require_phase(period)?;
    let period_scores = ctx.scores.period(period);

    let mut points = Vec::with_capacity(ctx.roster.len());
    for entry in ctx.roster.managers() {
        let Some(squad) = entry.squad(phase) else {
            diags.push(
                DiagnosticKind::MissingPhaseRoster,
                format!("{} has no squad for phase {phase} (period {period})", entry.name),
            );
            points.push((entry.name.clone(), 0));
            continue;
        };

        let mut total = 0i64;
        if let Some(period_scores) = period_scores {
            for &id in squad {
                if !ctx.players.contains(id) {
                    continue;
                }
                if let Some(&p) = period_scores.get(&id) {
                    total += i64::from(p);
                }
            }
        }
        for adj in ctx.adjustments.iter().filter(|a| a.phase == phase) {
            if squad.contains(&adj.player) {
                total += i64::from(adj.delta);
            }
        }
        points.push((entry.name.clone(), total));
    }

    Ok(PeriodResult { period, points })
}

/// Points a player earned in one phase through `through_period`, including
/// that phase's adjustments.
pub fn player_phase_points(
    ctx: &RunContext,
    player: PlayerId,
    phase: PhaseId,
    through_period: u32,
) -> i64 {
    let Some(span) = ctx.phases.get(phase) else {
        return 0;
    };
    let raw: i64 = (span.first..=span.last.min(through_period))
        .filter_map(|period| ctx.scores.get(period, player))
        .map(i64::from)
        .sum();
    raw + ctx.adjustment_for(player, phase)
}

/// Raw points of a fixed set of players over periods `1..=through_period`,
/// ignoring phases and adjustments.
pub fn squad_points(ctx: &RunContext, squad: &[PlayerId], through_period: u32) -> i64 {
    ctx.scores
        .loaded_periods()
        .filter(|&period| period >= 1 && period <= through_period)
        .map(|period| {
            squad
                .iter()
                .filter(|id| ctx.players.contains(**id))
                .filter_map(|&id| ctx.scores.get(period, id))
                .map(i64::from)
                .sum::<i64>()
        })
        .sum()
}
