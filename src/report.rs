// Report data and the plain-text renderer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use crate::aggregate::{ScoreTable, player_phase_points};
use crate::context::RunContext;
use crate::model::{PlayerId, Position};
use crate::phases::PhaseId;
use crate::run::{BaselineKind, RunOutcome};
use crate::standings::{Movement, StandingsSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueRow {
    pub rank: u32,
    pub movement: Movement,
    pub manager: String,
    pub total: i64,
    pub period_points: i64,
    pub gap_to_above: Option<i64>,
    pub gap_to_top: Option<i64>,
    pub original_difference: i64,
    pub original_rank: u32,
    pub top_scorer: bool,
}

/// League table in rank order.
pub fn league_table(outcome: &RunOutcome) -> Vec<LeagueRow> {
    let top_scorer = outcome.latest.top_scorer().map(|(name, _)| name);
    let mut rows = Vec::with_capacity(outcome.movements.len());
    let mut top_total = None;
    let mut above_total = None;

    for mv in &outcome.movements {
        let total = outcome
            .scores
            .get(&mv.manager)
            .map(|s| s.total())
            .unwrap_or(0);
        let top = *top_total.get_or_insert(total);
        let original = outcome
            .original_squads
            .iter()
            .find(|r| r.manager == mv.manager);

        rows.push(LeagueRow {
            rank: mv.rank,
            movement: mv.movement,
            manager: mv.manager.clone(),
            total,
            period_points: outcome.latest.get(&mv.manager).unwrap_or(0),
            gap_to_above: above_total.map(|above: i64| above - total),
            gap_to_top: above_total.map(|_| top - total),
            original_difference: original.map(|r| r.difference).unwrap_or(0),
            original_rank: original.map(|r| r.rank).unwrap_or(0),
            top_scorer: top_scorer == Some(mv.manager.as_str()),
        });
        above_total = Some(total);
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadPlayerRow {
    pub id: PlayerId,
    pub name: String,
    pub team: &'static str,
    pub position: Position,
    /// Only phases in which this manager held the player.
    pub phase_points: BTreeMap<PhaseId, i64>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadBreakdown {
    pub manager: String,
    pub total: i64,
    pub current_phase: PhaseId,
    pub current: Vec<SquadPlayerRow>,
    /// Held in an earlier phase but not in the current one.
    pub previous: Vec<SquadPlayerRow>,
}

/// Per-player contribution for every manager, in rank order. Players missing
/// from the directory are left out; aggregation already reported them.
pub fn squad_breakdowns(
    ctx: &RunContext,
    scores: &ScoreTable,
    standings: &StandingsSnapshot,
) -> Vec<SquadBreakdown> {
    let mut out = Vec::new();
    for (manager, _) in standings.ordered() {
        let Some(entry) = ctx.roster.get(manager) else {
            continue;
        };
        let Some(current_phase) = entry.latest_phase() else {
            continue;
        };
        let current_ids: Vec<PlayerId> = entry.squad(current_phase).unwrap_or(&[]).to_vec();
        let current_set: HashSet<PlayerId> = current_ids.iter().copied().collect();

        let mut previous_ids = Vec::new();
        let mut seen = HashSet::new();
        for (&phase, squad) in &entry.phases {
            if phase >= current_phase {
                continue;
            }
            for &id in squad {
                if !current_set.contains(&id) && seen.insert(id) {
                    previous_ids.push(id);
                }
            }
        }

        let build = |ids: &[PlayerId]| -> Vec<SquadPlayerRow> {
            let mut rows: Vec<SquadPlayerRow> = ids
                .iter()
                .filter_map(|&id| {
                    let player = ctx.players.get(id)?;
                    let phase_points: BTreeMap<PhaseId, i64> = entry
                        .phases
                        .iter()
                        .filter(|(_, squad)| squad.contains(&id))
                        .map(|(&phase, _)| {
                            (phase, player_phase_points(ctx, id, phase, scores.through_period))
                        })
                        .collect();
                    Some(SquadPlayerRow {
                        id,
                        name: player.name.clone(),
                        team: player.team.code(),
                        position: player.position,
                        total: phase_points.values().sum(),
                        phase_points,
                    })
                })
                .collect();
            rows.sort_by_key(|r| (r.position, r.id));
            rows
        };

        let current = build(&current_ids);
        let previous = build(&previous_ids);
        out.push(SquadBreakdown {
            manager: manager.to_string(),
            total: scores.get(manager).map(|s| s.total()).unwrap_or(0),
            current_phase,
            current,
            previous,
        });
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOwnershipRow {
    pub id: PlayerId,
    pub name: String,
    pub team: &'static str,
    pub position: Position,
    /// Tenths of a million, rounded up to the next half million.
    pub cost: u32,
    pub season_points: i32,
    /// Managers holding the player in their latest phase, in roster order.
    pub managers: Vec<String>,
}

/// Every player in the directory with current ownership, ordered by
/// position, then cost and season points (both highest first), then id.
pub fn all_players(ctx: &RunContext) -> Vec<PlayerOwnershipRow> {
    let mut owners: HashMap<PlayerId, Vec<String>> = HashMap::new();
    for entry in ctx.roster.managers() {
        let Some(squad) = entry.latest_phase().and_then(|phase| entry.squad(phase)) else {
            continue;
        };
        for &id in squad {
            owners.entry(id).or_default().push(entry.name.clone());
        }
    }

    let mut rows: Vec<PlayerOwnershipRow> = ctx
        .players
        .iter()
        .map(|player| PlayerOwnershipRow {
            id: player.id,
            name: player.name.clone(),
            team: player.team.code(),
            position: player.position,
            cost: player.display_cost(),
            season_points: player.season_points,
            managers: owners.remove(&player.id).unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(b.cost.cmp(&a.cost))
            .then(b.season_points.cmp(&a.season_points))
            .then(a.id.cmp(&b.id))
    });
    rows
}

/// Plain-text report: league table, baseline note, squads and diagnostics.
pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let period = outcome.context.current_period;
    let _ = writeln!(out, "League table after period {period}");
    let _ = writeln!(out, "Squads: {}", outcome.squads_path.display());
    let _ = writeln!(out, "{}", baseline_note(outcome));
    let _ = writeln!(out);

    let rows = league_table(outcome);
    if rows.is_empty() {
        let _ = writeln!(out, "No manager data available to generate league table.");
        return out;
    }
    let _ = writeln!(
        out,
        "{:>4}  {:<4} {:<24} {:>6} {:>6} {:>6} {:>6} {:>7} {:>6}",
        "Pos", "", "Manager", "Total", "Week", "Above", "Top", "WD Pts", "WD Pos"
    );
    for row in &rows {
        let marker = if row.top_scorer { "*" } else { "" };
        let _ = writeln!(
            out,
            "{:>4}  {:<4} {:<24} {:>6} {:>6} {:>6} {:>6} {:>+7} {:>6}",
            row.rank,
            row.movement.symbol(),
            format!("{}{marker}", row.manager),
            row.total,
            row.period_points,
            dash_or(row.gap_to_above),
            dash_or(row.gap_to_top),
            row.original_difference,
            row.original_rank,
        );
    }
    if let Some((name, points)) = outcome.latest.top_scorer() {
        let _ = writeln!(out, "\n* top scorer for period {period}: {name} ({points})");
    }

    let phases: Vec<PhaseId> = outcome
        .context
        .phases
        .spans()
        .iter()
        .map(|s| s.id)
        .collect();
    for squad in &outcome.squads {
        let _ = writeln!(out, "\n{} - {} points", squad.manager, squad.total);
        write_squad_rows(
            &mut out,
            &format!("Current squad (phase {})", squad.current_phase),
            &squad.current,
            &phases,
        );
        write_squad_rows(&mut out, "Previous players", &squad.previous, &phases);
    }

    let _ = writeln!(out, "\nAll players");
    for row in all_players(&outcome.context) {
        let owners = if row.managers.is_empty() {
            "None".to_string()
        } else {
            row.managers.join(", ")
        };
        let _ = writeln!(
            out,
            "  {:>4}  {:<20} {:<4} {:<7} {:>3}.{} {:>5}  {owners}",
            row.id,
            row.name,
            row.team,
            row.position.code(),
            row.cost / 10,
            row.cost % 10,
            row.season_points,
        );
    }

    let diags = outcome.diagnostics.items();
    if !diags.is_empty() {
        let _ = writeln!(out, "\nDiagnostics ({}):", diags.len());
        for diag in diags {
            let _ = writeln!(out, "  [{:?}] {}", diag.kind, diag.message);
        }
    }
    out
}

fn baseline_note(outcome: &RunOutcome) -> String {
    let period = outcome.baseline.snapshot.as_ref().map(|s| s.period);
    match (outcome.baseline.kind, period) {
        (BaselineKind::Recomputed, Some(p)) => format!("Movement compared with period {p}"),
        (BaselineKind::Stored, Some(p)) => {
            format!("Movement compared with stored standings from period {p}")
        }
        (BaselineKind::Perturbed, Some(p)) => {
            format!("TEST MODE: movement compared with shuffled standings from period {p}")
        }
        _ => "No previous standings; every manager is new".to_string(),
    }
}

fn write_squad_rows(out: &mut String, title: &str, rows: &[SquadPlayerRow], phases: &[PhaseId]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {title}");
    for row in rows {
        let cells: Vec<String> = phases
            .iter()
            .map(|phase| match row.phase_points.get(phase) {
                Some(points) => format!("{points:>4}"),
                None => format!("{:>4}", "-"),
            })
            .collect();
        let _ = writeln!(
            out,
            "    {:<20} {:<4} {:<4} {} {:>5}",
            row.name,
            row.team,
            row.position.code(),
            cells.join(" "),
            row.total
        );
    }
}

fn dash_or(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
