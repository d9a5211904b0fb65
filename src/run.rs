use std::path::PathBuf;

use rand::Rng;
use tracing::info;

use crate::aggregate::{PeriodResult, ScoreTable, aggregate, period_points};
use crate::config::{BaselineSource, TrackerConfig};
use crate::context::RunContext;
use crate::error::{DiagnosticKind, Diagnostics, TrackerError};
use crate::feed::{DataSource, LeagueFeed};
use crate::model::PeriodScores;
use crate::report::{SquadBreakdown, squad_breakdowns};
use crate::snapshot_store::SnapshotStore;
use crate::squads::load_squads;
use crate::standings::{
    MovementRow, OriginalSquadRow, StandingsSnapshot, compare, original_squad_ranking,
    perturb_baseline, rank,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compare against a shuffled copy of the stored snapshot.
    pub test_movement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineKind {
    /// Standings for the previous period, rebuilt from this run's data.
    Recomputed,
    /// Snapshot persisted by an earlier run.
    Stored,
    /// Stored snapshot shuffled for test-movement mode.
    Perturbed,
    /// Nothing to compare against; everyone is new.
    None,
}

#[derive(Debug, Clone)]
pub struct Baseline {
    pub kind: BaselineKind,
    pub snapshot: Option<StandingsSnapshot>,
}

impl Baseline {
    fn none() -> Self {
        Self {
            kind: BaselineKind::None,
            snapshot: None,
        }
    }
}

/// Everything a run produces for the report.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub squads_path: PathBuf,
    pub context: RunContext,
    pub scores: ScoreTable,
    pub standings: StandingsSnapshot,
    pub baseline: Baseline,
    pub movements: Vec<MovementRow>,
    pub latest: PeriodResult,
    pub original_squads: Vec<OriginalSquadRow>,
    pub squads: Vec<SquadBreakdown>,
    pub diagnostics: Diagnostics,
}

/// One complete run: squads, ingestion, aggregation, comparison, and the
/// snapshot update.
pub fn run<F: LeagueFeed + ?Sized, R: Rng + ?Sized>(
    config: &TrackerConfig,
    feed: &mut F,
    store: &SnapshotStore,
    options: RunOptions,
    rng: &mut R,
) -> Result<RunOutcome, TrackerError> {
    let mut diags = Diagnostics::new();

    let squads = load_squads(&config.squads, &config.phases, &mut diags)?;

    let bootstrap = feed.bootstrap()?;
    note_source(&mut diags, "bootstrap", &bootstrap.source);
    let bootstrap = bootstrap.value;
    if bootstrap.players.is_empty() {
        tracing::warn!("bootstrap data contained no players");
    }

    let current_period = match bootstrap.current_period {
        Some(period) => period,
        None => {
            diags.push(
                DiagnosticKind::NoCurrentPeriod,
                "no current or finished period found; the season may not have started, using period 1",
            );
            1
        }
    };
    config.phases.ensure_covers(current_period)?;
    info!("current period: {current_period}");

    let mut scores = PeriodScores::new();
    for period in 1..=current_period {
        let resolved = feed.period_points(period, current_period)?;
        note_source(&mut diags, &format!("period {period}"), &resolved.source);
        if resolved.value.is_empty() {
            diags.push(
                DiagnosticKind::MissingScore,
                format!("no player points data found for period {period}"),
            );
        }
        scores.insert_period(period, resolved.value);
    }

    let ctx = RunContext::new(
        config,
        bootstrap.players,
        scores,
        squads.roster,
        current_period,
    );

    let table = aggregate(&ctx, current_period, &mut diags)?;
    let standings = rank(&table);
    let latest = period_points(&ctx, current_period, &mut diags)?;
    let original_squads = original_squad_ranking(&ctx, &table);
    let squad_rows = squad_breakdowns(&ctx, &table, &standings);

    let baseline = if options.test_movement {
        match store.load(&mut diags) {
            Some(mut snapshot) => {
                for note in perturb_baseline(&mut snapshot, rng) {
                    info!("test movement: {note}");
                }
                Baseline {
                    kind: BaselineKind::Perturbed,
                    snapshot: Some(snapshot),
                }
            }
            None => Baseline::none(),
        }
    } else {
        match config.baseline {
            BaselineSource::Recompute => recomputed_baseline(&ctx)?,
            BaselineSource::Stored => match store.load(&mut diags) {
                Some(snapshot) => Baseline {
                    kind: BaselineKind::Stored,
                    snapshot: Some(snapshot),
                },
                None => Baseline::none(),
            },
        }
    };
    let movements = compare(&standings, baseline.snapshot.as_ref());

    if let Err(err) = store.save(&standings) {
        tracing::warn!(
            "failed to write standings to {}: {err:#}",
            store.path().display()
        );
    }

    Ok(RunOutcome {
        squads_path: squads.path,
        context: ctx,
        scores: table,
        standings,
        baseline,
        movements,
        latest,
        original_squads,
        squads: squad_rows,
        diagnostics: diags,
    })
}

/// Standings as they stood one period earlier, from the same data.
pub fn recomputed_baseline(ctx: &RunContext) -> Result<Baseline, TrackerError> {
    if ctx.current_period <= ctx.phases.first_period() {
        return Ok(Baseline::none());
    }
    // Diagnostics for the earlier period would only repeat the current ones.
    let mut scratch = Diagnostics::quiet();
    let previous = aggregate(ctx, ctx.current_period - 1, &mut scratch)?;
    Ok(Baseline {
        kind: BaselineKind::Recomputed,
        snapshot: Some(rank(&previous)),
    })
}

fn note_source(diags: &mut Diagnostics, resource: &str, source: &DataSource) {
    match source {
        DataSource::Live => {}
        DataSource::Cache { age_secs } => {
            tracing::debug!("{resource}: cached copy ({} min old)", age_secs / 60);
        }
        DataSource::Fallback { age_secs, reason } => diags.push(
            DiagnosticKind::CacheFallback,
            format!(
                "{resource}: live fetch failed ({reason}); using cached copy from {:.1} hours ago",
                *age_secs as f64 / 3600.0
            ),
        ),
    }
}
