use crate::config::TrackerConfig;
use crate::model::{PeriodScores, PlayerDirectory, PlayerId, PointAdjustment, Roster};
use crate::phases::{PhaseId, PhaseTable};

/// Everything one run reads. Built once after ingestion and dropped when
/// the run ends; nothing in it outlives the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub phases: PhaseTable,
    pub adjustments: Vec<PointAdjustment>,
    pub players: PlayerDirectory,
    pub scores: PeriodScores,
    pub roster: Roster,
    /// Most recent period with data; missing scores are only reported here.
    pub current_period: u32,
}

impl RunContext {
    pub fn new(
        config: &TrackerConfig,
        players: PlayerDirectory,
        scores: PeriodScores,
        roster: Roster,
        current_period: u32,
    ) -> Self {
        Self {
            phases: config.phases.clone(),
            adjustments: config.adjustments.clone(),
            players,
            scores,
            roster,
            current_period,
        }
    }

    /// Sum of adjustments for one player in one phase.
    pub fn adjustment_for(&self, player: PlayerId, phase: PhaseId) -> i64 {
        self.adjustments
            .iter()
            .filter(|a| a.player == player && a.phase == phase)
            .map(|a| i64::from(a.delta))
            .sum()
    }
}
