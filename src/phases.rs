use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

pub type PhaseId = u8;

/// One contiguous block of scoring periods (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpan {
    pub id: PhaseId,
    pub first: u32,
    pub last: u32,
}

impl PhaseSpan {
    pub fn periods(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }

    pub fn contains(&self, period: u32) -> bool {
        self.periods().contains(&period)
    }
}

/// Validated, ordered phase table. Spans never overlap and are sorted by
/// their first period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    spans: Vec<PhaseSpan>,
}

impl PhaseTable {
    pub fn new(mut spans: Vec<PhaseSpan>) -> Result<Self, TrackerError> {
        if spans.is_empty() {
            return Err(TrackerError::InvalidPhaseTable(
                "at least one phase is required".to_string(),
            ));
        }
        spans.sort_by_key(|s| s.first);
        for span in &spans {
            if span.id == 0 {
                return Err(TrackerError::InvalidPhaseTable(
                    "phase ids must be positive".to_string(),
                ));
            }
            if span.first == 0 || span.first > span.last {
                return Err(TrackerError::InvalidPhaseTable(format!(
                    "phase {} has an empty or invalid range {}..={}",
                    span.id, span.first, span.last
                )));
            }
        }
        for pair in spans.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.first <= a.last {
                return Err(TrackerError::InvalidPhaseTable(format!(
                    "phases {} and {} overlap",
                    a.id, b.id
                )));
            }
        }
        let mut ids: Vec<PhaseId> = spans.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != spans.len() {
            return Err(TrackerError::InvalidPhaseTable(
                "phase ids must be unique".to_string(),
            ));
        }
        Ok(Self { spans })
    }

    /// Five phases over a 38-round season.
    pub fn reference() -> Self {
        Self {
            spans: vec![
                PhaseSpan { id: 1, first: 1, last: 11 },
                PhaseSpan { id: 2, first: 12, last: 20 },
                PhaseSpan { id: 3, first: 21, last: 24 },
                PhaseSpan { id: 4, first: 25, last: 29 },
                PhaseSpan { id: 5, first: 30, last: 38 },
            ],
        }
    }

    pub fn spans(&self) -> &[PhaseSpan] {
        &self.spans
    }

    pub fn get(&self, id: PhaseId) -> Option<&PhaseSpan> {
        self.spans.iter().find(|s| s.id == id)
    }

    pub fn contains_phase(&self, id: PhaseId) -> bool {
        self.get(id).is_some()
    }

    pub fn phase_of(&self, period: u32) -> Option<PhaseId> {
        self.spans.iter().find(|s| s.contains(period)).map(|s| s.id)
    }

    /// Like [`phase_of`](Self::phase_of), but a gap in the table is an error.
    pub fn require_phase(&self, period: u32) -> Result<PhaseId, TrackerError> {
        self.phase_of(period)
            .ok_or(TrackerError::PeriodOutsidePhases { period })
    }

    /// Every period in `1..=through` must fall inside a phase.
    pub fn ensure_covers(&self, through: u32) -> Result<(), TrackerError> {
        for period in 1..=through {
            self.require_phase(period)?;
        }
        Ok(())
    }

    pub fn first_period(&self) -> u32 {
        self.spans.first().map(|s| s.first).unwrap_or(1)
    }
}
