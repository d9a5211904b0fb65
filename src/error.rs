use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Conditions that stop a run. Everything recoverable is reported as a
/// [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no {resource} data available: live fetch failed ({reason}) and no cached copy exists")]
    IngestionUnavailable { resource: String, reason: String },

    #[error("squads file not found (looked for {})", format_paths(.searched))]
    SquadsNotFound { searched: Vec<PathBuf> },

    #[error("no valid manager entries could be parsed from {path} ({skipped} rows skipped)")]
    NoManagers { path: PathBuf, skipped: usize },

    #[error("scoring period {period} is not covered by any configured phase")]
    PeriodOutsidePhases { period: u32 },

    #[error("invalid phase table: {0}")]
    InvalidPhaseTable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    MissingScore,
    UnknownPlayer,
    SkippedSquadRow,
    MissingPhaseRoster,
    CorruptSnapshot,
    CacheFallback,
    NoCurrentPeriod,
}

/// A non-fatal condition surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Collects diagnostics for a run and mirrors each one to the log.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    quiet: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects without logging.
    pub fn quiet() -> Self {
        Self {
            items: Vec::new(),
            quiet: true,
        }
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diag = Diagnostic::new(kind, message);
        if !self.quiet {
            tracing::warn!(kind = ?diag.kind, "{}", diag.message);
        }
        self.items.push(diag);
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
