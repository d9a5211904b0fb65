use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::{DiagnosticKind, Diagnostics};
use crate::standings::StandingsSnapshot;

/// Holds the single most recent standings snapshot in one JSON file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored snapshot, or `None` when there is none to use. An
    /// unreadable or malformed file counts as none and is reported.
    pub fn load(&self, diags: &mut Diagnostics) -> Option<StandingsSnapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                diags.push(
                    DiagnosticKind::CorruptSnapshot,
                    format!("previous standings {} unreadable: {err}", self.path.display()),
                );
                return None;
            }
        };
        match serde_json::from_str::<StandingsSnapshot>(&raw) {
            Ok(snapshot) if snapshot.is_bijective() => Some(snapshot),
            Ok(_) => {
                diags.push(
                    DiagnosticKind::CorruptSnapshot,
                    format!(
                        "previous standings {} has duplicate or missing ranks",
                        self.path.display()
                    ),
                );
                None
            }
            Err(err) => {
                diags.push(
                    DiagnosticKind::CorruptSnapshot,
                    format!("previous standings {} is corrupted: {err}", self.path.display()),
                );
                None
            }
        }
    }

    /// Replaces the stored snapshot.
    pub fn save(&self, snapshot: &StandingsSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create snapshot dir {}", dir.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot).context("serialize standings")?;
        fs::write(&tmp, json).context("write standings")?;
        fs::rename(&tmp, &self.path).context("swap standings")?;
        Ok(())
    }
}
