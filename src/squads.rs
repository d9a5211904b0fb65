// Squad file loading: manager → phase → player ids.
//
// Two layouts are accepted. CSV (`Squads.csv`): a one-cell row such as
// `Phase 2` opens a phase, then `Manager, 1, 2, 3` rows (ids may also sit
// comma-joined in one quoted cell). Text (`Squads.txt`): `Phase 2` lines and
// `Manager: 1, 2, 3` lines.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::SquadsConfig;
use crate::error::{DiagnosticKind, Diagnostics, TrackerError};
use crate::model::{PlayerId, Roster};
use crate::phases::{PhaseId, PhaseTable};

#[derive(Debug, Clone)]
pub struct SquadsLoad {
    pub path: PathBuf,
    pub roster: Roster,
    pub skipped: usize,
}

/// Finds the first existing squads file and parses it. A missing file writes
/// the example template (never over an existing file) and fails; a file with
/// no usable managers also fails.
pub fn load_squads(
    config: &SquadsConfig,
    phases: &PhaseTable,
    diags: &mut Diagnostics,
) -> Result<SquadsLoad, TrackerError> {
    let Some(path) = config.candidates.iter().find(|p| p.exists()).cloned() else {
        match write_example_squads(&config.example_path) {
            Ok(true) => tracing::info!(
                "wrote example squads template to {}",
                config.example_path.display()
            ),
            Ok(false) => {}
            Err(err) => tracing::warn!(
                "could not write example squads template {}: {err}",
                config.example_path.display()
            ),
        }
        return Err(TrackerError::SquadsNotFound {
            searched: config.candidates.clone(),
        });
    };

    tracing::info!("reading squads from {}", path.display());
    let (roster, skipped) = if is_csv(&path) {
        let file = fs::File::open(&path).map_err(|source| TrackerError::Io {
            path: path.clone(),
            source,
        })?;
        parse_csv_squads(file, phases, diags)
    } else {
        let text = fs::read_to_string(&path).map_err(|source| TrackerError::Io {
            path: path.clone(),
            source,
        })?;
        parse_text_squads(&text, phases, diags)
    };

    if roster.is_empty() {
        return Err(TrackerError::NoManagers { path, skipped });
    }
    tracing::info!(
        "loaded {} managers ({} rows skipped)",
        roster.len(),
        skipped
    );
    Ok(SquadsLoad {
        path,
        roster,
        skipped,
    })
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Parses the CSV layout. Returns the roster and the number of skipped rows.
pub fn parse_csv_squads(
    reader: impl Read,
    phases: &PhaseTable,
    diags: &mut Diagnostics,
) -> (Roster, usize) {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut builder = RosterBuilder::new(phases);
    for (idx, record) in rdr.records().enumerate() {
        let line = idx + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                builder.skip(diags, line, format!("unreadable row: {err}"));
                continue;
            }
        };
        let cells: Vec<&str> = record.iter().filter(|c| !c.is_empty()).collect();
        match cells.as_slice() {
            [] => {}
            [single] if single.to_ascii_lowercase().contains("phase") => {
                builder.open_phase(diags, line, single);
            }
            [name, ids @ ..] if !ids.is_empty() => {
                builder.add_row(diags, line, name, &ids.join(","));
            }
            _ => builder.skip(diags, line, format!("unrecognised row {:?}", cells)),
        }
    }
    builder.finish()
}

/// Parses the legacy text layout.
pub fn parse_text_squads(
    text: &str,
    phases: &PhaseTable,
    diags: &mut Diagnostics,
) -> (Roster, usize) {
    let mut builder = RosterBuilder::new(phases);
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("Phase ") && parse_phase_header(trimmed).is_some() {
            builder.open_phase(diags, line, trimmed);
            continue;
        }
        match trimmed.split_once(':') {
            Some((name, ids)) => builder.add_row(diags, line, name, ids),
            None => builder.skip(diags, line, format!("unrecognised line {trimmed:?}")),
        }
    }
    builder.finish()
}

fn parse_phase_header(cell: &str) -> Option<PhaseId> {
    cell.split_whitespace().nth(1)?.trim_end_matches(':').parse().ok()
}

struct RosterBuilder<'a> {
    phases: &'a PhaseTable,
    roster: Roster,
    current: Option<PhaseId>,
    skipped: usize,
}

impl<'a> RosterBuilder<'a> {
    fn new(phases: &'a PhaseTable) -> Self {
        Self {
            phases,
            roster: Roster::new(),
            current: None,
            skipped: 0,
        }
    }

    fn skip(&mut self, diags: &mut Diagnostics, line: usize, reason: String) {
        self.skipped += 1;
        diags.push(DiagnosticKind::SkippedSquadRow, format!("line {line}: {reason}"));
    }

    fn open_phase(&mut self, diags: &mut Diagnostics, line: usize, cell: &str) {
        match parse_phase_header(cell) {
            Some(phase) if self.phases.contains_phase(phase) => {
                tracing::debug!("found phase {phase}");
                self.current = Some(phase);
            }
            Some(phase) => {
                // Rows under an unknown phase are skipped until the next header.
                self.current = None;
                self.skip(diags, line, format!("phase {phase} is not in the phase table"));
            }
            None => self.skip(diags, line, format!("invalid phase header {cell:?}")),
        }
    }

    fn add_row(&mut self, diags: &mut Diagnostics, line: usize, name: &str, ids_text: &str) {
        let Some(phase) = self.current else {
            self.skip(diags, line, "manager row outside a known phase".to_string());
            return;
        };
        let name = name.trim();
        let name = name.strip_suffix(':').unwrap_or(name).trim_end();
        if name.is_empty() {
            self.skip(diags, line, "empty manager name".to_string());
            return;
        }

        let ids: Result<Vec<PlayerId>, _> = ids_text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<PlayerId>)
            .collect();
        let ids = match ids {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                self.skip(diags, line, format!("no player ids for {name}"));
                return;
            }
            Err(err) => {
                self.skip(
                    diags,
                    line,
                    format!("invalid player ids for {name}: {ids_text:?} ({err})"),
                );
                return;
            }
        };

        let count = ids.len();
        if self.roster.set_squad(name, phase, ids).is_some() {
            diags.push(
                DiagnosticKind::SkippedSquadRow,
                format!("line {line}: {name} listed twice for phase {phase}; keeping the later row"),
            );
        }
        tracing::debug!("added {count} players for {name} in phase {phase}");
    }

    fn finish(self) -> (Roster, usize) {
        (self.roster, self.skipped)
    }
}

/// Writes a small template squads file unless `path` already exists.
/// Returns whether a file was written.
pub fn write_example_squads(path: &Path) -> std::io::Result<bool> {
    let file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(err),
    };

    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);
    let rows: [&[&str]; 7] = [
        &["Phase 1"],
        &["Manager1", "1,2,3,4,5,6,7,8,9,10,11"],
        &["Manager2", "20,21,22,23,24,25,26,27,28,29,30"],
        &[""],
        &["Phase 2"],
        &["Manager1", "5,6,7,8,9,10,11,12,13,14,15"],
        &["Manager2", "25,26,27,28,29,30,31,32,33,34,35"],
    ];
    for row in rows {
        wtr.write_record(row).map_err(std::io::Error::other)?;
    }
    wtr.flush()?;
    Ok(true)
}
