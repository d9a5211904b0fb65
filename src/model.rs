use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::phases::PhaseId;

pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    Unknown,
}

impl Position {
    /// Maps the API's `element_type` code.
    pub fn from_element_type(code: u64) -> Self {
        match code {
            1 => Position::Goalkeeper,
            2 => Position::Defender,
            3 => Position::Midfielder,
            4 => Position::Forward,
            _ => Position::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
            Position::Unknown => "Unknown",
        }
    }
}

const TEAM_CODES: [&str; 20] = [
    "ARS", "AVL", "BOU", "BRE", "BHA", "CHE", "CRY", "EVE", "FUL", "IPS", "LEI", "LIV", "MCI",
    "MUN", "NEW", "NFO", "SOU", "TOT", "WHU", "WOL",
];

/// Club affiliation, keyed by the API's 1-based team number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Team(Option<u8>);

impl Team {
    pub fn from_api_id(id: u64) -> Self {
        if (1..=TEAM_CODES.len() as u64).contains(&id) {
            Team(Some(id as u8))
        } else {
            Team(None)
        }
    }

    pub fn code(self) -> &'static str {
        match self.0 {
            Some(id) => TEAM_CODES[usize::from(id) - 1],
            None => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: Team,
    /// Price in tenths of a million, as the API reports it.
    pub cost: u32,
    pub season_points: i32,
}

impl Player {
    /// Price in tenths, rounded up to the next half million.
    pub fn display_cost(&self) -> u32 {
        self.cost.div_ceil(5) * 5
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerDirectory {
    players: HashMap<PlayerId, Player>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Display label for diagnostics; falls back to the raw id.
    pub fn label(&self, id: PlayerId) -> String {
        match self.players.get(&id) {
            Some(p) => format!("{} (ID: {id})", p.name),
            None => format!("Unknown (ID: {id})"),
        }
    }
}

impl FromIterator<Player> for PlayerDirectory {
    fn from_iter<T: IntoIterator<Item = Player>>(iter: T) -> Self {
        let mut dir = PlayerDirectory::new();
        for player in iter {
            dir.insert(player);
        }
        dir
    }
}

/// Per-period point tables. A period that was never loaded is distinct from a
/// period where a player has no entry.
#[derive(Debug, Clone, Default)]
pub struct PeriodScores {
    periods: BTreeMap<u32, HashMap<PlayerId, i32>>,
}

impl PeriodScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_period(&mut self, period: u32, points: HashMap<PlayerId, i32>) {
        self.periods.insert(period, points);
    }

    pub fn has_period(&self, period: u32) -> bool {
        self.periods.contains_key(&period)
    }

    pub fn period(&self, period: u32) -> Option<&HashMap<PlayerId, i32>> {
        self.periods.get(&period)
    }

    pub fn get(&self, period: u32, player: PlayerId) -> Option<i32> {
        self.periods.get(&period)?.get(&player).copied()
    }

    pub fn loaded_periods(&self) -> impl Iterator<Item = u32> + '_ {
        self.periods.keys().copied()
    }
}

/// Manual correction for one player within one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAdjustment {
    pub player: PlayerId,
    pub phase: PhaseId,
    pub delta: i32,
}

/// One manager's squads, keyed by phase. Player ids keep file order and are
/// unique within a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerEntry {
    pub name: String,
    pub phases: BTreeMap<PhaseId, Vec<PlayerId>>,
}

impl ManagerEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phases: BTreeMap::new(),
        }
    }

    pub fn squad(&self, phase: PhaseId) -> Option<&[PlayerId]> {
        self.phases.get(&phase).map(Vec::as_slice)
    }

    pub fn holds(&self, phase: PhaseId, player: PlayerId) -> bool {
        self.squad(phase).is_some_and(|ids| ids.contains(&player))
    }

    pub fn first_phase(&self) -> Option<PhaseId> {
        self.phases.keys().next().copied()
    }

    pub fn latest_phase(&self) -> Option<PhaseId> {
        self.phases.keys().next_back().copied()
    }
}

/// All managers in first-seen order. That order is the ranking tie-break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    managers: Vec<ManagerEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a manager's squad for a phase, creating the manager on first
    /// sight. Returns the squad it replaced, if any.
    pub fn set_squad(
        &mut self,
        manager: &str,
        phase: PhaseId,
        players: Vec<PlayerId>,
    ) -> Option<Vec<PlayerId>> {
        let mut seen = std::collections::HashSet::new();
        let players: Vec<PlayerId> = players.into_iter().filter(|id| seen.insert(*id)).collect();
        let idx = match self.managers.iter().position(|m| m.name == manager) {
            Some(idx) => idx,
            None => {
                self.managers.push(ManagerEntry::new(manager));
                self.managers.len() - 1
            }
        };
        self.managers[idx].phases.insert(phase, players)
    }

    pub fn managers(&self) -> &[ManagerEntry] {
        &self.managers
    }

    pub fn get(&self, manager: &str) -> Option<&ManagerEntry> {
        self.managers.iter().find(|m| m.name == manager)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
