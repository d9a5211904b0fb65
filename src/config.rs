// Tracker configuration: optional tracker.toml plus environment overrides.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::PointAdjustment;
use crate::phases::{PhaseSpan, PhaseTable};

pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";

const DEFAULT_BOOTSTRAP_URL: &str = "https://fantasy.premierleague.com/api/bootstrap-static/";
const DEFAULT_PERIOD_URL: &str = "https://fantasy.premierleague.com/api/event/{period}/live/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_CACHE_EXPIRY_HOURS: u64 = 24;
const DEFAULT_SNAPSHOT_FILE: &str = "previous_standings.json";
const DEFAULT_EXAMPLE_SQUADS: &str = "example_squads.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSource {
    /// Rebuild the previous period's standings from this run's data.
    #[default]
    Recompute,
    /// Use the snapshot persisted by an earlier run.
    Stored,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bootstrap_url: String,
    pub period_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn period_url_for(&self, period: u32) -> String {
        self.period_url.replace("{period}", &period.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub expiry_hours: u64,
}

#[derive(Debug, Clone)]
pub struct SquadsConfig {
    pub candidates: Vec<PathBuf>,
    pub example_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub snapshot_path: PathBuf,
    pub squads: SquadsConfig,
    pub baseline: BaselineSource,
    pub phases: PhaseTable,
    pub adjustments: Vec<PointAdjustment>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let cache_dir = PathBuf::from(DEFAULT_CACHE_DIR);
        Self {
            api: ApiConfig {
                bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
                period_url: DEFAULT_PERIOD_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            snapshot_path: cache_dir.join(DEFAULT_SNAPSHOT_FILE),
            cache: CacheConfig {
                dir: cache_dir,
                expiry_hours: DEFAULT_CACHE_EXPIRY_HOURS,
            },
            squads: SquadsConfig {
                candidates: vec![PathBuf::from("Squads.csv"), PathBuf::from("Squads.txt")],
                example_path: PathBuf::from(DEFAULT_EXAMPLE_SQUADS),
            },
            baseline: BaselineSource::Recompute,
            phases: PhaseTable::reference(),
            adjustments: reference_adjustments(),
        }
    }
}

fn reference_adjustments() -> Vec<PointAdjustment> {
    vec![
        PointAdjustment { player: 218, phase: 4, delta: 8 },
        PointAdjustment { player: 324, phase: 3, delta: -1 },
        PointAdjustment { player: 450, phase: 4, delta: 1 },
    ]
}

// ---------------------------------------------------------------------------
// tracker.toml layout
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    snapshot: SnapshotSection,
    #[serde(default)]
    squads: SquadsSection,
    #[serde(default)]
    baseline: BaselineSection,
    phases: Option<Vec<PhaseSpan>>,
    adjustments: Option<Vec<PointAdjustment>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    bootstrap_url: Option<String>,
    period_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheSection {
    dir: Option<PathBuf>,
    expiry_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SquadsSection {
    files: Option<Vec<PathBuf>>,
    example: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BaselineSection {
    source: Option<BaselineSource>,
}

/// Loads configuration. An explicit `path` must exist; without one,
/// `tracker.toml` in the working directory is used when present and the
/// built-in defaults otherwise. Environment overrides apply last.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig, ConfigError> {
    let file = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            Some(read_config_file(path)?)
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Some(read_config_file(default_path)?)
            } else {
                None
            }
        }
    };

    let mut config = match file {
        Some(file) => from_file(file)?,
        None => TrackerConfig::default(),
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Parses TOML text on top of the defaults, without environment overrides.
pub fn parse_config(text: &str) -> Result<TrackerConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: PathBuf::from("<inline>"),
        source: e,
    })?;
    let config = from_file(file)?;
    validate(&config)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn from_file(file: ConfigFile) -> Result<TrackerConfig, ConfigError> {
    let mut config = TrackerConfig::default();

    if let Some(url) = file.api.bootstrap_url {
        config.api.bootstrap_url = url;
    }
    if let Some(url) = file.api.period_url {
        config.api.period_url = url;
    }
    if let Some(secs) = file.api.timeout_secs {
        config.api.timeout_secs = secs;
    }
    if let Some(agent) = file.api.user_agent {
        config.api.user_agent = agent;
    }

    if let Some(dir) = file.cache.dir {
        // The snapshot follows the cache dir unless placed explicitly.
        config.snapshot_path = dir.join(DEFAULT_SNAPSHOT_FILE);
        config.cache.dir = dir;
    }
    if let Some(hours) = file.cache.expiry_hours {
        config.cache.expiry_hours = hours;
    }
    if let Some(path) = file.snapshot.path {
        config.snapshot_path = path;
    }

    if let Some(files) = file.squads.files {
        config.squads.candidates = files;
    }
    if let Some(example) = file.squads.example {
        config.squads.example_path = example;
    }
    if let Some(source) = file.baseline.source {
        config.baseline = source;
    }

    if let Some(spans) = file.phases {
        config.phases = PhaseTable::new(spans).map_err(|e| ConfigError::ValidationError {
            field: "phases".to_string(),
            message: e.to_string(),
        })?;
        // Reference corrections are tied to the reference phase table.
        config.adjustments.clear();
    }
    if let Some(adjustments) = file.adjustments {
        config.adjustments = adjustments;
    }

    Ok(config)
}

fn apply_env_overrides(config: &mut TrackerConfig) {
    if let Some(dir) = env_path("TRACKER_CACHE_DIR") {
        config.snapshot_path = dir.join(DEFAULT_SNAPSHOT_FILE);
        config.cache.dir = dir;
    }
    if let Some(hours) = env::var("TRACKER_CACHE_EXPIRY_HOURS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        config.cache.expiry_hours = hours;
    }
    if let Some(path) = env_path("TRACKER_SNAPSHOT_PATH") {
        config.snapshot_path = path;
    }
    if let Some(path) = env_path("TRACKER_SQUADS") {
        config.squads.candidates = vec![path];
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn validate(config: &TrackerConfig) -> Result<(), ConfigError> {
    if config.api.bootstrap_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.bootstrap_url".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if !config.api.period_url.contains("{period}") {
        return Err(ConfigError::ValidationError {
            field: "api.period_url".to_string(),
            message: "must contain a {period} placeholder".to_string(),
        });
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "api.timeout_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.cache.expiry_hours == 0 {
        return Err(ConfigError::ValidationError {
            field: "cache.expiry_hours".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.squads.candidates.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "squads.files".to_string(),
            message: "at least one squads file is required".to_string(),
        });
    }
    for adj in &config.adjustments {
        if !config.phases.contains_phase(adj.phase) {
            return Err(ConfigError::ValidationError {
                field: "adjustments".to_string(),
                message: format!(
                    "adjustment for player {} references unknown phase {}",
                    adj.player, adj.phase
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = TrackerConfig::default();
        assert_eq!(config.phases.spans().len(), 5);
        assert_eq!(config.adjustments.len(), 3);
        assert_eq!(config.cache.expiry_hours, 24);
        assert_eq!(
            config.api.period_url_for(7),
            "https://fantasy.premierleague.com/api/event/7/live/"
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [cache]
            dir = "tmp-cache"

            [baseline]
            source = "stored"

            [[phases]]
            id = 1
            first = 1
            last = 19

            [[phases]]
            id = 2
            first = 20
            last = 38

            [[adjustments]]
            player = 10
            phase = 2
            delta = -3
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("tmp-cache"));
        assert_eq!(
            config.snapshot_path,
            PathBuf::from("tmp-cache").join("previous_standings.json")
        );
        assert_eq!(config.baseline, BaselineSource::Stored);
        assert_eq!(config.phases.phase_of(20), Some(2));
        assert_eq!(
            config.adjustments,
            vec![PointAdjustment { player: 10, phase: 2, delta: -3 }]
        );
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn adjustment_for_unknown_phase_is_rejected() {
        let err = parse_config(
            r#"
            [[adjustments]]
            player = 10
            phase = 9
            delta = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "adjustments"));
    }

    #[test]
    fn overlapping_phases_fail_validation() {
        let err = parse_config(
            r#"
            [[phases]]
            id = 1
            first = 1
            last = 10

            [[phases]]
            id = 2
            first = 10
            last = 20
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "phases"));
    }
}
