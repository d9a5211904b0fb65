use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::TrackerError;
use crate::http_cache::{ResponseCache, fetch_revalidated};
use crate::http_client::api_client;
use crate::model::{Player, PlayerDirectory, PlayerId, Position, Team};

/// Where a resolved piece of data came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Live,
    /// Fresh cached copy used without a network request.
    Cache { age_secs: i64 },
    /// Live fetch failed; a cached copy of any age was used instead.
    Fallback { age_secs: i64, reason: String },
}

#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Resolved<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            source: DataSource::Live,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub players: PlayerDirectory,
    /// `None` when the event list names neither a current nor a finished
    /// period.
    pub current_period: Option<u32>,
}

/// Player id → points for one scoring period.
pub type PeriodPoints = HashMap<PlayerId, i32>;

/// Source of league data for one run.
pub trait LeagueFeed {
    fn bootstrap(&mut self) -> Result<Resolved<Bootstrap>, TrackerError>;

    /// `current_period` lets the feed decide how much to trust its cache.
    fn period_points(
        &mut self,
        period: u32,
        current_period: u32,
    ) -> Result<Resolved<PeriodPoints>, TrackerError>;
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BootstrapResponse {
    #[serde(default)]
    elements: Vec<BootstrapElement>,
    events: Option<Vec<BootstrapEvent>>,
}

#[derive(Debug, Deserialize)]
struct BootstrapElement {
    id: u32,
    web_name: String,
    #[serde(default)]
    element_type: u64,
    #[serde(default)]
    team: u64,
    #[serde(default)]
    now_cost: u32,
    #[serde(default)]
    total_points: i32,
}

#[derive(Debug, Deserialize)]
struct BootstrapEvent {
    id: u32,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    finished: bool,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    elements: Option<Vec<LiveElement>>,
}

#[derive(Debug, Deserialize)]
struct LiveElement {
    id: u32,
    stats: Option<LiveStats>,
}

#[derive(Debug, Deserialize)]
struct LiveStats {
    total_points: Option<i32>,
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    let resp: BootstrapResponse =
        serde_json::from_str(raw.trim()).context("invalid bootstrap json")?;

    let players = resp
        .elements
        .into_iter()
        .map(|e| Player {
            id: e.id,
            name: e.web_name,
            position: Position::from_element_type(e.element_type),
            team: Team::from_api_id(e.team),
            cost: e.now_cost,
            season_points: e.total_points,
        })
        .collect::<PlayerDirectory>();

    let current_period = resp.events.as_deref().and_then(current_period_from_events);

    Ok(Bootstrap {
        players,
        current_period,
    })
}

fn current_period_from_events(events: &[BootstrapEvent]) -> Option<u32> {
    if let Some(current) = events.iter().find(|e| e.is_current) {
        return Some(current.id);
    }
    events.iter().filter(|e| e.finished).map(|e| e.id).max()
}

/// Parses a period's live payload. Returns `None` when the payload has no
/// `elements` list at all; elements without a points total are skipped.
pub fn parse_period_json(raw: &str) -> Result<Option<PeriodPoints>> {
    let resp: LiveResponse = serde_json::from_str(raw.trim()).context("invalid period json")?;
    let Some(elements) = resp.elements else {
        return Ok(None);
    };
    let points = elements
        .into_iter()
        .filter_map(|e| {
            let total = e.stats.as_ref()?.total_points?;
            Some((e.id, total))
        })
        .collect();
    Ok(Some(points))
}

// ---------------------------------------------------------------------------
// HTTP-backed feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    LiveFirst,
    CacheFirst,
    CacheOnly,
}

/// Feed backed by the public API, with per-request cache files.
pub struct ApiFeed {
    api: ApiConfig,
    cache: ResponseCache,
    offline: bool,
}

impl ApiFeed {
    pub fn new(api: ApiConfig, cache: ResponseCache) -> Self {
        Self {
            api,
            cache,
            offline: false,
        }
    }

    /// Resolve every request from cache only.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn resolve<T>(
        &self,
        resource: &str,
        key: &str,
        url: &str,
        mode: FetchMode,
        parse: impl Fn(&str) -> Result<T>,
    ) -> Result<Resolved<T>, TrackerError> {
        let mode = if self.offline { FetchMode::CacheOnly } else { mode };

        if mode == FetchMode::CacheFirst {
            if let Some(entry) = self.cache.lookup_fresh(key) {
                if let Ok(value) = parse(&entry.body) {
                    debug!("{resource}: using cached copy");
                    return Ok(Resolved {
                        value,
                        source: DataSource::Cache {
                            age_secs: entry.age_secs(),
                        },
                    });
                }
            }
        }

        let live_err = if mode == FetchMode::CacheOnly {
            "offline mode".to_string()
        } else {
            match self.fetch_live(key, url, &parse) {
                Ok(value) => {
                    info!("{resource}: fetched live");
                    return Ok(Resolved::live(value));
                }
                Err(err) => format!("{err:#}"),
            }
        };

        let fallback = self
            .cache
            .lookup(key)
            .and_then(|entry| parse(&entry.body).ok().map(|v| (v, entry.age_secs())));
        match fallback {
            Some((value, age_secs)) => Ok(Resolved {
                value,
                source: DataSource::Fallback {
                    age_secs,
                    reason: live_err,
                },
            }),
            None => Err(TrackerError::IngestionUnavailable {
                resource: resource.to_string(),
                reason: live_err,
            }),
        }
    }

    fn fetch_live<T>(&self, key: &str, url: &str, parse: &impl Fn(&str) -> Result<T>) -> Result<T> {
        let client = api_client(&self.api)?;
        let cached = self.cache.lookup(key);
        let entry = fetch_revalidated(client, url, cached.as_ref())?;
        let value = parse(&entry.body)?;
        if let Err(err) = self.cache.store(key, &entry) {
            tracing::warn!("failed to write {key} to cache: {err:#}");
        }
        Ok(value)
    }
}

impl LeagueFeed for ApiFeed {
    fn bootstrap(&mut self) -> Result<Resolved<Bootstrap>, TrackerError> {
        let url = self.api.bootstrap_url.clone();
        self.resolve(
            "bootstrap",
            "bootstrap",
            &url,
            FetchMode::LiveFirst,
            parse_bootstrap_json,
        )
    }

    fn period_points(
        &mut self,
        period: u32,
        current_period: u32,
    ) -> Result<Resolved<PeriodPoints>, TrackerError> {
        // Recent periods can still be revised, so they always go live.
        let mode = if period + 1 >= current_period {
            FetchMode::LiveFirst
        } else {
            FetchMode::CacheFirst
        };
        let url = self.api.period_url_for(period);
        self.resolve(
            &format!("period {period}"),
            &format!("period_{period}"),
            &url,
            mode,
            |raw| Ok(parse_period_json(raw)?.unwrap_or_default()),
        )
    }
}
