use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use phase_league::config::load_config;
use phase_league::feed::{ApiFeed, LeagueFeed};
use phase_league::http_cache::ResponseCache;
use phase_league::model::{Player, PlayerDirectory};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config_path = parse_config_arg(&args);
    let queries: Vec<&str> = query_terms(&args);
    if queries.is_empty() {
        bail!("usage: player_lookup [--config PATH] [--offline] <name or id>...");
    }
    let offline = args.iter().any(|a| a == "--offline");

    let config = load_config(config_path.as_deref()).context("load configuration")?;
    let cache = ResponseCache::new(&config.cache.dir, config.cache.expiry_hours);
    let mut feed = ApiFeed::new(config.api.clone(), cache).offline(offline);
    let bootstrap = feed.bootstrap()?.value;

    for query in queries {
        let matches = lookup(&bootstrap.players, query);
        if matches.is_empty() {
            println!("{query}: no match");
            continue;
        }
        println!("{query}:");
        for player in matches {
            println!(
                "  {:>4}  {:<20} {:<4} {}",
                player.id,
                player.name,
                player.team.code(),
                player.position.code()
            );
        }
    }
    Ok(())
}

/// Exact id match, or a case-insensitive name substring match sorted by id.
fn lookup<'a>(players: &'a PlayerDirectory, query: &str) -> Vec<&'a Player> {
    if let Ok(id) = query.parse() {
        return players.get(id).into_iter().collect();
    }
    let needle = query.to_lowercase();
    let mut found: Vec<&Player> = players
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect();
    found.sort_by_key(|p| p.id);
    found
}

fn parse_config_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--config=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--config" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn query_terms(args: &[String]) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--config" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        terms.push(arg.as_str());
    }
    terms
}
