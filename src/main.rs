use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use phase_league::config::load_config;
use phase_league::feed::ApiFeed;
use phase_league::http_cache::ResponseCache;
use phase_league::report::render_text;
use phase_league::run::{RunOptions, run};
use phase_league::snapshot_store::SnapshotStore;

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    squads: Option<PathBuf>,
    out: Option<PathBuf>,
    debug: bool,
    test_movement: bool,
    offline: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = parse_args(std::env::args().skip(1).collect());
    init_tracing(args.debug);

    let mut config = load_config(args.config.as_deref()).context("load configuration")?;
    if let Some(path) = args.squads {
        config.squads.candidates = vec![path];
    }

    let cache = ResponseCache::new(&config.cache.dir, config.cache.expiry_hours);
    let mut feed = ApiFeed::new(config.api.clone(), cache).offline(args.offline);
    let store = SnapshotStore::new(&config.snapshot_path);
    let options = RunOptions {
        test_movement: args.test_movement,
    };

    let outcome = run(&config, &mut feed, &store, options, &mut rand::thread_rng())?;
    let report = render_text(&outcome);
    print!("{report}");

    if let Some(path) = args.out {
        std::fs::write(&path, &report)
            .with_context(|| format!("write report to {}", path.display()))?;
        tracing::info!("report written to {}", path.display());
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "phase_league=debug,warn"
    } else {
        "phase_league=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_args(args: Vec<String>) -> CliArgs {
    let mut cli = CliArgs::default();
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        match arg {
            "--debug" => cli.debug = true,
            "--test-movement" => cli.test_movement = true,
            "--offline" => cli.offline = true,
            "--config" | "--squads" | "--out" => {
                if let Some(next) = args.get(idx + 1).filter(|v| !v.trim().is_empty()) {
                    set_path(&mut cli, arg, PathBuf::from(next));
                    idx += 1;
                }
            }
            _ => match arg.split_once('=') {
                Some((flag @ ("--config" | "--squads" | "--out"), value))
                    if !value.trim().is_empty() =>
                {
                    set_path(&mut cli, flag, PathBuf::from(value.trim()));
                }
                _ => eprintln!("ignoring unknown argument {arg:?}"),
            },
        }
        idx += 1;
    }
    cli
}

fn set_path(cli: &mut CliArgs, flag: &str, path: PathBuf) {
    match flag {
        "--config" => cli.config = Some(path),
        "--squads" => cli.squads = Some(path),
        _ => cli.out = Some(path),
    }
}
