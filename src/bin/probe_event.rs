use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{info, warn};

use spl_listener::config::{ListenerConfig, arg_value};
use spl_listener::fetch::{HttpFetcher, fetch_json};
use spl_listener::normalize::{to_event_record, to_stats_record};

const DEFAULT_OUT_DIR: &str = "data";

/// Fetches one event and its statistics and writes the normalized pair, for checking the
/// schema against live data without touching the registry.
fn main() -> Result<()> {
    spl_listener::load_dotenv();
    spl_listener::init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let event_id = arg_value(&args, "--event-id")
        .context("missing --event-id")?
        .parse::<u64>()
        .context("--event-id must be an integer")?;
    let out_dir = arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));

    let config = ListenerConfig::from_env_and_args();
    let fetcher = HttpFetcher::new()?;
    if let Some(url) = config.warmup_url.as_deref()
        && let Err(err) = fetcher.warm_up(url)
    {
        warn!(url, "warm-up request failed: {err:#}");
    }

    let event_url = config.endpoints.event_url(event_id);
    let event_json = fetch_json(&fetcher, &event_url, &config.retry)
        .ok_or_else(|| anyhow!("failed to load event json from {event_url}"))?;
    let event = to_event_record(&event_json).context("event payload did not normalize")?;

    let stats_url = config.endpoints.stats_url(event_id);
    let stats_json = fetch_json(&fetcher, &stats_url, &config.retry)
        .ok_or_else(|| anyhow!("failed to load stats json from {stats_url}"))?;
    let stats =
        to_stats_record(&stats_json, event_id).context("stats payload did not normalize")?;

    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let event_path = out_dir.join(format!("event_{event_id}.json"));
    let stats_path = out_dir.join(format!("stats_{event_id}.json"));
    write_pretty(&event_path, &event)?;
    write_pretty(&stats_path, &stats)?;
    info!(event_id, status = event.status_code, "probe complete");

    println!(
        "Event: {} vs {} ({}-{}), status {}",
        event.home_team, event.away_team, event.home_score, event.away_score, event.status_code
    );
    println!("xG: {:?} - {:?}", stats.home_xg, stats.away_xg);
    println!("Wrote {}", event_path.display());
    println!("Wrote {}", stats_path.display());
    Ok(())
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize record")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
