use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use spl_listener::config::ListenerConfig;
use spl_listener::fetch::HttpFetcher;
use spl_listener::listener;

fn main() -> Result<()> {
    spl_listener::load_dotenv();
    spl_listener::init_tracing();

    let config = ListenerConfig::from_env_and_args();
    let fetcher = HttpFetcher::new()?;
    if let Some(url) = config.warmup_url.as_deref() {
        if let Err(err) = fetcher.warm_up(url) {
            warn!(url, "warm-up request failed: {err:#}");
        }
        thread::sleep(Duration::from_secs(1));
    }

    let summary = listener::run(&config, &fetcher).with_context(|| {
        format!(
            "listener run failed for {}",
            config.registry_path.display()
        )
    })?;

    println!("Listener run complete");
    println!("Registry: {}", config.registry_path.display());
    println!(
        "Pending rows: {} (identifiers {}, missing id {})",
        summary.pending_rows, summary.identifiers, summary.missing_identifier
    );
    println!("Finished seen (status={}): {}", config.finished_status, summary.finished_seen);
    println!("Not finished yet: {}", summary.not_finished);
    println!("Written to stream folders: {}", summary.written);
    println!("Skipped (already backfilled): {}", summary.skipped_backfilled);
    println!("Rows flipped: {}", summary.flipped);
    let failures = summary.fetch_timeouts
        + summary.parse_failures
        + summary.emit_failures
        + summary.other_failures;
    if failures > 0 {
        println!(
            "Failures: timeouts={} parse={} emit={} other={}",
            summary.fetch_timeouts,
            summary.parse_failures,
            summary.emit_failures,
            summary.other_failures
        );
    }
    if summary.registry_persisted {
        println!("Registry updated: {}", config.registry_path.display());
    }
    println!("Event dir: {}", config.output.event_dir.display());
    println!("Stats dir: {}", config.output.stats_dir.display());
    if config.force {
        println!("Force was set (re-emitting even if already backfilled).");
    }

    Ok(())
}
