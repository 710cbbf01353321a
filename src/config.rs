use std::path::PathBuf;
use std::time::Duration;

use crate::output::OutputLayout;
use crate::registry::DEFAULT_PENDING_COLUMN;
use crate::retry::{MIN_POLL_INTERVAL, RetryPolicy};

pub const DEFAULT_REGISTRY_PATH: &str = "data/spl_match_links_merged.csv";
pub const DEFAULT_EVENT_DIR: &str = "data/stream_in/event";
pub const DEFAULT_STATS_DIR: &str = "data/stream_in/stats";
pub const DEFAULT_EVENT_URL: &str = "https://www.sofascore.com/api/v1/event/{event_id}";
pub const DEFAULT_STATS_URL: &str = "https://www.sofascore.com/api/v1/event/{event_id}/statistics";
pub const DEFAULT_WARMUP_URL: &str = "https://www.sofascore.com";
pub const FINISHED_STATUS_CODE: i64 = 100;

const ID_PLACEHOLDER: &str = "{event_id}";

/// URL templates for the match-data provider; `{event_id}` is substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub event_template: String,
    pub stats_template: String,
}

impl Endpoints {
    pub fn event_url(&self, event_id: u64) -> String {
        self.event_template
            .replace(ID_PLACEHOLDER, &event_id.to_string())
    }

    pub fn stats_url(&self, event_id: u64) -> String {
        self.stats_template
            .replace(ID_PLACEHOLDER, &event_id.to_string())
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            event_template: DEFAULT_EVENT_URL.to_string(),
            stats_template: DEFAULT_STATS_URL.to_string(),
        }
    }
}

/// Everything one listener run needs. Built at the binary boundary and passed down.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub registry_path: PathBuf,
    pub pending_column: String,
    pub output: OutputLayout,
    pub endpoints: Endpoints,
    pub warmup_url: Option<String>,
    pub retry: RetryPolicy,
    /// Pause after every fetch.
    pub pacing: Duration,
    pub finished_status: i64,
    /// Re-emit even when both streams already hold files for an id.
    pub force: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            pending_column: DEFAULT_PENDING_COLUMN.to_string(),
            output: OutputLayout::new(DEFAULT_EVENT_DIR, DEFAULT_STATS_DIR),
            endpoints: Endpoints::default(),
            warmup_url: Some(DEFAULT_WARMUP_URL.to_string()),
            retry: RetryPolicy::default(),
            pacing: Duration::from_millis(150),
            finished_status: FINISHED_STATUS_CODE,
            force: false,
        }
    }
}

impl ListenerConfig {
    /// Defaults, then process environment, then command-line arguments.
    pub fn from_env_and_args() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        cfg.apply_args(&args);
        cfg
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = get("LISTENER_REGISTRY") {
            self.registry_path = PathBuf::from(path);
        }
        if let Some(column) = get("LISTENER_PENDING_COLUMN") {
            self.pending_column = column;
        }
        if let Some(dir) = get("LISTENER_EVENT_DIR") {
            self.output.event_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("LISTENER_STATS_DIR") {
            self.output.stats_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("LISTENER_EVENT_URL") {
            self.endpoints.event_template = url;
        }
        if let Some(url) = get("LISTENER_STATS_URL") {
            self.endpoints.stats_template = url;
        }
        if let Some(url) = get("LISTENER_WARMUP_URL") {
            self.warmup_url = if url == "none" { None } else { Some(url) };
        }
        if let Some(secs) = get("LISTENER_MAX_WAIT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.retry.max_wait = Duration::from_secs(secs);
        }
        if let Some(ms) = get("LISTENER_POLL_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.retry.interval = Duration::from_millis(ms).max(MIN_POLL_INTERVAL);
        }
        if let Some(ms) = get("LISTENER_PACING_MS").and_then(|v| v.parse::<u64>().ok()) {
            self.pacing = Duration::from_millis(ms);
        }
        if let Some(code) = get("LISTENER_FINISHED_STATUS").and_then(|v| v.parse::<i64>().ok()) {
            self.finished_status = code;
        }
        if let Some(force) = get("FORCE") {
            self.force = force == "1";
        }
    }

    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(path) = arg_value(args, "--registry") {
            self.registry_path = PathBuf::from(path);
        }
        if let Some(dir) = arg_value(args, "--event-dir") {
            self.output.event_dir = PathBuf::from(dir);
        }
        if let Some(dir) = arg_value(args, "--stats-dir") {
            self.output.stats_dir = PathBuf::from(dir);
        }
        if args.iter().any(|a| a == "--force") {
            self.force = true;
        }
        if args.iter().any(|a| a == "--no-warmup") {
            self.warmup_url = None;
        }
    }
}

/// Reads `--name=value` or `--name value`; blank values are ignored.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let eq_prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&eq_prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
