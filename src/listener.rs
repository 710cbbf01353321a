use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::config::ListenerConfig;
use crate::error::ListenerError;
use crate::fetch::PageFetcher;
use crate::identifier::extract_event_id;
use crate::normalize::{to_event_record, to_stats_record};
use crate::output::Emission;
use crate::poller::{MatchState, StatusPoller};
use crate::registry::FixtureRegistry;

const PROGRESS_EVERY: usize = 20;

/// Counters for one listener run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pending_rows: usize,
    pub identifiers: usize,
    pub missing_identifier: usize,
    pub skipped_backfilled: usize,
    pub finished_seen: usize,
    pub not_finished: usize,
    pub fetch_timeouts: usize,
    pub parse_failures: usize,
    pub emit_failures: usize,
    pub other_failures: usize,
    pub written: usize,
    pub flipped: usize,
    pub registry_persisted: bool,
}

/// A pending identifier and every registry row that maps to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub event_id: u64,
    pub rows: Vec<usize>,
}

/// Groups pending rows by event id, in first-seen order.
pub fn collect_targets(registry: &FixtureRegistry, summary: &mut RunSummary) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();
    let mut by_id: HashMap<u64, usize> = HashMap::new();

    for idx in registry.pending_rows() {
        summary.pending_rows += 1;
        let Some(event_id) = registry.row(idx).as_ref().and_then(extract_event_id) else {
            summary.missing_identifier += 1;
            let err = ListenerError::IdentifierNotFound { row: idx };
            warn!(error = %err, "skipping row");
            continue;
        };
        match by_id.get(&event_id) {
            Some(&slot) => targets[slot].rows.push(idx),
            None => {
                by_id.insert(event_id, targets.len());
                targets.push(Target {
                    event_id,
                    rows: vec![idx],
                });
            }
        }
    }

    summary.identifiers = targets.len();
    targets
}

/// One full pass over the registry: poll each pending identifier, emit finished matches,
/// resolve their rows and persist the registry once at the end.
///
/// Only registry load and output-directory setup are fatal; everything that goes wrong for a
/// single identifier is counted and the run moves on.
pub fn run<F: PageFetcher + ?Sized>(
    config: &ListenerConfig,
    fetcher: &F,
) -> Result<RunSummary, ListenerError> {
    let mut registry = FixtureRegistry::load(&config.registry_path, &config.pending_column)?;
    config.output.ensure_dirs()?;

    let mut summary = RunSummary::default();
    let targets = collect_targets(&registry, &mut summary);
    if summary.pending_rows == 0 {
        info!(column = %config.pending_column, "no pending fixtures, nothing to do");
        return Ok(summary);
    }
    info!(
        pending = summary.pending_rows,
        identifiers = summary.identifiers,
        missing = summary.missing_identifier,
        force = config.force,
        "starting listener run"
    );

    let poller = StatusPoller::new(
        fetcher,
        &config.endpoints,
        config.retry,
        config.pacing,
        config.finished_status,
    );

    for (k, target) in targets.iter().enumerate() {
        match process_target(config, &poller, target, &mut summary) {
            Ok(None) => {}
            Ok(Some(emission)) => {
                summary.written += 1;
                for &row in &target.rows {
                    if registry.mark_resolved(row) {
                        summary.flipped += 1;
                    }
                }
                debug!(
                    event_id = target.event_id,
                    event = %emission.event_path.display(),
                    "fixture resolved"
                );
                if summary.written % PROGRESS_EVERY == 0 {
                    info!(
                        written = summary.written,
                        flipped = summary.flipped,
                        scanned = k + 1,
                        total = targets.len(),
                        "progress"
                    );
                }
            }
            Err(err) => record_failure(target.event_id, err, &mut summary),
        }
    }

    summary.registry_persisted = registry.persist_if_changed()?;
    Ok(summary)
}

fn process_target<F: PageFetcher + ?Sized>(
    config: &ListenerConfig,
    poller: &StatusPoller<'_, F>,
    target: &Target,
    summary: &mut RunSummary,
) -> Result<Option<Emission>, ListenerError> {
    let event_id = target.event_id;
    if !config.force {
        let done = config
            .output
            .already_emitted(event_id)
            .map_err(|e| ListenerError::io(&config.output.event_dir, e))?;
        if done {
            summary.skipped_backfilled += 1;
            debug!(event_id, "already backfilled");
            return Ok(None);
        }
    }

    let report = poller.poll(event_id);
    if report.state >= MatchState::EventFetched {
        summary.finished_seen += 1;
    }
    let finished = report.outcome?;

    let event = to_event_record(&finished.event)?;
    let stats = to_stats_record(&finished.stats, event_id)?;
    let emission = config.output.emit(&event, &stats)?;

    let mut state = report.state;
    state.advance(MatchState::Emitted);
    debug!(event_id, %state, "pair written");
    Ok(Some(emission))
}

fn record_failure(event_id: u64, err: ListenerError, summary: &mut RunSummary) {
    match &err {
        ListenerError::StatusNotFinished { .. } => {
            summary.not_finished += 1;
            debug!(event_id, "{err}");
        }
        ListenerError::FetchTimeout { .. } => {
            summary.fetch_timeouts += 1;
            warn!(event_id, "{err}");
        }
        ListenerError::Parse(_) => {
            summary.parse_failures += 1;
            warn!(event_id, "{err}");
        }
        ListenerError::EmitWriteFailure { .. } => {
            summary.emit_failures += 1;
            error!(event_id, "{err}");
        }
        _ => {
            summary.other_failures += 1;
            error!(event_id, "{err}");
        }
    }
}
