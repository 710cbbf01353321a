use std::fmt;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::Endpoints;
use crate::error::ListenerError;
use crate::fetch::{PageFetcher, fetch_json};
use crate::normalize::status_code;
use crate::retry::RetryPolicy;

/// Per-identifier progress through one run. States are only ever entered in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchState {
    Pending,
    EventFetched,
    ConfirmedFinished,
    StatsFetched,
    Emitted,
}

impl MatchState {
    pub fn next(self) -> Option<Self> {
        match self {
            MatchState::Pending => Some(MatchState::EventFetched),
            MatchState::EventFetched => Some(MatchState::ConfirmedFinished),
            MatchState::ConfirmedFinished => Some(MatchState::StatsFetched),
            MatchState::StatsFetched => Some(MatchState::Emitted),
            MatchState::Emitted => None,
        }
    }

    /// Moves one step forward. Panics on an attempt to skip a state.
    pub fn advance(&mut self, to: MatchState) {
        let from = *self;
        assert_eq!(from.next(), Some(to), "illegal transition {from} -> {to}");
        *self = to;
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchState::Pending => "pending",
            MatchState::EventFetched => "event_fetched",
            MatchState::ConfirmedFinished => "confirmed_finished",
            MatchState::StatsFetched => "stats_fetched",
            MatchState::Emitted => "emitted",
        };
        f.write_str(label)
    }
}

/// Raw payloads for a match the provider reports as finished.
#[derive(Debug, Clone)]
pub struct FinishedMatch {
    pub event_id: u64,
    pub event: Value,
    pub stats: Value,
}

/// Result of polling one identifier, with the state it came to rest in.
#[derive(Debug)]
pub struct PollReport {
    pub event_id: u64,
    pub state: MatchState,
    pub outcome: Result<FinishedMatch, ListenerError>,
}

pub struct StatusPoller<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    endpoints: &'a Endpoints,
    retry: RetryPolicy,
    pacing: Duration,
    finished_status: i64,
}

impl<'a, F: PageFetcher + ?Sized> StatusPoller<'a, F> {
    pub fn new(
        fetcher: &'a F,
        endpoints: &'a Endpoints,
        retry: RetryPolicy,
        pacing: Duration,
        finished_status: i64,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            retry,
            pacing,
            finished_status,
        }
    }

    pub fn poll(&self, event_id: u64) -> PollReport {
        let mut state = MatchState::Pending;

        let event_url = self.endpoints.event_url(event_id);
        let Some(event) = self.fetch(&event_url) else {
            return PollReport {
                event_id,
                state,
                outcome: Err(self.timeout(event_url)),
            };
        };
        state.advance(MatchState::EventFetched);

        let status = status_code(&event);
        if status != Some(self.finished_status) {
            debug!(event_id, ?status, "match not finished");
            return PollReport {
                event_id,
                state: MatchState::Pending,
                outcome: Err(ListenerError::StatusNotFinished { event_id, status }),
            };
        }
        state.advance(MatchState::ConfirmedFinished);

        let stats_url = self.endpoints.stats_url(event_id);
        let Some(stats) = self.fetch(&stats_url) else {
            return PollReport {
                event_id,
                state: MatchState::EventFetched,
                outcome: Err(self.timeout(stats_url)),
            };
        };
        state.advance(MatchState::StatsFetched);
        debug!(event_id, %state, "statistics fetched");

        PollReport {
            event_id,
            state,
            outcome: Ok(FinishedMatch {
                event_id,
                event,
                stats,
            }),
        }
    }

    fn fetch(&self, url: &str) -> Option<Value> {
        let value = fetch_json(self.fetcher, url, &self.retry);
        if !self.pacing.is_zero() {
            thread::sleep(self.pacing);
        }
        value
    }

    fn timeout(&self, url: String) -> ListenerError {
        ListenerError::FetchTimeout {
            url,
            waited_ms: self.retry.max_wait.as_millis(),
        }
    }
}
