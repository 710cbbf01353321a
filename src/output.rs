use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ListenerError;
use crate::normalize::{EventRecord, StatsRecord};

const EVENT_KIND: &str = "event";
const STATS_KIND: &str = "stats";
const EXT: &str = "json";

/// Where emitted pairs land: one directory per stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub event_dir: PathBuf,
    pub stats_dir: PathBuf,
}

/// Paths of one published event/stats pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub event_path: PathBuf,
    pub stats_path: PathBuf,
    pub timestamp_ms: i64,
}

impl OutputLayout {
    pub fn new(event_dir: impl Into<PathBuf>, stats_dir: impl Into<PathBuf>) -> Self {
        Self {
            event_dir: event_dir.into(),
            stats_dir: stats_dir.into(),
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), ListenerError> {
        for dir in [&self.event_dir, &self.stats_dir] {
            fs::create_dir_all(dir).map_err(|e| ListenerError::io(dir, e))?;
        }
        Ok(())
    }

    /// True when both streams already hold a file for `event_id`.
    ///
    /// A half pair (only one stream written) does not count.
    pub fn already_emitted(&self, event_id: u64) -> io::Result<bool> {
        Ok(has_output(&self.event_dir, EVENT_KIND, event_id)?
            && has_output(&self.stats_dir, STATS_KIND, event_id)?)
    }

    /// Publishes the pair: both files are staged under hidden temp names, then stats is
    /// renamed into place and the event file last.
    pub fn emit(&self, event: &EventRecord, stats: &StatsRecord) -> Result<Emission, ListenerError> {
        self.emit_with(event, stats, |from, to| fs::rename(from, to))
    }

    fn emit_with(
        &self,
        event: &EventRecord,
        stats: &StatsRecord,
        rename: impl Fn(&Path, &Path) -> io::Result<()>,
    ) -> Result<Emission, ListenerError> {
        let event_id = event.event_id;
        let event_body = to_json(event, &self.event_dir)?;
        let stats_body = to_json(stats, &self.stats_dir)?;

        let mut timestamp_ms = Utc::now().timestamp_millis();
        let (event_path, stats_path) = loop {
            let event_path = self.event_dir.join(file_name(EVENT_KIND, event_id, timestamp_ms));
            let stats_path = self.stats_dir.join(file_name(STATS_KIND, event_id, timestamp_ms));
            if !event_path.exists() && !stats_path.exists() {
                break (event_path, stats_path);
            }
            timestamp_ms += 1;
        };

        let event_tmp = staging_path(&event_path);
        let stats_tmp = staging_path(&stats_path);

        if let Err(source) = fs::write(&event_tmp, &event_body) {
            let _ = fs::remove_file(&event_tmp);
            return Err(ListenerError::EmitWriteFailure {
                path: event_tmp,
                source,
            });
        }
        if let Err(source) = fs::write(&stats_tmp, &stats_body) {
            let _ = fs::remove_file(&stats_tmp);
            let _ = fs::remove_file(&event_tmp);
            return Err(ListenerError::EmitWriteFailure {
                path: stats_tmp,
                source,
            });
        }

        if let Err(source) = rename(&stats_tmp, &stats_path) {
            let _ = fs::remove_file(&stats_tmp);
            let _ = fs::remove_file(&event_tmp);
            return Err(ListenerError::EmitWriteFailure {
                path: stats_path,
                source,
            });
        }
        if let Err(source) = rename(&event_tmp, &event_path) {
            let _ = fs::remove_file(&event_tmp);
            warn!(
                event_id,
                stats = %stats_path.display(),
                "stats file published without its event sibling"
            );
            return Err(ListenerError::EmitWriteFailure {
                path: event_path,
                source,
            });
        }

        debug!(
            event_id,
            event = %event_path.display(),
            stats = %stats_path.display(),
            "emitted pair"
        );
        Ok(Emission {
            event_path,
            stats_path,
            timestamp_ms,
        })
    }
}

pub fn file_name(kind: &str, event_id: u64, timestamp_ms: i64) -> String {
    format!("{kind}_{event_id}_{timestamp_ms}.{EXT}")
}

/// Matches `{kind}_{event_id}_{digits}.json` and nothing else.
pub fn is_output_name(name: &str, kind: &str, event_id: u64) -> bool {
    let prefix = format!("{kind}_{event_id}_");
    name.strip_prefix(&prefix)
        .and_then(|rest| rest.strip_suffix(&format!(".{EXT}")))
        .is_some_and(|ts| !ts.is_empty() && ts.bytes().all(|b| b.is_ascii_digit()))
}

fn has_output(dir: &Path, kind: &str, event_id: u64) -> io::Result<bool> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str()
            && is_output_name(name, kind, event_id)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn to_json<T: Serialize>(value: &T, dir: &Path) -> Result<Vec<u8>, ListenerError> {
    serde_json::to_vec(value).map_err(|e| ListenerError::EmitWriteFailure {
        path: dir.to_path_buf(),
        source: io::Error::other(e),
    })
}
