use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

pub const EXPECTED_GOALS_KEY: &str = "expectedGoals";

/// Minimal event schema consumed by the downstream batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: u64,
    pub season_year: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status_code: i64,
    pub start_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub event_id: u64,
    pub home_xg: Option<f64>,
    pub away_xg: Option<f64>,
}

pub fn parse_payload(raw: &str) -> Result<Value, ParseError> {
    serde_json::from_str(raw.trim()).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Reads `event.status.code`, if present and integral.
pub fn status_code(raw: &Value) -> Option<i64> {
    raw.get("event")?.get("status")?.get("code")?.as_i64()
}

pub fn to_event_record(raw: &Value) -> Result<EventRecord, ParseError> {
    let ev = lookup(raw, &["event"])?;
    Ok(EventRecord {
        event_id: as_u64(ev, &["event", "id"])?,
        season_year: as_season(ev)?,
        home_team: as_str(ev, &["event", "homeTeam", "name"])?,
        away_team: as_str(ev, &["event", "awayTeam", "name"])?,
        home_score: as_score(ev, &["event", "homeScore", "current"])?,
        away_score: as_score(ev, &["event", "awayScore", "current"])?,
        status_code: as_i64(ev, &["event", "status", "code"])?,
        start_timestamp: as_i64(ev, &["event", "startTimestamp"])?,
    })
}

/// Extracts expected goals from a statistics payload.
///
/// The first group holding an `expectedGoals` item wins; scanning stops once a home value
/// is found. A payload without the metric still yields a record, with both values null.
pub fn to_stats_record(raw: &Value, event_id: u64) -> Result<StatsRecord, ParseError> {
    let periods = lookup(raw, &["statistics"])?
        .as_array()
        .ok_or_else(|| wrong_type(&["statistics"], "an array"))?;
    let first = periods.first().ok_or_else(|| ParseError::MissingField {
        path: "statistics[0]".to_string(),
    })?;
    let groups = first
        .get("groups")
        .ok_or_else(|| ParseError::MissingField {
            path: "statistics[0].groups".to_string(),
        })?
        .as_array()
        .ok_or_else(|| ParseError::WrongType {
            path: "statistics[0].groups".to_string(),
            expected: "an array",
        })?;

    let mut home_xg = None;
    let mut away_xg = None;
    for group in groups {
        let items = group
            .get("statisticsItems")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if let Some(item) = items
            .iter()
            .find(|it| it.get("key").and_then(Value::as_str) == Some(EXPECTED_GOALS_KEY))
        {
            home_xg = item.get("homeValue").and_then(to_float);
            away_xg = item.get("awayValue").and_then(to_float);
        }
        if home_xg.is_some() {
            break;
        }
    }

    Ok(StatsRecord {
        event_id,
        home_xg,
        away_xg,
    })
}

/// Numbers pass through; strings are parsed after dropping a `%` sign.
pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace('%', "").trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value, ParseError> {
    let mut cur = root;
    for (depth, key) in path.iter().enumerate() {
        if !cur.is_object() {
            return Err(wrong_type(&path[..depth], "an object"));
        }
        cur = cur.get(*key).ok_or_else(|| ParseError::MissingField {
            path: path[..=depth].join("."),
        })?;
    }
    Ok(cur)
}

/// Lookup relative to the `event` object while reporting the full path.
fn nested<'a>(ev: &'a Value, path: &[&str]) -> Result<&'a Value, ParseError> {
    let mut cur = ev;
    for depth in 1..path.len() {
        if !cur.is_object() {
            return Err(wrong_type(&path[..depth], "an object"));
        }
        cur = cur.get(path[depth]).ok_or_else(|| ParseError::MissingField {
            path: path[..=depth].join("."),
        })?;
    }
    Ok(cur)
}

fn wrong_type(path: &[&str], expected: &'static str) -> ParseError {
    ParseError::WrongType {
        path: if path.is_empty() {
            "$".to_string()
        } else {
            path.join(".")
        },
        expected,
    }
}

fn as_str(ev: &Value, path: &[&str]) -> Result<String, ParseError> {
    nested(ev, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(path, "a string"))
}

fn as_u64(ev: &Value, path: &[&str]) -> Result<u64, ParseError> {
    nested(ev, path)?
        .as_u64()
        .ok_or_else(|| wrong_type(path, "an unsigned integer"))
}

fn as_i64(ev: &Value, path: &[&str]) -> Result<i64, ParseError> {
    nested(ev, path)?
        .as_i64()
        .ok_or_else(|| wrong_type(path, "an integer"))
}

fn as_score(ev: &Value, path: &[&str]) -> Result<u32, ParseError> {
    let raw = as_u64(ev, path)?;
    u32::try_from(raw).map_err(|_| wrong_type(path, "a score"))
}

fn as_season(ev: &Value) -> Result<String, ParseError> {
    const PATH: &[&str] = &["event", "season", "year"];
    match nested(ev, PATH)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        _ => Err(wrong_type(PATH, "a season year")),
    }
}
