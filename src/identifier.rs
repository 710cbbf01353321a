use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::FixtureRow;

const ID_COLUMNS: &[&str] = &["event_id", "eventid", "sofascore_event_id"];

static EVENT_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/event/(\d+)").expect("event link pattern is valid"));

/// Resolves the SofaScore event id for a registry row.
///
/// An explicit id column wins when its value is numeric; otherwise the first
/// `/event/<digits>` fragment found in any cell is used.
pub fn extract_event_id(row: &FixtureRow<'_>) -> Option<u64> {
    for (name, value) in row.cells() {
        if !ID_COLUMNS.contains(&name.trim().to_ascii_lowercase().as_str()) {
            continue;
        }
        if let Some(id) = parse_id_cell(value) {
            return Some(id);
        }
    }

    row.cells()
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .find_map(|value| {
            EVENT_LINK_RE
                .captures(value)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
}

/// Integer cell, accepting float spellings such as `14195502.0` by truncation.
fn parse_id_cell(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<u64>() {
        return Some(id);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.trunc() as u64)
}
