use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use spl_listener::error::ParseError;
use spl_listener::fetch::extract_payload_text;
use spl_listener::normalize::{parse_payload, status_code, to_event_record, to_stats_record};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_json(name: &str) -> Value {
    parse_payload(&read_fixture(name)).expect("fixture should be json")
}

#[test]
fn parses_finished_event_fixture() {
    let raw = fixture_json("sofascore_event_finished.json");
    assert_eq!(status_code(&raw), Some(100));
    let ev = to_event_record(&raw).expect("fixture should normalize");
    assert_eq!(ev.event_id, 14195502);
    assert_eq!(ev.season_year, "24/25");
    assert_eq!(ev.home_team, "Al Hilal");
    assert_eq!(ev.away_team, "Al Nassr");
    assert_eq!(ev.home_score, 3);
    assert_eq!(ev.away_score, 1);
    assert_eq!(ev.status_code, 100);
    assert_eq!(ev.start_timestamp, 1727377200);
}

#[test]
fn not_started_event_lacks_scores() {
    let raw = fixture_json("sofascore_event_notstarted.json");
    assert_eq!(status_code(&raw), Some(0));
    let err = to_event_record(&raw).expect_err("scores are missing");
    assert_eq!(
        err,
        ParseError::MissingField {
            path: "event.homeScore.current".to_string()
        }
    );
}

#[test]
fn event_record_reports_mistyped_path() {
    let mut raw = fixture_json("sofascore_event_finished.json");
    raw["event"]["homeTeam"]["name"] = json!(42);
    let err = to_event_record(&raw).expect_err("name is not a string");
    assert_eq!(
        err,
        ParseError::WrongType {
            path: "event.homeTeam.name".to_string(),
            expected: "a string",
        }
    );

    let err = to_event_record(&json!({"event": "nope"})).expect_err("event not an object");
    assert!(matches!(err, ParseError::WrongType { ref path, .. } if path == "event"));

    let err = to_event_record(&json!({})).expect_err("no event");
    assert_eq!(
        err,
        ParseError::MissingField {
            path: "event".to_string()
        }
    );
}

#[test]
fn numeric_season_year_is_rendered_as_text() {
    let mut raw = fixture_json("sofascore_event_finished.json");
    raw["event"]["season"]["year"] = json!(2025);
    let ev = to_event_record(&raw).expect("numeric year accepted");
    assert_eq!(ev.season_year, "2025");
}

#[test]
fn stats_fixture_uses_first_period_expected_goals() {
    let raw = fixture_json("sofascore_stats.json");
    let stats = to_stats_record(&raw, 14195502).expect("fixture should normalize");
    assert_eq!(stats.event_id, 14195502);
    assert_eq!(stats.home_xg, Some(2.41));
    assert_eq!(stats.away_xg, Some(0.87));
}

#[test]
fn stats_without_expected_goals_are_null_but_valid() {
    let raw = fixture_json("sofascore_stats_no_xg.json");
    let stats = to_stats_record(&raw, 7).expect("missing metric is not an error");
    assert_eq!(stats.event_id, 7);
    assert_eq!(stats.home_xg, None);
    assert_eq!(stats.away_xg, None);
}

#[test]
fn stats_percent_strings_are_coerced() {
    let raw = json!({
        "statistics": [{
            "groups": [{
                "statisticsItems": [
                    {"key": "expectedGoals", "homeValue": "1.5%", "awayValue": "oops"}
                ]
            }]
        }]
    });
    let stats = to_stats_record(&raw, 1).expect("valid container");
    assert_eq!(stats.home_xg, Some(1.5));
    assert_eq!(stats.away_xg, None);
}

#[test]
fn stats_search_continues_past_null_home_value() {
    let raw = json!({
        "statistics": [{
            "groups": [
                {"statisticsItems": [{"key": "expectedGoals", "homeValue": null, "awayValue": 0.4}]},
                {"statisticsItems": [{"key": "expectedGoals", "homeValue": 1.1, "awayValue": 0.9}]},
                {"statisticsItems": [{"key": "expectedGoals", "homeValue": 9.9, "awayValue": 9.9}]}
            ]
        }]
    });
    let stats = to_stats_record(&raw, 1).expect("valid container");
    assert_eq!(stats.home_xg, Some(1.1));
    assert_eq!(stats.away_xg, Some(0.9));
}

#[test]
fn stats_container_problems_fail() {
    assert!(matches!(
        to_stats_record(&json!({}), 1),
        Err(ParseError::MissingField { .. })
    ));
    assert!(matches!(
        to_stats_record(&json!({"statistics": []}), 1),
        Err(ParseError::MissingField { ref path }) if path == "statistics[0]"
    ));
    assert!(matches!(
        to_stats_record(&json!({"statistics": [{"groups": {}}]}), 1),
        Err(ParseError::WrongType { .. })
    ));
    assert!(matches!(
        to_stats_record(&json!({"statistics": "x"}), 1),
        Err(ParseError::WrongType { .. })
    ));
}

#[test]
fn pre_wrapped_event_payload_parses() {
    let body = read_fixture("sofascore_event_finished.json")
        .replace('&', "&amp;")
        .replace('"', "&quot;");
    let html = format!("<html><head></head><body><pre>{body}</pre></body></html>");
    let text = extract_payload_text(&html);
    let raw = parse_payload(&text).expect("unwrapped payload is json");
    let ev = to_event_record(&raw).expect("normalizes");
    assert_eq!(ev.event_id, 14195502);
}

#[test]
fn invalid_json_is_reported() {
    assert!(matches!(
        parse_payload("{not json"),
        Err(ParseError::InvalidJson(_))
    ));
}
