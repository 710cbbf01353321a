use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use spl_listener::csv::{parse_rows, to_csv_string};
use spl_listener::fetch::extract_payload_text;
use spl_listener::identifier::extract_event_id;
use spl_listener::normalize::{parse_payload, to_event_record, to_stats_record};
use spl_listener::registry::FixtureRow;

fn sample_registry(rows: usize) -> String {
    let mut out = String::from("home,away,date,is_future_fixture,match_link\n");
    for idx in 0..rows {
        out.push_str(&format!(
            "Team {idx},\"Club {idx}, FC\",2025-01-{:02},{},https://www.sofascore.com/api/v1/event/{}\n",
            idx % 28 + 1,
            idx % 2,
            14_000_000 + idx
        ));
    }
    out
}

fn bench_event_normalize(c: &mut Criterion) {
    c.bench_function("event_normalize", |b| {
        b.iter(|| {
            let raw = parse_payload(black_box(EVENT_JSON)).unwrap();
            let ev = to_event_record(&raw).unwrap();
            black_box(ev.event_id);
        })
    });
}

fn bench_stats_normalize(c: &mut Criterion) {
    c.bench_function("stats_normalize", |b| {
        b.iter(|| {
            let raw = parse_payload(black_box(STATS_JSON)).unwrap();
            let st = to_stats_record(&raw, 14195502).unwrap();
            black_box(st.home_xg);
        })
    });
}

fn bench_markup_unwrap(c: &mut Criterion) {
    let wrapped = format!(
        "<html><head></head><body><pre>{}</pre></body></html>",
        STATS_JSON.replace('"', "&quot;")
    );
    c.bench_function("markup_unwrap", |b| {
        b.iter(|| {
            let text = extract_payload_text(black_box(&wrapped));
            black_box(text.len());
        })
    });
}

fn bench_registry_roundtrip(c: &mut Criterion) {
    let raw = sample_registry(2_000);
    c.bench_function("registry_csv_roundtrip", |b| {
        b.iter(|| {
            let mut rows = parse_rows(black_box(&raw));
            let header = rows.remove(0);
            let out = to_csv_string(&header, &rows);
            black_box(out.len());
        })
    });
}

fn bench_identifier_scan(c: &mut Criterion) {
    let mut rows = parse_rows(&sample_registry(500));
    let header = rows.remove(0);
    c.bench_function("identifier_scan", |b| {
        b.iter(|| {
            let found = rows
                .iter()
                .filter_map(|cells| extract_event_id(&FixtureRow::new(&header, cells)))
                .count();
            black_box(found);
        })
    });
}

criterion_group!(
    perf,
    bench_event_normalize,
    bench_stats_normalize,
    bench_markup_unwrap,
    bench_registry_roundtrip,
    bench_identifier_scan
);
criterion_main!(perf);

static EVENT_JSON: &str = include_str!("../tests/fixtures/sofascore_event_finished.json");
static STATS_JSON: &str = include_str!("../tests/fixtures/sofascore_stats.json");
