use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::hint::black_box;
use weatherbot::weather::Snapshot;
use weatherbot::{render, AccessGate};

fn bench_render(c: &mut Criterion) {
    let full = Snapshot::from_value(&json!({
        "fact": {
            "temp": -3,
            "feels_like": -9,
            "condition": "light-snow",
            "wind_speed": 4.5,
            "humidity": 81,
            "pressure_mm": 745
        }
    }));
    let unknown = Snapshot::from_value(&json!({ "fact": { "condition": "volcanic-ash" } }));

    c.bench_function("render_full_snapshot", |b| {
        b.iter(|| render(black_box(Some(&full))))
    });
    c.bench_function("render_unknown_condition", |b| {
        b.iter(|| render(black_box(Some(&unknown))))
    });
    c.bench_function("render_fallback", |b| b.iter(|| render(black_box(None))));
}

fn bench_decode(c: &mut Criterion) {
    let body = json!({
        "now": 1_700_000_000,
        "fact": { "temp": 20, "condition": "clear", "humidity": 40, "pressure_mm": 750 }
    });
    c.bench_function("snapshot_from_value", |b| {
        b.iter(|| Snapshot::from_value(black_box(&body)))
    });
}

fn bench_gate(c: &mut Criterion) {
    let gate = AccessGate::new(0..1_000);
    c.bench_function("allow_list_lookup", |b| {
        b.iter(|| gate.is_allowed(black_box(999)))
    });
}

criterion_group!(benches, bench_render, bench_decode, bench_gate);
criterion_main!(benches);
