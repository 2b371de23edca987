//! Criterion benchmarks for the relay framing codecs.
//!
//! Measures stdio frame encode/decode and socket line decoding for typical
//! small control messages and a large daemon payload.
//!
//! Run with:
//! ```bash
//! cargo bench --package relay-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relay_core::protocol::{decode_frame, encode_frame, encode_line, LineBuffer};
use relay_core::Message;
use serde_json::{json, Value};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn object(value: Value) -> Message {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("fixtures are objects"),
    }
}

fn make_focus_ack() -> Message {
    object(json!({"command": "focusAck"}))
}

fn make_active_tab() -> Message {
    object(json!({"command": "setActiveTabUrl", "url": "https://example.com/some/long/path?q=1"}))
}

fn make_window_list() -> Message {
    let windows: Vec<Value> = (0..200)
        .map(|i| json!({"id": i, "title": format!("Window {i}"), "focused": i == 0}))
        .collect();
    object(json!({"seq": 99, "event": "windowList", "windows": windows}))
}

fn fixtures() -> Vec<(&'static str, Message)> {
    vec![
        ("focus_ack", make_focus_ack()),
        ("active_tab", make_active_tab()),
        ("window_list", make_window_list()),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for (name, message) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &message, |b, m| {
            b.iter(|| encode_frame(black_box(m)))
        });
    }
    group.finish();
}

fn bench_decode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for (name, message) in fixtures() {
        let Ok(bytes) = encode_frame(&message) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_frame(black_box(bytes)))
        });
    }
    group.finish();
}

fn bench_line_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_buffer");
    for (name, message) in fixtures() {
        let Ok(line) = encode_line(&message) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| {
                let mut buffer = LineBuffer::new();
                for chunk in line.chunks(512) {
                    let _ = buffer.extend(black_box(chunk));
                }
                buffer.next_message()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode_frame, bench_decode_frame, bench_line_buffer);
criterion_main!(benches);
