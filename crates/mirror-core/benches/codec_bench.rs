//! Criterion benchmarks for the control channel codec.
//!
//! Motion events dominate the inbound stream during a drag, so they get their
//! own round-trip benchmark.
//!
//! Run with:
//! ```bash
//! cargo bench --package mirror-core --bench codec_bench
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_core::protocol::codec::{decode_message, encode_message};
use mirror_core::protocol::messages::{
    ControlMessage, KeyEventMessage, MotionEventMessage, Pointer, StartClipboardSyncMessage,
    UiSettingsResponseMessage, UiSettingsSnapshot,
};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_motion_event() -> ControlMessage {
    ControlMessage::MotionEvent(MotionEventMessage {
        pointers: vec![
            Pointer {
                x: 540,
                y: 1200,
                pointer_id: 0,
                axis_values: BTreeMap::new(),
            },
            Pointer {
                x: 620,
                y: 1310,
                pointer_id: 1,
                axis_values: BTreeMap::new(),
            },
        ],
        action: 2,
        button_state: 0,
        action_button: 0,
        display_id: 0,
    })
}

fn make_key_event() -> ControlMessage {
    ControlMessage::KeyEvent(KeyEventMessage {
        action: 8,
        keycode: 29,
        meta_state: 0x41,
    })
}

fn make_text_input() -> ControlMessage {
    ControlMessage::TextInput("The quick brown fox jumps over the lazy dog".to_string())
}

fn make_start_clipboard_sync() -> ControlMessage {
    ControlMessage::StartClipboardSync(StartClipboardSyncMessage {
        max_synced_length: 5000,
        text: "x".repeat(1024),
    })
}

fn make_ui_settings_response() -> ControlMessage {
    ControlMessage::UiSettingsResponse(UiSettingsResponseMessage {
        request_id: 17,
        settings: UiSettingsSnapshot {
            dark_mode: true,
            foreground_application_id: "com.example.app".to_string(),
            app_locale: "en-US".to_string(),
            font_size_settable: true,
            font_size: 100,
            density_settable: true,
            density: 420,
            ..UiSettingsSnapshot::default()
        },
    })
}

fn fixtures() -> Vec<(&'static str, ControlMessage)> {
    vec![
        ("MotionEvent", make_motion_event()),
        ("KeyEvent", make_key_event()),
        ("TextInput", make_text_input()),
        ("StartClipboardSync(1KiB)", make_start_clipboard_sync()),
        ("UiSettingsResponse", make_ui_settings_response()),
    ]
}

/// Benchmarks `encode_message` for a representative set of kinds.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::new("msg", name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)))
        });
    }
    group.finish();
}

/// Benchmarks `decode_message` from pre-encoded bytes.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg);
        group.bench_with_input(BenchmarkId::new("msg", name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_decode_roundtrip");

    let motion = make_motion_event();
    group.bench_function("MotionEvent", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&motion));
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip_hot_path);
criterion_main!(benches);
