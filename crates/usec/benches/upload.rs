//! Criterion benchmarks for the upload engine against the in-memory bus.
//!
//! Run: cargo bench -p usec --bench upload
//!
//! Results show:
//!   chunk_plan_*      — cost of planning row chunks for one panel
//!   upload_composite  — full 4 × 720 × 640 frame through the mock bus
//!   update_display    — refresh + power-off sequence

#![allow(
    clippy::unwrap_used, // benchmark helpers use unwrap for brevity
    clippy::expect_used,
    clippy::panic,
    missing_docs, // criterion_group! macro generates undocumented items
)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use usec::mocks::MockBus;
use usec::upload::RowChunks;
use usec::{Session, SessionConfig, UpdateMode};

fn bench_chunk_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_plan");
    for width in [360u32, 720, 1440, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &w| {
            b.iter(|| {
                RowChunks::new(black_box(w), 640, 61_440)
                    .unwrap()
                    .map(|chunk| chunk.rows)
                    .sum::<u32>()
            });
        });
    }
    group.finish();
}

fn bench_upload(c: &mut Criterion) {
    let bus = MockBus::new();
    let mut session = Session::open_with(&mut bus.opener(), SessionConfig::default()).unwrap();
    let image = vec![0xA5u8; session.composite_len().unwrap()];

    let mut group = c.benchmark_group("upload_composite");
    group.throughput(Throughput::Bytes(u64::try_from(image.len()).unwrap()));
    group.bench_function("4x720x640", |b| {
        b.iter(|| {
            session.upload_image(black_box(&image)).unwrap();
            bus.clear_calls();
        });
    });
    group.finish();
}

fn bench_update_display(c: &mut Criterion) {
    let bus = MockBus::new();
    let mut session = Session::open_with(&mut bus.opener(), SessionConfig::default()).unwrap();

    c.bench_function("update_display", |b| {
        b.iter(|| {
            session.update_display(UpdateMode::Gc16, true).unwrap();
            bus.clear_calls();
        });
    });
}

criterion_group!(benches, bench_chunk_plan, bench_upload, bench_update_display);
criterion_main!(benches);
