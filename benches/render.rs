//! Rendering benchmarks

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use minitel_terminal::caps::Capabilities;
use minitel_terminal::core::Layout;
use minitel_terminal::headless::{HeadlessLink, HeadlessScreen};
use minitel_terminal::sleeper::MockSleeper;
use minitel_terminal::transmit::{PacedTransmitter, Pacing};
use minitel_terminal::{PagePrompt, Terminal};

fn terminal(keys: &[u8]) -> Terminal<HeadlessLink> {
    Terminal::new(HeadlessLink::with_keys(keys), Capabilities::ansi(), Layout::MINITEL)
        .with_sleeper(Arc::new(MockSleeper::new()))
}

fn document(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("Line {}: ship log entry, hull status nominal", i))
        .collect()
}

fn bench_transmit(c: &mut Criterion) {
    let mut group = c.benchmark_group("transmit");

    let payload = vec![b'x'; 4096];
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("paced_4k", |b| {
        let transmitter = PacedTransmitter::new(Pacing::default());
        b.iter(|| {
            let mut sink = Vec::with_capacity(payload.len());
            let sleeper = MockSleeper::new();
            transmitter
                .send(&mut sink, black_box(&payload), &sleeper)
                .unwrap();
            black_box(sink)
        })
    });

    group.finish();
}

fn bench_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll");

    let lines = document(200);
    group.bench_function("body_200_lines", |b| {
        b.iter(|| {
            let mut term = terminal(b"");
            term.scroll_lines(Layout::MINITEL.body(), black_box(&lines), Duration::ZERO)
                .unwrap();
            black_box(term.into_link())
        })
    });

    group.finish();
}

fn bench_paginate(c: &mut Criterion) {
    let mut group = c.benchmark_group("paginate");

    let lines = document(200);
    let keys = vec![b'\r'; 16];
    group.bench_function("body_200_lines", |b| {
        b.iter(|| {
            let mut term = terminal(&keys);
            let outcome = term
                .paginate(black_box(&lines), Layout::MINITEL.body(), &PagePrompt::default())
                .unwrap();
            black_box(outcome)
        })
    });

    group.finish();
}

fn bench_headless(c: &mut Criterion) {
    let mut group = c.benchmark_group("headless");

    let mut term = terminal(b"");
    term.scroll_lines(Layout::MINITEL.body(), &document(500), Duration::ZERO)
        .unwrap();
    let output = term.link().output().to_vec();

    group.throughput(Throughput::Bytes(output.len() as u64));
    group.bench_function("replay_scroll", |b| {
        b.iter(|| {
            let mut screen = HeadlessScreen::new(80, 24);
            screen.process(black_box(&output));
            black_box(screen)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_transmit, bench_scroll, bench_paginate, bench_headless);
criterion_main!(benches);
