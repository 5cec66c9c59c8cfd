//! Benchmarks for the capture hot path
//!
//! At 256 Hz the device delivers about 4.3 KB/s, so every stage here should
//! be orders of magnitude faster than the stream:
//! - framing and decoding realistic 64-byte reads, clean and with noise
//! - ring insertion and the 512-record snapshot copy taken per publish
//!
//! Platform: Cross-platform (synthetic packet streams, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use eeg_monitor::framing::{ByteAccumulator, PacketFramer, decode};
use eeg_monitor::test_utils::{encode_stream, records};
use eeg_monitor::types::PacketFormat;
use eeg_monitor::{SampleRecord, SampleRing};
use std::hint::black_box;

const READ_SIZE: usize = 64;

fn frame_all(format: PacketFormat, stream: &[u8]) -> usize {
    let mut framer = PacketFramer::new(format).expect("default format is valid");
    let mut acc = ByteAccumulator::default();
    let mut decoded = 0;
    for chunk in stream.chunks(READ_SIZE) {
        framer.push(&mut acc, chunk, |packet| {
            black_box(decode(&format, packet));
            decoded += 1;
        });
    }
    decoded
}

fn bench_framing(c: &mut Criterion) {
    let format = PacketFormat::default();
    let input = records(2560);
    let clean = encode_stream(&format, &input, &[]);
    let noisy = encode_stream(&format, &input, &[vec![], vec![0x00, 0x13, 0x7F], vec![0x42]]);

    let mut group = c.benchmark_group("framing");

    group.throughput(Throughput::Bytes(clean.len() as u64));
    group.bench_function("clean_stream_64b_reads", |b| {
        b.iter(|| black_box(frame_all(format, black_box(&clean))))
    });

    group.throughput(Throughput::Bytes(noisy.len() as u64));
    group.bench_function("noisy_stream_64b_reads", |b| {
        b.iter(|| black_box(frame_all(format, black_box(&noisy))))
    });

    group.finish();
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");

    group.bench_function("insert", |b| {
        let mut ring: SampleRing = SampleRing::new();
        let record = SampleRecord::new(1, [512, 512]);
        b.iter(|| ring.insert(black_box(record)))
    });

    group.bench_function("snapshot_512", |b| {
        let mut ring: SampleRing = SampleRing::new();
        for record in records(700) {
            ring.insert(record);
        }
        b.iter(|| black_box(ring.snapshot()))
    });

    group.finish();
}

criterion_group!(benches, bench_framing, bench_ring);
criterion_main!(benches);
