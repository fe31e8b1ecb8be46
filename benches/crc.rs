//! Benchmarks the CRC-16/Modbus and LRC hot path (§4.2): the engine runs
//! one of these over every request and response frame it builds or parses.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modbus_serial_master::crc::{crc16, lrc};

fn frame_of_len(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn bench_crc16(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for len in [8usize, 64, 256] {
        let data = frame_of_len(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| crc16(black_box(data)));
        });
    }
    group.finish();
}

fn bench_lrc(c: &mut Criterion) {
    let mut group = c.benchmark_group("lrc");
    for len in [8usize, 64, 256] {
        let data = frame_of_len(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| lrc(black_box(data)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc16, bench_lrc);
criterion_main!(benches);
