//! Muxer benchmarks

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reelwright::avi::{AviInspection, AviMuxer, MuxerOptions};

fn synthetic_frame(size: usize, seed: usize) -> Vec<u8> {
    (0..size).map(|i| ((i + seed) % 251) as u8).collect()
}

fn mux(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut muxer = AviMuxer::new(Cursor::new(Vec::new()), MuxerOptions::default());
    muxer.init().unwrap();
    for frame in frames {
        muxer.append_frame(frame).unwrap();
    }
    muxer.finalize(640, 480, 24).unwrap();
    muxer.into_inner().into_inner()
}

fn bench_mux(c: &mut Criterion) {
    let mut group = c.benchmark_group("mux_100_frames");

    for size in &[4096usize, 65536] {
        let frames: Vec<Vec<u8>> = (0..100).map(|i| synthetic_frame(*size, i)).collect();
        group.throughput(Throughput::Bytes((size * frames.len()) as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            &frames,
            |b, frames| b.iter(|| black_box(mux(frames))),
        );
    }

    group.finish();
}

fn bench_inspect(c: &mut Criterion) {
    let frames: Vec<Vec<u8>> = (0..1000).map(|i| synthetic_frame(512, i)).collect();
    let file = mux(&frames);

    c.bench_function("inspect_1000_frames", |b| {
        b.iter(|| {
            let info = AviInspection::read(&mut Cursor::new(&file)).unwrap();
            black_box(info.index.len())
        });
    });
}

criterion_group!(benches, bench_mux, bench_inspect);
criterion_main!(benches);
