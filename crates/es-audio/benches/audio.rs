use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use es_audio::fft::SpectralAnalyzer;
use es_audio::pipeline::AnalysisPipeline;
use es_audio::ring::RingBuffer;
use es_core::config::{SensingConfig, WindowKind};

fn probe_block(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = std::f64::consts::TAU * 18_000.0 * i as f64 / 48_000.0;
            0.5 * phase.sin() as f32
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let block = probe_block(4096);
    let mut analyzer = SpectralAnalyzer::new(4096, WindowKind::Blackman);
    let mut out = vec![0.0f32; analyzer.bin_count()];
    c.bench_function("analyze_4096", |b| {
        b.iter(|| analyzer.analyze_into(black_box(&block), &mut out));
    });
}

fn bench_tick(c: &mut Criterion) {
    let config = SensingConfig::default();
    let ring = RingBuffer::new(2, config.analysis.buffer_size);
    let interleaved: Vec<f32> = probe_block(4096).iter().flat_map(|&s| [s, s]).collect();
    ring.write(&interleaved, 2);
    let mut pipeline = AnalysisPipeline::new(&config, 48_000);
    let mut t = 0.0;
    c.bench_function("pipeline_tick", |b| {
        b.iter(|| {
            t += 1.0 / 30.0;
            black_box(pipeline.tick(&ring, 18_000.0, t))
        });
    });
}

fn bench_ring_write(c: &mut Criterion) {
    let ring = RingBuffer::new(2, 4096);
    let callback = vec![0.25f32; 512 * 2];
    c.bench_function("ring_write_512", |b| {
        b.iter(|| ring.write(black_box(&callback), 2));
    });
}

criterion_group!(benches, bench_analyze, bench_tick, bench_ring_write);
criterion_main!(benches);
