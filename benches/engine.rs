use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kaosspad::audio::engine::CHANNELS;
use kaosspad::audio::{AudioCallback, Engine, EngineHandle};
use kaosspad::fx::EffectMode;
use std::hint::black_box;
use std::sync::Arc;

mod common;
use common::{SineFactory, placeholder_source};

const BUFFER_SIZE: usize = 256;

fn build_engine(dir: &std::path::Path) -> (Engine, EngineHandle) {
    let (engine, handle) = Engine::new(Arc::new(SineFactory));
    assert!(handle.load_source(placeholder_source(dir)));
    handle.set_xy(0.6, 0.7);
    handle.play();
    (engine, handle)
}

fn bench_engine_modes(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("Engine Render");
    group.throughput(Throughput::Elements(BUFFER_SIZE as u64));

    for mode in EffectMode::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            let (mut engine, handle) = build_engine(dir.path());
            handle.set_effect_mode(mode.tag());

            let mut output = vec![0.0f32; BUFFER_SIZE * CHANNELS];
            for _ in 0..10 {
                engine.render(&mut output);
            }

            b.iter(|| engine.render(black_box(&mut output)));
        });
    }

    group.finish();
}

fn bench_engine_idle(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("Engine Idle");

    group.bench_function("paused", |b| {
        let (mut engine, handle) = build_engine(dir.path());
        handle.pause();
        let mut output = vec![0.0f32; BUFFER_SIZE * CHANNELS];
        b.iter(|| engine.render(black_box(&mut output)));
    });

    group.bench_function("passthrough", |b| {
        let (mut engine, handle) = build_engine(dir.path());
        handle.set_effect_mode(-1);
        let mut output = vec![0.0f32; BUFFER_SIZE * CHANNELS];
        b.iter(|| engine.render(black_box(&mut output)));
    });

    group.finish();
}

fn bench_engine_buffer_sizes(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("Engine Buffer Sizes");

    for &buffer_size in &[64, 128, 256, 512, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let (mut engine, handle) = build_engine(dir.path());
                handle.set_effect_mode(EffectMode::Reverb.tag());
                let mut output = vec![0.0f32; buffer_size * CHANNELS];
                b.iter(|| engine.render(black_box(&mut output)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_engine_modes,
    bench_engine_idle,
    bench_engine_buffer_sizes
);
criterion_main!(benches);
