use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use lockstep_core::{Engine, MovingAverage, MovingStats, RobustScaler, Transform, Window};

// Synthetic trace: sine with additive white noise.
fn synth_trace(n: usize, noise_amp: f32, seed: u32) -> Vec<f32> {
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f32 / 200.0;
        let noise = (next_f32() * 2.0 - 1.0) * noise_amp;
        v.push(t.sin() + noise);
    }
    v
}

fn bench_moving_average(c: &mut Criterion) {
    let trace = synth_trace(10_000, 0.1, 42);
    c.bench_function("moving_average_apply_10k", |b| {
        b.iter_batched(
            || MovingAverage::with_window(Window::Samples(32)).unwrap(),
            |mut avg| {
                for &v in &trace {
                    black_box(avg.apply(v, 100.0));
                }
                avg
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_moving_stats(c: &mut Criterion) {
    let trace = synth_trace(10_000, 0.1, 7);
    let mut group = c.benchmark_group("moving_stats_apply_10k");
    group.bench_function("welford", |b| {
        b.iter_batched(
            MovingStats::new,
            |mut stats| {
                for &v in &trace {
                    black_box(stats.apply(v, 100.0));
                }
                stats
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("decay", |b| {
        b.iter_batched(
            || MovingStats::with_window(Window::Samples(64)).unwrap(),
            |mut stats| {
                for &v in &trace {
                    black_box(stats.apply(v, 100.0));
                }
                stats
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_robust_scaler(c: &mut Criterion) {
    let trace = synth_trace(10_000, 0.2, 99);
    c.bench_function("robust_scaler_put_10k", |b| {
        b.iter_batched(
            || RobustScaler::new().with_engine(Engine::new()),
            |mut scaler| {
                for &v in &trace {
                    black_box(scaler.put(v));
                }
                scaler
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_moving_average,
    bench_moving_stats,
    bench_robust_scaler
);
criterion_main!(benches);
