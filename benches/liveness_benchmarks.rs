//! Benchmarks for the per-frame liveness path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liveness_capture::config::LivenessConfig;
use liveness_capture::constants::NUM_FACIAL_LANDMARKS;
use liveness_capture::face_detection::Point;
use liveness_capture::filters::create_filter;
use liveness_capture::head_pose::{yaw_ratio, YawThresholds};
use liveness_capture::liveness::{LivenessMachine, Observation};
use std::time::{Duration, Instant};

fn landmarks() -> Vec<Point> {
    (0..NUM_FACIAL_LANDMARKS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / NUM_FACIAL_LANDMARKS as f32;
            Point::new(200.0 + 240.0 * t, 150.0 + 80.0 * (t * std::f32::consts::TAU).sin())
        })
        .collect()
}

fn benchmark_yaw(c: &mut Criterion) {
    let points = landmarks();
    let thresholds = YawThresholds::default();

    c.bench_function("yaw_ratio_and_classify", |b| {
        b.iter(|| {
            let ratio = yaw_ratio(black_box(&points));
            black_box(ratio.map(|r| thresholds.classify(r)))
        });
    });
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("yaw_filters");

    // Noisy head turn: center, left, right, center
    let ratios: Vec<f64> = (0..120)
        .map(|i| {
            let base = match i / 30 {
                1 => 0.75,
                2 => 0.25,
                _ => 0.5,
            };
            base + 0.03 * (f64::from(i) * 1.7).sin()
        })
        .collect();

    for spec in ["none", "moving_average:5", "median:5", "exponential:0.5"] {
        group.bench_with_input(BenchmarkId::new("sequence", spec), &ratios, |b, ratios| {
            let mut filter = create_filter(spec).unwrap();
            b.iter(|| {
                filter.reset();
                for &r in ratios {
                    black_box(filter.apply(black_box(r)));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_machine(c: &mut Criterion) {
    let config = LivenessConfig::default();
    let script: Vec<Observation> = [(0.5, 10), (0.8, 5), (0.2, 5), (0.5, 10)]
        .iter()
        .flat_map(|&(ratio, n)| std::iter::repeat(Observation::Yaw(ratio)).take(n))
        .collect();

    c.bench_function("full_challenge", |b| {
        let mut machine = LivenessMachine::new(&config).unwrap();
        b.iter(|| {
            let mut now = Instant::now();
            machine.start(now);
            for &obs in &script {
                now += Duration::from_millis(33);
                black_box(machine.observe(obs, now));
            }
            black_box(machine.confirm_capture())
        });
    });
}

criterion_group!(benches, benchmark_yaw, benchmark_filters, benchmark_machine);
criterion_main!(benches);
