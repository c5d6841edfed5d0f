//! Criterion benchmarks for overlap detection and density rollup.
//!
//! Run with: `cargo bench --features synthetic --bench overlap_detection`
//!
//! Compares the coarse-to-fine detector against the exhaustive scan on
//! generated fields of increasing size.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use run_congestion::synthetic::SyntheticRace;
use run_congestion::{
    AnalysisConfig, DensityConfig, DensitySegment, DetectionConfig, ExecutionMode,
    analyze_density, analyze_overlaps, detect_segment_overlap, detect_segment_overlap_full_scan,
};
use std::time::Duration;

fn bench_single_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_segment");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    let config = DetectionConfig {
        step_km: 0.03,
        ..Default::default()
    };

    for runners in [100, 500, 2000] {
        let field = SyntheticRace::two_event(runners, 2.0, 42).generate();

        group.bench_with_input(BenchmarkId::new("coarse_fine", runners), &field, |b, f| {
            b.iter(|| {
                detect_segment_overlap(&f.pace, "A", "B", 0.0, 2.0, 0.0, 5.0, black_box(&config))
            });
        });

        // The exhaustive scan is quadratic per step; keep it to smaller fields
        if runners <= 500 {
            group.bench_with_input(BenchmarkId::new("full_scan", runners), &field, |b, f| {
                b.iter(|| {
                    detect_segment_overlap_full_scan(
                        &f.pace,
                        "A",
                        "B",
                        0.0,
                        2.0,
                        0.0,
                        5.0,
                        black_box(&config),
                    )
                });
            });
        }
    }

    group.finish();
}

fn bench_race_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("race_analysis");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    let field = SyntheticRace::three_event(1000, 7).generate();
    for mode in [ExecutionMode::Parallel, ExecutionMode::Sequential] {
        let config = AnalysisConfig {
            execution_mode: mode,
            ..Default::default()
        };
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| analyze_overlaps(&field.pace, &field.segments, &field.start_times, &config));
        });
    }

    group.finish();
}

fn bench_density(c: &mut Criterion) {
    let field = SyntheticRace::three_event(1000, 7).generate();
    let segments = vec![
        DensitySegment::new("Full", 0.0, 2.74, 3.0).with_event_b("10K"),
        DensitySegment::new("10K", 0.0, 4.5, 3.0).with_event_b("Half"),
    ];
    let config = DensityConfig::default();

    c.bench_function("density_two_segments", |b| {
        b.iter(|| analyze_density(&field.pace, &segments, &field.start_times, &config));
    });
}

criterion_group!(benches, bench_single_segment, bench_race_analysis, bench_density);
criterion_main!(benches);
