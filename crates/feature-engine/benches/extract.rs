use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feature_engine::{BasicStatistics, FeatureExtractor};
use lightcurve::FluxSeries;

fn light_curve(points: usize) -> FluxSeries {
    let flux = (0..points)
        .map(|i| {
            let t = i as f64 * 30.0 / 1440.0;
            let dip = if (t - 0.4).rem_euclid(2.5) < 0.12 { 0.008 } else { 0.0 };
            1.0 - dip + 0.0005 * (i as f64 * 0.37).sin()
        })
        .collect();
    FluxSeries::from_cadence(flux, 30.0).expect("valid cadence")
}

fn bench_basic_statistics(c: &mut Criterion) {
    let series = light_curve(2000);
    c.bench_function("basic_statistics_2000", |b| {
        b.iter(|| BasicStatistics::compute(black_box(series.flux())))
    });
}

fn bench_full_extraction(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let series = light_curve(1000);
    c.bench_function("extract_with_bls_1000", |b| {
        b.iter(|| extractor.extract(black_box(&series)))
    });
}

criterion_group!(benches, bench_basic_statistics, bench_full_extraction);
criterion_main!(benches);
