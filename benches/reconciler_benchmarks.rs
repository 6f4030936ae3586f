use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use floor_chart_wasm::domain::chart::{Chart, MoveDirection, ScaleOptions, SeriesDraft, SeriesKind};
use floor_chart_wasm::domain::coordinates::{CoordinateMapper, PixelPoint, PriceScale, TimeScale};
use floor_chart_wasm::domain::market_data::{DataPoint, RawPoint, SeriesReconciler, SeriesSource};
use std::hint::black_box;
use std::time::Duration;

/// Minute bars with a slow drift and some noise.
fn generate_rows(count: usize, offset: i64) -> Vec<RawPoint> {
    (0..count as i64)
        .map(|i| {
            let t = offset + i;
            let open = 50_000.0 + (t as f64 * 0.001).sin() * 1000.0 + (t as f64 * 0.1).sin() * 200.0;
            let close = open + (t as f64 * 0.3).cos() * 100.0;
            let high = open.max(close) + (t as f64 * 0.7).sin().abs() * 150.0;
            let low = open.min(close) - (t as f64 * 0.9).cos().abs() * 120.0;
            RawPoint::ohlc(1_640_000_000 + t * 60, open, high, low, close).with_volume(1000.0)
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciler");
    group.measurement_time(Duration::from_secs(5));

    for count in [1_000usize, 10_000, 50_000] {
        let existing = SeriesReconciler::merge(&generate_rows(count, 0), &Vec::<RawPoint>::new()).points;
        let page = generate_rows(200, -180);
        let tick = generate_rows(2, count as i64 - 1);

        group.bench_with_input(BenchmarkId::new("history", count), &count, |b, &count| {
            let rows = generate_rows(count, 0);
            b.iter(|| SeriesReconciler::merge(black_box(&rows), &existing))
        });
        group.bench_with_input(BenchmarkId::new("backfill", count), &count, |b, _| {
            b.iter(|| SeriesReconciler::apply_backfill(black_box(&existing), &page))
        });
        group.bench_with_input(BenchmarkId::new("tick", count), &count, |b, _| {
            b.iter(|| SeriesReconciler::apply_tick(black_box(&existing), &tick))
        });
    }
    group.finish();
}

fn bench_mapper(c: &mut Criterion) {
    let bars: Vec<DataPoint> = (0..10_000).map(|i| DataPoint::value(i * 60, 100.0)).collect();
    let time_scale = TimeScale::new(1200.0, 6.0, 0.5, 50.0);
    let price_scale = PriceScale::new(50.0, 150.0, 600.0, &ScaleOptions::default());
    let mapper = CoordinateMapper::new(&bars, 60.0, &time_scale, Some(&price_scale));

    c.bench_function("pixel_round_trip", |b| {
        b.iter(|| {
            let domain = mapper.pixel_to_domain(black_box(PixelPoint::new(613.0, 250.0)));
            domain.and_then(|point| mapper.domain_to_pixel(point))
        })
    });
}

fn bench_layout(c: &mut Criterion) {
    c.bench_function("layout_edits", |b| {
        b.iter(|| {
            let mut chart = Chart::new();
            let mut ids = Vec::new();
            for i in 0..20 {
                let draft = SeriesDraft::new(SeriesSource::parse("BTCUSDT"), SeriesKind::Line);
                let target = (i % 3 == 0).then(|| chart.anchor());
                let (next, id) = chart.add_series(draft, target);
                chart = next;
                ids.extend(id);
            }
            for id in &ids {
                chart = chart.move_series(*id, MoveDirection::Up);
            }
            black_box(chart.invariant_report())
        })
    });
}

criterion_group!(benches, bench_merge, bench_mapper, bench_layout);
criterion_main!(benches);
