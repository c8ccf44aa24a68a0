//! Quota model benchmarks.
//!
//! Exercises the pure, allocation-light paths the Reservation Engine's hot
//! loop depends on: capacity arithmetic, selector matching, cell ranking,
//! and age-band parsing — none of which touch the store.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use dialer_core::selector::{calculate_age, first_matching_band, parse_age_band};
use dialer_core::{OverflowPolicy, ProjectId, QuotaCell, SampleContact, SchemeId, Selector, SelectorValue};
use std::time::Duration;

fn cell(target: u32, soft_cap: Option<u32>, weight: f64) -> QuotaCell {
    let mut cell = QuotaCell::new(SchemeId::new(), Selector::new(), target);
    cell.soft_cap = soft_cap;
    cell.weight = weight;
    cell
}

fn bench_capacity_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("capacity_arithmetic");
    group.throughput(Throughput::Elements(1000));
    group.measurement_time(Duration::from_secs(10));

    let cells: Vec<QuotaCell> = (0..1000u32)
        .map(|i| {
            let mut cell = cell(100, Some(120), 1.0);
            cell.achieved = i % 80;
            cell.in_progress = i % 10;
            cell
        })
        .collect();

    group.bench_function("has_capacity_strict_1000", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(cell.has_capacity(OverflowPolicy::Strict));
            }
        });
    });

    group.bench_function("weighted_score_1000", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(cell.weighted_score(OverflowPolicy::Weighted));
            }
        });
    });

    group.finish();
}

fn bench_selector_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_matching");
    group.throughput(Throughput::Elements(1000));
    group.measurement_time(Duration::from_secs(10));

    let mut selector = Selector::new();
    selector.insert("gender".to_string(), SelectorValue::Scalar("female".to_string()));
    selector.insert(
        "province_code".to_string(),
        SelectorValue::List(vec!["10".to_string(), "20".to_string(), "30".to_string()]),
    );

    let samples: Vec<SampleContact> = (0..1000u32)
        .map(|i| {
            let mut sample = SampleContact::new(ProjectId::new(), format!("+1555{i:07}"));
            sample.gender = Some(if i % 2 == 0 { "female" } else { "male" }.to_string());
            sample.province_code = Some(format!("{}", 10 * (i % 4)));
            sample
        })
        .collect();

    group.bench_function("matches_selector_1000", |b| {
        b.iter(|| {
            for sample in &samples {
                black_box(sample.matches_selector(&selector));
            }
        });
    });

    group.finish();
}

fn bench_cell_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_ranking");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(10));

    let cells: Vec<QuotaCell> = (0..200u32)
        .map(|i| cell(50 + (i % 30), None, 1.0 + (i % 5) as f64))
        .collect();

    group.bench_function("rank_cells_weighted_200", |b| {
        b.iter_batched(
            || cells.clone(),
            |cells| black_box(dialer_core::rank_cells(cells, OverflowPolicy::Weighted)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_age_band_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("age_band_parsing");
    group.throughput(Throughput::Elements(1000));
    group.measurement_time(Duration::from_secs(10));

    let bands = vec!["18-24".to_string(), "25-34".to_string(), "35-54".to_string(), "55+".to_string()];
    let today = chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
    let dobs: Vec<chrono::NaiveDate> = (0..1000i32)
        .map(|i| chrono::NaiveDate::from_ymd_opt(1960 + (i % 60), (1 + (i % 12)) as u32, 1).unwrap())
        .collect();

    group.bench_function("calculate_age_and_band_1000", |b| {
        b.iter(|| {
            for dob in &dobs {
                let age = calculate_age(*dob, today);
                black_box(first_matching_band(&bands, age));
            }
        });
    });

    group.bench_function("parse_age_band_1000", |b| {
        b.iter(|| {
            for _ in 0..250 {
                for band in &bands {
                    black_box(parse_age_band(band));
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_capacity_arithmetic,
    bench_selector_matching,
    bench_cell_ranking,
    bench_age_band_parsing
);
criterion_main!(benches);
