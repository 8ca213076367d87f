use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sleeprs::{advice, metrics, models};

/// Performance benchmarks for the sleep analysis pipeline
///
/// Histories of increasing length check that window selection and the
/// weekly rules stay cheap as the log grows.

fn create_history(nights: u64) -> Vec<models::SleepRecord> {
    let last = NaiveDate::from_ymd_opt(2024, 9, 23).unwrap();
    let bedtime = models::parse_time_of_day("23:00").unwrap();

    let records = (0..nights)
        .map(|offset| {
            let date = last.checked_sub_days(Days::new(offset)).unwrap();
            let minutes = (offset * 37 % 180) as u32;
            let wake = chrono::NaiveTime::from_hms_opt(5 + minutes / 60, minutes % 60, 0).unwrap();
            models::SleepRecord::new(date, bedtime, wake, (offset % 5 + 1) as u8, None).unwrap()
        })
        .collect();

    models::RecordSet::from_records(records).into_vec()
}

fn bench_weekly_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("Weekly Metrics");

    for &nights in &[7, 30, 365, 3650] {
        let history = create_history(nights);
        let now = NaiveDate::from_ymd_opt(2024, 9, 23)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();

        group.throughput(Throughput::Elements(nights));
        group.bench_with_input(
            BenchmarkId::new("compute_weekly_metrics", nights),
            &history,
            |b, history| b.iter(|| metrics::compute_weekly_metrics(black_box(history), now)),
        );
        group.bench_with_input(BenchmarkId::new("analyze", nights), &history, |b, history| {
            b.iter(|| advice::analyze(black_box(history), now))
        });
    }

    group.finish();
}

fn bench_record_set_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("Record Set");

    for &nights in &[30, 365] {
        let history = create_history(nights);

        group.throughput(Throughput::Elements(nights));
        group.bench_with_input(BenchmarkId::new("from_records", nights), &history, |b, history| {
            b.iter(|| models::RecordSet::from_records(black_box(history.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_weekly_metrics, bench_record_set_upsert);
criterion_main!(benches);
