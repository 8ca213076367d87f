//! Weekly sleep metrics
//!
//! Pure functions turning a list of sleep records into the aggregate
//! statistics used by the advice rules. Nothing here performs I/O or keeps
//! state, so every function can be called from any thread.
//!
//! # Formulas
//!
//! Over the trailing seven-day window:
//!
//! - **Average / total**: mean and sum of nightly durations (1 decimal)
//! - **Consistency**: `max(0, 100 - 10 * stddev)` using the population
//!   standard deviation of durations (integer)
//! - **Deficit**: `max(0, 56 - total)` against an 8h x 7 target (1 decimal)
//! - **Quality**: `min(100, consistency + average / 8 * 50)` (integer)
//!
//! Intermediate values are unrounded; only the reported fields are rounded.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{SleepRecord, SleepSettings};

/// Nightly sleep target used by the weekly metrics
pub const TARGET_NIGHTLY_HOURS: f64 = 8.0;

/// Number of days in the analysis window
pub const WINDOW_DAYS: u64 = 7;

/// Weekly sleep target (8h x 7 nights)
pub const TARGET_WEEKLY_HOURS: f64 = TARGET_NIGHTLY_HOURS * WINDOW_DAYS as f64;

/// Aggregate statistics over the weekly window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyMetrics {
    /// Mean nightly duration in hours
    pub average_sleep_hours: f64,

    /// Total hours slept in the window
    pub total_sleep_hours: f64,

    /// Night-to-night regularity, 0-100 (higher is more regular)
    pub consistency_score: u8,

    /// Hours short of the weekly target, never negative
    pub deficit_hours: f64,

    /// Composite of consistency and duration against goal, 0-100
    pub quality_score: u8,
}

impl WeeklyMetrics {
    /// All-zero metrics reported for an empty window
    pub fn zero() -> Self {
        Self::default()
    }
}

/// First date of a trailing window of `days` calendar days ending on `today`.
///
/// The window holds exactly `days` dates: `today - (days - 1)` through `today`.
pub fn window_start(today: NaiveDate, days: u64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(NaiveDate::MIN)
}

/// Records dated within the seven calendar days ending on `now`'s date
pub fn select_weekly_window(records: &[SleepRecord], now: NaiveDateTime) -> Vec<SleepRecord> {
    let today = now.date();
    let start = window_start(today, WINDOW_DAYS);

    records
        .iter()
        .filter(|r| r.date >= start && r.date <= today)
        .cloned()
        .collect()
}

/// Compute weekly metrics for an already selected window
pub fn compute_metrics(window: &[SleepRecord]) -> WeeklyMetrics {
    let durations: Vec<f64> = window.iter().map(|r| r.duration_hours).collect();
    compute_metrics_from_durations(&durations)
}

/// Compute weekly metrics from raw nightly durations.
///
/// Durations are taken as given, including degenerate values from a
/// hand-edited store. Negative durations can push the composite quality
/// below zero; it is clamped to `0..=100` before rounding.
pub fn compute_metrics_from_durations(durations: &[f64]) -> WeeklyMetrics {
    if durations.is_empty() {
        return WeeklyMetrics::zero();
    }

    let total: f64 = durations.iter().sum();
    let average = total / durations.len() as f64;
    let std_dev = durations.iter().population_std_dev();

    let consistency = consistency_from_std_dev(std_dev);
    let deficit = (TARGET_WEEKLY_HOURS - total).max(0.0);
    let quality = consistency + (average / TARGET_NIGHTLY_HOURS) * 50.0;

    WeeklyMetrics {
        average_sleep_hours: round_to(average, 1),
        total_sleep_hours: round_to(total, 1),
        consistency_score: consistency.round() as u8,
        deficit_hours: round_to(deficit, 1),
        quality_score: quality.clamp(0.0, 100.0).round() as u8,
    }
}

/// Weekly metrics for the window ending at `now`
pub fn compute_weekly_metrics(records: &[SleepRecord], now: NaiveDateTime) -> WeeklyMetrics {
    compute_metrics(&select_weekly_window(records, now))
}

/// Unrounded consistency for a given standard deviation, floored at zero
pub fn consistency_from_std_dev(std_dev: f64) -> f64 {
    (100.0 - std_dev * 10.0).max(0.0)
}

/// Round half away from zero at the given number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Hours between bedtime and wake time.
///
/// A wake time at or before the bedtime is taken to be on the following day.
pub fn sleep_duration_hours(bedtime: NaiveTime, wakeup_time: NaiveTime) -> f64 {
    let mut seconds = (wakeup_time - bedtime).num_seconds();
    if seconds <= 0 {
        seconds += 24 * 60 * 60;
    }
    seconds as f64 / 3600.0
}

/// Dashboard and statistics figures for the whole log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub total_nights: usize,
    pub last_night_hours: Option<f64>,
    pub weekly_average_hours: f64,
    pub overall_average_hours: f64,
    pub average_quality: f64,
    pub sleep_goal_hours: f64,
}

/// Summary statistics over all records, relative to `today`.
///
/// `records` is expected newest first, as kept by [`crate::models::RecordSet`].
pub fn tracker_stats(
    records: &[SleepRecord],
    settings: &SleepSettings,
    today: NaiveDate,
) -> TrackerStats {
    let week_start = window_start(today, WINDOW_DAYS);
    let recent: Vec<f64> = records
        .iter()
        .filter(|r| r.date >= week_start)
        .map(|r| r.duration_hours)
        .collect();

    TrackerStats {
        total_nights: records.len(),
        last_night_hours: records.first().map(|r| r.duration_hours),
        weekly_average_hours: mean(&recent),
        overall_average_hours: mean(
            &records.iter().map(|r| r.duration_hours).collect::<Vec<_>>(),
        ),
        average_quality: mean(
            &records.iter().map(|r| r.quality as f64).collect::<Vec<_>>(),
        ),
        sleep_goal_hours: settings.sleep_goal_hours,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Render hours as `7h 30m`
pub fn format_duration(hours: f64) -> String {
    if hours <= 0.0 {
        return "0h 0m".to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

/// Short label for a 1-5 quality rating
pub fn quality_label(quality: u8) -> &'static str {
    match quality {
        1 => "Poor",
        2 => "Fair",
        3 => "Good",
        4 => "Great",
        5 => "Excellent",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_time_of_day;

    fn record_with_duration(date: NaiveDate, hours: f64) -> SleepRecord {
        let mut record = SleepRecord::new(
            date,
            parse_time_of_day("23:00").unwrap(),
            parse_time_of_day("07:00").unwrap(),
            3,
            None,
        )
        .unwrap();
        record.duration_hours = hours;
        record
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        let metrics = compute_metrics(&[]);
        assert_eq!(metrics, WeeklyMetrics::zero());
        assert_eq!(metrics.average_sleep_hours, 0.0);
        assert_eq!(metrics.total_sleep_hours, 0.0);
        assert_eq!(metrics.consistency_score, 0);
        assert_eq!(metrics.deficit_hours, 0.0);
        assert_eq!(metrics.quality_score, 0);
    }

    #[test]
    fn test_perfect_week() {
        let metrics = compute_metrics_from_durations(&[8.0; 7]);
        assert_eq!(metrics.average_sleep_hours, 8.0);
        assert_eq!(metrics.total_sleep_hours, 56.0);
        assert_eq!(metrics.deficit_hours, 0.0);
        assert_eq!(metrics.consistency_score, 100);
        assert_eq!(metrics.quality_score, 100);
    }

    #[test]
    fn test_short_week() {
        let metrics = compute_metrics_from_durations(&[4.0; 7]);
        assert_eq!(metrics.average_sleep_hours, 4.0);
        assert_eq!(metrics.total_sleep_hours, 28.0);
        assert_eq!(metrics.deficit_hours, 28.0);
        assert_eq!(metrics.consistency_score, 100);
        // 100 + 4/8 * 50 capped at 100
        assert_eq!(metrics.quality_score, 100);
    }

    #[test]
    fn test_irregular_week() {
        // mean 7, population stddev 2
        let metrics = compute_metrics_from_durations(&[5.0, 9.0, 5.0, 9.0]);
        assert_eq!(metrics.average_sleep_hours, 7.0);
        assert_eq!(metrics.total_sleep_hours, 28.0);
        assert_eq!(metrics.consistency_score, 80);
        assert_eq!(metrics.deficit_hours, 28.0);
        // 80 + 7/8 * 50 = 123.75 -> 100
        assert_eq!(metrics.quality_score, 100);
    }

    #[test]
    fn test_consistency_floor() {
        // stddev 11 -> 100 - 110 < 0
        let metrics = compute_metrics_from_durations(&[0.5, 22.5]);
        assert_eq!(metrics.consistency_score, 0);
        // 0 + 11.5/8 * 50 = 71.875
        assert_eq!(metrics.quality_score, 72);
    }

    #[test]
    fn test_rounding_uses_unrounded_intermediates() {
        let metrics = compute_metrics_from_durations(&[7.25, 7.25]);
        assert_eq!(metrics.average_sleep_hours, 7.3);
        assert_eq!(metrics.total_sleep_hours, 14.5);
        assert_eq!(metrics.deficit_hours, 41.5);
        // 100 + 7.25/8*50 capped
        assert_eq!(metrics.quality_score, 100);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(7.25, 1), 7.3);
        assert_eq!(round_to(7.24, 1), 7.2);
        assert_eq!(round_to(-0.25, 1), -0.3);
        assert_eq!(round_to(79.5, 0), 80.0);
    }

    #[test]
    fn test_weekly_window_covers_seven_dates() {
        let now = at(2024, 9, 30, 21);
        let records = vec![
            record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(), 8.0),
            record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 24).unwrap(), 7.0),
            record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 23).unwrap(), 6.0),
            record_with_duration(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(), 5.0),
        ];

        let window = select_weekly_window(&records, now);
        let dates: Vec<NaiveDate> = window.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 24).unwrap(),
            ]
        );
        // input untouched
        assert_eq!(records.len(), 4);

        let metrics = compute_weekly_metrics(&records, now);
        assert_eq!(metrics.total_sleep_hours, 15.0);
    }

    #[test]
    fn test_eight_consecutive_nights_keep_last_seven() {
        let last = NaiveDate::from_ymd_opt(2024, 9, 23).unwrap();
        let records: Vec<SleepRecord> = (0..8)
            .map(|offset| {
                record_with_duration(last.checked_sub_days(Days::new(offset)).unwrap(), 7.0)
            })
            .collect();

        let window = select_weekly_window(&records, at(2024, 9, 23, 20));
        assert_eq!(window.len(), 7);
        assert!(window.iter().all(|r| r.date >= NaiveDate::from_ymd_opt(2024, 9, 17).unwrap()));

        let metrics = compute_metrics(&window);
        assert_eq!(metrics.total_sleep_hours, 49.0);
        assert_eq!(metrics.deficit_hours, 7.0);
    }

    #[test]
    fn test_window_start() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        assert_eq!(window_start(today, 7), NaiveDate::from_ymd_opt(2024, 9, 24).unwrap());
        assert_eq!(window_start(today, 30), NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert_eq!(window_start(today, 1), today);
        assert_eq!(window_start(today, 0), today);
    }

    #[test]
    fn test_negative_durations_clamp_quality() {
        // consistency 100, average -20 -> 100 - 125 < 0
        let metrics = compute_metrics_from_durations(&[-20.0, -20.0]);
        assert_eq!(metrics.consistency_score, 100);
        assert_eq!(metrics.quality_score, 0);
        assert_eq!(metrics.average_sleep_hours, -20.0);
    }

    #[test]
    fn test_compute_metrics_is_idempotent() {
        let records: Vec<SleepRecord> = (1..=7)
            .map(|d| {
                let date = NaiveDate::from_ymd_opt(2024, 9, d).unwrap();
                record_with_duration(date, 5.0 + d as f64 / 3.0)
            })
            .collect();

        assert_eq!(compute_metrics(&records), compute_metrics(&records));
    }

    #[test]
    fn test_sleep_duration_hours() {
        let t = |s| parse_time_of_day(s).unwrap();
        assert_eq!(sleep_duration_hours(t("23:00"), t("07:00")), 8.0);
        assert_eq!(sleep_duration_hours(t("13:00"), t("14:30")), 1.5);
        assert_eq!(sleep_duration_hours(t("22:00"), t("22:00")), 24.0);
        assert_eq!(sleep_duration_hours(t("00:15"), t("00:00")), 23.75);
    }

    #[test]
    fn test_tracker_stats() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let mut newest = record_with_duration(today, 8.0);
        newest.quality = 5;
        let mut older = record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(), 6.0);
        older.quality = 2;

        let stats = tracker_stats(&[newest, older], &SleepSettings::default(), today);
        assert_eq!(stats.total_nights, 2);
        assert_eq!(stats.last_night_hours, Some(8.0));
        assert_eq!(stats.weekly_average_hours, 8.0);
        assert_eq!(stats.overall_average_hours, 7.0);
        assert_eq!(stats.average_quality, 3.5);
        assert_eq!(stats.sleep_goal_hours, 8.0);

        let empty = tracker_stats(&[], &SleepSettings::default(), today);
        assert_eq!(empty.last_night_hours, None);
        assert_eq!(empty.average_quality, 0.0);
    }

    #[test]
    fn test_tracker_stats_week_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let records = vec![
            record_with_duration(today, 8.0),
            record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 24).unwrap(), 6.0),
            record_with_duration(NaiveDate::from_ymd_opt(2024, 9, 23).unwrap(), 1.0),
        ];

        let stats = tracker_stats(&records, &SleepSettings::default(), today);
        assert_eq!(stats.weekly_average_hours, 7.0);
        assert_eq!(stats.overall_average_hours, 5.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0h 0m");
        assert_eq!(format_duration(7.5), "7h 30m");
        assert_eq!(format_duration(8.0), "8h 0m");
        assert_eq!(format_duration(6.999), "7h 0m");
    }

    #[test]
    fn test_quality_label() {
        assert_eq!(quality_label(1), "Poor");
        assert_eq!(quality_label(5), "Excellent");
        assert_eq!(quality_label(9), "Unknown");
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_quality_score_never_exceeds_100(
            durations in prop::collection::vec(0.1f64..24.0f64, 1..14)
        ) {
            let metrics = compute_metrics_from_durations(&durations);
            prop_assert!(metrics.quality_score <= 100);
            prop_assert!(metrics.consistency_score <= 100);
            prop_assert!(metrics.deficit_hours >= 0.0);
        }

        #[test]
        fn test_consistency_non_increasing_in_std_dev(
            a in 0.0f64..20.0f64,
            b in 0.0f64..20.0f64
        ) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(consistency_from_std_dev(high) <= consistency_from_std_dev(low));
            prop_assert!(consistency_from_std_dev(high) >= 0.0);
        }

        #[test]
        fn test_wider_spread_never_more_consistent(
            center in 5.0f64..9.0f64,
            spread in 0.0f64..4.0f64,
            extra in 0.0f64..4.0f64
        ) {
            let narrow = compute_metrics_from_durations(&[center - spread, center + spread]);
            let wide = compute_metrics_from_durations(
                &[center - spread - extra, center + spread + extra],
            );
            prop_assert!(wide.consistency_score <= narrow.consistency_score);
        }
    }
}
