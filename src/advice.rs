//! Rule-based sleep advice
//!
//! Turns [`WeeklyMetrics`] into issues, improvement suggestions, a short
//! narrative and a plan for tonight. This is the deterministic path the
//! advisor uses whenever no external provider answers.

use chrono::{Days, Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::{self, round_to, WeeklyMetrics, TARGET_NIGHTLY_HOURS};
use crate::models::SleepRecord;

/// Average below which sleep is considered too short
pub const MIN_HEALTHY_AVERAGE: f64 = 7.0;

/// Average above which sleep is considered too long
pub const MAX_HEALTHY_AVERAGE: f64 = 9.0;

/// Average below which the strongest "sleep more" advice is given
pub const SEVERE_SHORTAGE_AVERAGE: f64 = 6.0;

/// Consistency below which the schedule is irregular
pub const MIN_CONSISTENCY: u8 = 70;

/// Weekly deficit above which it is flagged as significant
pub const SIGNIFICANT_DEFICIT_HOURS: f64 = 5.0;

/// Quality score below which quality needs work
pub const MIN_QUALITY_SCORE: u8 = 60;

/// Deficit above which tonight's target is raised
pub const REPAYMENT_DEFICIT_HOURS: f64 = 3.0;

/// Upper bound on tonight's target
pub const MAX_TARGET_HOURS: f64 = 10.0;

/// Local hour from which no bedtime is back-computed
pub const LATE_EVENING_HOUR: u32 = 22;

/// Assumed wake-up hour for tonight's plan
pub const WAKE_TARGET_HOUR: u32 = 6;

/// Problems detected in a week of sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepIssue {
    TooLittleSleep,
    TooMuchSleep,
    IrregularSchedule,
    SignificantDeficit,
    QualityNeedsImprovement,
    /// Reported alone when no rule fires
    Stable,
}

impl SleepIssue {
    pub fn description(&self) -> &'static str {
        match self {
            SleepIssue::TooLittleSleep => "too little average sleep",
            SleepIssue::TooMuchSleep => "too much average sleep",
            SleepIssue::IrregularSchedule => "irregular schedule",
            SleepIssue::SignificantDeficit => "significant deficit",
            SleepIssue::QualityNeedsImprovement => "quality needs improvement",
            SleepIssue::Stable => "sleep is fairly stable",
        }
    }

    pub fn is_problem(&self) -> bool {
        !matches!(self, SleepIssue::Stable)
    }
}

impl fmt::Display for SleepIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Where a piece of advice text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceSource {
    /// External text-generation provider
    Provider,
    /// Built-in rules
    Fallback,
}

/// Narrative advice for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvicePayload {
    pub text: String,
    pub source: AdviceSource,
}

impl AdvicePayload {
    /// Rule-based advice for the given metrics
    pub fn from_rules(metrics: &WeeklyMetrics) -> Self {
        AdvicePayload {
            text: generate_advice(metrics),
            source: AdviceSource::Fallback,
        }
    }
}

/// Recommendation for tonight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePlan {
    /// Full plan narrative (includes the bedtime suggestion on the rule path)
    pub plan_text: String,

    /// Suggested bedtime sentence
    pub suggested_bedtime_text: String,

    /// Hours of sleep to aim for tonight
    pub target_hours: f64,

    pub source: AdviceSource,
}

/// Full result of analysing the weekly window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Records inside the weekly window
    pub weekly_data: Vec<SleepRecord>,
    pub metrics: WeeklyMetrics,
    pub issues: Vec<SleepIssue>,
    pub improvements: Vec<String>,
}

/// Select the weekly window and evaluate every rule over it
pub fn analyze(records: &[SleepRecord], now: NaiveDateTime) -> AnalysisResult {
    let weekly_data = metrics::select_weekly_window(records, now);
    let metrics = metrics::compute_metrics(&weekly_data);
    let issues = identify_issues(&metrics);
    let improvements = suggest_improvements(&metrics);

    tracing::debug!(
        nights = weekly_data.len(),
        average = metrics.average_sleep_hours,
        deficit = metrics.deficit_hours,
        issues = issues.len(),
        "Weekly sleep analysed"
    );

    AnalysisResult {
        weekly_data,
        metrics,
        issues,
        improvements,
    }
}

/// Issues in rule order; `[Stable]` when none apply
pub fn identify_issues(metrics: &WeeklyMetrics) -> Vec<SleepIssue> {
    let mut issues = Vec::new();

    if metrics.average_sleep_hours < MIN_HEALTHY_AVERAGE {
        issues.push(SleepIssue::TooLittleSleep);
    } else if metrics.average_sleep_hours > MAX_HEALTHY_AVERAGE {
        issues.push(SleepIssue::TooMuchSleep);
    }

    if metrics.consistency_score < MIN_CONSISTENCY {
        issues.push(SleepIssue::IrregularSchedule);
    }

    if metrics.deficit_hours > SIGNIFICANT_DEFICIT_HOURS {
        issues.push(SleepIssue::SignificantDeficit);
    }

    if metrics.quality_score < MIN_QUALITY_SCORE {
        issues.push(SleepIssue::QualityNeedsImprovement);
    }

    if issues.is_empty() {
        issues.push(SleepIssue::Stable);
    }

    issues
}

/// Concrete improvement suggestions, each rule evaluated on its own
pub fn suggest_improvements(metrics: &WeeklyMetrics) -> Vec<String> {
    let mut improvements = Vec::new();

    if metrics.average_sleep_hours < MIN_HEALTHY_AVERAGE {
        improvements.push("Increase your sleep to 7-8 hours every night".to_string());
    }

    if metrics.consistency_score < MIN_CONSISTENCY {
        improvements.push("Go to bed and wake up at the same time every day".to_string());
    }

    if metrics.deficit_hours > SIGNIFICANT_DEFICIT_HOURS {
        improvements
            .push("Make up the deficit by sleeping 1-2 extra hours on rest days".to_string());
    }

    improvements
}

/// Narrative advice keyed on the average duration
pub fn generate_advice(metrics: &WeeklyMetrics) -> String {
    let average = metrics.average_sleep_hours;

    let mut advice = if average < SEVERE_SHORTAGE_AVERAGE {
        "You need more sleep. Aim for at least 7-8 hours each night \
         so your body has enough time to recover."
    } else if average < MIN_HEALTHY_AVERAGE {
        "Your sleep is a little short. Increase it to 7-8 hours for better health."
    } else if average > MAX_HEALTHY_AVERAGE {
        "You sleep quite a lot. Cutting back to 7-8 hours can help you avoid waking up groggy."
    } else {
        "Your sleep duration is well balanced! Keep up this routine."
    }
    .to_string();

    if metrics.consistency_score < MIN_CONSISTENCY {
        advice.push_str(
            " A regular schedule matters: try to go to bed and wake up at the same time every day.",
        );
    }

    advice
}

/// Hours to aim for tonight, raised gradually to repay a deficit
pub fn target_hours_for(metrics: &WeeklyMetrics) -> f64 {
    if metrics.deficit_hours > REPAYMENT_DEFICIT_HOURS {
        (TARGET_NIGHTLY_HOURS + metrics.deficit_hours / 7.0).min(MAX_TARGET_HOURS)
    } else {
        TARGET_NIGHTLY_HOURS
    }
}

/// Plan for tonight given the metrics and the current local time
pub fn generate_today_plan(metrics: &WeeklyMetrics, now: NaiveDateTime) -> SchedulePlan {
    let target_hours = target_hours_for(metrics);

    let mut plan_text = if metrics.deficit_hours > REPAYMENT_DEFICIT_HOURS {
        format!(
            "Tonight you should sleep {} hours to make up your sleep deficit. ",
            round_to(target_hours, 1)
        )
    } else {
        format!(
            "Tonight you should sleep {} hours to stay healthy. ",
            target_hours
        )
    };

    let suggested_bedtime_text = match suggested_bedtime(target_hours, now) {
        Some(bedtime) => format!(
            "Go to bed at {}:{:02} to wake up at {}:00.",
            bedtime.hour(),
            bedtime.minute(),
            WAKE_TARGET_HOUR
        ),
        None => "You should go to bed earlier to get enough sleep.".to_string(),
    };

    plan_text.push_str(&suggested_bedtime_text);

    SchedulePlan {
        plan_text,
        suggested_bedtime_text,
        target_hours,
        source: AdviceSource::Fallback,
    }
}

/// Bedtime that allows `target_hours` before tomorrow's wake target.
///
/// `None` from the late-evening cutoff onwards.
pub fn suggested_bedtime(target_hours: f64, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if now.hour() >= LATE_EVENING_HOUR {
        return None;
    }

    let wake_time = NaiveTime::from_hms_opt(WAKE_TARGET_HOUR, 0, 0)?;
    let wake_at = now
        .date()
        .checked_add_days(Days::new(1))?
        .and_time(wake_time);
    let sleep_for = Duration::seconds((target_hours * 3600.0).round() as i64);

    Some(wake_at - sleep_for)
}
