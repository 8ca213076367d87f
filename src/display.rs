//! Terminal rendering for the CLI
//!
//! Render functions return strings so they can be tested; the binary prints
//! them. Colors are applied with `colored`, which honours `NO_COLOR`.

use colored::*;
use tabled::{settings::Style, Table, Tabled};

use crate::advice::{AdviceSource, SleepIssue};
use crate::advisor::AdvisorReport;
use crate::metrics::{format_duration, quality_label, TrackerStats, WeeklyMetrics};
use crate::models::SleepRecord;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Bedtime")]
    bedtime: String,
    #[tabled(rename = "Wake-up")]
    wakeup: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Quality")]
    quality: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl From<&SleepRecord> for HistoryRow {
    fn from(record: &SleepRecord) -> Self {
        HistoryRow {
            date: record.date.format("%a %Y-%m-%d").to_string(),
            bedtime: record.bedtime.format("%H:%M").to_string(),
            wakeup: record.wakeup_time.format("%H:%M").to_string(),
            duration: format_duration(record.duration_hours),
            quality: format!("{} ({})", record.quality, quality_label(record.quality)),
            notes: record.notes.clone().unwrap_or_default(),
        }
    }
}

/// History as a table, newest first
pub fn render_history(records: &[&SleepRecord]) -> String {
    if records.is_empty() {
        return "No sleep records yet. Add one with `sleeprs log`.".to_string();
    }

    let rows: Vec<HistoryRow> = records.iter().map(|r| HistoryRow::from(*r)).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_stats(stats: &TrackerStats) -> String {
    let last_night = stats
        .last_night_hours
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());

    [
        "Sleep statistics".bold().to_string(),
        format!("  Nights logged:     {}", stats.total_nights),
        format!("  Last night:        {}", last_night),
        format!(
            "  7-day average:     {}",
            goal_colored(stats.weekly_average_hours, stats.sleep_goal_hours)
        ),
        format!(
            "  Overall average:   {}",
            goal_colored(stats.overall_average_hours, stats.sleep_goal_hours)
        ),
        format!("  Average quality:   {:.1}/5", stats.average_quality),
        format!("  Sleep goal:        {}h", stats.sleep_goal_hours),
    ]
    .join("\n")
}

fn goal_colored(hours: f64, goal: f64) -> ColoredString {
    let text = format_duration(hours);
    if hours <= 0.0 {
        text.normal()
    } else if hours >= goal {
        text.green()
    } else if hours >= goal - 1.0 {
        text.yellow()
    } else {
        text.red()
    }
}

fn score_colored(score: u8) -> ColoredString {
    let text = format!("{}", score);
    match score {
        80..=u8::MAX => text.green(),
        60..=79 => text.yellow(),
        _ => text.red(),
    }
}

pub fn render_metrics(metrics: &WeeklyMetrics, nights: usize) -> String {
    [
        format!("{} ({} nights)", "Last 7 days".bold(), nights),
        format!("  Average sleep:  {}h", metrics.average_sleep_hours),
        format!("  Total sleep:    {}h", metrics.total_sleep_hours),
        format!("  Sleep deficit:  {}h", metrics.deficit_hours),
        format!("  Consistency:    {}%", score_colored(metrics.consistency_score)),
        format!("  Quality score:  {}/100", score_colored(metrics.quality_score)),
    ]
    .join("\n")
}

/// Full analysis report: metrics, issues, improvements, advice and plan
pub fn render_report(report: &AdvisorReport) -> String {
    let analysis = &report.analysis;
    let mut lines = vec![
        render_metrics(&analysis.metrics, analysis.weekly_data.len()),
        String::new(),
        "Findings".bold().to_string(),
    ];
    lines.extend(
        analysis
            .issues
            .iter()
            .map(|issue| format!("  {} {}", issue_marker(issue), issue)),
    );

    if !analysis.improvements.is_empty() {
        lines.push(String::new());
        lines.push("Improvements".bold().to_string());
        lines.extend(analysis.improvements.iter().map(|i| format!("  - {}", i)));
    }

    lines.push(String::new());
    lines.push(format!("{} {}", "Advice".bold(), source_tag(report.advice.source)));
    lines.push(format!("  {}", report.advice.text.trim()));

    lines.push(String::new());
    lines.push(format!("{} {}", "Tonight".bold(), source_tag(report.plan.source)));
    lines.push(format!("  Target: {}h", report.plan.target_hours));
    lines.push(format!("  {}", report.plan.plan_text.trim()));
    if report.plan.source == AdviceSource::Provider {
        lines.push(format!("  {}", report.plan.suggested_bedtime_text.dimmed()));
    }

    lines.join("\n")
}

fn issue_marker(issue: &SleepIssue) -> ColoredString {
    if issue.is_problem() {
        "!".red().bold()
    } else {
        "✓".green().bold()
    }
}

fn source_tag(source: AdviceSource) -> ColoredString {
    match source {
        AdviceSource::Provider => "(advice service)".dimmed(),
        AdviceSource::Fallback => "(built-in)".dimmed(),
    }
}
