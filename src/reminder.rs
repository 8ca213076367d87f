//! Bedtime reminder
//!
//! A reminder fires when notifications are enabled and the local wall clock
//! reads the configured `HH:MM`. The CLI polls [`BedtimeReminder::is_due`]
//! once a minute.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::models::SleepSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedtimeReminder {
    at: NaiveTime,
    enabled: bool,
}

impl BedtimeReminder {
    pub fn new(at: NaiveTime, enabled: bool) -> Self {
        Self { at, enabled }
    }

    pub fn from_settings(settings: &SleepSettings) -> Self {
        Self::new(settings.bedtime_reminder, settings.enable_notifications)
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True during the minute matching the reminder time
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.enabled && now.hour() == self.at.hour() && now.minute() == self.at.minute()
    }

    pub fn message(&self, sleep_goal_hours: f64) -> String {
        format!(
            "It's {}. Time to wind down and get ready for bed ({}h sleep goal).",
            self.at.format("%H:%M"),
            sleep_goal_hours
        )
    }
}
