use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SleepRsError};
use crate::metrics::{sleep_duration_hours, window_start};

/// Lowest accepted quality rating
pub const MIN_QUALITY: u8 = 1;

/// Highest accepted quality rating
pub const MAX_QUALITY: u8 = 5;

/// Single night of logged sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    /// Stable identity, preserved when the record for a date is replaced
    pub id: String,

    /// Calendar date the night is filed under (unique within a record set)
    pub date: NaiveDate,

    /// Time the user went to bed
    #[serde(with = "hhmm")]
    pub bedtime: NaiveTime,

    /// Time the user woke up (next day when not after bedtime)
    #[serde(with = "hhmm")]
    pub wakeup_time: NaiveTime,

    /// Derived sleep duration in hours
    #[serde(rename = "duration")]
    pub duration_hours: f64,

    /// Subjective quality rating, 1 (poor) to 5 (excellent)
    pub quality: u8,

    /// Optional free-text notes (never forwarded to the advice provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Whether the record has been pushed to remote storage
    #[serde(default)]
    pub synced: bool,
}

impl SleepRecord {
    /// Create a new record, deriving the duration from bedtime and wake time
    pub fn new(
        date: NaiveDate,
        bedtime: NaiveTime,
        wakeup_time: NaiveTime,
        quality: u8,
        notes: Option<String>,
    ) -> Result<Self> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(SleepRsError::Validation(format!(
                "quality must be between {} and {}, got {}",
                MIN_QUALITY, MAX_QUALITY, quality
            )));
        }

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(SleepRecord {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            bedtime,
            wakeup_time,
            duration_hours: sleep_duration_hours(bedtime, wakeup_time),
            quality,
            notes,
            created_at: Utc::now(),
            synced: false,
        })
    }

    /// Build a record from raw text input (`YYYY-MM-DD`, `HH:MM`, `HH:MM`)
    pub fn parse(
        date: &str,
        bedtime: &str,
        wakeup_time: &str,
        quality: u8,
        notes: Option<String>,
    ) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| SleepRsError::Validation(format!("Invalid date: {}", date)))?;
        let bedtime = parse_time_of_day(bedtime)?;
        let wakeup_time = parse_time_of_day(wakeup_time)?;

        Self::new(date, bedtime, wakeup_time, quality, notes)
    }
}

/// Parse an `HH:MM` (or `HH:MM:SS`) time of day
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| SleepRsError::Validation(format!("Invalid time of day: {}", value)))
}

/// Result of inserting a record keyed by date
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No record existed for the date
    Inserted,
    /// An existing record was replaced; its identity was kept
    Replaced { previous: SleepRecord },
}

/// Time filter used by the history view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    Week,
    Month,
    All,
}

impl HistoryFilter {
    /// Days covered by the filter, `None` for no cutoff
    pub fn days(&self) -> Option<u64> {
        match self {
            HistoryFilter::Week => Some(7),
            HistoryFilter::Month => Some(30),
            HistoryFilter::All => None,
        }
    }
}

impl std::str::FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(HistoryFilter::Week),
            "month" => Ok(HistoryFilter::Month),
            "all" => Ok(HistoryFilter::All),
            _ => Err(format!("Invalid history filter: {}", s)),
        }
    }
}

/// Collection of sleep records holding at most one record per date,
/// ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<SleepRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from an arbitrary list; later duplicates of a date win
    pub fn from_records(records: Vec<SleepRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.upsert(record);
        }
        set
    }

    /// Insert a record, replacing any record already filed under its date.
    ///
    /// A replacement inherits the identity of the record it replaces.
    pub fn upsert(&mut self, mut record: SleepRecord) -> UpsertOutcome {
        let outcome = match self.records.iter().position(|r| r.date == record.date) {
            Some(index) => {
                record.id = self.records[index].id.clone();
                let previous = std::mem::replace(&mut self.records[index], record);
                UpsertOutcome::Replaced { previous }
            }
            None => {
                self.records.push(record);
                UpsertOutcome::Inserted
            }
        };

        self.records.sort_by(|a, b| b.date.cmp(&a.date));
        outcome
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SleepRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    /// Remove the record for a date, returning it if present
    pub fn remove(&mut self, date: NaiveDate) -> Option<SleepRecord> {
        let index = self.records.iter().position(|r| r.date == date)?;
        Some(self.records.remove(index))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SleepRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[SleepRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<SleepRecord> {
        self.records
    }

    /// Most recent night on record
    pub fn last_night(&self) -> Option<&SleepRecord> {
        self.records.first()
    }

    /// Records matching a history filter relative to `today`.
    ///
    /// `Week` and `Month` cover that many calendar days ending on `today`.
    pub fn filter(&self, filter: HistoryFilter, today: NaiveDate) -> Vec<&SleepRecord> {
        match filter.days() {
            Some(days) => {
                let cutoff = window_start(today, days);
                self.records.iter().filter(|r| r.date >= cutoff).collect()
            }
            None => self.records.iter().collect(),
        }
    }
}

/// User preferences carried over from the tracker settings page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepSettings {
    /// Nightly sleep goal in hours
    pub sleep_goal_hours: f64,

    /// Bedtime reminder time of day
    #[serde(with = "hhmm")]
    pub bedtime_reminder: NaiveTime,

    /// Whether reminders are emitted
    pub enable_notifications: bool,
}

impl Default for SleepSettings {
    fn default() -> Self {
        SleepSettings {
            sleep_goal_hours: 8.0,
            bedtime_reminder: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            enable_notifications: false,
        }
    }
}

impl fmt::Display for SleepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} ({:.1}h, quality {})",
            self.date,
            self.bedtime.format("%H:%M"),
            self.wakeup_time.format("%H:%M"),
            self.duration_hours,
            self.quality
        )
    }
}

// Times of day are stored as "HH:MM", matching the tracker's data files
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(serde::de::Error::custom)
    }
}
