use serde::Serialize;
use std::io::Write;

use super::ExportError;
use crate::metrics::round_to;
use crate::models::SleepRecord;

/// One CSV row; column order is the header order
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: String,
    bedtime: String,
    wakeup_time: String,
    duration_hours: f64,
    quality: u8,
    notes: &'a str,
}

impl<'a> From<&'a SleepRecord> for CsvRow<'a> {
    fn from(record: &'a SleepRecord) -> Self {
        CsvRow {
            date: record.date.format("%Y-%m-%d").to_string(),
            bedtime: record.bedtime.format("%H:%M").to_string(),
            wakeup_time: record.wakeup_time.format("%H:%M").to_string(),
            duration_hours: round_to(record.duration_hours, 2),
            quality: record.quality,
            notes: record.notes.as_deref().unwrap_or(""),
        }
    }
}

/// Write records as CSV with a header row
pub fn write_records<W: Write>(records: &[&SleepRecord], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);

    if records.is_empty() {
        csv_writer.write_record([
            "date",
            "bedtime",
            "wakeup_time",
            "duration_hours",
            "quality",
            "notes",
        ])?;
    }

    for record in records {
        csv_writer.serialize(CsvRow::from(*record))?;
    }

    csv_writer.flush()?;
    Ok(())
}
