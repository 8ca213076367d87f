//! Sleep history export
//!
//! Writes the record history to CSV or JSON. The format is chosen from the
//! command line or from the output file's extension.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ExportError;
use crate::models::SleepRecord;

pub mod csv;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Result<Self, ExportError> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }

    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::from_str(ext).ok())
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::from_str(s)
    }
}

/// Write `records` in `format` to any writer
pub fn write_records<W: Write>(
    records: &[&SleepRecord],
    format: ExportFormat,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => csv::write_records(records, writer),
        ExportFormat::Json => json::write_records(records, writer),
    }
}

/// Export `records` to a file, returning the number of records written
pub fn export_records<P: AsRef<Path>>(
    records: &[&SleepRecord],
    format: ExportFormat,
    output_path: P,
) -> Result<usize, ExportError> {
    let file = File::create(output_path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_records(records, format, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        count = records.len(),
        format = format.extension(),
        path = %output_path.as_ref().display(),
        "Records exported"
    );

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_format_parsing() {
        assert_eq!(ExportFormat::from_str("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            ExportFormat::from_str("pdf"),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(&PathBuf::from("out/sleep.JSON")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_path(&PathBuf::from("sleep.csv")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(&PathBuf::from("sleep")), None);
    }

    #[test]
    fn test_export_to_file() {
        let record = SleepRecord::parse("2024-09-23", "23:00", "07:00", 5, None).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.csv");

        let written = export_records(&[&record], ExportFormat::Csv, &path).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
