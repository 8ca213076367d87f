use std::io::Write;

use super::ExportError;
use crate::models::SleepRecord;

/// Write records as a pretty-printed JSON array in storage format
pub fn write_records<W: Write>(records: &[&SleepRecord], mut writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    Ok(())
}

/// Export any serializable data structure to JSON
pub fn export_json<T, W>(data: &T, mut writer: W) -> Result<(), ExportError>
where
    T: serde::Serialize,
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, data)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_round_trip_through_storage_format() {
        let record =
            SleepRecord::parse("2024-09-23", "23:30", "07:00", 4, Some("quiet".into())).unwrap();

        let mut buffer = Vec::new();
        write_records(&[&record], &mut buffer).unwrap();
        let content = String::from_utf8(buffer).unwrap();

        assert!(content.contains("\"bedtime\": \"23:30\""));
        assert!(content.contains("\"duration\": 7.5"));

        let parsed: Vec<SleepRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![record]);
    }

    #[test]
    fn test_export_json_generic() {
        #[derive(serde::Serialize)]
        struct TestData {
            name: String,
            value: u32,
        }

        let mut buffer = Vec::new();
        export_json(&TestData { name: "test".into(), value: 42 }, &mut buffer).unwrap();

        let content = String::from_utf8(buffer).unwrap();
        assert!(content.contains("\"name\": \"test\""));
        assert!(content.contains("\"value\": 42"));
    }
}
