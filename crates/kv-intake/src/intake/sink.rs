use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use super::normalize::NormalizedRow;
use super::schema::FieldSchema;

/// Storage abstraction over the tabular application store so the submission
/// service can be exercised against spreadsheet backends, local workbooks, or
/// in-memory doubles.
pub trait TabularSink: Send + Sync {
    /// Idempotently write the schema as the first row of an empty store.
    /// Never rewrites an existing header.
    fn ensure_header(&self, schema: &FieldSchema) -> Result<(), SinkError>;

    /// Append exactly one row; atomic from the caller's perspective.
    fn append(&self, row: &NormalizedRow) -> Result<(), SinkError>;

    /// Every stored row keyed by header names; missing cells normalize to
    /// empty strings.
    fn list_all(&self) -> Result<Vec<BTreeMap<String, String>>, SinkError>;

    /// Re-establish a dropped backend connection. Backends without a
    /// connection lifecycle treat this as a no-op.
    fn reconnect(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Error enumeration for sink failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("tabular backend unreachable: {0}")]
    ConnectionFailed(String),
    #[error("tabular backend rejected write: {0}")]
    WriteRejected(String),
}

/// Local workbook backend persisting one CSV row per submission.
///
/// File access is serialized through an internal mutex; the append path opens
/// the file in append mode and flushes per row so a completed call leaves a
/// whole record on disk.
#[derive(Debug)]
pub struct CsvWorkbookSink {
    path: PathBuf,
    io_gate: Mutex<()>,
}

impl CsvWorkbookSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn has_header(&self) -> Result<bool, SinkError> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => Ok(metadata.len() > 0),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SinkError::ConnectionFailed(err.to_string())),
        }
    }
}

impl TabularSink for CsvWorkbookSink {
    fn ensure_header(&self, schema: &FieldSchema) -> Result<(), SinkError> {
        let _gate = self.io_gate.lock().expect("sink mutex poisoned");

        if self.has_header()? {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)
            .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;
        writer
            .write_record(schema.fields())
            .map_err(|err| SinkError::WriteRejected(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| SinkError::WriteRejected(err.to_string()))?;
        Ok(())
    }

    fn append(&self, row: &NormalizedRow) -> Result<(), SinkError> {
        let _gate = self.io_gate.lock().expect("sink mutex poisoned");

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(row.values())
            .map_err(|err| SinkError::WriteRejected(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| SinkError::WriteRejected(err.to_string()))?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<BTreeMap<String, String>>, SinkError> {
        let _gate = self.io_gate.lock().expect("sink mutex poisoned");

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;
            let row = headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    (
                        header.to_string(),
                        record.get(index).unwrap_or_default().to_string(),
                    )
                })
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }

    fn reconnect(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SinkError::ConnectionFailed(err.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::normalize::normalize_row;
    use crate::intake::registration::RegistrationId;
    use serde_json::json;

    fn sample_row(schema: &FieldSchema, name: &str) -> NormalizedRow {
        let payload = json!({"Name": name, "Mobile": "9999999999", "Email": "a@x.com"});
        normalize_row(
            payload.as_object().expect("object"),
            schema,
            &RegistrationId("KV-20250924101500".to_string()),
            "2025-09-24 10:15:00",
        )
    }

    #[test]
    fn ensure_header_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = CsvWorkbookSink::new(dir.path().join("applications.csv"));
        let schema = FieldSchema::standard();

        sink.ensure_header(&schema).expect("first header write");
        sink.append(&sample_row(&schema, "Asha Rao")).expect("append");
        sink.ensure_header(&schema).expect("second header write");

        let contents = std::fs::read_to_string(sink.path()).expect("read file");
        let header_lines = contents
            .lines()
            .filter(|line| line.starts_with("RegistrationNo"))
            .count();
        assert_eq!(header_lines, 1);
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn appended_rows_round_trip_through_list_all() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = CsvWorkbookSink::new(dir.path().join("applications.csv"));
        let schema = FieldSchema::standard();

        sink.ensure_header(&schema).expect("header");
        sink.append(&sample_row(&schema, "Asha Rao")).expect("append");

        let rows = sink.list_all().expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name"], "Asha Rao");
        assert_eq!(rows[0]["Mobile"], "9999999999");
        assert_eq!(rows[0]["FatherName"], "");
    }

    #[test]
    fn list_all_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = CsvWorkbookSink::new(dir.path().join("never-written.csv"));
        assert!(sink.list_all().expect("list").is_empty());
    }

    #[test]
    fn ensure_header_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = CsvWorkbookSink::new(dir.path().join("nested/deeper/applications.csv"));
        sink.ensure_header(&FieldSchema::standard())
            .expect("header with nested dirs");
        assert!(sink.path().exists());
    }
}
