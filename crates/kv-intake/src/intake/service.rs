use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::export::{export_workbook, workbook_filename, ExportError};
use super::normalize::{display_value, normalize_row, NormalizedRow};
use super::registration::{RegistrationId, RegistrationIdGenerator};
use super::schema::{FieldSchema, MANDATORY_FIELDS};
use super::sink::{SinkError, TabularSink};

/// Outcome returned to the caller for an accepted submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub registration: RegistrationId,
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("payload must not be empty")]
    EmptyPayload,
    #[error("{0} is required")]
    MissingRequiredField(String),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl SubmissionError {
    /// Validation failures are caller errors; everything else is backend-side.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmissionError::EmptyPayload | SubmissionError::MissingRequiredField(_)
        )
    }
}

/// Service composing the schema registry, identifier generator, and sink.
///
/// `ensure_header` and `append` run under a single write gate so concurrent
/// submissions cannot interleave against a backend that does not serialize
/// its own writes.
pub struct SubmissionService<S> {
    schema: FieldSchema,
    ids: RegistrationIdGenerator,
    sink: Arc<S>,
    write_gate: Mutex<()>,
}

impl<S> SubmissionService<S>
where
    S: TabularSink + 'static,
{
    pub fn new(sink: Arc<S>, registration_prefix: impl Into<String>) -> Self {
        Self {
            schema: FieldSchema::standard(),
            ids: RegistrationIdGenerator::new(registration_prefix),
            sink,
            write_gate: Mutex::new(()),
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Persist one submission, returning its registration identifier.
    ///
    /// Exactly one row is appended per successful call; nothing is written on
    /// any rejection. A `ConnectionFailed` append is retried once after a
    /// reconnect.
    pub fn submit(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if payload.is_empty() {
            return Err(SubmissionError::EmptyPayload);
        }

        for field in MANDATORY_FIELDS {
            let blank = payload
                .get(*field)
                .map(|value| display_value(value).trim().is_empty())
                .unwrap_or(true);
            if blank {
                return Err(SubmissionError::MissingRequiredField(field.to_string()));
            }
        }

        let registration = self.ids.generate();
        let submitted_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let row = normalize_row(payload, &self.schema, &registration, &submitted_at);

        {
            let _gate = self.write_gate.lock().expect("write gate poisoned");
            self.append_with_retry(&row, &registration)?;
        }

        info!(registration = %registration, "application row appended");
        Ok(SubmissionReceipt { registration })
    }

    fn append_with_retry(
        &self,
        row: &NormalizedRow,
        registration: &RegistrationId,
    ) -> Result<(), SinkError> {
        match self.write_row(row) {
            Err(SinkError::ConnectionFailed(reason)) => {
                warn!(
                    registration = %registration,
                    %reason,
                    "append failed on a dropped sink connection, reconnecting once"
                );
                self.sink.reconnect()?;
                self.write_row(row)
            }
            outcome => outcome,
        }
    }

    fn write_row(&self, row: &NormalizedRow) -> Result<(), SinkError> {
        self.sink.ensure_header(&self.schema)?;
        self.sink.append(row)
    }

    /// Every stored row keyed by header names, for dashboards and export.
    pub fn list(&self) -> Result<Vec<BTreeMap<String, String>>, SubmissionError> {
        Ok(self.sink.list_all()?)
    }

    /// Render the whole store as a downloadable workbook.
    pub fn export(&self) -> Result<(String, Vec<u8>), SubmissionError> {
        let rows = self.sink.list_all()?;
        let bytes = export_workbook(&self.schema, &rows)?;
        let filename = workbook_filename(Local::now().naive_local());
        Ok((filename, bytes))
    }
}
