//! Application intake pipeline: schema registry, registration identifiers,
//! payload normalization, the tabular sink abstraction, workbook export, and
//! the submission service composing them.

pub mod export;
pub mod normalize;
pub mod registration;
pub mod router;
pub mod schema;
pub mod service;
pub mod sink;

pub use export::{export_workbook, workbook_filename, ExportError, WORKBOOK_CONTENT_TYPE};
pub use normalize::{normalize_row, NormalizedRow};
pub use registration::{RegistrationId, RegistrationIdGenerator};
pub use router::intake_router;
pub use schema::FieldSchema;
pub use service::{SubmissionError, SubmissionReceipt, SubmissionService};
pub use sink::{CsvWorkbookSink, SinkError, TabularSink};
