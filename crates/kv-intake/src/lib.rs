//! Job application intake pipeline: schema-aligned normalization, durable
//! tabular persistence, workbook export, and per-applicant PDF records.

pub mod config;
pub mod error;
pub mod intake;
pub mod pdf;
pub mod telemetry;
