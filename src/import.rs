//! Book import: CSV parsing, manual entry, reconciliation and reporting.

pub mod csv;
mod manual;
mod reconcile;
mod report;

pub use csv::{parse_csv, parse_csv_file};
pub use manual::ManualEntry;
pub use reconcile::{ImportOptions, Reconciler};
pub use report::{ImportAction, ImportReport, ImportReportBuilder, ProcessedRecord, SkippedRecord};
