//! Import outcome aggregation.

use crate::error::SkipReason;
use crate::library::{CandidateRecord, CatalogEntry};
use serde::{Deserialize, Serialize};

/// What happened to a record that reached the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    /// New catalog entry created.
    Inserted,
    /// Copies added to an existing entry.
    Updated,
}

/// A record written to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Catalog entry id.
    pub id: String,
    /// ISBN.
    pub isbn: String,
    /// Title.
    pub title: String,
    /// Copies owned after the import.
    pub total_copies: u32,
    /// Insert or update.
    pub action: ImportAction,
}

/// A record left out of the catalog, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// The candidate as it was when skipped.
    pub record: CandidateRecord,
    /// Machine-readable reason.
    pub reason: SkipReason,
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// New entries created.
    pub inserted_count: usize,
    /// Existing entries updated.
    pub updated_count: usize,
    /// Records skipped.
    pub skipped_count: usize,
    /// Written records, in input order.
    pub processed: Vec<ProcessedRecord>,
    /// Skipped records, in input order.
    pub skipped: Vec<SkippedRecord>,
}

impl ImportReport {
    /// One-line summary for display.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Added {} new books and updated {} existing books",
            self.inserted_count, self.updated_count
        );

        if !self.skipped.is_empty() {
            let details: Vec<String> = self
                .skipped
                .iter()
                .map(|s| format!("{} ({})", s.record.isbn, s.reason))
                .collect();
            summary.push_str(&format!(
                ". Skipped {} books: {}",
                self.skipped_count,
                details.join("; ")
            ));
        }

        summary
    }

    /// Whether every record was written.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Candidates that were skipped, for a retry run.
    pub fn skipped_records(&self) -> Vec<CandidateRecord> {
        self.skipped.iter().map(|s| s.record.clone()).collect()
    }
}

/// Collects per-record outcomes into an [`ImportReport`].
#[derive(Debug, Default)]
pub struct ImportReportBuilder {
    report: ImportReport,
}

impl ImportReportBuilder {
    /// Start an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created entry.
    pub fn inserted(&mut self, entry: &CatalogEntry) {
        self.report.inserted_count += 1;
        self.push(entry, ImportAction::Inserted);
    }

    /// Record an updated entry.
    pub fn updated(&mut self, entry: &CatalogEntry) {
        self.report.updated_count += 1;
        self.push(entry, ImportAction::Updated);
    }

    /// Record a skipped candidate.
    pub fn skipped(&mut self, record: CandidateRecord, reason: SkipReason) {
        self.report.skipped_count += 1;
        self.report.skipped.push(SkippedRecord { record, reason });
    }

    fn push(&mut self, entry: &CatalogEntry, action: ImportAction) {
        self.report.processed.push(ProcessedRecord {
            id: entry.id.clone(),
            isbn: entry.isbn.clone(),
            title: entry.title.clone(),
            total_copies: entry.total_copies,
            action,
        });
    }

    /// Finish the report.
    pub fn build(self) -> ImportReport {
        self.report
    }
}
