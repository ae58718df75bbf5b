//! Merges candidate records into the catalog.

use crate::config::ImportConfig;
use crate::error::{AppError, Result, SkipReason};
use crate::import::csv::parse_csv;
use crate::import::report::{ImportReport, ImportReportBuilder};
use crate::library::{
    CandidateRecord, CapacityVerdict, CatalogEntry, EntryUpdate, ShelfCapacityChecker,
};
use crate::metadata::{BookMetadata, MetadataLookup};
use crate::store::{CatalogStore, ShelfStore};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Tuning for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Time allowed for one metadata lookup.
    pub lookup_timeout: Duration,
    /// Lookups allowed in flight at once.
    pub lookup_concurrency: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportConfig::default().into()
    }
}

impl From<ImportConfig> for ImportOptions {
    fn from(config: ImportConfig) -> Self {
        Self {
            lookup_timeout: config.lookup_timeout(),
            lookup_concurrency: config.lookup_concurrency.max(1),
        }
    }
}

enum Enrichment {
    Found(BookMetadata),
    Missing,
    TimedOut,
}

enum Outcome {
    Inserted(CatalogEntry),
    Updated(CatalogEntry),
    Refused(SkipReason),
}

/// Reconciles batches of candidates against a catalog and its shelves.
///
/// Metadata lookups may overlap, but catalog writes happen one record at a
/// time in input order, so duplicate ISBNs within a batch add up instead of
/// racing each other.
pub struct Reconciler {
    catalog: Arc<dyn CatalogStore>,
    shelves: Arc<dyn ShelfStore>,
    lookup: Option<Arc<dyn MetadataLookup>>,
    options: ImportOptions,
}

impl Reconciler {
    /// Create a reconciler without metadata enrichment.
    pub fn new(catalog: Arc<dyn CatalogStore>, shelves: Arc<dyn ShelfStore>) -> Self {
        Self {
            catalog,
            shelves,
            lookup: None,
            options: ImportOptions::default(),
        }
    }

    /// Enrich records from a metadata service before writing them.
    pub fn with_lookup(mut self, lookup: Arc<dyn MetadataLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Override lookup timeout and concurrency.
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse CSV text and reconcile every row.
    ///
    /// A parse error rejects the file before the catalog is touched.
    pub async fn run_csv(&self, text: &str, cancel: &CancellationToken) -> Result<ImportReport> {
        let records = parse_csv(text)?;
        Ok(self.run(records, cancel).await)
    }

    /// Reconcile records in order.
    ///
    /// Every record ends up either written (inserted or updated) or skipped
    /// with a reason. Once `cancel` fires, records not yet written are
    /// skipped as cancelled; a write already in progress completes.
    pub async fn run(&self, records: Vec<CandidateRecord>, cancel: &CancellationToken) -> ImportReport {
        let start = Instant::now();
        tracing::info!(records = records.len(), "Starting import");

        let mut report = ImportReportBuilder::new();
        let enrichments = futures::stream::iter(records.iter())
            .map(|record| self.enrich(record))
            .buffered(self.options.lookup_concurrency.max(1));
        let mut enrichments = std::pin::pin!(enrichments);

        let mut position = 0;
        while position < records.len() {
            if cancel.is_cancelled() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = enrichments.next() => next,
            };
            let Some(enrichment) = next else {
                break;
            };

            let original = &records[position];
            position += 1;

            let record = match enrichment {
                Enrichment::Found(metadata) => original.enriched(&metadata),
                Enrichment::Missing => original.clone(),
                Enrichment::TimedOut => {
                    let reason = SkipReason::LookupTimeout {
                        timeout_ms: u64::try_from(self.options.lookup_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    };
                    tracing::warn!(isbn = %original.isbn, reason = %reason, "Skipping book");
                    report.skipped(original.clone(), reason);
                    continue;
                }
            };

            match self.write(&record) {
                Ok(Outcome::Inserted(entry)) => {
                    tracing::debug!(isbn = %entry.isbn, copies = entry.total_copies, "Inserted book");
                    report.inserted(&entry);
                }
                Ok(Outcome::Updated(entry)) => {
                    tracing::debug!(isbn = %entry.isbn, copies = entry.total_copies, "Updated book");
                    report.updated(&entry);
                }
                Ok(Outcome::Refused(reason)) => {
                    tracing::warn!(isbn = %record.isbn, reason = %reason, "Skipping book");
                    report.skipped(record, reason);
                }
                Err(e) => {
                    tracing::warn!(isbn = %record.isbn, error = %e, "Store failed, skipping book");
                    report.skipped(
                        record,
                        SkipReason::StoreFailure {
                            message: e.to_string(),
                        },
                    );
                }
            }
        }

        if position < records.len() {
            tracing::warn!(remaining = records.len() - position, "Import cancelled");
            for record in &records[position..] {
                report.skipped(record.clone(), SkipReason::Cancelled);
            }
        }

        let report = report.build();
        tracing::info!(
            inserted = report.inserted_count,
            updated = report.updated_count,
            skipped = report.skipped_count,
            elapsed = ?start.elapsed(),
            "Import finished"
        );
        report
    }

    async fn enrich(&self, record: &CandidateRecord) -> Enrichment {
        let Some(lookup) = &self.lookup else {
            return Enrichment::Missing;
        };

        match tokio::time::timeout(self.options.lookup_timeout, lookup.lookup(&record.isbn)).await {
            Ok(Ok(Some(metadata))) => Enrichment::Found(metadata),
            Ok(Ok(None)) => {
                tracing::debug!(isbn = %record.isbn, "No metadata found");
                Enrichment::Missing
            }
            Ok(Err(e)) => {
                tracing::warn!(isbn = %record.isbn, error = %e, "Metadata lookup failed");
                Enrichment::Missing
            }
            Err(_) => Enrichment::TimedOut,
        }
    }

    /// Check the shelf and write one record.
    ///
    /// Shelf placement travels with the insert or update, so a record is
    /// either fully written or not written at all.
    fn write(&self, record: &CandidateRecord) -> Result<Outcome> {
        let existing = self.catalog.find_by_isbn(&record.isbn)?;

        if let Some(existing) = &existing {
            if existing.total_copies.checked_add(record.total_copies).is_none() {
                return Ok(Outcome::Refused(SkipReason::TooManyCopies {
                    held: existing.total_copies,
                    requested: record.total_copies,
                }));
            }
        }

        if let Some(reason) = self.check_shelf(record, existing.as_ref())? {
            return Ok(Outcome::Refused(reason));
        }

        match existing {
            None => {
                let entry = CatalogEntry::from_candidate(record);
                self.catalog.insert(&entry)?;
                Ok(Outcome::Inserted(entry))
            }
            Some(existing) => {
                let update = EntryUpdate::from_candidate(record);
                Ok(Outcome::Updated(self.catalog.update(&existing.id, &update)?))
            }
        }
    }

    /// Capacity check for the shelf the incoming copies land on.
    ///
    /// Copies of an entry already on a shelf join it unless the record names
    /// another shelf. Otherwise the whole entry lands on the named shelf,
    /// including an entry that had no shelf yet.
    fn check_shelf(
        &self,
        record: &CandidateRecord,
        existing: Option<&CatalogEntry>,
    ) -> Result<Option<SkipReason>> {
        let current = existing.and_then(|e| e.shelf_location.as_deref());
        let held = existing.map_or(0, |e| e.total_copies);

        let (shelf_id, copies) = match (record.shelf(), current) {
            (Some(target), Some(current)) if target == current => (target, record.total_copies),
            (Some(target), _) => (target, held.saturating_add(record.total_copies)),
            (None, Some(current)) => (current, record.total_copies),
            (None, None) => return Ok(None),
        };

        let shelf = self.shelves.get_shelf(shelf_id)?;
        if shelf.is_none() && record.shelf().is_none() {
            // Entry sits on a shelf that has since been removed.
            return Ok(None);
        }

        Ok(ShelfCapacityChecker::check_copies(shelf_id, shelf.as_ref(), copies).skip_reason())
    }

    /// Place an existing entry, with all of its copies, on a shelf.
    ///
    /// This is the later step for books imported without a shelf. The
    /// entry is only moved when the verdict is `Accepted`.
    pub fn place_on_shelf(&self, isbn: &str, shelf_id: &str) -> Result<CapacityVerdict> {
        let entry = self
            .catalog
            .find_by_isbn(isbn)?
            .ok_or_else(|| AppError::NotFound(format!("Book with ISBN {}", isbn)))?;

        if entry.shelf_location.as_deref() == Some(shelf_id) {
            return Ok(CapacityVerdict::Accepted);
        }

        let shelf = self.shelves.get_shelf(shelf_id)?;
        let verdict =
            ShelfCapacityChecker::check_copies(shelf_id, shelf.as_ref(), entry.total_copies);
        if verdict.is_accepted() {
            self.shelves.assign_book_to_shelf(&entry.id, shelf_id)?;
            tracing::info!(
                isbn = %isbn,
                shelf = %shelf_id,
                copies = entry.total_copies,
                "Placed book"
            );
        }

        Ok(verdict)
    }
}
