use crate::config::{Config, Genre};
use crate::db::{Database, Shelf, now_timestamp};
use crate::error::{AppError, ParseError, Result, SkipReason};
use crate::import::{
    ImportAction, ImportOptions, ManualEntry, Reconciler, parse_csv, parse_csv_file,
};
use crate::library::{CandidateRecord, CapacityVerdict, CatalogEntry, EntryUpdate, ShelfRecord};
use crate::metadata::{BookMetadata, GenreSuggester, MetadataLookup, StaticLookup};
use crate::store::{CatalogStore, MemoryCatalog, ShelfStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const HEADER: &str = "Title,Author,Genre,ISBN,PublicationDate,TotalCopies\n";
const DUNE_CSV: &str = "Title,Author,Genre,ISBN,PublicationDate,TotalCopies\nDune,Frank Herbert,Fiction,9780441013593,1965,3\n";

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn reconciler_for(catalog: &MemoryCatalog) -> Reconciler {
    Reconciler::new(Arc::new(catalog.clone()), Arc::new(catalog.clone()))
}

fn db_reconciler(db: &Database) -> Reconciler {
    Reconciler::new(Arc::new(db.clone()), Arc::new(db.clone()))
}

fn book(isbn: &str, copies: u32) -> CandidateRecord {
    CandidateRecord::new(
        format!("Book {}", isbn),
        vec!["Some Author".to_string()],
        Genre::Fiction,
        isbn,
        "2001",
        copies,
    )
}

fn create_shelf(db: &Database, id: &str, capacity: u32) {
    let shelf = Shelf {
        id: id.to_string(),
        name: Some(format!("Shelf {}", id)),
        capacity,
        created_at: now_timestamp(),
    };
    db.create_shelf(&shelf).unwrap();
}

// ========== CSV PARSING ==========

#[test]
fn csv_parse_dune() {
    let records = parse_csv(DUNE_CSV).unwrap();
    assert_eq!(records.len(), 1);

    let dune = &records[0];
    assert_eq!(dune.title, "Dune");
    assert_eq!(dune.authors, vec!["Frank Herbert".to_string()]);
    assert_eq!(dune.genre, Genre::Fiction);
    assert_eq!(dune.isbn, "9780441013593");
    assert_eq!(dune.publication_year, "1965");
    assert_eq!(dune.total_copies, 3);
    assert!(dune.shelf_location.is_none());
}

#[test]
fn csv_multiple_authors() {
    let csv = format!(
        "{}Good Omens,Neil Gaiman; Terry Pratchett,Fantasy,9780060853983,1990,2\n",
        HEADER
    );
    let records = parse_csv(&csv).unwrap();
    assert_eq!(
        records[0].authors,
        vec!["Neil Gaiman".to_string(), "Terry Pratchett".to_string()]
    );
    assert_eq!(records[0].genre, Genre::Fantasy);
}

#[test]
fn csv_malformed_second_row() {
    let csv = format!(
        "{}Dune,Frank Herbert,Fiction,9780441013593,1965,3\nEmma,Jane Austen,Fiction,9780141439587,1815\n",
        HEADER
    );
    assert_eq!(
        parse_csv(&csv),
        Err(ParseError::MalformedRow {
            row: 2,
            expected: 6,
            actual: 5
        })
    );
}

#[test]
fn csv_comma_in_title_is_malformed() {
    let csv = format!("{}Dune, Messiah,Frank Herbert,Fiction,1,1969,1\n", HEADER);
    assert!(matches!(
        parse_csv(&csv),
        Err(ParseError::MalformedRow { row: 1, actual: 7, .. })
    ));
}

#[test]
fn csv_invalid_genre() {
    let csv = format!("{}Dune,Frank Herbert,SciFi,9780441013593,1965,3\n", HEADER);
    let err = parse_csv(&csv).unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidGenre {
            row: 1,
            value: "SciFi".to_string()
        }
    );
    assert!(err.to_string().contains("SciFi"));
}

#[test]
fn csv_empty_file() {
    assert_eq!(parse_csv(""), Err(ParseError::EmptyFile));
    assert_eq!(parse_csv(HEADER), Err(ParseError::EmptyFile));
    assert_eq!(
        parse_csv(&format!("{}\n   \n", HEADER)),
        Err(ParseError::EmptyFile)
    );
}

#[test]
fn csv_missing_fields_and_bad_copies() {
    let no_title = format!("{},Frank Herbert,Fiction,1,1965,3\n", HEADER);
    assert_eq!(
        parse_csv(&no_title),
        Err(ParseError::MissingField {
            row: 1,
            field: "title"
        })
    );

    let no_author = format!("{}Dune,;,Fiction,1,1965,3\n", HEADER);
    assert_eq!(
        parse_csv(&no_author),
        Err(ParseError::MissingField {
            row: 1,
            field: "author"
        })
    );

    let zero = format!("{}Dune,Frank Herbert,Fiction,1,1965,0\n", HEADER);
    assert_eq!(
        parse_csv(&zero),
        Err(ParseError::InvalidCopies {
            row: 1,
            value: "0".to_string()
        })
    );
}

#[test]
fn csv_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books.csv");
    std::fs::write(&path, DUNE_CSV).unwrap();

    let records = parse_csv_file(&path).unwrap();
    assert_eq!(records.len(), 1);

    let missing = parse_csv_file(&dir.path().join("missing.csv"));
    assert!(matches!(missing, Err(AppError::Io(_))));
}

// ========== RECONCILIATION ==========

#[tokio::test]
async fn import_dune_into_empty_catalog() {
    let catalog = MemoryCatalog::new();
    let report = reconciler_for(&catalog)
        .run_csv(DUNE_CSV, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.updated_count, 0);
    assert_eq!(
        report.summary(),
        "Added 1 new books and updated 0 existing books"
    );

    let entry = catalog.find_by_isbn("9780441013593").unwrap().unwrap();
    assert_eq!(entry.total_copies, 3);
    assert_eq!(entry.available_copies, 3);
    assert_eq!(entry.title, "Dune");
}

#[tokio::test]
async fn import_distinct_rows_all_inserted() {
    let db = test_db();
    let mut csv = HEADER.to_string();
    for i in 0..5 {
        csv.push_str(&format!("Book {i},Author {i},History,isbn-{i},19{i}0,{}\n", i + 1));
    }

    let report = db_reconciler(&db)
        .run_csv(&csv, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted_count, 5);
    assert_eq!(report.updated_count, 0);
    assert!(report.is_clean());
    assert_eq!(db.list_entries().unwrap().len(), 5);
    assert!(
        report
            .processed
            .iter()
            .all(|p| p.action == ImportAction::Inserted)
    );
}

#[tokio::test]
async fn import_duplicate_isbn_sums_copies() {
    let catalog = MemoryCatalog::new();
    let records = vec![book("111", 2), book("111", 5)];

    let report = reconciler_for(&catalog)
        .run(records, &CancellationToken::new())
        .await;

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.updated_count, 1);
    assert_eq!(catalog.len(), 1);

    let entry = catalog.find_by_isbn("111").unwrap().unwrap();
    assert_eq!(entry.total_copies, 7);
    assert_eq!(entry.available_copies, 7);
}

#[tokio::test]
async fn import_twice_adds_copies_again() {
    let db = test_db();
    let reconciler = db_reconciler(&db);
    let token = CancellationToken::new();

    reconciler.run_csv(DUNE_CSV, &token).await.unwrap();
    let second = reconciler.run_csv(DUNE_CSV, &token).await.unwrap();

    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.updated_count, 1);
    assert_eq!(
        second.summary(),
        "Added 0 new books and updated 1 existing books"
    );

    let entry = db.find_by_isbn("9780441013593").unwrap().unwrap();
    assert_eq!(entry.total_copies, 6);
    assert_eq!(entry.available_copies, 6);
}

#[tokio::test]
async fn import_parse_error_leaves_catalog_untouched() {
    let catalog = MemoryCatalog::new();
    let csv = format!(
        "{}Dune,Frank Herbert,Fiction,9780441013593,1965,3\nBad,Row,SciFi,2,2000,1\n",
        HEADER
    );

    let result = reconciler_for(&catalog)
        .run_csv(&csv, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(AppError::Parse(ParseError::InvalidGenre { row: 2, .. }))
    ));
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn import_update_keeps_existing_fields() {
    let catalog = MemoryCatalog::new();
    let reconciler = reconciler_for(&catalog);
    let token = CancellationToken::new();

    let mut first = book("222", 1);
    first.description = Some("Original".to_string());
    first.publisher = Some("First Press".to_string());
    reconciler.run(vec![first], &token).await;

    let mut second = book("222", 2);
    second.publisher = Some("Second Press".to_string());
    second.description = Some(String::new());
    reconciler.run(vec![second], &token).await;

    let entry = catalog.find_by_isbn("222").unwrap().unwrap();
    assert_eq!(entry.total_copies, 3);
    assert_eq!(entry.description.as_deref(), Some("Original"));
    assert_eq!(entry.publisher.as_deref(), Some("Second Press"));
}

// ========== SHELVES ==========

#[tokio::test]
async fn import_respects_shelf_capacity() {
    let db = test_db();
    create_shelf(&db, "A-1", 10);
    let reconciler = db_reconciler(&db);
    let token = CancellationToken::new();

    let seeded = reconciler.run(vec![book("100", 8).on_shelf("A-1")], &token).await;
    assert_eq!(seeded.inserted_count, 1);
    assert_eq!(db.get_shelf("A-1").unwrap().unwrap().current_occupancy, 8);

    let report = reconciler
        .run(
            vec![book("101", 5).on_shelf("A-1"), book("102", 2).on_shelf("A-1")],
            &token,
        )
        .await;

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.skipped_count, 1);
    assert_eq!(report.skipped[0].record.isbn, "101");
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::CapacityExceeded {
            shelf_id: "A-1".to_string(),
            capacity: 10,
            occupancy: 8,
            requested: 5,
            overflow: 3,
        }
    );

    assert!(db.find_by_isbn("101").unwrap().is_none());
    assert_eq!(db.get_shelf("A-1").unwrap().unwrap().current_occupancy, 10);
    assert!(report.summary().contains("Skipped 1 books: 101"));
}

#[tokio::test]
async fn import_unknown_shelf_is_skipped() {
    let catalog = MemoryCatalog::new();
    let report = reconciler_for(&catalog)
        .run(vec![book("300", 1).on_shelf("Z-9")], &CancellationToken::new())
        .await;

    assert_eq!(
        report.skipped[0].reason,
        SkipReason::ShelfNotFound {
            shelf_id: "Z-9".to_string()
        }
    );
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn import_without_shelf_defers_assignment() {
    let catalog = MemoryCatalog::new();
    catalog.add_shelf("A-1", None, 1);

    let report = reconciler_for(&catalog)
        .run(vec![book("400", 50)], &CancellationToken::new())
        .await;

    assert_eq!(report.inserted_count, 1);
    assert_eq!(catalog.get_shelf("A-1").unwrap().unwrap().current_occupancy, 0);
}

#[tokio::test]
async fn import_moving_shelf_checks_all_copies() {
    let catalog = MemoryCatalog::new();
    catalog.add_shelf("A-1", None, 10);
    catalog.add_shelf("B-1", None, 5);
    let reconciler = reconciler_for(&catalog);
    let token = CancellationToken::new();

    reconciler.run(vec![book("500", 4).on_shelf("A-1")], &token).await;

    // 4 existing + 2 new copies do not fit on B-1.
    let report = reconciler.run(vec![book("500", 2).on_shelf("B-1")], &token).await;
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::CapacityExceeded { overflow: 1, .. }
    ));

    let report = reconciler.run(vec![book("500", 1).on_shelf("B-1")], &token).await;
    assert_eq!(report.updated_count, 1);
    assert_eq!(catalog.get_shelf("A-1").unwrap().unwrap().current_occupancy, 0);
    assert_eq!(catalog.get_shelf("B-1").unwrap().unwrap().current_occupancy, 5);
}

#[tokio::test]
async fn import_more_copies_on_current_shelf_checks_capacity() {
    let catalog = MemoryCatalog::new();
    catalog.add_shelf("A-1", None, 5);
    let reconciler = reconciler_for(&catalog);
    let token = CancellationToken::new();

    reconciler.run(vec![book("600", 4).on_shelf("A-1")], &token).await;
    let report = reconciler.run(vec![book("600", 2)], &token).await;

    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::CapacityExceeded { overflow: 1, .. }
    ));
    assert_eq!(catalog.find_by_isbn("600").unwrap().unwrap().total_copies, 4);
}

#[tokio::test]
async fn import_unshelved_entry_gaining_shelf_checks_all_copies() {
    let catalog = MemoryCatalog::new();
    catalog.add_shelf("S", None, 5);
    let reconciler = reconciler_for(&catalog);
    let token = CancellationToken::new();

    reconciler.run(vec![book("42", 5)], &token).await;

    // All 7 copies would land on S.
    let report = reconciler.run(vec![book("42", 2).on_shelf("S")], &token).await;
    assert_eq!(report.updated_count, 0);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::CapacityExceeded {
            shelf_id: "S".to_string(),
            capacity: 5,
            occupancy: 0,
            requested: 7,
            overflow: 2,
        }
    );

    let entry = catalog.find_by_isbn("42").unwrap().unwrap();
    assert_eq!(entry.total_copies, 5);
    assert!(entry.shelf_location.is_none());
    assert_eq!(catalog.get_shelf("S").unwrap().unwrap().current_occupancy, 0);

    catalog.add_shelf("T", None, 7);
    let report = reconciler.run(vec![book("42", 2).on_shelf("T")], &token).await;
    assert_eq!(report.updated_count, 1);
    let shelf = catalog.get_shelf("T").unwrap().unwrap();
    assert_eq!(shelf.current_occupancy, 7);
    assert_eq!(shelf.free_space(), 0);
}

#[tokio::test]
async fn place_on_shelf_checks_all_copies() {
    let db = test_db();
    let reconciler = db_reconciler(&db);
    reconciler.run(vec![book("700", 6)], &CancellationToken::new()).await;
    create_shelf(&db, "P-1", 5);
    create_shelf(&db, "P-2", 10);

    let verdict = reconciler.place_on_shelf("700", "P-1").unwrap();
    assert!(matches!(
        verdict,
        CapacityVerdict::CapacityExceeded { requested: 6, overflow: 1, .. }
    ));
    assert!(db.find_by_isbn("700").unwrap().unwrap().shelf_location.is_none());

    assert!(reconciler.place_on_shelf("700", "P-2").unwrap().is_accepted());
    assert_eq!(db.get_shelf("P-2").unwrap().unwrap().current_occupancy, 6);

    // Already there.
    assert!(reconciler.place_on_shelf("700", "P-2").unwrap().is_accepted());

    assert_eq!(
        reconciler.place_on_shelf("700", "P-9").unwrap(),
        CapacityVerdict::UnknownShelf {
            shelf_id: "P-9".to_string()
        }
    );
    assert!(matches!(
        reconciler.place_on_shelf("missing", "P-2"),
        Err(AppError::NotFound(_))
    ));
}

// ========== ENRICHMENT, TIMEOUTS, CANCELLATION ==========

struct SlowLookup {
    slow_isbn: &'static str,
}

#[async_trait]
impl MetadataLookup for SlowLookup {
    async fn lookup(&self, isbn: &str) -> Result<Option<BookMetadata>> {
        if isbn == self.slow_isbn {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(None)
    }
}

struct BrokenLookup;

#[async_trait]
impl MetadataLookup for BrokenLookup {
    async fn lookup(&self, _isbn: &str) -> Result<Option<BookMetadata>> {
        Err(AppError::Internal("service unavailable".to_string()))
    }
}

#[tokio::test]
async fn import_enriches_from_lookup() {
    let catalog = MemoryCatalog::new();
    let mut books = HashMap::new();
    books.insert(
        "9780441013593".to_string(),
        BookMetadata {
            title: Some("Dune".to_string()),
            description: Some("A desert planet".to_string()),
            publisher: Some("Ace".to_string()),
            cover_image_url: Some("https://covers.example/dune.jpg".to_string()),
            ..Default::default()
        },
    );

    let report = reconciler_for(&catalog)
        .with_lookup(Arc::new(StaticLookup::new(books)))
        .run_csv(DUNE_CSV, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted_count, 1);
    let entry = catalog.find_by_isbn("9780441013593").unwrap().unwrap();
    assert_eq!(entry.description.as_deref(), Some("A desert planet"));
    assert_eq!(entry.publisher.as_deref(), Some("Ace"));
    assert_eq!(entry.publication_year, "1965");
}

#[tokio::test]
async fn import_lookup_failure_is_not_fatal() {
    let catalog = MemoryCatalog::new();
    let report = reconciler_for(&catalog)
        .with_lookup(Arc::new(BrokenLookup))
        .run(vec![book("700", 1)], &CancellationToken::new())
        .await;

    assert_eq!(report.inserted_count, 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn import_lookup_timeout_skips_record() {
    let catalog = MemoryCatalog::new();
    let options = ImportOptions {
        lookup_timeout: Duration::from_millis(50),
        lookup_concurrency: 4,
    };

    let report = reconciler_for(&catalog)
        .with_lookup(Arc::new(SlowLookup { slow_isbn: "801" }))
        .with_options(options)
        .run(
            vec![book("800", 1), book("801", 1), book("802", 1)],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.inserted_count, 2);
    assert_eq!(report.skipped_count, 1);
    assert_eq!(report.skipped[0].record.isbn, "801");
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::LookupTimeout { timeout_ms: 50 }
    );
    assert_eq!(report.processed[0].isbn, "800");
    assert_eq!(report.processed[1].isbn, "802");
}

#[tokio::test]
async fn import_cancelled_skips_remaining() {
    let catalog = MemoryCatalog::new();
    let token = CancellationToken::new();
    token.cancel();

    let report = reconciler_for(&catalog)
        .run(vec![book("900", 1), book("901", 1)], &token)
        .await;

    assert_eq!(report.skipped_count, 2);
    assert!(
        report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Cancelled)
    );
    assert!(catalog.is_empty());
    assert_eq!(report.skipped_records().len(), 2);
}

#[tokio::test]
async fn import_cancel_during_lookup() {
    let catalog = MemoryCatalog::new();
    let token = CancellationToken::new();
    let options = ImportOptions {
        lookup_timeout: Duration::from_secs(60),
        lookup_concurrency: 1,
    };

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let report = reconciler_for(&catalog)
        .with_lookup(Arc::new(SlowLookup { slow_isbn: "911" }))
        .with_options(options)
        .run(vec![book("910", 1), book("911", 1), book("912", 1)], &token)
        .await;

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.processed[0].isbn, "910");
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.skipped[0].reason, SkipReason::Cancelled);
}

// ========== STORE FAILURES ==========

struct FlakyCatalog {
    inner: MemoryCatalog,
    failing_isbn: &'static str,
}

impl CatalogStore for FlakyCatalog {
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<CatalogEntry>> {
        self.inner.find_by_isbn(isbn)
    }

    fn insert(&self, entry: &CatalogEntry) -> Result<String> {
        if entry.isbn == self.failing_isbn {
            return Err(AppError::Database("disk full".to_string()));
        }
        self.inner.insert(entry)
    }

    fn update(&self, id: &str, update: &EntryUpdate) -> Result<CatalogEntry> {
        self.inner.update(id, update)
    }

    fn list_entries(&self) -> Result<Vec<CatalogEntry>> {
        self.inner.list_entries()
    }
}

#[tokio::test]
async fn import_store_failure_skips_only_that_record() {
    let memory = MemoryCatalog::new();
    let catalog = Arc::new(FlakyCatalog {
        inner: memory.clone(),
        failing_isbn: "1001",
    });

    let report = Reconciler::new(catalog, Arc::new(memory.clone()))
        .run(
            vec![book("1000", 1), book("1001", 1), book("1002", 1)],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.inserted_count, 2);
    assert_eq!(report.skipped_count, 1);
    assert!(matches!(
        &report.skipped[0].reason,
        SkipReason::StoreFailure { message } if message.contains("disk full")
    ));
}

/// Shelf store that cannot move books between shelves.
struct FixedShelves {
    inner: MemoryCatalog,
}

impl ShelfStore for FixedShelves {
    fn get_shelf(&self, shelf_id: &str) -> Result<Option<ShelfRecord>> {
        self.inner.get_shelf(shelf_id)
    }

    fn assign_book_to_shelf(&self, _book_id: &str, _shelf_id: &str) -> Result<()> {
        Err(AppError::Database("shelf table locked".to_string()))
    }
}

#[tokio::test]
async fn import_places_book_with_the_write() {
    let memory = MemoryCatalog::new();
    memory.add_shelf("A-1", None, 10);
    let shelves = Arc::new(FixedShelves {
        inner: memory.clone(),
    });

    let report = Reconciler::new(Arc::new(memory.clone()), shelves)
        .run(vec![book("1100", 3).on_shelf("A-1")], &CancellationToken::new())
        .await;

    assert_eq!(report.inserted_count, 1);
    assert!(report.is_clean());
    let entry = memory.find_by_isbn("1100").unwrap().unwrap();
    assert_eq!(entry.total_copies, 3);
    assert_eq!(entry.shelf_location.as_deref(), Some("A-1"));
    assert_eq!(memory.get_shelf("A-1").unwrap().unwrap().current_occupancy, 3);
}

#[tokio::test]
async fn import_copy_count_overflow_is_skipped() {
    let catalog = MemoryCatalog::new();
    let report = reconciler_for(&catalog)
        .run(
            vec![book("98", 4_000_000_000), book("98", 1_000_000_000)],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.inserted_count, 1);
    assert_eq!(report.skipped_count, 1);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::TooManyCopies {
            held: 4_000_000_000,
            requested: 1_000_000_000,
        }
    );
    assert_eq!(
        catalog.find_by_isbn("98").unwrap().unwrap().total_copies,
        4_000_000_000
    );

    let id = catalog.find_by_isbn("98").unwrap().unwrap().id;
    let update = EntryUpdate {
        added_copies: 1_000_000_000,
        ..Default::default()
    };
    assert!(matches!(
        catalog.update(&id, &update),
        Err(AppError::InvalidFormat(_))
    ));
}

// ========== REPORT ==========

#[tokio::test]
async fn report_serializes_to_json() {
    let catalog = MemoryCatalog::new();
    let report = reconciler_for(&catalog)
        .run(
            vec![book("1100", 1), book("1101", 1).on_shelf("nowhere")],
            &CancellationToken::new(),
        )
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["inserted_count"], 1);
    assert_eq!(json["skipped"][0]["reason"]["kind"], "shelf_not_found");
    assert_eq!(json["processed"][0]["action"], "inserted");
}

// ========== MANUAL ENTRY ==========

struct FixedSuggester(&'static str);

#[async_trait]
impl GenreSuggester for FixedSuggester {
    async fn suggest_genre(&self, _title: &str, _authors: &[String]) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn manual_entry() -> ManualEntry {
    ManualEntry {
        title: " Neuromancer ".to_string(),
        authors: vec!["William Gibson".to_string()],
        genre: None,
        isbn: "9780441569595".to_string(),
        publication_year: "1984".to_string(),
        total_copies: "2".to_string(),
        shelf_location: Some("B-2".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn manual_entry_uses_suggested_genre() {
    let suggester = FixedSuggester("science fiction");
    let candidate = manual_entry()
        .into_candidate(Some(&suggester))
        .await
        .unwrap();

    assert_eq!(candidate.title, "Neuromancer");
    assert_eq!(candidate.genre, Genre::ScienceFiction);
    assert_eq!(candidate.total_copies, 2);
    assert_eq!(candidate.shelf(), Some("B-2"));
}

#[tokio::test]
async fn manual_entry_requires_known_genre() {
    assert!(manual_entry().into_candidate(None).await.is_err());

    let suggester = FixedSuggester("Cyberpunk");
    assert!(manual_entry().into_candidate(Some(&suggester)).await.is_err());

    let mut entry = manual_entry();
    entry.genre = Some("SciFi".to_string());
    assert!(matches!(
        entry.into_candidate(None).await,
        Err(AppError::Parse(ParseError::InvalidGenre { .. }))
    ));
}

#[tokio::test]
async fn manual_entry_validates_copies() {
    let mut entry = manual_entry();
    entry.genre = Some("Fiction".to_string());
    entry.total_copies = "none".to_string();
    assert!(matches!(
        entry.into_candidate(None).await,
        Err(AppError::InvalidFormat(_))
    ));
}

// ========== DATABASE ==========

#[test]
fn db_insert_and_find_entry() {
    let db = test_db();
    let mut candidate = book("1200", 2);
    candidate.authors = vec!["A".to_string(), "B".to_string()];
    let entry = CatalogEntry::from_candidate(&candidate);

    let id = db.insert(&entry).unwrap();
    assert_eq!(id, entry.id);

    let found = db.find_by_isbn("1200").unwrap().unwrap();
    assert_eq!(found, entry);
    assert_eq!(db.get_entry(&id).unwrap().unwrap().isbn, "1200");
    assert!(db.find_by_isbn("missing").unwrap().is_none());
}

#[test]
fn db_duplicate_isbn_fails() {
    let db = test_db();
    db.insert(&CatalogEntry::from_candidate(&book("1300", 1)))
        .unwrap();
    let err = db
        .insert(&CatalogEntry::from_candidate(&book("1300", 1)))
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidFormat(_)));
}

#[test]
fn db_update_missing_entry() {
    let db = test_db();
    let update = EntryUpdate {
        added_copies: 1,
        ..Default::default()
    };
    assert!(matches!(
        db.update("nope", &update),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn db_update_refuses_copy_overflow() {
    let db = test_db();
    let entry = CatalogEntry::from_candidate(&book("98", 4_000_000_000));
    db.insert(&entry).unwrap();

    let update = EntryUpdate {
        added_copies: 1_000_000_000,
        ..Default::default()
    };
    assert!(matches!(
        db.update(&entry.id, &update),
        Err(AppError::InvalidFormat(_))
    ));

    let stored = db.find_by_isbn("98").unwrap().unwrap();
    assert_eq!(stored.total_copies, 4_000_000_000);
    assert_eq!(stored.available_copies, 4_000_000_000);
    assert_eq!(db.list_entries().unwrap().len(), 1);

    let update = EntryUpdate {
        added_copies: u32::MAX - 4_000_000_000,
        ..Default::default()
    };
    assert_eq!(db.update(&entry.id, &update).unwrap().total_copies, u32::MAX);
}

#[test]
fn db_concurrent_updates_do_not_lose_copies() {
    let db = test_db();
    let entry = CatalogEntry::from_candidate(&book("1400", 1));
    db.insert(&entry).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let db = db.clone();
            let id = entry.id.clone();
            scope.spawn(move || {
                let update = EntryUpdate {
                    added_copies: 1,
                    ..Default::default()
                };
                for _ in 0..25 {
                    db.update(&id, &update).unwrap();
                }
            });
        }
    });

    let found = db.find_by_isbn("1400").unwrap().unwrap();
    assert_eq!(found.total_copies, 201);
    assert_eq!(found.available_copies, 201);
}

#[test]
fn memory_concurrent_updates_do_not_lose_copies() {
    let catalog = MemoryCatalog::new();
    let entry = CatalogEntry::from_candidate(&book("1500", 1));
    catalog.insert(&entry).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let catalog = catalog.clone();
            let id = entry.id.clone();
            scope.spawn(move || {
                let update = EntryUpdate {
                    added_copies: 2,
                    ..Default::default()
                };
                for _ in 0..25 {
                    catalog.update(&id, &update).unwrap();
                }
            });
        }
    });

    assert_eq!(
        catalog.find_by_isbn("1500").unwrap().unwrap().total_copies,
        401
    );
}

#[test]
fn db_shelf_occupancy_and_delete() {
    let db = test_db();
    create_shelf(&db, "C-1", 20);
    create_shelf(&db, "C-2", 5);
    assert!(db.create_shelf(&Shelf {
        id: "C-1".to_string(),
        name: None,
        capacity: 1,
        created_at: now_timestamp(),
    })
    .is_err());

    let entry = CatalogEntry::from_candidate(&book("1600", 7));
    db.insert(&entry).unwrap();
    db.assign_book_to_shelf(&entry.id, "C-1").unwrap();

    let shelves = db.list_shelves().unwrap();
    assert_eq!(shelves.len(), 2);
    assert_eq!(shelves[0].shelf_id, "C-1");
    assert_eq!(shelves[0].current_occupancy, 7);
    assert_eq!(shelves[1].current_occupancy, 0);

    assert!(matches!(
        db.assign_book_to_shelf(&entry.id, "missing"),
        Err(AppError::NotFound(_))
    ));
    assert!(db.delete_shelf("C-1").is_err());
    assert!(db.delete_shelf("C-2").unwrap());
    assert!(!db.delete_shelf("C-2").unwrap());
}

#[test]
fn db_list_entries_sorted_by_title() {
    let db = test_db();
    for (isbn, title) in [("1", "Zorba"), ("2", "Anna Karenina"), ("3", "Moby Dick")] {
        let mut candidate = book(isbn, 1);
        candidate.title = title.to_string();
        db.insert(&CatalogEntry::from_candidate(&candidate)).unwrap();
    }

    let titles: Vec<String> = db
        .list_entries()
        .unwrap()
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles, vec!["Anna Karenina", "Moby Dick", "Zorba"]);
}

#[test]
fn db_persists_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("catalog.db");

    {
        let db = Database::open(&path).unwrap();
        db.insert(&CatalogEntry::from_candidate(&book("1700", 3)))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.find_by_isbn("1700").unwrap().unwrap().total_copies, 3);
}

// ========== METADATA ==========

#[tokio::test]
async fn static_lookup_loads_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.json");
    std::fs::write(
        &path,
        r#"{"9780441013593": {"title": "Dune", "publisher": "Ace", "publication_date": "1965-08-01"}}"#,
    )
    .unwrap();

    let lookup = StaticLookup::load(&path).unwrap();
    assert_eq!(lookup.len(), 1);

    let found = lookup.lookup("9780441013593").await.unwrap().unwrap();
    assert_eq!(found.publisher.as_deref(), Some("Ace"));
    assert!(lookup.lookup("0000000000").await.unwrap().is_none());

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        StaticLookup::load(&path),
        Err(AppError::Config(_))
    ));
}

// ========== CONFIG ==========

#[test]
fn config_parse_toml() {
    let toml = r#"
[database]
path = "/tmp/test.db"

[import]
lookup_timeout_secs = 3
lookup_concurrency = 8

[metadata]
file = "books.json"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.database.path.to_str(), Some("/tmp/test.db"));
    assert_eq!(config.import.lookup_timeout(), Duration::from_secs(3));
    assert_eq!(config.import.lookup_concurrency, 8);
    assert_eq!(
        config.metadata.file.as_deref().and_then(|p| p.to_str()),
        Some("books.json")
    );

    let options: ImportOptions = config.import.into();
    assert_eq!(options.lookup_concurrency, 8);
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.database.path.to_str(), Some("data/catalog.db"));
    assert_eq!(config.import.lookup_timeout_secs, 10);
    assert_eq!(config.import.lookup_concurrency, 4);
    assert!(config.metadata.file.is_none());

    let generated: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(generated.import.lookup_concurrency, 4);
}

#[test]
fn genre_parse() {
    assert_eq!(Genre::parse("Fiction"), Some(Genre::Fiction));
    assert_eq!(Genre::parse(" fiction "), Some(Genre::Fiction));
    assert_eq!(Genre::parse("Non-Fiction"), Some(Genre::NonFiction));
    assert_eq!(Genre::parse("nonfiction"), Some(Genre::NonFiction));
    assert_eq!(Genre::parse("Science Fiction"), Some(Genre::ScienceFiction));
    assert_eq!(Genre::parse("SciFi"), None);
    assert_eq!(Genre::parse(""), None);

    for genre in Genre::ALL {
        assert_eq!(Genre::parse(genre.name()), Some(genre));
    }
}
