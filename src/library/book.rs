//! Book models: import candidates and committed catalog entries.

use crate::config::Genre;
use crate::db::now_timestamp;
use crate::error::{AppError, Result};
use crate::metadata::BookMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parsed book awaiting reconciliation against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Book title.
    pub title: String,

    /// Authors, in the order given.
    pub authors: Vec<String>,

    /// Genre from the allow-list.
    pub genre: Genre,

    /// ISBN, used as the catalog key.
    pub isbn: String,

    /// Publication year as written by the user (may be empty).
    pub publication_year: String,

    /// Copies being added (at least one).
    pub total_copies: u32,

    /// Book description or summary.
    pub description: Option<String>,

    /// Shelf the copies go on (None defers assignment).
    pub shelf_location: Option<String>,

    /// Publisher name.
    pub publisher: Option<String>,

    /// Cover image URL.
    pub cover_image_url: Option<String>,
}

impl CandidateRecord {
    /// Create a candidate with only the required fields.
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        genre: Genre,
        isbn: impl Into<String>,
        publication_year: impl Into<String>,
        total_copies: u32,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            genre,
            isbn: isbn.into(),
            publication_year: publication_year.into(),
            total_copies,
            description: None,
            shelf_location: None,
            publisher: None,
            cover_image_url: None,
        }
    }

    /// Same record placed on a shelf.
    pub fn on_shelf(mut self, shelf_id: impl Into<String>) -> Self {
        self.shelf_location = Some(shelf_id.into());
        self
    }

    /// Shelf id if one is set and not blank.
    pub fn shelf(&self) -> Option<&str> {
        non_empty(&self.shelf_location)
    }

    /// Fill descriptive gaps from looked-up metadata.
    ///
    /// Title, authors, genre, ISBN and copy count always come from the
    /// record itself; metadata only supplies fields the record left empty.
    pub fn enriched(&self, metadata: &BookMetadata) -> Self {
        let mut record = self.clone();

        if record.publication_year.trim().is_empty() {
            if let Some(year) = metadata.publication_year() {
                record.publication_year = year;
            }
        }
        fill(&mut record.description, &metadata.description);
        fill(&mut record.publisher, &metadata.publisher);
        fill(&mut record.cover_image_url, &metadata.cover_image_url);

        record
    }
}

fn fill(target: &mut Option<String>, source: &Option<String>) {
    if non_empty(target).is_none() {
        if let Some(value) = non_empty(source) {
            *target = Some(value.to_string());
        }
    }
}

/// Trimmed value of an optional field, or None when blank.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A committed book title with its copy counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique identifier.
    pub id: String,

    /// ISBN (unique within the catalog).
    pub isbn: String,

    /// Book title.
    pub title: String,

    /// Authors.
    pub authors: Vec<String>,

    /// Genre.
    pub genre: Genre,

    /// Publication year.
    pub publication_year: String,

    /// Copies owned.
    pub total_copies: u32,

    /// Copies not currently lent out.
    pub available_copies: u32,

    /// Book description.
    pub description: Option<String>,

    /// Shelf holding the copies.
    pub shelf_location: Option<String>,

    /// Publisher.
    pub publisher: Option<String>,

    /// Cover image URL.
    pub cover_image_url: Option<String>,

    /// Creation timestamp.
    pub created_at: i64,

    /// Last update timestamp.
    pub updated_at: i64,
}

impl CatalogEntry {
    /// Build a first-time entry from a candidate; every copy starts available.
    pub fn from_candidate(candidate: &CandidateRecord) -> Self {
        let now = now_timestamp();

        Self {
            id: Uuid::new_v4().to_string(),
            isbn: candidate.isbn.clone(),
            title: candidate.title.clone(),
            authors: candidate.authors.clone(),
            genre: candidate.genre,
            publication_year: candidate.publication_year.clone(),
            total_copies: candidate.total_copies,
            available_copies: candidate.total_copies,
            description: non_empty(&candidate.description).map(String::from),
            shelf_location: candidate.shelf().map(String::from),
            publisher: non_empty(&candidate.publisher).map(String::from),
            cover_image_url: non_empty(&candidate.cover_image_url).map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update in place (used by in-memory stores).
    ///
    /// Fails without touching the entry if a copy count would overflow.
    pub fn apply(&mut self, update: &EntryUpdate) -> Result<()> {
        let (Some(total), Some(available)) = (
            self.total_copies.checked_add(update.added_copies),
            self.available_copies.checked_add(update.added_copies),
        ) else {
            return Err(AppError::InvalidFormat(format!(
                "Book {} cannot hold {} more copies",
                self.isbn, update.added_copies
            )));
        };
        self.total_copies = total;
        self.available_copies = available;

        if let Some(v) = &update.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = &update.shelf_location {
            self.shelf_location = Some(v.clone());
        }
        if let Some(v) = &update.publisher {
            self.publisher = Some(v.clone());
        }
        if let Some(v) = &update.cover_image_url {
            self.cover_image_url = Some(v.clone());
        }
        self.updated_at = now_timestamp();
        Ok(())
    }
}

/// Change applied to an existing entry when the same ISBN is imported again.
///
/// Copies are added, never set, so stores can apply the update atomically
/// instead of writing back a count read earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    /// Copies to add to both the total and the available count.
    pub added_copies: u32,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement shelf.
    pub shelf_location: Option<String>,
    /// Replacement publisher.
    pub publisher: Option<String>,
    /// Replacement cover image URL.
    pub cover_image_url: Option<String>,
}

impl EntryUpdate {
    /// Update for a re-imported candidate. Blank candidate fields keep the
    /// existing values.
    pub fn from_candidate(candidate: &CandidateRecord) -> Self {
        Self {
            added_copies: candidate.total_copies,
            description: non_empty(&candidate.description).map(String::from),
            shelf_location: candidate.shelf().map(String::from),
            publisher: non_empty(&candidate.publisher).map(String::from),
            cover_image_url: non_empty(&candidate.cover_image_url).map(String::from),
        }
    }
}
