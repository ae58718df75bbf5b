//! External book metadata and genre suggestion.
//!
//! Both collaborators are optional hints: a failed lookup means "no
//! enrichment", never a failed import.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Metadata returned by a lookup service for one ISBN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publisher.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Publication date (any format starting with the year).
    #[serde(default)]
    pub publication_date: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl BookMetadata {
    /// Four-digit year at the start of the publication date.
    pub fn publication_year(&self) -> Option<String> {
        let date = self.publication_date.as_deref()?.trim();
        let year: String = date.chars().take(4).collect();
        (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
    }
}

/// Looks up book metadata by ISBN.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Fetch metadata for an ISBN; `Ok(None)` when the ISBN is unknown.
    async fn lookup(&self, isbn: &str) -> Result<Option<BookMetadata>>;
}

/// Suggests a genre for a book being entered by hand.
#[async_trait]
pub trait GenreSuggester: Send + Sync {
    /// Suggested genre name, or None when no suggestion could be made.
    async fn suggest_genre(&self, title: &str, authors: &[String]) -> Option<String>;
}

/// Lookup backed by a fixed map, typically loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    books: HashMap<String, BookMetadata>,
}

impl StaticLookup {
    /// Create a lookup from a map of ISBN to metadata.
    pub fn new(books: HashMap<String, BookMetadata>) -> Self {
        Self { books }
    }

    /// Load a JSON object of `{ "<isbn>": { ...metadata } }`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let books: HashMap<String, BookMetadata> = serde_json::from_str(&content)
            .map_err(|e| {
                AppError::Config(format!(
                    "Failed to parse metadata file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(path = %path.display(), books = books.len(), "Loaded metadata file");
        Ok(Self::new(books))
    }

    /// Number of known ISBNs.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the lookup knows no ISBN.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[async_trait]
impl MetadataLookup for StaticLookup {
    async fn lookup(&self, isbn: &str) -> Result<Option<BookMetadata>> {
        Ok(self.books.get(isbn.trim()).cloned())
    }
}
