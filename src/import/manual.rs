//! Single-book entry typed in by a librarian.

use crate::config::Genre;
use crate::error::{AppError, ParseError, Result};
use crate::import::csv::{parse_copies, split_authors};
use crate::library::CandidateRecord;
use crate::metadata::GenreSuggester;

/// Raw form fields for one book.
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    /// Title.
    pub title: String,
    /// Authors; each value may itself hold several names separated by `;`.
    pub authors: Vec<String>,
    /// Genre name, or None to ask for a suggestion.
    pub genre: Option<String>,
    /// ISBN.
    pub isbn: String,
    /// Publication year.
    pub publication_year: String,
    /// Number of copies as typed.
    pub total_copies: String,
    /// Description.
    pub description: Option<String>,
    /// Shelf.
    pub shelf_location: Option<String>,
    /// Publisher.
    pub publisher: Option<String>,
    /// Cover image URL.
    pub cover_image_url: Option<String>,
}

impl ManualEntry {
    /// Validate the form and build a candidate.
    ///
    /// A blank genre is filled from `suggester` when it returns a known
    /// genre; otherwise the user has to pick one.
    pub async fn into_candidate(
        self,
        suggester: Option<&dyn GenreSuggester>,
    ) -> Result<CandidateRecord> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::InvalidFormat("Title is required".to_string()));
        }

        let authors: Vec<String> = self
            .authors
            .iter()
            .map(String::as_str)
            .flat_map(split_authors)
            .collect();
        if authors.is_empty() {
            return Err(AppError::InvalidFormat(
                "At least one author is required".to_string(),
            ));
        }

        let isbn = self.isbn.trim().to_string();
        if isbn.is_empty() {
            return Err(AppError::InvalidFormat("ISBN is required".to_string()));
        }

        let total_copies = parse_copies(1, &self.total_copies).map_err(|_| {
            AppError::InvalidFormat(format!(
                "Number of copies must be a positive integer, got '{}'",
                self.total_copies
            ))
        })?;

        let genre = match self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(value) => Genre::parse(value).ok_or_else(|| {
                AppError::Parse(ParseError::InvalidGenre {
                    row: 1,
                    value: value.to_string(),
                })
            })?,
            None => suggest(suggester, &title, &authors).await.ok_or_else(|| {
                AppError::InvalidFormat("Genre is required; choose one from the list".to_string())
            })?,
        };

        Ok(CandidateRecord {
            title,
            authors,
            genre,
            isbn,
            publication_year: self.publication_year.trim().to_string(),
            total_copies,
            description: self.description,
            shelf_location: self.shelf_location,
            publisher: self.publisher,
            cover_image_url: self.cover_image_url,
        })
    }
}

async fn suggest(
    suggester: Option<&dyn GenreSuggester>,
    title: &str,
    authors: &[String],
) -> Option<Genre> {
    let suggestion = suggester?.suggest_genre(title, authors).await?;
    let genre = Genre::parse(&suggestion);
    if genre.is_none() {
        tracing::debug!(suggestion = %suggestion, "Ignoring unknown genre suggestion");
    }
    genre
}
