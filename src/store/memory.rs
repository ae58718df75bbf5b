use super::{CatalogStore, ShelfStore};
use crate::error::{AppError, Result};
use crate::library::{CatalogEntry, EntryUpdate, ShelfRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    /// Entries by id.
    entries: HashMap<String, CatalogEntry>,
    /// ISBN to entry id.
    by_isbn: HashMap<String, String>,
    /// Shelf id to (name, capacity).
    shelves: HashMap<String, (Option<String>, u32)>,
}

/// In-memory catalog and shelf store.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCatalog {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a shelf.
    pub fn add_shelf(&self, shelf_id: &str, name: Option<&str>, capacity: u32) {
        self.inner
            .lock()
            .shelves
            .insert(shelf_id.to_string(), (name.map(String::from), capacity));
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl CatalogStore for MemoryCatalog {
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<CatalogEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .by_isbn
            .get(isbn)
            .and_then(|id| inner.entries.get(id))
            .cloned())
    }

    fn insert(&self, entry: &CatalogEntry) -> Result<String> {
        let mut inner = self.inner.lock();
        if inner.by_isbn.contains_key(&entry.isbn) {
            return Err(AppError::InvalidFormat(format!(
                "ISBN '{}' already exists",
                entry.isbn
            )));
        }
        inner.by_isbn.insert(entry.isbn.clone(), entry.id.clone());
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry.id.clone())
    }

    fn update(&self, id: &str, update: &EntryUpdate) -> Result<CatalogEntry> {
        let mut inner = self.inner.lock();
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Book {}", id)))?;
        entry.apply(update)?;
        Ok(entry.clone())
    }

    fn list_entries(&self) -> Result<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self.inner.lock().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(entries)
    }
}

impl ShelfStore for MemoryCatalog {
    fn get_shelf(&self, shelf_id: &str) -> Result<Option<ShelfRecord>> {
        let inner = self.inner.lock();
        let Some((name, capacity)) = inner.shelves.get(shelf_id) else {
            return Ok(None);
        };

        let occupancy: u32 = inner
            .entries
            .values()
            .filter(|e| e.shelf_location.as_deref() == Some(shelf_id))
            .map(|e| e.total_copies)
            .sum();

        Ok(Some(ShelfRecord {
            shelf_id: shelf_id.to_string(),
            name: name.clone(),
            capacity: *capacity,
            current_occupancy: occupancy,
        }))
    }

    fn assign_book_to_shelf(&self, book_id: &str, shelf_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.shelves.contains_key(shelf_id) {
            return Err(AppError::NotFound(format!("Shelf {}", shelf_id)));
        }
        let entry = inner
            .entries
            .get_mut(book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book {}", book_id)))?;
        entry.shelf_location = Some(shelf_id.to_string());
        Ok(())
    }
}
