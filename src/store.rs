//! Storage seams used by the reconciler.

mod memory;

pub use memory::MemoryCatalog;

use crate::error::Result;
use crate::library::{CatalogEntry, EntryUpdate, ShelfRecord};

/// Persistent catalog of books keyed by ISBN.
pub trait CatalogStore: Send + Sync {
    /// Find the entry with exactly this ISBN.
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<CatalogEntry>>;

    /// Insert a new entry, returning its id.
    fn insert(&self, entry: &CatalogEntry) -> Result<String>;

    /// Apply an update to an existing entry, returning the stored result.
    ///
    /// Implementations must add `update.added_copies` atomically so that
    /// concurrent updates of one entry never lose copies.
    fn update(&self, id: &str, update: &EntryUpdate) -> Result<CatalogEntry>;

    /// All entries, ordered by title.
    fn list_entries(&self) -> Result<Vec<CatalogEntry>>;
}

/// Shelves and the books assigned to them.
pub trait ShelfStore: Send + Sync {
    /// Shelf with its current occupancy.
    fn get_shelf(&self, shelf_id: &str) -> Result<Option<ShelfRecord>>;

    /// Place a catalog entry (all of its copies) on a shelf.
    fn assign_book_to_shelf(&self, book_id: &str, shelf_id: &str) -> Result<()>;
}
