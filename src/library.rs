/// Book candidate and catalog entry models.
pub mod book;
/// Shelves and capacity checks.
pub mod shelf;

pub use book::{CandidateRecord, CatalogEntry, EntryUpdate};
pub use shelf::{CapacityVerdict, ShelfCapacityChecker, ShelfRecord};
