//! Shelves and the capacity check applied before copies are placed.

use crate::error::SkipReason;
use crate::library::book::CandidateRecord;
use serde::{Deserialize, Serialize};

/// A physical shelf with a finite copy capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfRecord {
    /// Shelf identifier.
    pub shelf_id: String,

    /// Display name.
    pub name: Option<String>,

    /// Maximum number of copies.
    pub capacity: u32,

    /// Copies currently assigned (derived from catalog entries).
    pub current_occupancy: u32,
}

impl ShelfRecord {
    /// Copies that can still be placed.
    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.current_occupancy)
    }
}

/// Outcome of a capacity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityVerdict {
    /// Copies fit, or no shelf was requested.
    Accepted,

    /// Copies would push the shelf past capacity.
    CapacityExceeded {
        /// Target shelf.
        shelf_id: String,
        /// Shelf capacity.
        capacity: u32,
        /// Copies already on the shelf.
        occupancy: u32,
        /// Copies requested.
        requested: u32,
        /// Copies beyond capacity.
        overflow: u32,
    },

    /// Requested shelf is unknown.
    UnknownShelf {
        /// Requested shelf.
        shelf_id: String,
    },
}

impl CapacityVerdict {
    /// Whether the record may be written.
    pub fn is_accepted(&self) -> bool {
        matches!(self, CapacityVerdict::Accepted)
    }

    /// Skip reason for a refused verdict.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            CapacityVerdict::Accepted => None,
            CapacityVerdict::CapacityExceeded {
                shelf_id,
                capacity,
                occupancy,
                requested,
                overflow,
            } => Some(SkipReason::CapacityExceeded {
                shelf_id: shelf_id.clone(),
                capacity: *capacity,
                occupancy: *occupancy,
                requested: *requested,
                overflow: *overflow,
            }),
            CapacityVerdict::UnknownShelf { shelf_id } => Some(SkipReason::ShelfNotFound {
                shelf_id: shelf_id.clone(),
            }),
        }
    }
}

/// Decides whether a batch of copies fits on a shelf.
pub struct ShelfCapacityChecker;

impl ShelfCapacityChecker {
    /// Check a candidate against the current record of its shelf.
    ///
    /// Candidates without a shelf are accepted; they can be assigned later.
    pub fn check(candidate: &CandidateRecord, shelf: Option<&ShelfRecord>) -> CapacityVerdict {
        match candidate.shelf() {
            None => CapacityVerdict::Accepted,
            Some(shelf_id) => Self::check_copies(shelf_id, shelf, candidate.total_copies),
        }
    }

    /// Check an explicit number of copies against a shelf.
    pub fn check_copies(
        shelf_id: &str,
        shelf: Option<&ShelfRecord>,
        copies: u32,
    ) -> CapacityVerdict {
        let Some(shelf) = shelf else {
            return CapacityVerdict::UnknownShelf {
                shelf_id: shelf_id.to_string(),
            };
        };

        let after = u64::from(shelf.current_occupancy) + u64::from(copies);
        if after > u64::from(shelf.capacity) {
            CapacityVerdict::CapacityExceeded {
                shelf_id: shelf.shelf_id.clone(),
                capacity: shelf.capacity,
                occupancy: shelf.current_occupancy,
                requested: copies,
                overflow: (after - u64::from(shelf.capacity)) as u32,
            }
        } else {
            CapacityVerdict::Accepted
        }
    }
}
