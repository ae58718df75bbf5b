mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shelf definition as stored (occupancy is computed on read).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelf {
    /// Shelf identifier.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Maximum number of copies.
    pub capacity: u32,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
