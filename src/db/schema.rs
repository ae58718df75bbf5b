use crate::config::Genre;
use crate::db::*;
use crate::error::{AppError, Result};
use crate::library::{CatalogEntry, EntryUpdate, ShelfRecord};
use crate::store::{CatalogStore, ShelfStore};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Arc;

const ENTRY_COLUMNS: &str = "id, isbn, title, authors_json, genre, publication_year,
    total_copies, available_copies, description, shelf_location, publisher,
    cover_image_url, created_at, updated_at";

const SHELF_QUERY: &str = "SELECT s.id, s.name, s.capacity,
    (SELECT COALESCE(SUM(b.total_copies), 0) FROM books b WHERE b.shelf_location = s.id)
    FROM shelves s";

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Catalog entries, one per ISBN
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                isbn TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                authors_json TEXT NOT NULL,
                genre TEXT NOT NULL,
                publication_year TEXT NOT NULL DEFAULT '',
                total_copies INTEGER NOT NULL,
                available_copies INTEGER NOT NULL,
                description TEXT,
                shelf_location TEXT,
                publisher TEXT,
                cover_image_url TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Shelves; occupancy is the sum of copies of books placed on them
            CREATE TABLE IF NOT EXISTS shelves (
                id TEXT PRIMARY KEY,
                name TEXT,
                capacity INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_books_shelf ON books(shelf_location);
            CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== BOOK OPERATIONS ==========

    /// Get a catalog entry by ID.
    pub fn get_entry(&self, id: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.conn.lock();
        Self::query_entry(&conn, "id", id)
    }

    fn query_entry(conn: &Connection, column: &str, value: &str) -> Result<Option<CatalogEntry>> {
        conn.query_row(
            &format!("SELECT {} FROM books WHERE {} = ?1", ENTRY_COLUMNS, column),
            params![value],
            row_to_entry,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get book: {}", e)))
    }

    // ========== SHELF OPERATIONS ==========

    /// Create a new shelf.
    pub fn create_shelf(&self, shelf: &Shelf) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO shelves (id, name, capacity, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![shelf.id, shelf.name, shelf.capacity, shelf.created_at],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::InvalidFormat(format!("Shelf '{}' already exists", shelf.id))
            } else {
                AppError::Database(format!("Failed to create shelf: {}", e))
            }
        })?;
        Ok(())
    }

    /// List all shelves with their occupancy.
    pub fn list_shelves(&self) -> Result<Vec<ShelfRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY s.id", SHELF_QUERY))
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let shelves = stmt
            .query_map([], row_to_shelf)
            .map_err(|e| AppError::Database(format!("Failed to list shelves: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect shelves: {}", e)))?;

        Ok(shelves)
    }

    /// Delete an empty shelf.
    pub fn delete_shelf(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let occupied: u32 = conn
            .query_row(
                "SELECT COALESCE(SUM(total_copies), 0) FROM books WHERE shelf_location = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Database(format!("Failed to count shelf copies: {}", e)))?;

        if occupied > 0 {
            return Err(AppError::InvalidFormat(format!(
                "Shelf '{}' still holds {} copies",
                id, occupied
            )));
        }

        let rows = conn
            .execute("DELETE FROM shelves WHERE id = ?1", params![id])
            .map_err(|e| AppError::Database(format!("Failed to delete shelf: {}", e)))?;
        Ok(rows > 0)
    }
}

impl CatalogStore for Database {
    fn find_by_isbn(&self, isbn: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.conn.lock();
        Self::query_entry(&conn, "isbn", isbn)
    }

    fn insert(&self, entry: &CatalogEntry) -> Result<String> {
        let authors_json = serde_json::to_string(&entry.authors).unwrap_or_default();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books
             (id, isbn, title, authors_json, genre, publication_year, total_copies,
              available_copies, description, shelf_location, publisher, cover_image_url,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                entry.id,
                entry.isbn,
                entry.title,
                authors_json,
                entry.genre.name(),
                entry.publication_year,
                entry.total_copies,
                entry.available_copies,
                entry.description,
                entry.shelf_location,
                entry.publisher,
                entry.cover_image_url,
                entry.created_at,
                entry.updated_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::InvalidFormat(format!("ISBN '{}' already exists", entry.isbn))
            } else {
                AppError::Database(format!("Failed to insert book: {}", e))
            }
        })?;
        Ok(entry.id.clone())
    }

    fn update(&self, id: &str, update: &EntryUpdate) -> Result<CatalogEntry> {
        let conn = self.conn.lock();
        // Counts are read back as u32; refuse an addition that would not fit.
        let rows = conn
            .execute(
                "UPDATE books SET
                    total_copies = total_copies + ?2,
                    available_copies = available_copies + ?2,
                    description = COALESCE(?3, description),
                    shelf_location = COALESCE(?4, shelf_location),
                    publisher = COALESCE(?5, publisher),
                    cover_image_url = COALESCE(?6, cover_image_url),
                    updated_at = ?7
                 WHERE id = ?1 AND total_copies + ?2 <= ?8 AND available_copies + ?2 <= ?8",
                params![
                    id,
                    update.added_copies,
                    update.description,
                    update.shelf_location,
                    update.publisher,
                    update.cover_image_url,
                    now_timestamp(),
                    u32::MAX,
                ],
            )
            .map_err(|e| AppError::Database(format!("Failed to update book: {}", e)))?;

        let entry = Self::query_entry(&conn, "id", id)?
            .ok_or_else(|| AppError::NotFound(format!("Book {}", id)))?;

        if rows == 0 {
            return Err(AppError::InvalidFormat(format!(
                "Book {} cannot hold {} more copies",
                entry.isbn, update.added_copies
            )));
        }

        Ok(entry)
    }

    fn list_entries(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM books ORDER BY title, isbn",
                ENTRY_COLUMNS
            ))
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let entries = stmt
            .query_map([], row_to_entry)
            .map_err(|e| AppError::Database(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(entries)
    }
}

impl ShelfStore for Database {
    fn get_shelf(&self, shelf_id: &str) -> Result<Option<ShelfRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE s.id = ?1", SHELF_QUERY),
            params![shelf_id],
            row_to_shelf,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get shelf: {}", e)))
    }

    fn assign_book_to_shelf(&self, book_id: &str, shelf_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row(
                "SELECT 1 FROM shelves WHERE id = ?1",
                params![shelf_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| AppError::Database(format!("Failed to get shelf: {}", e)))?
            .is_some();

        if !exists {
            return Err(AppError::NotFound(format!("Shelf {}", shelf_id)));
        }

        let rows = conn
            .execute(
                "UPDATE books SET shelf_location = ?2, updated_at = ?3 WHERE id = ?1",
                params![book_id, shelf_id, now_timestamp()],
            )
            .map_err(|e| AppError::Database(format!("Failed to assign shelf: {}", e)))?;

        if rows == 0 {
            return Err(AppError::NotFound(format!("Book {}", book_id)));
        }
        Ok(())
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let authors_json: String = row.get(3)?;
    let genre_name: String = row.get(4)?;
    let genre = Genre::parse(&genre_name).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(AppError::Database(format!("Unknown genre '{}'", genre_name))),
        )
    })?;

    Ok(CatalogEntry {
        id: row.get(0)?,
        isbn: row.get(1)?,
        title: row.get(2)?,
        authors: serde_json::from_str(&authors_json).unwrap_or_default(),
        genre,
        publication_year: row.get(5)?,
        total_copies: row.get(6)?,
        available_copies: row.get(7)?,
        description: row.get(8)?,
        shelf_location: row.get(9)?,
        publisher: row.get(10)?,
        cover_image_url: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn row_to_shelf(row: &Row<'_>) -> rusqlite::Result<ShelfRecord> {
    Ok(ShelfRecord {
        shelf_id: row.get(0)?,
        name: row.get(1)?,
        capacity: row.get(2)?,
        current_occupancy: row.get(3)?,
    })
}
