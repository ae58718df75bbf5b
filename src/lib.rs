//! libris: book catalog import with ISBN reconciliation.
//!
//! This crate merges batches of candidate books, parsed from CSV or typed
//! in by hand, into a catalog where each ISBN has exactly one entry.
//!
//! # Features
//!
//! - CSV parsing with row-level error reporting
//! - Additive copy counts for repeated ISBNs
//! - Shelf capacity enforcement
//! - Optional metadata enrichment with per-lookup timeouts
//! - Cooperative cancellation of running imports
//! - SQLite and in-memory stores behind injectable traits

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// CSV parsing, reconciliation and reports.
pub mod import;
/// Book and shelf models.
pub mod library;
/// External metadata and genre suggestion.
pub mod metadata;
/// Catalog and shelf store traits.
pub mod store;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config, Genre};
pub use db::Database;
pub use error::{AppError, ParseError, Result, SkipReason};
pub use import::{ImportReport, Reconciler};
