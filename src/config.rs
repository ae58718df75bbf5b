use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Book catalog import with ISBN reconciliation.
#[derive(Parser, Debug, Clone)]
#[command(name = "libris")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "LIBRIS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },

    /// Import books from a CSV file.
    Import {
        /// CSV file (Title,Author,Genre,ISBN,PublicationDate,TotalCopies).
        file: PathBuf,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Add a single book by hand.
    Add(AddArgs),

    /// Shelf management commands.
    Shelf {
        /// Shelf subcommand action.
        #[command(subcommand)]
        action: ShelfCommand,
    },

    /// Catalog inspection commands.
    Catalog {
        /// Catalog subcommand action.
        #[command(subcommand)]
        action: CatalogCommand,
    },
}

/// Fields of a manually entered book.
#[derive(clap::Args, Debug, Clone)]
pub struct AddArgs {
    /// Book title.
    #[arg(long)]
    pub title: String,
    /// Author (repeat for several authors).
    #[arg(long = "author", required = true)]
    pub authors: Vec<String>,
    /// Genre (suggested from title when omitted, if a suggester is available).
    #[arg(long)]
    pub genre: Option<String>,
    /// ISBN.
    #[arg(long)]
    pub isbn: String,
    /// Publication year.
    #[arg(long, default_value = "")]
    pub year: String,
    /// Number of copies.
    #[arg(long, default_value = "1")]
    pub copies: String,
    /// Shelf to place the copies on.
    #[arg(long)]
    pub shelf: Option<String>,
    /// Publisher.
    #[arg(long)]
    pub publisher: Option<String>,
    /// Description.
    #[arg(long)]
    pub description: Option<String>,
    /// Cover image URL.
    #[arg(long)]
    pub cover_url: Option<String>,
}

/// Shelf management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ShelfCommand {
    /// Add a new shelf.
    Add {
        /// Shelf identifier (as used in the shelf column).
        id: String,
        /// Maximum number of copies.
        #[arg(short, long)]
        capacity: u32,
        /// Display name.
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove a shelf.
    Del {
        /// Shelf identifier.
        id: String,
    },

    /// Place a catalog entry, with all of its copies, on a shelf.
    Place {
        /// ISBN of the catalog entry.
        isbn: String,
        /// Shelf identifier.
        shelf: String,
    },

    /// List shelves with their occupancy.
    List,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CatalogCommand {
    /// List all catalog entries.
    List,

    /// Show one entry.
    Show {
        /// ISBN of the entry.
        isbn: String,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Import configuration.
    #[serde(default)]
    pub import: ImportConfig,

    /// Metadata enrichment configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/catalog.db")
}

/// Import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Seconds to wait for a metadata lookup before skipping the record.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Maximum metadata lookups in flight. Catalog writes stay sequential.
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: default_lookup_timeout(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

fn default_lookup_timeout() -> u64 {
    10
}

fn default_lookup_concurrency() -> usize {
    4
}

impl ImportConfig {
    /// Lookup timeout as a duration.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Metadata enrichment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// JSON file mapping ISBN to book metadata (enrichment disabled if unset).
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("libris.toml"),
            dirs::config_dir()
                .map(|p| p.join("libris").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/libris/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# libris configuration

[database]
# path = "/var/lib/libris/catalog.db"

[import]
# Seconds before a metadata lookup is abandoned and the book skipped
lookup_timeout_secs = 10
# Metadata lookups running at once (catalog writes are always sequential)
lookup_concurrency = 4

[metadata]
# JSON file of {"<isbn>": {"title": ..., "publisher": ..., ...}} used to
# fill in missing descriptions, publishers and covers
# file = "metadata.json"
"#
        .to_string()
    }
}

/// Genres a book can be catalogued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    /// Fiction.
    Fiction,
    /// Non-fiction.
    NonFiction,
    /// Mystery and crime.
    Mystery,
    /// Fantasy.
    Fantasy,
    /// Science fiction.
    ScienceFiction,
    /// Popular and academic science.
    Science,
    /// History.
    History,
    /// Biography and memoir.
    Biography,
    /// Romance.
    Romance,
    /// Horror.
    Horror,
    /// Poetry.
    Poetry,
    /// Children's books.
    Children,
    /// Technology and computing.
    Technology,
    /// Philosophy.
    Philosophy,
    /// Self-help.
    SelfHelp,
    /// Business and economics.
    Business,
    /// Art and design.
    Art,
    /// Religion.
    Religion,
    /// Travel.
    Travel,
    /// Dictionaries, encyclopedias and other reference works.
    Reference,
}

impl Genre {
    /// Every known genre, in display order.
    pub const ALL: [Genre; 20] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Mystery,
        Genre::Fantasy,
        Genre::ScienceFiction,
        Genre::Science,
        Genre::History,
        Genre::Biography,
        Genre::Romance,
        Genre::Horror,
        Genre::Poetry,
        Genre::Children,
        Genre::Technology,
        Genre::Philosophy,
        Genre::SelfHelp,
        Genre::Business,
        Genre::Art,
        Genre::Religion,
        Genre::Travel,
        Genre::Reference,
    ];

    /// Human-readable name, as written in CSV files.
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Mystery => "Mystery",
            Genre::Fantasy => "Fantasy",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Science => "Science",
            Genre::History => "History",
            Genre::Biography => "Biography",
            Genre::Romance => "Romance",
            Genre::Horror => "Horror",
            Genre::Poetry => "Poetry",
            Genre::Children => "Children",
            Genre::Technology => "Technology",
            Genre::Philosophy => "Philosophy",
            Genre::SelfHelp => "Self-Help",
            Genre::Business => "Business",
            Genre::Art => "Art",
            Genre::Religion => "Religion",
            Genre::Travel => "Travel",
            Genre::Reference => "Reference",
        }
    }

    /// Parse a genre name, ignoring case and hyphens ("nonfiction" matches
    /// "Non-Fiction"). Abbreviations such as "SciFi" are not accepted.
    pub fn parse(value: &str) -> Option<Self> {
        let wanted = normalize_genre(value);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|g| normalize_genre(g.name()) == wanted)
    }
}

fn normalize_genre(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
