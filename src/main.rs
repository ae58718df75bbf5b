//! libris command-line entry point.

use clap::Parser;
use libris::{
    config::{AddArgs, CatalogCommand, Cli, Command, Config, ShelfCommand},
    db::{self, Database, Shelf},
    import::{ImportAction, ImportReport, ManualEntry, Reconciler},
    library::CapacityVerdict,
    metadata::StaticLookup,
    store::CatalogStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "libris=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Import { file, json } => cmd_import(&config, &file, json).await,
        Command::Add(args) => cmd_add(&config, args).await,
        Command::Shelf { action } => cmd_shelf(action, &config),
        Command::Catalog { action } => cmd_catalog(action, &config),
    }
}

/// Initialize config and database.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nAdd shelves with: libris shelf add <id> --capacity <copies>");
    println!("Then run: libris import books.csv");

    Ok(())
}

/// Build a reconciler over the configured database and metadata file.
fn reconciler(config: &Config, db: &Database) -> anyhow::Result<Reconciler> {
    let mut reconciler = Reconciler::new(Arc::new(db.clone()), Arc::new(db.clone()))
        .with_options(config.import.clone().into());

    if let Some(ref file) = config.metadata.file {
        reconciler = reconciler.with_lookup(Arc::new(StaticLookup::load(file)?));
    }

    Ok(reconciler)
}

/// Cancel the token on Ctrl-C; running writes finish first.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current book");
            child.cancel();
        }
    });

    token
}

/// Import a CSV file.
async fn cmd_import(config: &Config, file: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let db = Database::open(&config.database.path)?;
    let reconciler = reconciler(config, &db)?;

    tracing::info!(file = %file.display(), database = %config.database.path.display(), "Importing");

    let report = reconciler.run_csv(&text, &cancel_on_ctrl_c()).await?;
    print_report(&report, json)
}

/// Add one book by hand.
async fn cmd_add(config: &Config, args: AddArgs) -> anyhow::Result<()> {
    let entry = ManualEntry {
        title: args.title,
        authors: args.authors,
        genre: args.genre,
        isbn: args.isbn,
        publication_year: args.year,
        total_copies: args.copies,
        description: args.description,
        shelf_location: args.shelf,
        publisher: args.publisher,
        cover_image_url: args.cover_url,
    };
    let candidate = entry.into_candidate(None).await?;

    let db = Database::open(&config.database.path)?;
    let report = reconciler(config, &db)?
        .run(vec![candidate], &cancel_on_ctrl_c())
        .await;
    print_report(&report, false)
}

fn print_report(report: &ImportReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for record in &report.processed {
        let action = match record.action {
            ImportAction::Inserted => "added",
            ImportAction::Updated => "updated",
        };
        println!(
            "{:<8} {:<15} {:<40} {} copies",
            action, record.isbn, record.title, record.total_copies
        );
    }
    for skipped in &report.skipped {
        println!(
            "{:<8} {:<15} {:<40} {}",
            "skipped", skipped.record.isbn, skipped.record.title, skipped.reason
        );
    }
    println!("{}", report.summary());

    Ok(())
}

/// Shelf management commands.
fn cmd_shelf(action: ShelfCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        ShelfCommand::Add { id, capacity, name } => {
            if capacity == 0 {
                anyhow::bail!("Capacity must be at least 1");
            }

            let shelf = Shelf {
                id: id.clone(),
                name,
                capacity,
                created_at: db::now_timestamp(),
            };
            db.create_shelf(&shelf)?;
            println!("Added shelf: {} (capacity: {})", id, capacity);
        }

        ShelfCommand::Del { id } => {
            if db.delete_shelf(&id)? {
                println!("Deleted shelf: {}", id);
            } else {
                println!("Shelf not found: {}", id);
            }
        }

        ShelfCommand::Place { isbn, shelf } => {
            match reconciler(config, &db)?.place_on_shelf(isbn.trim(), &shelf)? {
                CapacityVerdict::Accepted => println!("Placed {} on shelf {}", isbn, shelf),
                CapacityVerdict::CapacityExceeded {
                    capacity,
                    occupancy,
                    requested,
                    overflow,
                    ..
                } => anyhow::bail!(
                    "Shelf {} is over capacity by {} (capacity {}, occupied {}, requested {})",
                    shelf,
                    overflow,
                    capacity,
                    occupancy,
                    requested
                ),
                CapacityVerdict::UnknownShelf { .. } => {
                    anyhow::bail!("Shelf not found: {}", shelf)
                }
            }
        }

        ShelfCommand::List => {
            let shelves = db.list_shelves()?;
            if shelves.is_empty() {
                println!("No shelves found.");
            } else {
                println!(
                    "{:<15} {:<30} {:>10} {:>10} {:>10}",
                    "ID", "NAME", "OCCUPIED", "CAPACITY", "FREE"
                );
                println!("{}", "-".repeat(79));
                for shelf in shelves {
                    println!(
                        "{:<15} {:<30} {:>10} {:>10} {:>10}",
                        shelf.shelf_id,
                        shelf.name.as_deref().unwrap_or("-"),
                        shelf.current_occupancy,
                        shelf.capacity,
                        shelf.free_space()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Catalog inspection commands.
fn cmd_catalog(action: CatalogCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        CatalogCommand::List => {
            let entries = db.list_entries()?;
            if entries.is_empty() {
                println!("Catalog is empty.");
            } else {
                println!(
                    "{:<15} {:<40} {:<15} {:>6} {:>6}",
                    "ISBN", "TITLE", "SHELF", "TOTAL", "AVAIL"
                );
                println!("{}", "-".repeat(86));
                for entry in entries {
                    println!(
                        "{:<15} {:<40} {:<15} {:>6} {:>6}",
                        entry.isbn,
                        entry.title,
                        entry.shelf_location.as_deref().unwrap_or("-"),
                        entry.total_copies,
                        entry.available_copies
                    );
                }
            }
        }

        CatalogCommand::Show { isbn } => {
            let Some(entry) = db.find_by_isbn(isbn.trim())? else {
                anyhow::bail!("No book with ISBN {}", isbn);
            };

            println!("Title:       {}", entry.title);
            println!("Authors:     {}", entry.authors.join(", "));
            println!("Genre:       {}", entry.genre);
            println!("ISBN:        {}", entry.isbn);
            println!("Published:   {}", entry.publication_year);
            println!("Publisher:   {}", entry.publisher.as_deref().unwrap_or("-"));
            println!("Shelf:       {}", entry.shelf_location.as_deref().unwrap_or("-"));
            println!(
                "Copies:      {} ({} available)",
                entry.total_copies, entry.available_copies
            );
            println!(
                "Updated:     {}",
                db::timestamp_to_datetime(entry.updated_at).format("%Y-%m-%d %H:%M")
            );
            if let Some(description) = entry.description {
                println!("\n{}", description);
            }
        }
    }

    Ok(())
}
