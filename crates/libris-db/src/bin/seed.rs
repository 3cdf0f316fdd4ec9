//! # Seed Data Generator
//!
//! Populates a database with sample reference data and books, then runs a
//! short lending cycle against it.
//!
//! ## Usage
//! ```bash
//! # Generate 20 books (default)
//! cargo run -p libris-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p libris-db --bin seed -- --count 200
//!
//! # Specify database path (otherwise LIBRIS_DATABASE_PATH or ./libris.db)
//! cargo run -p libris-db --bin seed -- --db ./data/libris.db
//! ```
//!
//! Each book gets an ISBN `978{index:010}`, a publisher, one or two authors
//! and a category, and 1-4 copies.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::env;
use tracing_subscriber::EnvFilter;

use libris_core::{NewAuthor, NewBook, NewCategory, NewPublisher, NewReview};
use libris_db::{with_backoff, Database, DbConfig, RetryPolicy};

const PUBLISHERS: &[(&str, &str)] = &[
    ("Penguin Random House", "New York, NY"),
    ("Tor Books", "New York, NY"),
    ("O'Reilly Media", "Sebastopol, CA"),
    ("No Starch Press", "San Francisco, CA"),
];

const AUTHORS: &[(&str, Option<i32>)] = &[
    ("Ursula K. Le Guin", Some(1929)),
    ("Octavia E. Butler", Some(1947)),
    ("Ted Chiang", Some(1967)),
    ("N. K. Jemisin", Some(1972)),
    ("Steve Klabnik", None),
    ("Carol Nichols", None),
];

const CATEGORIES: &[&str] = &["Science Fiction", "Fantasy", "Programming", "Short Stories"];

const TITLE_WORDS: &[&str] = &[
    "Left Hand", "Parable", "Exhalation", "Broken Earth", "Ownership", "Borrowing", "Lathe",
    "Kindred", "Stories", "Obelisk", "Traits", "Dispossessed",
];

/// Final availability line per book.
#[derive(Debug, Serialize)]
struct BookReport {
    isbn: String,
    title: String,
    copies: i64,
    available: i64,
    open_loans: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,libris_db=info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Libris Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of books to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: $LIBRIS_DATABASE_PATH or ./libris.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = DbConfig::from_env()?;
    if let Some(path) = db_path {
        config.database_path = path.into();
    }

    println!("Libris Seed Data Generator");
    println!("==========================");
    println!("Database: {}", config.database_path.display());
    println!("Books:    {}", count);
    println!();

    let db = Database::new(config).await?;
    println!("✓ Connected to database, migrations applied");

    let catalog = db.catalog();
    let reference = db.reference();

    let existing = catalog.count_books().await?;
    if existing > 0 {
        println!("⚠ Database already has {} books", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Reference data
    let mut publisher_ids = Vec::new();
    for (name, address) in PUBLISHERS {
        let publisher = reference
            .add_publisher(NewPublisher {
                name: name.to_string(),
                address: Some(address.to_string()),
            })
            .await?;
        publisher_ids.push(publisher.id);
    }

    let mut author_ids = Vec::new();
    for (name, birth_year) in AUTHORS {
        let author = reference
            .add_author(NewAuthor {
                name: name.to_string(),
                biography: None,
                birth_year: *birth_year,
            })
            .await?;
        author_ids.push(author.id);
    }

    let mut category_ids = Vec::new();
    for name in CATEGORIES {
        category_ids.push(reference.add_category(NewCategory::new(*name)).await?.id);
    }

    println!(
        "✓ Added {} publishers, {} authors, {} categories",
        publisher_ids.len(),
        author_ids.len(),
        category_ids.len()
    );

    // Books
    let start = std::time::Instant::now();
    let mut books = Vec::with_capacity(count);

    for index in 0..count {
        let title = format!(
            "The {} {}",
            TITLE_WORDS[index % TITLE_WORDS.len()],
            index / TITLE_WORDS.len() + 1
        );
        let input = NewBook::new(format!("978{:010}", index), title)
            .copies((index % 4) as i64 + 1)
            .publication_year(1960 + (index % 60) as i32)
            .publisher(&publisher_ids[index % publisher_ids.len()]);

        let book = match catalog.add_book(input).await {
            Ok(book) => book,
            Err(e) => {
                eprintln!("Failed to add book {}: {}", index, e);
                continue;
            }
        };

        catalog
            .link_author(&book.isbn, &author_ids[index % author_ids.len()])
            .await?;
        if index % 3 == 0 {
            catalog
                .link_author(&book.isbn, &author_ids[(index + 1) % author_ids.len()])
                .await?;
        }
        catalog
            .link_category(&book.isbn, &category_ids[index % category_ids.len()])
            .await?;

        books.push(book);
    }

    println!("✓ Added {} books in {:?}", books.len(), start.elapsed());

    // Lending cycle: borrow every copy of the first books, return half
    println!();
    println!("Running lending cycle...");

    let ledger = db.ledger();
    let policy = RetryPolicy::default();
    let today = Utc::now();
    let due = today + Duration::days(14);

    let mut issued = Vec::new();
    let mut refused = 0;
    for book in books.iter().take(5) {
        // One more attempt than there are copies
        for _ in 0..=book.copies {
            match with_backoff(&policy, "issue_loan", || ledger.issue_loan(&book.id, today, due))
                .await
            {
                Ok(loan) => issued.push(loan),
                Err(e) => {
                    refused += 1;
                    println!("  {}: {}", book.isbn, e);
                }
            }
        }
    }

    let mut returned = 0;
    for loan in issued.iter().step_by(2) {
        ledger.return_loan(&loan.id).await?;
        returned += 1;
    }

    println!(
        "✓ Issued {} loans, {} refused, {} returned",
        issued.len(),
        refused,
        returned
    );

    if let Some(first) = books.first() {
        reference
            .add_review(NewReview {
                rating: 5,
                comment: Some("A classic".to_string()),
                customer_id: "seed-customer".to_string(),
                product_id: first.id.clone(),
            })
            .await?;
    }

    // Availability report
    let mut report = Vec::new();
    for book in books.iter().take(5) {
        let current = catalog.find_book(&book.isbn).await?;
        let open_loans = ledger.open_loans_for_book(&current.id).await?.len();
        report.push(BookReport {
            isbn: current.isbn,
            title: current.title,
            copies: current.copies,
            available: current.available,
            open_loans,
        });
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
