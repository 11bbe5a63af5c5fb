use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open (or create) the database file at `path`, enable foreign keys and run
/// the lazy migrations. Missing parent directories are created first.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Private in-memory database with the full schema. Used by tests and dry
/// runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Create every table the loan desk needs if it is missing. The function
/// also toggles `PRAGMA foreign_keys = ON` so loans and blocks can never
/// point at readers or copies that do not exist. Deletes never cascade: a
/// reader or copy with loan history cannot be removed.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS authors (
            author_id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            middle_name TEXT
        )",
        [],
    )
    .context("failed to create authors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            book_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            year INTEGER,
            author_id INTEGER NOT NULL,
            language TEXT,
            pages INTEGER,
            FOREIGN KEY(author_id) REFERENCES authors(author_id)
        )",
        [],
    )
    .context("failed to create books table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bookcopies (
            copy_id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            is_available INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(book_id) REFERENCES books(book_id)
        )",
        [],
    )
    .context("failed to create bookcopies table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS readers (
            reader_id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            middle_name TEXT,
            birth_date TEXT,
            phone TEXT,
            email TEXT,
            address TEXT,
            has_active_loan INTEGER NOT NULL DEFAULT 0,
            must_return_by TEXT
        )",
        [],
    )
    .context("failed to create readers table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS loans (
            loan_id INTEGER PRIMARY KEY AUTOINCREMENT,
            reader_id INTEGER NOT NULL,
            copy_id INTEGER NOT NULL,
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            is_returned INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(reader_id) REFERENCES readers(reader_id),
            FOREIGN KEY(copy_id) REFERENCES bookcopies(copy_id)
        )",
        [],
    )
    .context("failed to create loans table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS blocks (
            block_id INTEGER PRIMARY KEY AUTOINCREMENT,
            reader_id INTEGER NOT NULL,
            is_blocked INTEGER,
            block_reason TEXT,
            paid_amount INTEGER CHECK (paid_amount IS NULL OR paid_amount >= 0),
            FOREIGN KEY(reader_id) REFERENCES readers(reader_id)
        )",
        [],
    )
    .context("failed to create blocks table")?;

    Ok(())
}
