use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Author, AuthorId, Book, BookCopy, BookId, CopyId};

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        middle_name: row.get(3)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        author_id: row.get(3)?,
        language: row.get(4)?,
        pages: row.get(5)?,
    })
}

fn copy_from_row(row: &Row<'_>) -> rusqlite::Result<BookCopy> {
    Ok(BookCopy {
        id: row.get(0)?,
        book_id: row.get(1)?,
        is_available: row.get(2)?,
    })
}

/// Insert an author and echo the hydrated record back.
pub fn create_author(
    conn: &Connection,
    last_name: &str,
    first_name: &str,
    middle_name: Option<&str>,
) -> Result<Author> {
    conn.execute(
        "INSERT INTO authors (last_name, first_name, middle_name) VALUES (?1, ?2, ?3)",
        params![last_name, first_name, middle_name],
    )
    .context("failed to insert author")?;

    Ok(Author {
        id: conn.last_insert_rowid(),
        last_name: last_name.to_string(),
        first_name: first_name.to_string(),
        middle_name: middle_name.map(str::to_string),
    })
}

/// Look up one author; `None` when the id is unknown.
pub fn fetch_author(conn: &Connection, id: AuthorId) -> Result<Option<Author>> {
    conn.query_row(
        "SELECT author_id, last_name, first_name, middle_name FROM authors WHERE author_id = ?1",
        [id],
        author_from_row,
    )
    .optional()
    .context("failed to load author")
}

/// Insert a book for an existing author. The foreign key rejects unknown
/// authors.
pub fn create_book(
    conn: &Connection,
    author_id: AuthorId,
    title: &str,
    year: Option<i32>,
    language: Option<&str>,
    pages: Option<i32>,
) -> Result<Book> {
    conn.execute(
        "INSERT INTO books (title, year, author_id, language, pages) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![title, year, author_id, language, pages],
    )
    .context("failed to insert book")?;

    Ok(Book {
        id: conn.last_insert_rowid(),
        title: title.to_string(),
        year,
        author_id,
        language: language.map(str::to_string),
        pages,
    })
}

/// Look up one book; `None` when the id is unknown.
pub fn fetch_book(conn: &Connection, id: BookId) -> Result<Option<Book>> {
    conn.query_row(
        "SELECT book_id, title, year, author_id, language, pages FROM books WHERE book_id = ?1",
        [id],
        book_from_row,
    )
    .optional()
    .context("failed to load book")
}

/// Register a new physical copy of a book. Copies start available.
pub fn create_copy(conn: &Connection, book_id: BookId) -> Result<BookCopy> {
    conn.execute(
        "INSERT INTO bookcopies (book_id, is_available) VALUES (?1, 1)",
        [book_id],
    )
    .context("failed to insert copy")?;

    Ok(BookCopy::new(conn.last_insert_rowid(), book_id))
}

/// Look up one copy; `None` when the id is unknown.
pub fn fetch_copy(conn: &Connection, id: CopyId) -> Result<Option<BookCopy>> {
    conn.query_row(
        "SELECT copy_id, book_id, is_available FROM bookcopies WHERE copy_id = ?1",
        [id],
        copy_from_row,
    )
    .optional()
    .context("failed to load copy")
}

/// Every copy in the catalogue, ordered by id.
pub fn fetch_copies(conn: &Connection) -> Result<Vec<BookCopy>> {
    let mut stmt = conn
        .prepare("SELECT copy_id, book_id, is_available FROM bookcopies ORDER BY copy_id")
        .context("failed to prepare copies query")?;

    let copies = stmt
        .query_map([], copy_from_row)
        .context("failed to load copies")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect copies")?;

    Ok(copies)
}

/// Persist a copy's availability. Zero touched rows means the copy is gone,
/// which is an error rather than a silent no-op.
pub fn update_copy(conn: &Connection, copy: &BookCopy) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE bookcopies SET book_id = ?1, is_available = ?2 WHERE copy_id = ?3",
            params![copy.book_id, copy.is_available, copy.id],
        )
        .context("failed to update copy")?;

    if updated == 0 {
        Err(anyhow!("Copy not found"))
    } else {
        Ok(())
    }
}
