use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Block, Reader, ReaderId};

const READER_COLUMNS: &str = "reader_id, last_name, first_name, middle_name, birth_date, \
     phone, email, address, has_active_loan, must_return_by";

fn reader_from_row(row: &Row<'_>) -> rusqlite::Result<Reader> {
    Ok(Reader {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        middle_name: row.get(3)?,
        birth_date: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        address: row.get(7)?,
        has_active_loan: row.get(8)?,
        must_return_by: row.get(9)?,
    })
}

/// Insert a reader. The `id` of the argument is ignored; the returned
/// record carries the id SQLite assigned.
pub fn create_reader(conn: &Connection, reader: &Reader) -> Result<Reader> {
    conn.execute(
        "INSERT INTO readers (last_name, first_name, middle_name, birth_date, phone, email,
                              address, has_active_loan, must_return_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            reader.last_name,
            reader.first_name,
            reader.middle_name,
            reader.birth_date,
            reader.phone,
            reader.email,
            reader.address,
            reader.has_active_loan,
            reader.must_return_by,
        ],
    )
    .context("failed to insert reader")?;

    Ok(Reader {
        id: conn.last_insert_rowid(),
        ..reader.clone()
    })
}

/// Look up one reader; `None` when the id is unknown.
pub fn fetch_reader(conn: &Connection, id: ReaderId) -> Result<Option<Reader>> {
    conn.query_row(
        &format!("SELECT {READER_COLUMNS} FROM readers WHERE reader_id = ?1"),
        [id],
        reader_from_row,
    )
    .optional()
    .context("failed to load reader")
}

/// Every registered reader, by last name then id.
pub fn fetch_readers(conn: &Connection) -> Result<Vec<Reader>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {READER_COLUMNS} FROM readers ORDER BY last_name COLLATE NOCASE, reader_id"
        ))
        .context("failed to prepare readers query")?;

    let readers = stmt
        .query_map([], reader_from_row)
        .context("failed to load readers")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect readers")?;

    Ok(readers)
}

/// Overwrite every column of an existing reader row.
pub fn update_reader(conn: &Connection, reader: &Reader) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE readers SET last_name = ?1, first_name = ?2, middle_name = ?3,
                    birth_date = ?4, phone = ?5, email = ?6, address = ?7,
                    has_active_loan = ?8, must_return_by = ?9
             WHERE reader_id = ?10",
            params![
                reader.last_name,
                reader.first_name,
                reader.middle_name,
                reader.birth_date,
                reader.phone,
                reader.email,
                reader.address,
                reader.has_active_loan,
                reader.must_return_by,
                reader.id,
            ],
        )
        .context("failed to update reader")?;

    if updated == 0 {
        Err(anyhow!("Reader not found"))
    } else {
        Ok(())
    }
}

/// Record a block against a reader. `paid_amount` must not be negative.
pub fn create_block(
    conn: &Connection,
    reader_id: ReaderId,
    is_blocked: Option<bool>,
    reason: Option<&str>,
    paid_amount: Option<i64>,
) -> Result<Block> {
    conn.execute(
        "INSERT INTO blocks (reader_id, is_blocked, block_reason, paid_amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![reader_id, is_blocked, reason, paid_amount],
    )
    .context("failed to insert block")?;

    Ok(Block {
        id: conn.last_insert_rowid(),
        reader_id,
        is_blocked,
        reason: reason.map(str::to_string),
        paid_amount,
    })
}

/// All block rows of a reader, oldest first, whether active or not.
pub fn fetch_blocks_for_reader(conn: &Connection, reader_id: ReaderId) -> Result<Vec<Block>> {
    let mut stmt = conn
        .prepare(
            "SELECT block_id, reader_id, is_blocked, block_reason, paid_amount
             FROM blocks
             WHERE reader_id = ?1
             ORDER BY block_id",
        )
        .context("failed to prepare blocks query")?;

    let blocks = stmt
        .query_map([reader_id], |row| {
            Ok(Block {
                id: row.get(0)?,
                reader_id: row.get(1)?,
                is_blocked: row.get(2)?,
                reason: row.get(3)?,
                paid_amount: row.get(4)?,
            })
        })
        .context("failed to iterate blocks")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect blocks")?;

    Ok(blocks)
}
