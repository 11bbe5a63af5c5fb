use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{CopyId, Loan, LoanId, NewLoan};

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get(0)?,
        reader_id: row.get(1)?,
        copy_id: row.get(2)?,
        issue_date: row.get(3)?,
        due_date: row.get(4)?,
        return_date: row.get(5)?,
        is_returned: row.get(6)?,
    })
}

/// Insert an open loan and return it with its new id.
pub fn insert_loan(conn: &Connection, loan: &NewLoan) -> Result<Loan> {
    conn.execute(
        "INSERT INTO loans (reader_id, copy_id, issue_date, due_date, return_date, is_returned)
         VALUES (?1, ?2, ?3, ?4, NULL, 0)",
        params![loan.reader_id, loan.copy_id, loan.issue_date, loan.due_date],
    )
    .context("failed to insert loan")?;

    Ok(loan.with_id(conn.last_insert_rowid()))
}

/// Look up one loan; `None` when the id is unknown.
pub fn fetch_loan(conn: &Connection, id: LoanId) -> Result<Option<Loan>> {
    conn.query_row(
        "SELECT loan_id, reader_id, copy_id, issue_date, due_date, return_date, is_returned
         FROM loans WHERE loan_id = ?1",
        [id],
        loan_from_row,
    )
    .optional()
    .context("failed to load loan")
}

/// The whole loan table, open and returned, ordered by id.
pub fn fetch_loans(conn: &Connection) -> Result<Vec<Loan>> {
    let mut stmt = conn
        .prepare(
            "SELECT loan_id, reader_id, copy_id, issue_date, due_date, return_date, is_returned
             FROM loans ORDER BY loan_id",
        )
        .context("failed to prepare loans query")?;

    let loans = stmt
        .query_map([], loan_from_row)
        .context("failed to load loans")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect loans")?;

    Ok(loans)
}

/// Loans of a copy that are still out. A loan counts as out only while it
/// has neither a return date nor the returned flag.
pub fn fetch_open_loans_for_copy(conn: &Connection, copy_id: CopyId) -> Result<Vec<Loan>> {
    let mut stmt = conn
        .prepare(
            "SELECT loan_id, reader_id, copy_id, issue_date, due_date, return_date, is_returned
             FROM loans
             WHERE copy_id = ?1 AND return_date IS NULL AND is_returned = 0
             ORDER BY loan_id",
        )
        .context("failed to prepare open loans query")?;

    let loans = stmt
        .query_map([copy_id], loan_from_row)
        .context("failed to iterate open loans")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect open loans")?;

    Ok(loans)
}

/// Write back the mutable fields of a loan. Reader, copy and issue date are
/// fixed once the loan exists.
pub fn update_loan(conn: &Connection, loan: &Loan) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE loans SET due_date = ?1, return_date = ?2, is_returned = ?3 WHERE loan_id = ?4",
            params![loan.due_date, loan.return_date, loan.is_returned, loan.id],
        )
        .context("failed to update loan")?;

    if updated == 0 {
        Err(anyhow!("Loan not found"))
    } else {
        Ok(())
    }
}
