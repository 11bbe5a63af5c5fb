use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::catalog::{fetch_author, fetch_book, fetch_copies, fetch_copy, update_copy};
use super::connection::{open_database, open_in_memory};
use super::loans::{fetch_loan, fetch_loans, fetch_open_loans_for_copy, insert_loan, update_loan};
use super::readers::{fetch_blocks_for_reader, fetch_reader, fetch_readers, update_reader};
use crate::error::StorageError;
use crate::models::{
    Author, AuthorId, Block, Book, BookCopy, BookId, CopyId, Loan, LoanId, Reader, ReaderId,
};
use crate::store::{Committed, CopyRecord, LoanStore, Mutation};

/// `LoanStore` backed by an SQLite connection. Every commit runs in its own
/// transaction; the first failing statement drops the transaction, which
/// rolls back everything written before it.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Adopt a connection whose schema is already in place.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the database file at `path`, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_database(path)?))
    }

    /// A throwaway in-memory database with the full schema.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(open_in_memory()?))
    }

    /// Raw connection for record maintenance (seeding readers, copies and
    /// blocks). Loan rows and availability flags should only change through
    /// `commit`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn apply(conn: &Connection, mutation: &Mutation, committed: &mut Committed) -> Result<()> {
    match mutation {
        Mutation::InsertLoan(new_loan) => {
            let loan = insert_loan(conn, new_loan)?;
            committed.inserted_loans.push(loan.id);
        }
        Mutation::UpdateLoan(loan) => update_loan(conn, loan)?,
        Mutation::UpdateCopy(copy) => update_copy(conn, copy)?,
        Mutation::UpdateReader(reader) => update_reader(conn, reader)?,
    }
    Ok(())
}

impl LoanStore for SqliteStore {
    fn find_reader(&self, id: ReaderId) -> Result<Option<Reader>, StorageError> {
        Ok(fetch_reader(&self.conn, id)?)
    }

    fn find_copy(&self, id: CopyId) -> Result<Option<CopyRecord>, StorageError> {
        let Some(copy) = fetch_copy(&self.conn, id)? else {
            return Ok(None);
        };
        let open_loans = fetch_open_loans_for_copy(&self.conn, id)?;
        Ok(Some(CopyRecord { copy, open_loans }))
    }

    fn list_blocks_for_reader(&self, id: ReaderId) -> Result<Vec<Block>, StorageError> {
        Ok(fetch_blocks_for_reader(&self.conn, id)?)
    }

    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>, StorageError> {
        Ok(fetch_loan(&self.conn, id)?)
    }

    fn commit(&mut self, mutations: &[Mutation]) -> Result<Committed, StorageError> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start loan transaction")?;
        let mut committed = Committed::default();

        for mutation in mutations {
            apply(&tx, mutation, &mut committed).map_err(|source| StorageError::Write {
                entity: mutation.entity(),
                id: mutation.record_id(),
                source,
            })?;
        }

        tx.commit().context("failed to commit loan transaction")?;
        Ok(committed)
    }

    fn find_book(&self, id: BookId) -> Result<Option<Book>, StorageError> {
        Ok(fetch_book(&self.conn, id)?)
    }

    fn find_author(&self, id: AuthorId) -> Result<Option<Author>, StorageError> {
        Ok(fetch_author(&self.conn, id)?)
    }

    fn list_readers(&self) -> Result<Vec<Reader>, StorageError> {
        Ok(fetch_readers(&self.conn)?)
    }

    fn list_copies(&self) -> Result<Vec<BookCopy>, StorageError> {
        Ok(fetch_copies(&self.conn)?)
    }

    fn list_loans(&self) -> Result<Vec<Loan>, StorageError> {
        Ok(fetch_loans(&self.conn)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::{create_author, create_block, create_book, create_copy, create_reader};
    use crate::error::{Entity, IneligibilityReason, LoanError};
    use crate::models::{LoanPolicy, NewLoan};
    use crate::workflow::{IssueRequest, LoanDesk};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: SqliteStore,
        reader: Reader,
        other_reader: Reader,
        copy: BookCopy,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::in_memory().unwrap();
        let conn = store.connection();
        let author = create_author(conn, "Chekhov", "Anton", Some("Pavlovich")).unwrap();
        let book = create_book(conn, author.id, "The Steppe", Some(1888), Some("ru"), None).unwrap();
        let copy = create_copy(conn, book.id).unwrap();
        let reader = create_reader(conn, &Reader::new(0, "Lebedev", "Roman")).unwrap();
        let other_reader = create_reader(conn, &Reader::new(0, "Markova", "Daria")).unwrap();
        Fixture {
            store,
            reader,
            other_reader,
            copy,
        }
    }

    #[test]
    fn records_round_trip_through_sqlite() {
        let fx = fixture();
        let stored = fx.store.find_reader(fx.reader.id).unwrap().unwrap();
        assert_eq!(stored, fx.reader);

        let record = fx.store.find_copy(fx.copy.id).unwrap().unwrap();
        assert_eq!(record.copy, fx.copy);
        assert!(record.open_loans.is_empty());

        let book = fx.store.find_book(fx.copy.book_id).unwrap().unwrap();
        let author = fx.store.find_author(book.author_id).unwrap().unwrap();
        assert_eq!(author.full_name(), "Chekhov Anton Pavlovich");
        assert_eq!(fx.store.list_readers().unwrap().len(), 2);
    }

    #[test]
    fn commit_rolls_back_on_missing_row() {
        let mut fx = fixture();
        let new_loan = NewLoan {
            reader_id: fx.reader.id,
            copy_id: fx.copy.id,
            issue_date: date(2024, 1, 1),
            due_date: date(2024, 1, 15),
        };
        let mut copy = fx.copy.clone();
        copy.is_available = false;

        let err = fx
            .store
            .commit(&[
                Mutation::InsertLoan(new_loan),
                Mutation::UpdateCopy(copy),
                Mutation::UpdateReader(Reader::new(404, "Ghost", "Reader")),
            ])
            .unwrap_err();

        assert_eq!(err.entity(), Some(Entity::Reader));
        assert!(fx.store.list_loans().unwrap().is_empty());
        assert!(fx.store.find_copy(fx.copy.id).unwrap().unwrap().copy.is_available);
    }

    #[test]
    fn loan_lifecycle_on_sqlite() {
        let fx = fixture();
        let (reader_id, other_id, copy_id) = (fx.reader.id, fx.other_reader.id, fx.copy.id);
        let mut desk = LoanDesk::new(fx.store);

        let loan = desk
            .issue_loan(IssueRequest::new(reader_id, copy_id, date(2024, 1, 1), LoanPolicy::OneMonth))
            .unwrap();
        assert_eq!(loan.due_date, date(2024, 1, 31));
        assert_eq!(desk.store().find_loan(loan.id).unwrap(), Some(loan.clone()));

        let record = desk.store().find_copy(copy_id).unwrap().unwrap();
        assert!(!record.copy.is_available);
        assert_eq!(record.open_loans, vec![loan.clone()]);

        let err = desk
            .issue_loan(IssueRequest::new(other_id, copy_id, date(2024, 1, 2), LoanPolicy::TwoWeeks))
            .unwrap_err();
        assert_eq!(err.ineligibility(), Some(&IneligibilityReason::CopyAlreadyLoaned));

        desk.return_loan(loan.id, date(2024, 1, 20)).unwrap();
        let reader = desk.store().find_reader(reader_id).unwrap().unwrap();
        assert!(!reader.has_active_loan);
        assert_eq!(reader.must_return_by, None);
        assert!(desk.audit().unwrap().is_empty());
    }

    #[test]
    fn blocked_reader_is_refused_on_sqlite() {
        let fx = fixture();
        create_block(
            fx.store.connection(),
            fx.reader.id,
            Some(true),
            Some("unpaid fine"),
            Some(0),
        )
        .unwrap();
        let mut desk = LoanDesk::new(fx.store);

        let err = desk
            .issue_loan(IssueRequest::new(
                fx.reader.id,
                fx.copy.id,
                date(2024, 1, 1),
                LoanPolicy::TwoWeeks,
            ))
            .unwrap_err();
        assert_eq!(
            err.ineligibility(),
            Some(&IneligibilityReason::ReaderBlocked {
                reason: Some("unpaid fine".into())
            })
        );
    }

    #[test]
    fn trigger_fault_on_reader_update_keeps_loan_open() {
        let fx = fixture();
        let (reader_id, copy_id) = (fx.reader.id, fx.copy.id);
        let mut desk = LoanDesk::new(fx.store);
        let loan = desk
            .issue_loan(IssueRequest::new(reader_id, copy_id, date(2024, 1, 1), LoanPolicy::TwoWeeks))
            .unwrap();

        desk.store()
            .connection()
            .execute_batch(
                "CREATE TRIGGER reader_writes_fail BEFORE UPDATE ON readers
                 BEGIN SELECT RAISE(ABORT, 'injected reader failure'); END;",
            )
            .unwrap();

        let err = desk.return_loan(loan.id, date(2024, 1, 5)).unwrap_err();
        assert!(matches!(
            err,
            LoanError::PartialUpdateFailure { source: Some(_), .. }
        ));
        assert!(desk.store().find_loan(loan.id).unwrap().unwrap().is_open());
        assert!(!desk.store().find_copy(copy_id).unwrap().unwrap().copy.is_available);
        assert!(desk.audit().unwrap().is_empty());
    }

    #[test]
    fn database_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.sqlite");

        let reader_id = {
            let store = SqliteStore::open(&path).unwrap();
            create_reader(store.connection(), &Reader::new(0, "Belova", "Irina"))
                .unwrap()
                .id
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let reader = reopened.find_reader(reader_id).unwrap().unwrap();
        assert_eq!(reader.full_name(), "Belova Irina");
    }
}
