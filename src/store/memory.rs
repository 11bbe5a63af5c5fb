use std::collections::BTreeMap;

use anyhow::anyhow;

use super::{Committed, CopyRecord, LoanStore, Mutation};
use crate::error::{Entity, StorageError};
use crate::models::{
    Author, AuthorId, Block, BlockId, Book, BookCopy, BookId, CopyId, Loan, LoanId, Reader,
    ReaderId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    authors: BTreeMap<AuthorId, Author>,
    books: BTreeMap<BookId, Book>,
    copies: BTreeMap<CopyId, BookCopy>,
    readers: BTreeMap<ReaderId, Reader>,
    loans: BTreeMap<LoanId, Loan>,
    blocks: BTreeMap<BlockId, Block>,
}

impl Tables {
    fn next_loan_id(&self) -> LoanId {
        self.loans.keys().next_back().map_or(1, |id| id + 1)
    }

    fn apply(&mut self, mutation: &Mutation, committed: &mut Committed) -> Result<(), StorageError> {
        match mutation {
            Mutation::InsertLoan(new_loan) => {
                let id = self.next_loan_id();
                self.loans.insert(id, new_loan.with_id(id));
                committed.inserted_loans.push(id);
            }
            Mutation::UpdateLoan(loan) => {
                let slot = self.loans.get_mut(&loan.id).ok_or_else(|| missing(mutation))?;
                *slot = loan.clone();
            }
            Mutation::UpdateCopy(copy) => {
                let slot = self.copies.get_mut(&copy.id).ok_or_else(|| missing(mutation))?;
                *slot = copy.clone();
            }
            Mutation::UpdateReader(reader) => {
                let slot = self
                    .readers
                    .get_mut(&reader.id)
                    .ok_or_else(|| missing(mutation))?;
                *slot = reader.clone();
            }
        }
        Ok(())
    }
}

fn missing(mutation: &Mutation) -> StorageError {
    StorageError::Write {
        entity: mutation.entity(),
        id: mutation.record_id(),
        source: anyhow!("{} not found", mutation.entity()),
    }
}

/// Map-backed store. Commits are staged on a copy of the tables and swapped
/// in only when every mutation applied, which gives the same all-or-nothing
/// behavior as the SQLite transaction.
///
/// `fail_writes_to` turns the store into a fault injector: any commit that
/// touches the given record kind fails at that mutation, after the earlier
/// ones were staged.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    failing: Option<Entity>,
}

impl MemoryStore {
    /// An empty store with no faults armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an author row, replacing any row with the same id.
    pub fn insert_author(&mut self, author: Author) {
        self.tables.authors.insert(author.id, author);
    }

    /// Seed a book row.
    pub fn insert_book(&mut self, book: Book) {
        self.tables.books.insert(book.id, book);
    }

    /// Seed a copy row.
    pub fn insert_copy(&mut self, copy: BookCopy) {
        self.tables.copies.insert(copy.id, copy);
    }

    /// Seed a reader row.
    pub fn insert_reader(&mut self, reader: Reader) {
        self.tables.readers.insert(reader.id, reader);
    }

    /// Seed a block row.
    pub fn insert_block(&mut self, block: Block) {
        self.tables.blocks.insert(block.id, block);
    }

    /// Write a loan row directly, bypassing the workflow. Only useful for
    /// reproducing drifted data.
    pub fn insert_loan(&mut self, loan: Loan) {
        self.tables.loans.insert(loan.id, loan);
    }

    /// Drop a reader row outright, leaving its loans dangling.
    pub fn remove_reader(&mut self, id: ReaderId) -> Option<Reader> {
        self.tables.readers.remove(&id)
    }

    /// Make every later commit that touches `entity` fail.
    pub fn fail_writes_to(&mut self, entity: Entity) {
        self.failing = Some(entity);
    }

    /// Disarm all injected write failures.
    pub fn clear_faults(&mut self) {
        self.failing = None;
    }
}

impl LoanStore for MemoryStore {
    fn find_reader(&self, id: ReaderId) -> Result<Option<Reader>, StorageError> {
        Ok(self.tables.readers.get(&id).cloned())
    }

    fn find_copy(&self, id: CopyId) -> Result<Option<CopyRecord>, StorageError> {
        let Some(copy) = self.tables.copies.get(&id) else {
            return Ok(None);
        };
        let open_loans = self
            .tables
            .loans
            .values()
            .filter(|loan| loan.copy_id == id && loan.is_open())
            .cloned()
            .collect();
        Ok(Some(CopyRecord {
            copy: copy.clone(),
            open_loans,
        }))
    }

    fn list_blocks_for_reader(&self, id: ReaderId) -> Result<Vec<Block>, StorageError> {
        Ok(self
            .tables
            .blocks
            .values()
            .filter(|block| block.reader_id == id)
            .cloned()
            .collect())
    }

    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>, StorageError> {
        Ok(self.tables.loans.get(&id).cloned())
    }

    fn commit(&mut self, mutations: &[Mutation]) -> Result<Committed, StorageError> {
        let mut staged = self.tables.clone();
        let mut committed = Committed::default();

        for mutation in mutations {
            if self.failing == Some(mutation.entity()) {
                return Err(StorageError::Write {
                    entity: mutation.entity(),
                    id: mutation.record_id(),
                    source: anyhow!("injected write failure"),
                });
            }
            staged.apply(mutation, &mut committed)?;
        }

        self.tables = staged;
        Ok(committed)
    }

    fn find_book(&self, id: BookId) -> Result<Option<Book>, StorageError> {
        Ok(self.tables.books.get(&id).cloned())
    }

    fn find_author(&self, id: AuthorId) -> Result<Option<Author>, StorageError> {
        Ok(self.tables.authors.get(&id).cloned())
    }

    fn list_readers(&self) -> Result<Vec<Reader>, StorageError> {
        Ok(self.tables.readers.values().cloned().collect())
    }

    fn list_copies(&self) -> Result<Vec<BookCopy>, StorageError> {
        Ok(self.tables.copies.values().cloned().collect())
    }

    fn list_loans(&self) -> Result<Vec<Loan>, StorageError> {
        Ok(self.tables.loans.values().cloned().collect())
    }
}
