//! The persistence seam of the loan desk. The workflow only ever talks to a
//! `LoanStore`; the SQLite adapter lives in `crate::db` and an in-memory
//! adapter used by tests and fault-injection runs lives in `memory`.

mod memory;

pub use memory::MemoryStore;

use crate::error::{Entity, StorageError};
use crate::models::{
    Author, AuthorId, Block, Book, BookCopy, BookId, CopyId, Loan, LoanId, NewLoan, Reader,
    ReaderId,
};

/// A copy together with its open loans, loaded in one lookup so the
/// eligibility checker can compare the cached flag with the loan table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    /// The copy row with its cached availability flag.
    pub copy: BookCopy,
    /// Loans of this copy that have not been returned.
    pub open_loans: Vec<Loan>,
}

/// One change inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    InsertLoan(NewLoan),
    UpdateLoan(Loan),
    UpdateCopy(BookCopy),
    UpdateReader(Reader),
}

impl Mutation {
    /// Record kind this mutation writes.
    pub fn entity(&self) -> Entity {
        match self {
            Mutation::InsertLoan(_) | Mutation::UpdateLoan(_) => Entity::Loan,
            Mutation::UpdateCopy(_) => Entity::Copy,
            Mutation::UpdateReader(_) => Entity::Reader,
        }
    }

    /// Id of the row being changed; `None` for inserts.
    pub fn record_id(&self) -> Option<i64> {
        match self {
            Mutation::InsertLoan(_) => None,
            Mutation::UpdateLoan(loan) => Some(loan.id),
            Mutation::UpdateCopy(copy) => Some(copy.id),
            Mutation::UpdateReader(reader) => Some(reader.id),
        }
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committed {
    /// Ids assigned to `InsertLoan` mutations, in mutation order.
    pub inserted_loans: Vec<LoanId>,
}

/// Durable storage consumed by the loan workflow.
///
/// `commit` is all-or-nothing: either every mutation is applied or none is
/// visible to later reads. Updating a row that does not exist fails the
/// commit with `StorageError::Write`.
pub trait LoanStore {
    fn find_reader(&self, id: ReaderId) -> Result<Option<Reader>, StorageError>;

    fn find_copy(&self, id: CopyId) -> Result<Option<CopyRecord>, StorageError>;

    fn list_blocks_for_reader(&self, id: ReaderId) -> Result<Vec<Block>, StorageError>;

    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>, StorageError>;

    fn commit(&mut self, mutations: &[Mutation]) -> Result<Committed, StorageError>;

    fn find_book(&self, id: BookId) -> Result<Option<Book>, StorageError>;

    fn find_author(&self, id: AuthorId) -> Result<Option<Author>, StorageError>;

    fn list_readers(&self) -> Result<Vec<Reader>, StorageError>;

    fn list_copies(&self) -> Result<Vec<BookCopy>, StorageError>;

    fn list_loans(&self) -> Result<Vec<Loan>, StorageError>;
}
