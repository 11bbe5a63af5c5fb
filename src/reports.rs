//! Read-only views the loan screens are built from: the open-loan list with
//! derived statuses, the counters in the footer, and the pick lists used when
//! issuing a loan.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;

use crate::audit::{check_consistency, Inconsistency};
use crate::error::StorageError;
use crate::models::{BookCopy, CopyId, Loan, LoanStatus, Reader, ReaderId};
use crate::store::LoanStore;
use crate::workflow::LoanDesk;

const UNKNOWN_READER: &str = "Unknown reader";
const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown author";

/// An open loan joined with the names a librarian recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanOverview {
    /// The loan row itself.
    pub loan: Loan,
    /// Status derived at the time the report was built.
    pub status: LoanStatus,
    /// Borrower's full name, or a placeholder when the reader is gone.
    pub reader_name: String,
    /// Title of the lent book.
    pub book_title: String,
    /// Author of the lent book.
    pub author_name: String,
}

/// Footer counters for the loan list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeskSummary {
    /// Loans not yet returned.
    pub open_loans: usize,
    /// Open loans past their due date.
    pub overdue_loans: usize,
}

/// A copy that can be handed out, with enough catalogue data to pick it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableCopy {
    /// Copy to hand out.
    pub copy_id: CopyId,
    /// Title of its book.
    pub title: String,
    /// Author of its book.
    pub author_name: String,
    /// Publication year, if known.
    pub year: Option<i32>,
}

impl fmt::Display for AvailableCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({}, {})", self.title, self.author_name, year),
            None => write!(f, "{} ({})", self.title, self.author_name),
        }
    }
}

/// Title and author name for a copy, with placeholders for missing rows.
fn describe_copy<S: LoanStore + ?Sized>(
    store: &S,
    copy: &BookCopy,
) -> Result<(String, String, Option<i32>), StorageError> {
    let Some(book) = store.find_book(copy.book_id)? else {
        return Ok((UNTITLED.to_string(), UNKNOWN_AUTHOR.to_string(), None));
    };
    let author_name = store
        .find_author(book.author_id)?
        .map(|author| author.full_name())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    Ok((book.title, author_name, book.year))
}

impl<S: LoanStore> LoanDesk<S> {
    /// Every open loan, newest issue date first, with status derived at
    /// `now`.
    pub fn open_loans_at(&self, now: NaiveDateTime) -> Result<Vec<LoanOverview>, StorageError> {
        let store = self.store();
        let mut open: Vec<Loan> = store
            .list_loans()?
            .into_iter()
            .filter(Loan::is_open)
            .collect();
        open.sort_by(|a, b| b.issue_date.cmp(&a.issue_date).then(b.id.cmp(&a.id)));

        let readers: HashMap<ReaderId, Reader> = store
            .list_readers()?
            .into_iter()
            .map(|reader| (reader.id, reader))
            .collect();

        open.into_iter()
            .map(|loan| {
                let reader_name = readers
                    .get(&loan.reader_id)
                    .map(Reader::full_name)
                    .unwrap_or_else(|| UNKNOWN_READER.to_string());
                let (book_title, author_name) = match store.find_copy(loan.copy_id)? {
                    Some(record) => {
                        let (title, author, _) = describe_copy(store, &record.copy)?;
                        (title, author)
                    }
                    None => (UNTITLED.to_string(), UNKNOWN_AUTHOR.to_string()),
                };
                Ok::<_, StorageError>(LoanOverview {
                    status: loan.status_at(now),
                    loan,
                    reader_name,
                    book_title,
                    author_name,
                })
            })
            .collect()
    }

    /// `open_loans_at` against the local wall clock.
    pub fn open_loans(&self) -> Result<Vec<LoanOverview>, StorageError> {
        self.open_loans_at(chrono::Local::now().naive_local())
    }

    /// Open and overdue loan counts as of `now`.
    pub fn summary_at(&self, now: NaiveDateTime) -> Result<DeskSummary, StorageError> {
        let summary = self
            .store()
            .list_loans()?
            .iter()
            .filter(|loan| loan.is_open())
            .fold(DeskSummary::default(), |mut acc, loan| {
                acc.open_loans += 1;
                if loan.is_overdue_at(now) {
                    acc.overdue_loans += 1;
                }
                acc
            });
        Ok(summary)
    }

    /// Readers without an active block, by last then first name.
    pub fn eligible_readers(&self) -> Result<Vec<Reader>, StorageError> {
        let store = self.store();
        let mut blocked = HashSet::new();
        let mut readers = store.list_readers()?;
        for reader in &readers {
            if store
                .list_blocks_for_reader(reader.id)?
                .iter()
                .any(|block| block.is_active())
            {
                blocked.insert(reader.id);
            }
        }
        readers.retain(|reader| !blocked.contains(&reader.id));
        readers.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(readers)
    }

    /// Copies flagged available, sorted by title.
    pub fn available_copies(&self) -> Result<Vec<AvailableCopy>, StorageError> {
        let store = self.store();
        let mut copies = Vec::new();
        for copy in store.list_copies()? {
            if !copy.is_available {
                continue;
            }
            let (title, author_name, year) = describe_copy(store, &copy)?;
            copies.push(AvailableCopy {
                copy_id: copy.id,
                title,
                author_name,
                year,
            });
        }
        copies.sort_by(|a, b| a.title.cmp(&b.title).then(a.copy_id.cmp(&b.copy_id)));
        Ok(copies)
    }

    /// Run the consistency audit over this desk's store.
    pub fn audit(&self) -> Result<Vec<Inconsistency>, StorageError> {
        check_consistency(self.store())
    }
}
