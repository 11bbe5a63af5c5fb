//! Re-derives the availability flags from the loan table and reports every
//! place where the cached copy/reader flags or the loan rows themselves have
//! drifted.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::error::StorageError;
use crate::models::{CopyId, LoanId, ReaderId};
use crate::store::LoanStore;

/// One broken invariant found by [`check_consistency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    CopyHasSeveralOpenLoans { copy_id: CopyId, loans: Vec<LoanId> },
    ReaderHasSeveralOpenLoans { reader_id: ReaderId, loans: Vec<LoanId> },
    CopyFlagDrift { copy_id: CopyId, is_available: bool, open_loans: usize },
    ReaderFlagDrift { reader_id: ReaderId, has_active_loan: bool, open_loans: usize },
    LoanFieldsDisagree { loan_id: LoanId },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::CopyHasSeveralOpenLoans { copy_id, loans } => {
                write!(f, "copy {copy_id} is out on several loans: {loans:?}")
            }
            Inconsistency::ReaderHasSeveralOpenLoans { reader_id, loans } => {
                write!(f, "reader {reader_id} holds several loans: {loans:?}")
            }
            Inconsistency::CopyFlagDrift {
                copy_id,
                is_available,
                open_loans,
            } => write!(
                f,
                "copy {copy_id} is flagged available={is_available} with {open_loans} open loan(s)"
            ),
            Inconsistency::ReaderFlagDrift {
                reader_id,
                has_active_loan,
                open_loans,
            } => write!(
                f,
                "reader {reader_id} is flagged has_active_loan={has_active_loan} with {open_loans} open loan(s)"
            ),
            Inconsistency::LoanFieldsDisagree { loan_id } => {
                write!(f, "loan {loan_id} has a return date and returned flag that disagree")
            }
        }
    }
}

/// Scan the whole store. An empty result means every invariant holds.
pub fn check_consistency<S: LoanStore + ?Sized>(
    store: &S,
) -> Result<Vec<Inconsistency>, StorageError> {
    let loans = store.list_loans()?;
    let mut by_copy: BTreeMap<CopyId, Vec<LoanId>> = BTreeMap::new();
    let mut by_reader: BTreeMap<ReaderId, Vec<LoanId>> = BTreeMap::new();
    let mut found = Vec::new();

    for loan in &loans {
        if loan.is_returned != loan.return_date.is_some() {
            found.push(Inconsistency::LoanFieldsDisagree { loan_id: loan.id });
        }
        if loan.is_open() {
            by_copy.entry(loan.copy_id).or_default().push(loan.id);
            by_reader.entry(loan.reader_id).or_default().push(loan.id);
        }
    }

    for (copy_id, open) in &by_copy {
        if open.len() > 1 {
            found.push(Inconsistency::CopyHasSeveralOpenLoans {
                copy_id: *copy_id,
                loans: open.clone(),
            });
        }
    }
    for (reader_id, open) in &by_reader {
        if open.len() > 1 {
            found.push(Inconsistency::ReaderHasSeveralOpenLoans {
                reader_id: *reader_id,
                loans: open.clone(),
            });
        }
    }

    for copy in store.list_copies()? {
        let open_loans = by_copy.get(&copy.id).map_or(0, Vec::len);
        if copy.is_available != (open_loans == 0) {
            found.push(Inconsistency::CopyFlagDrift {
                copy_id: copy.id,
                is_available: copy.is_available,
                open_loans,
            });
        }
    }
    for reader in store.list_readers()? {
        let open_loans = by_reader.get(&reader.id).map_or(0, Vec::len);
        if reader.has_active_loan != (open_loans > 0) {
            found.push(Inconsistency::ReaderFlagDrift {
                reader_id: reader.id,
                has_active_loan: reader.has_active_loan,
                open_loans,
            });
        }
    }

    for issue in &found {
        warn!(%issue, "loan data inconsistency");
    }
    Ok(found)
}
