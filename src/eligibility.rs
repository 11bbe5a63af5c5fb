//! Decides whether a reader may take a copy. The checks run in a fixed order
//! and the first failing one is reported, so the librarian always sees the
//! most fundamental problem first.

use tracing::debug;

use crate::error::{IneligibilityReason, LoanError};
use crate::models::{CopyId, ReaderId};
use crate::store::LoanStore;

/// Read-only eligibility check for lending `copy_id` to `reader_id`.
///
/// A refusal comes back as `LoanError::Ineligible`; any other error is a
/// store failure.
pub fn check_eligibility<S: LoanStore + ?Sized>(
    store: &S,
    reader_id: ReaderId,
    copy_id: CopyId,
) -> Result<(), LoanError> {
    let refuse = |reason: IneligibilityReason| {
        debug!(reader_id, copy_id, %reason, "loan refused");
        Err(LoanError::Ineligible(reason))
    };

    let Some(reader) = store.find_reader(reader_id)? else {
        return refuse(IneligibilityReason::ReaderNotFound);
    };

    let blocks = store.list_blocks_for_reader(reader_id)?;
    if let Some(block) = blocks.iter().filter(|b| b.is_active()).min_by_key(|b| b.id) {
        return refuse(IneligibilityReason::ReaderBlocked {
            reason: block.reason.clone(),
        });
    }

    if reader.has_active_loan {
        return refuse(IneligibilityReason::ReaderAlreadyHasLoan);
    }

    let Some(record) = store.find_copy(copy_id)? else {
        return refuse(IneligibilityReason::CopyNotFound);
    };

    let on_loan = !record.open_loans.is_empty();
    if !record.copy.is_available {
        return refuse(if on_loan {
            IneligibilityReason::CopyAlreadyLoaned
        } else {
            IneligibilityReason::CopyUnavailable
        });
    }

    // The flag says available; trust the loan table over it.
    if on_loan {
        return refuse(IneligibilityReason::CopyAlreadyLoaned);
    }

    Ok(())
}
