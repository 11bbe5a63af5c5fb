//! Issue and return of loans. Every successful operation ends in exactly one
//! store commit that carries the loan change together with the matching
//! copy and reader flag changes, so the flags cannot drift from the loan
//! table through this path.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::eligibility::check_eligibility;
use crate::error::{Entity, LoanError, StorageError};
use crate::models::{CopyId, Loan, LoanId, LoanPolicy, NewLoan, ReaderId};
use crate::store::{LoanStore, Mutation};

/// Everything needed to lend a copy. The due date follows `policy` unless
/// overridden with [`IssueRequest::due_on`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    /// Reader asking for the copy.
    pub reader_id: ReaderId,
    /// Copy to lend.
    pub copy_id: CopyId,
    /// Day the copy goes out.
    pub issue_date: NaiveDate,
    /// Loan period used when no explicit due date is set.
    pub policy: LoanPolicy,
    /// Explicit due date overriding the policy.
    pub due_date: Option<NaiveDate>,
}

impl IssueRequest {
    /// A request whose due date follows `policy`.
    pub fn new(
        reader_id: ReaderId,
        copy_id: CopyId,
        issue_date: NaiveDate,
        policy: LoanPolicy,
    ) -> Self {
        Self {
            reader_id,
            copy_id,
            issue_date,
            policy,
            due_date: None,
        }
    }

    /// Replace the policy-derived due date with a hand-picked one.
    pub fn due_on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// The due date the loan will carry: the override if present, otherwise
    /// the policy date. Fails when the policy period leaves the calendar or
    /// the date falls before the issue date.
    pub fn effective_due_date(&self) -> Result<NaiveDate, LoanError> {
        let due_date = match self.due_date {
            Some(due_date) => due_date,
            None => self.policy.due_date(self.issue_date).ok_or(
                LoanError::DueDateOutOfRange {
                    issued: self.issue_date,
                    days: self.policy.days(),
                },
            )?,
        };
        if due_date < self.issue_date {
            return Err(LoanError::DueBeforeIssue {
                issued: self.issue_date,
                due: due_date,
            });
        }
        Ok(due_date)
    }
}

/// The loan desk: owns a store handle and runs the loan workflows against
/// it.
#[derive(Debug)]
pub struct LoanDesk<S> {
    store: S,
}

impl<S: LoanStore> LoanDesk<S> {
    /// Wrap a store handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store, for seeding and fault
    /// injection. Writes made here bypass the workflow.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the store back, dropping the desk.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Lend a copy to a reader.
    ///
    /// Eligibility refusals take precedence over date problems; both are
    /// reported before anything is written. On success the new loan, the
    /// unavailable copy and the reader's active-loan flag are committed
    /// together.
    pub fn issue_loan(&mut self, request: IssueRequest) -> Result<Loan, LoanError> {
        check_eligibility(&self.store, request.reader_id, request.copy_id)?;
        let due_date = request.effective_due_date()?;

        // Eligibility just resolved both rows; a miss here means they
        // vanished in between.
        let mut reader = self
            .store
            .find_reader(request.reader_id)?
            .ok_or_else(|| LoanError::not_found(Entity::Reader, request.reader_id))?;
        let mut copy = self
            .store
            .find_copy(request.copy_id)?
            .ok_or_else(|| LoanError::not_found(Entity::Copy, request.copy_id))?
            .copy;

        let new_loan = NewLoan {
            reader_id: request.reader_id,
            copy_id: request.copy_id,
            issue_date: request.issue_date,
            due_date,
        };
        copy.is_available = false;
        reader.has_active_loan = true;
        reader.must_return_by = Some(due_date);

        let committed = self.store.commit(&[
            Mutation::InsertLoan(new_loan.clone()),
            Mutation::UpdateCopy(copy),
            Mutation::UpdateReader(reader),
        ])?;

        let loan_id = committed.inserted_loans.first().copied().ok_or_else(|| {
            StorageError::Backend(anyhow::anyhow!("commit did not report the new loan id"))
        })?;
        let loan = new_loan.with_id(loan_id);

        info!(
            loan_id,
            reader_id = loan.reader_id,
            copy_id = loan.copy_id,
            due = %loan.due_date,
            "loan issued"
        );
        Ok(loan)
    }

    /// Close an open loan, put the copy back on the shelf and clear the
    /// reader's active-loan flag.
    ///
    /// A return date before the issue date is refused. When the reader's row
    /// cannot be updated the whole return is refused
    /// with `PartialUpdateFailure`; the loan stays open rather than leaving
    /// the reader flagged with a returned book.
    pub fn return_loan(
        &mut self,
        loan_id: LoanId,
        return_date: NaiveDate,
    ) -> Result<Loan, LoanError> {
        let mut loan = self
            .store
            .find_loan(loan_id)?
            .ok_or_else(|| LoanError::not_found(Entity::Loan, loan_id))?;
        if !loan.is_open() {
            return Err(LoanError::AlreadyReturned(loan_id));
        }
        if return_date < loan.issue_date {
            return Err(LoanError::ReturnBeforeIssue {
                loan_id,
                issued: loan.issue_date,
                returned: return_date,
            });
        }

        let mut copy = self
            .store
            .find_copy(loan.copy_id)?
            .ok_or_else(|| LoanError::not_found(Entity::Copy, loan.copy_id))?
            .copy;

        let Some(mut reader) = self.store.find_reader(loan.reader_id)? else {
            warn!(loan_id, reader_id = loan.reader_id, "reader missing on return");
            return Err(LoanError::PartialUpdateFailure {
                loan_id,
                reader_id: loan.reader_id,
                source: None,
            });
        };

        loan.return_date = Some(return_date);
        loan.is_returned = true;
        copy.is_available = true;
        reader.has_active_loan = false;
        reader.must_return_by = None;

        let outcome = self.store.commit(&[
            Mutation::UpdateLoan(loan.clone()),
            Mutation::UpdateCopy(copy),
            Mutation::UpdateReader(reader),
        ]);

        match outcome {
            Ok(_) => {
                info!(loan_id, copy_id = loan.copy_id, returned = %return_date, "loan returned");
                Ok(loan)
            }
            Err(err) if err.entity() == Some(Entity::Reader) => {
                warn!(loan_id, reader_id = loan.reader_id, error = %err, "reader update failed on return");
                Err(LoanError::PartialUpdateFailure {
                    loan_id,
                    reader_id: loan.reader_id,
                    source: Some(err),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
