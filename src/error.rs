//! Typed failures of the loan workflow. Refusals and missing records are
//! expected outcomes the desk reports back to the librarian; storage failures
//! are passed through untouched so the caller decides whether to retry.

use std::fmt;

use thiserror::Error;

use crate::models::{LoanId, ReaderId};

/// Record kinds the store knows about. Used to label missing rows and failed
/// writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Author,
    Book,
    Copy,
    Reader,
    Loan,
    Block,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Author => "author",
            Entity::Book => "book",
            Entity::Copy => "copy",
            Entity::Reader => "reader",
            Entity::Loan => "loan",
            Entity::Block => "block",
        };
        f.write_str(name)
    }
}

/// Why a reader may not take a copy right now.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IneligibilityReason {
    #[error("reader not found")]
    ReaderNotFound,
    #[error("reader is blocked: {}", .reason.as_deref().unwrap_or("no reason recorded"))]
    ReaderBlocked { reason: Option<String> },
    #[error("reader already has a book on loan")]
    ReaderAlreadyHasLoan,
    #[error("copy not found")]
    CopyNotFound,
    #[error("copy is not available for loan")]
    CopyUnavailable,
    #[error("copy is already on loan to another reader")]
    CopyAlreadyLoaned,
}

fn describe_id(id: &Option<i64>) -> String {
    id.map(|id| format!(" {id}")).unwrap_or_default()
}

/// Failures raised by a `LoanStore` implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A single mutation of a commit could not be applied. The commit as a
    /// whole has been discarded.
    #[error("failed to write {entity}{}", describe_id(.id))]
    Write {
        entity: Entity,
        id: Option<i64>,
        #[source]
        source: anyhow::Error,
    },
    /// Query, connection or transaction failures.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    /// Which record kind a failed write targeted, if the failure is tied to
    /// one.
    pub fn entity(&self) -> Option<Entity> {
        match self {
            StorageError::Write { entity, .. } => Some(*entity),
            StorageError::Backend(_) => None,
        }
    }
}

/// Everything `LoanDesk` operations can report.
#[derive(Debug, Error)]
pub enum LoanError {
    /// A record the operation depends on does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("loan refused: {0}")]
    Ineligible(#[from] IneligibilityReason),

    #[error("loan {0} has already been returned")]
    AlreadyReturned(LoanId),

    #[error("due date {due} is before issue date {issued}")]
    DueBeforeIssue {
        issued: chrono::NaiveDate,
        due: chrono::NaiveDate,
    },

    /// The policy's loan period runs past the last representable date.
    #[error("a {days}-day loan issued on {issued} would end after the last supported date")]
    DueDateOutOfRange { issued: chrono::NaiveDate, days: u64 },

    /// A loan cannot come back before it went out.
    #[error("return date {returned} is before issue date {issued} of loan {loan_id}")]
    ReturnBeforeIssue {
        loan_id: LoanId,
        issued: chrono::NaiveDate,
        returned: chrono::NaiveDate,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The loan and copy could be closed but the reader's flags could not be
    /// cleared. Nothing was written.
    #[error("loan {loan_id} was not returned: reader {reader_id} could not be updated")]
    PartialUpdateFailure {
        loan_id: LoanId,
        reader_id: ReaderId,
        #[source]
        source: Option<StorageError>,
    },
}

impl LoanError {
    /// Shorthand for a missing record of the given kind.
    pub fn not_found(entity: Entity, id: i64) -> Self {
        LoanError::NotFound { entity, id }
    }

    /// The refusal reason, when the error is an eligibility refusal.
    pub fn ineligibility(&self) -> Option<&IneligibilityReason> {
        match self {
            LoanError::Ineligible(reason) => Some(reason),
            _ => None,
        }
    }
}
