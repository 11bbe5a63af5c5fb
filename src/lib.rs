//! Core library surface for the library loan desk.
//!
//! The desk lends book copies to readers and takes them back, keeping the
//! copy and reader availability flags in step with the loan table. The
//! workflow talks to storage only through the `LoanStore` trait, so the
//! SQLite adapter used by the binary and the in-memory adapter used by tests
//! are interchangeable.
pub mod audit;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod reports;
pub mod store;
pub mod workflow;

/// The configuration and SQLite entry points used by `main.rs`.
pub use config::DeskConfig;
pub use db::SqliteStore;

/// Error taxonomy shared by every operation.
pub use error::{Entity, IneligibilityReason, LoanError, StorageError};

/// Domain records.
pub use models::{Author, Block, Book, BookCopy, Loan, LoanPolicy, LoanStatus, NewLoan, Reader};

/// The storage seam and its in-memory implementation.
pub use store::{Committed, CopyRecord, LoanStore, MemoryStore, Mutation};

/// The loan workflow and the views built on top of it.
pub use audit::{check_consistency, Inconsistency};
pub use eligibility::check_eligibility;
pub use reports::{AvailableCopy, DeskSummary, LoanOverview};
pub use workflow::{IssueRequest, LoanDesk};
