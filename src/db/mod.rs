//! SQLite persistence split across logical submodules: schema setup, one
//! module per group of tables, and the `LoanStore` adapter that ties them
//! into transactional commits.

mod catalog;
mod connection;
mod loans;
mod readers;
mod store;

pub use catalog::{create_author, create_book, create_copy, fetch_copies, fetch_copy};
pub use connection::{ensure_schema, open_database, open_in_memory};
pub use loans::{fetch_loan, fetch_loans, fetch_open_loans_for_copy};
pub use readers::{create_block, create_reader, fetch_blocks_for_reader, fetch_reader, fetch_readers};
pub use store::SqliteStore;
