//! Binary entry point that opens the configured library database and prints
//! the loan desk's morning report: every open loan with its status, the
//! overdue counter, and any drift between the availability flags and the
//! loan table.
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loan_desk::{DeskConfig, LoanDesk, SqliteStore};

/// Initialize logging and persistence, then print the report.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// an unwritable data directory) to the terminal instead of crashing
/// silently.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loan_desk=info")),
        )
        .with_target(false)
        .init();

    let config = DeskConfig::from_env()?;
    info!(path = %config.database_path.display(), "opening library database");
    let desk = LoanDesk::new(SqliteStore::open(&config.database_path)?);

    let now = chrono::Local::now().naive_local();
    let loans = desk.open_loans_at(now).context("failed to load open loans")?;
    for row in &loans {
        println!(
            "#{:<5} {:<10} due {}  {} - {} ({})",
            row.loan.id, row.status, row.loan.due_date, row.reader_name, row.book_title, row.author_name
        );
    }

    let summary = desk.summary_at(now).context("failed to count loans")?;
    println!(
        "{} open loan(s), {} overdue",
        summary.open_loans, summary.overdue_loans
    );

    let issues = desk.audit().context("failed to audit loan data")?;
    for issue in &issues {
        println!("inconsistency: {issue}");
    }

    Ok(())
}
