//! End-to-end loan desk scenarios, replayed against both store adapters so
//! the SQLite transaction and the in-memory staging behave identically.

use chrono::NaiveDate;

use loan_desk::db::{create_author, create_book, create_copy, create_reader};
use loan_desk::{
    BookCopy, IneligibilityReason, IssueRequest, LoanDesk, LoanError, LoanPolicy, LoanStatus,
    LoanStore, MemoryStore, Reader, SqliteStore,
};

struct Ids {
    r1: i64,
    r2: i64,
    c1: i64,
    c2: i64,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn memory_desk() -> (LoanDesk<MemoryStore>, Ids) {
    let mut store = MemoryStore::new();
    store.insert_reader(Reader::new(1, "Volkov", "Artem"));
    store.insert_reader(Reader::new(2, "Popova", "Elena"));
    store.insert_copy(BookCopy::new(1, 1));
    store.insert_copy(BookCopy::new(2, 1));
    let ids = Ids {
        r1: 1,
        r2: 2,
        c1: 1,
        c2: 2,
    };
    (LoanDesk::new(store), ids)
}

fn sqlite_desk() -> (LoanDesk<SqliteStore>, Ids) {
    let store = SqliteStore::in_memory().unwrap();
    let conn = store.connection();
    let author = create_author(conn, "Gogol", "Nikolai", None).unwrap();
    let book = create_book(conn, author.id, "Dead Souls", Some(1842), None, Some(352)).unwrap();
    let c1 = create_copy(conn, book.id).unwrap();
    let c2 = create_copy(conn, book.id).unwrap();
    let r1 = create_reader(conn, &Reader::new(0, "Volkov", "Artem")).unwrap();
    let r2 = create_reader(conn, &Reader::new(0, "Popova", "Elena")).unwrap();
    let ids = Ids {
        r1: r1.id,
        r2: r2.id,
        c1: c1.id,
        c2: c2.id,
    };
    (LoanDesk::new(store), ids)
}

fn first_loan_gets_two_week_due_date<S: LoanStore>(mut desk: LoanDesk<S>, ids: Ids) {
    let loan = desk
        .issue_loan(IssueRequest::new(ids.r1, ids.c1, date(2024, 1, 1), LoanPolicy::TwoWeeks))
        .unwrap();

    assert_eq!(loan.due_date, date(2024, 1, 15));
    assert!(!desk.store().find_copy(ids.c1).unwrap().unwrap().copy.is_available);
    assert!(desk.store().find_reader(ids.r1).unwrap().unwrap().has_active_loan);
}

fn second_loan_is_refused<S: LoanStore>(mut desk: LoanDesk<S>, ids: Ids) {
    desk.issue_loan(IssueRequest::new(ids.r1, ids.c1, date(2024, 1, 1), LoanPolicy::TwoWeeks))
        .unwrap();
    let err = desk
        .issue_loan(IssueRequest::new(ids.r1, ids.c2, date(2024, 1, 2), LoanPolicy::TwoWeeks))
        .unwrap_err();

    assert_eq!(err.ineligibility(), Some(&IneligibilityReason::ReaderAlreadyHasLoan));
    assert!(desk.store().find_copy(ids.c2).unwrap().unwrap().copy.is_available);
}

fn loaned_copy_is_refused<S: LoanStore>(mut desk: LoanDesk<S>, ids: Ids) {
    desk.issue_loan(IssueRequest::new(ids.r1, ids.c1, date(2024, 1, 1), LoanPolicy::TwoWeeks))
        .unwrap();
    let err = desk
        .issue_loan(IssueRequest::new(ids.r2, ids.c1, date(2024, 1, 2), LoanPolicy::OneMonth))
        .unwrap_err();

    assert_eq!(err.ineligibility(), Some(&IneligibilityReason::CopyAlreadyLoaned));
    assert!(!desk.store().find_reader(ids.r2).unwrap().unwrap().has_active_loan);
}

fn overdue_loan_turns_returned<S: LoanStore>(mut desk: LoanDesk<S>, ids: Ids) {
    let loan = desk
        .issue_loan(IssueRequest::new(ids.r1, ids.c1, date(2024, 3, 1), LoanPolicy::TwoWeeks))
        .unwrap();
    let day_after_due = date(2024, 3, 16).and_hms_opt(10, 0, 0).unwrap();
    assert_eq!(loan.status_at(day_after_due), LoanStatus::Overdue);
    assert_eq!(desk.summary_at(day_after_due).unwrap().overdue_loans, 1);

    let closed = desk.return_loan(loan.id, date(2024, 3, 16)).unwrap();
    assert_eq!(closed.status_at(day_after_due), LoanStatus::Returned);
    assert_eq!(desk.summary_at(day_after_due).unwrap().open_loans, 0);

    let again = desk.return_loan(loan.id, date(2024, 3, 17));
    assert!(matches!(again, Err(LoanError::AlreadyReturned(id)) if id == loan.id));
    assert!(desk.audit().unwrap().is_empty());
}

#[test]
fn scenarios_on_memory_store() {
    let (desk, ids) = memory_desk();
    first_loan_gets_two_week_due_date(desk, ids);
    let (desk, ids) = memory_desk();
    second_loan_is_refused(desk, ids);
    let (desk, ids) = memory_desk();
    loaned_copy_is_refused(desk, ids);
    let (desk, ids) = memory_desk();
    overdue_loan_turns_returned(desk, ids);
}

#[test]
fn scenarios_on_sqlite_store() {
    let (desk, ids) = sqlite_desk();
    first_loan_gets_two_week_due_date(desk, ids);
    let (desk, ids) = sqlite_desk();
    second_loan_is_refused(desk, ids);
    let (desk, ids) = sqlite_desk();
    loaned_copy_is_refused(desk, ids);
    let (desk, ids) = sqlite_desk();
    overdue_loan_turns_returned(desk, ids);
}

#[test]
fn sqlite_pick_lists_show_catalogue_names() {
    let (mut desk, ids) = sqlite_desk();
    desk.issue_loan(IssueRequest::new(ids.r2, ids.c2, date(2024, 1, 1), LoanPolicy::TwoWeeks))
        .unwrap();

    let copies = desk.available_copies().unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].to_string(), "Dead Souls (Gogol Nikolai, 1842)");

    let rows = desk
        .open_loans_at(date(2024, 1, 2).and_hms_opt(8, 0, 0).unwrap())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reader_name, "Popova Elena");
    assert_eq!(rows[0].status, LoanStatus::Active);
}
