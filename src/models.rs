//! Domain records that mirror the library schema and get passed between the
//! store adapters and the loan workflow. The types stay plain data holders:
//! relationships are expressed through ids and resolved via the store, never
//! through embedded back-pointers.

use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// Row ids as assigned by the store.
pub type AuthorId = i64;
pub type BookId = i64;
pub type CopyId = i64;
pub type ReaderId = i64;
pub type LoanId = i64;
pub type BlockId = i64;

/// Join name parts with single spaces, skipping the blank ones.
fn join_name(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A book author. Authors own books through `Book::author_id`.
pub struct Author {
    /// Unique identifier of the author.
    pub id: AuthorId,
    /// Family name, shown first in listings.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Patronymic or middle name, when recorded.
    pub middle_name: Option<String>,
}

impl Author {
    /// `Last First Middle`, with absent parts dropped.
    pub fn full_name(&self) -> String {
        join_name(&[
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or_default(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A catalogue title. Physical instances live in `Copy` rows keyed by
/// `book_id`, so the book owns its copies without holding them.
pub struct Book {
    /// Unique identifier of the book.
    pub id: BookId,
    /// Title as printed on the cover.
    pub title: String,
    /// Publication year, if known.
    pub year: Option<i32>,
    /// Author who wrote the book.
    pub author_id: AuthorId,
    /// Language of the edition.
    pub language: Option<String>,
    /// Page count.
    pub pages: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A lendable instance of a book.
pub struct BookCopy {
    /// Unique identifier of the copy.
    pub id: CopyId,
    /// Book this copy is an instance of.
    pub book_id: BookId,
    /// Cached mirror of "this copy has no open loan". Only the issue and
    /// return workflows flip it.
    pub is_available: bool,
}

impl BookCopy {
    /// A freshly catalogued copy starts on the shelf.
    pub fn new(id: CopyId, book_id: BookId) -> Self {
        Self {
            id,
            book_id,
            is_available: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A library member who may borrow copies.
pub struct Reader {
    /// Unique identifier of the reader.
    pub id: ReaderId,
    /// Family name.
    pub last_name: String,
    /// Given name.
    pub first_name: String,
    /// Patronymic or middle name, when recorded.
    pub middle_name: Option<String>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Contact e-mail address.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Cached mirror of "this reader has an open loan".
    pub has_active_loan: bool,
    /// Due date of the reader's open loan, cleared on return.
    pub must_return_by: Option<NaiveDate>,
}

impl Reader {
    /// A reader with only the required name fields filled in and no loan.
    pub fn new(id: ReaderId, last_name: &str, first_name: &str) -> Self {
        Self {
            id,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            middle_name: None,
            birth_date: None,
            phone: None,
            email: None,
            address: None,
            has_active_loan: false,
            must_return_by: None,
        }
    }

    /// `Last First Middle`, the form used in pick lists and reports.
    pub fn full_name(&self) -> String {
        join_name(&[
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or_default(),
        ])
    }
}

impl fmt::Display for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A restriction row against a reader. Only rows with `is_blocked ==
/// Some(true)` count; cleared or unknown rows are kept for history.
pub struct Block {
    /// Unique identifier of the block.
    pub id: BlockId,
    /// Reader the block applies to.
    pub reader_id: ReaderId,
    /// `Some(true)` while the block is in force.
    pub is_blocked: Option<bool>,
    /// Free-text explanation shown when a loan is refused.
    pub reason: Option<String>,
    /// Fine paid towards lifting the block.
    pub paid_amount: Option<i64>,
}

impl Block {
    /// Whether this row currently stops the reader from borrowing.
    pub fn is_active(&self) -> bool {
        self.is_blocked == Some(true)
    }
}

/// How long a copy goes out for when no explicit due date is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoanPolicy {
    /// Fourteen days.
    #[default]
    TwoWeeks,
    /// Thirty days.
    OneMonth,
}

impl LoanPolicy {
    /// Length of the loan period in days.
    pub fn days(self) -> u64 {
        match self {
            LoanPolicy::TwoWeeks => 14,
            LoanPolicy::OneMonth => 30,
        }
    }

    /// Due date derived from the issue date, or `None` when the period
    /// would run past the end of the calendar.
    pub fn due_date(self, issue_date: NaiveDate) -> Option<NaiveDate> {
        issue_date.checked_add_days(Days::new(self.days()))
    }
}

/// Derived state of a loan. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoanStatus::Active => "On loan",
            LoanStatus::Overdue => "Overdue",
            LoanStatus::Returned => "Returned",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A copy lent to a reader. `return_date` and `is_returned` are written
/// together by the return workflow and must never disagree.
pub struct Loan {
    /// Unique identifier of the loan.
    pub id: LoanId,
    /// Reader who borrowed the copy.
    pub reader_id: ReaderId,
    /// Copy that went out.
    pub copy_id: CopyId,
    /// Day the copy was handed over.
    pub issue_date: NaiveDate,
    /// Day the copy is expected back.
    pub due_date: NaiveDate,
    /// Day the copy came back, once it has.
    pub return_date: Option<NaiveDate>,
    /// Set together with `return_date` when the loan is closed.
    pub is_returned: bool,
}

impl Loan {
    /// A loan stays open until either return marker is set.
    pub fn is_open(&self) -> bool {
        !self.is_returned && self.return_date.is_none()
    }

    /// Status as of `now`. A loan becomes overdue as soon as the clock passes
    /// the start of its due date.
    pub fn status_at(&self, now: NaiveDateTime) -> LoanStatus {
        if !self.is_open() {
            LoanStatus::Returned
        } else if now > self.due_date.and_time(NaiveTime::MIN) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// Status against the local wall clock. Recomputed on every call.
    pub fn status(&self) -> LoanStatus {
        self.status_at(chrono::Local::now().naive_local())
    }

    /// Shorthand for `status_at(now) == LoanStatus::Overdue`.
    pub fn is_overdue_at(&self, now: NaiveDateTime) -> bool {
        self.status_at(now) == LoanStatus::Overdue
    }
}

/// A loan that has passed eligibility but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    /// Reader who is borrowing.
    pub reader_id: ReaderId,
    /// Copy being lent.
    pub copy_id: CopyId,
    /// Day of issue.
    pub issue_date: NaiveDate,
    /// Agreed return date.
    pub due_date: NaiveDate,
}

impl NewLoan {
    /// Materialize the row once the store has assigned an id.
    pub fn with_id(&self, id: LoanId) -> Loan {
        Loan {
            id,
            reader_id: self.reader_id,
            copy_id: self.copy_id,
            issue_date: self.issue_date,
            due_date: self.due_date,
            return_date: None,
            is_returned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(day: NaiveDate) -> NaiveDateTime {
        day.and_hms_opt(12, 0, 0).unwrap()
    }

    fn open_loan(due: NaiveDate) -> Loan {
        Loan {
            id: 1,
            reader_id: 1,
            copy_id: 1,
            issue_date: date(2024, 1, 1),
            due_date: due,
            return_date: None,
            is_returned: false,
        }
    }

    #[test]
    fn policy_offsets() {
        let issued = date(2024, 1, 1);
        assert_eq!(LoanPolicy::TwoWeeks.due_date(issued), Some(date(2024, 1, 15)));
        assert_eq!(LoanPolicy::OneMonth.due_date(issued), Some(date(2024, 1, 31)));
        assert_eq!(LoanPolicy::default(), LoanPolicy::TwoWeeks);
    }

    #[test]
    fn policy_past_calendar_end_has_no_due_date() {
        let near_end = NaiveDate::MAX.checked_sub_days(Days::new(3)).unwrap();
        assert_eq!(LoanPolicy::TwoWeeks.due_date(near_end), None);
        assert_eq!(LoanPolicy::OneMonth.due_date(near_end), None);

        let last_fit = NaiveDate::MAX.checked_sub_days(Days::new(14)).unwrap();
        assert_eq!(LoanPolicy::TwoWeeks.due_date(last_fit), Some(NaiveDate::MAX));
    }

    #[test]
    fn yesterday_due_is_overdue_until_returned() {
        let today = date(2024, 3, 10);
        let mut loan = open_loan(date(2024, 3, 9));
        assert_eq!(loan.status_at(noon(today)), LoanStatus::Overdue);
        assert!(loan.is_overdue_at(noon(today)));

        loan.return_date = Some(today);
        assert_eq!(loan.status_at(noon(today)), LoanStatus::Returned);
        assert!(!loan.is_overdue_at(noon(today)));
    }

    #[test]
    fn returned_flag_alone_counts_as_returned() {
        let mut loan = open_loan(date(2024, 3, 9));
        loan.is_returned = true;
        assert!(!loan.is_open());
        assert_eq!(loan.status_at(noon(date(2024, 4, 1))), LoanStatus::Returned);
    }

    #[test]
    fn active_before_due_date() {
        let loan = open_loan(date(2024, 3, 9));
        assert_eq!(loan.status_at(noon(date(2024, 3, 8))), LoanStatus::Active);
        assert_eq!(
            loan.status_at(date(2024, 3, 9).and_time(NaiveTime::MIN)),
            LoanStatus::Active
        );
        assert_eq!(loan.status_at(noon(date(2024, 3, 9))), LoanStatus::Overdue);
    }

    #[test]
    fn full_names_skip_blank_parts() {
        let mut reader = Reader::new(1, "Ivanova", "Anna");
        assert_eq!(reader.full_name(), "Ivanova Anna");
        reader.middle_name = Some("Petrovna".into());
        assert_eq!(reader.to_string(), "Ivanova Anna Petrovna");

        let author = Author {
            id: 1,
            last_name: "Tolstoy".into(),
            first_name: " ".into(),
            middle_name: None,
        };
        assert_eq!(author.full_name(), "Tolstoy");
    }

    #[test]
    fn only_explicit_blocks_are_active() {
        let mut block = Block {
            id: 1,
            reader_id: 1,
            is_blocked: None,
            reason: None,
            paid_amount: None,
        };
        assert!(!block.is_active());
        block.is_blocked = Some(false);
        assert!(!block.is_active());
        block.is_blocked = Some(true);
        assert!(block.is_active());
    }
}
