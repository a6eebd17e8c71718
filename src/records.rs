//! Typed rows for the tables the ledger reads and writes.
//!
//! Foreign keys are plain id fields; nothing here embeds another row. The
//! [`LedgerStore`](crate::store::LedgerStore) resolves ids to rows.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::states::{FineState, LoanState, ReservationState};

/// Common behaviour of the row identifier newtypes
pub trait RowId: Copy {
    /// Lower-case entity name used in messages
    fn entity(self) -> &'static str;

    /// The underlying integer key
    fn raw(self) -> u64;
}

/// Declares a row identifier newtype
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident => $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl RowId for $name {
            fn entity(self) -> &'static str {
                $entity
            }

            fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} #{}", $entity, self.0)
            }
        }
    };
}

row_id!(
    /// `Members.MemberID`
    MemberId => "member"
);
row_id!(
    /// `Authors.AuthorID`
    AuthorId => "author"
);
row_id!(
    /// `Books.BookID`
    BookId => "book"
);
row_id!(
    /// `BookLoans.LoanID`
    LoanId => "loan"
);
row_id!(
    /// `Fines.FineID`
    FineId => "fine"
);
row_id!(
    /// `BookReservations.ReservationID`
    ReservationId => "reservation"
);

/// A library member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    /// Primary key
    pub id: MemberId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact e-mail, unique per member
    pub email: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Day the membership started
    pub membership_date: NaiveDate,
}

impl Member {
    /// Create a member with no phone number on file
    #[must_use]
    pub fn new(
        id: MemberId,
        first_name: &str,
        last_name: &str,
        email: &str,
        membership_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: None,
            membership_date,
        }
    }
}

/// An author a book may be linked to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Author {
    /// Primary key
    pub id: AuthorId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    /// Primary key
    pub id: BookId,
    /// Title
    pub title: String,
    /// Optional link to `Authors`
    pub author_id: Option<AuthorId>,
    /// ISBN, when catalogued
    pub isbn: Option<String>,
    /// Copies the library owns
    pub total_copies: u32,
    /// Copies on the shelf; never more than `total_copies`
    pub copies_available: u32,
}

impl Book {
    /// Create a book with every copy on the shelf
    #[must_use]
    pub fn new(id: BookId, title: &str, total_copies: u32) -> Self {
        Self {
            id,
            title: title.to_string(),
            author_id: None,
            isbn: None,
            total_copies,
            copies_available: total_copies,
        }
    }
}

/// A `BookLoans` row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Loan {
    /// Primary key
    pub id: LoanId,
    /// Borrowing member
    pub member_id: MemberId,
    /// Borrowed book
    pub book_id: BookId,
    /// Day the loan was made
    pub loan_date: NaiveDate,
    /// Day the book is due back; never before `loan_date`
    pub due_date: NaiveDate,
    /// Day the book came back; never before `loan_date`
    pub return_date: Option<NaiveDate>,
    /// Lifecycle state
    pub state: LoanState,
}

/// Values for a loan row that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    /// Borrowing member
    pub member_id: MemberId,
    /// Borrowed book
    pub book_id: BookId,
    /// Day the loan was made
    pub loan_date: NaiveDate,
    /// Day the book is due back
    pub due_date: NaiveDate,
}

/// A `Fines` row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Fine {
    /// Primary key
    pub id: FineId,
    /// The overdue loan this fine was derived from
    pub loan_id: LoanId,
    /// Amount owed
    pub amount: Decimal,
    /// Day the fine was first issued
    pub issued_on: NaiveDate,
    /// Lifecycle state
    pub state: FineState,
}

/// Values for a fine row that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFine {
    /// The overdue loan
    pub loan_id: LoanId,
    /// Amount owed
    pub amount: Decimal,
    /// Day of issue
    pub issued_on: NaiveDate,
}

/// A `BookReservations` row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reservation {
    /// Primary key
    pub id: ReservationId,
    /// Waiting member
    pub member_id: MemberId,
    /// Reserved book
    pub book_id: BookId,
    /// When the reservation was placed; orders the queue
    pub reservation_date: DateTime<Utc>,
    /// Lifecycle state
    pub state: ReservationState,
    /// Day the reservation became active
    pub activated_on: Option<NaiveDate>,
    /// Last day the held copy stays held
    pub expires_on: Option<NaiveDate>,
}

/// Values for a reservation row that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    /// Waiting member
    pub member_id: MemberId,
    /// Reserved book
    pub book_id: BookId,
    /// When the reservation was placed
    pub reservation_date: DateTime<Utc>,
}
