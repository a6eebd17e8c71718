use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::records::{BookId, FineId, LoanId, MemberId, ReservationId};

/// Transitions the ledger has committed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum LedgerEvent {
    /// A member borrowed a book
    LoanCreated { loan: LoanId, member: MemberId, book: BookId, due_date: NaiveDate },
    /// A loan's due date was pushed back
    LoanRenewed { loan: LoanId, member: MemberId, due_date: NaiveDate },
    /// A loan passed its due date without a return
    LoanOverdue { loan: LoanId, member: MemberId, due_date: NaiveDate },
    /// A book came back
    LoanReturned { loan: LoanId, member: MemberId, book: BookId, returned_on: NaiveDate },
    /// A fine was created for an overdue loan
    FineIssued { fine: FineId, loan: LoanId, member: MemberId, amount: Decimal },
    /// An unpaid fine's amount changed
    FineAccrued { fine: FineId, loan: LoanId, amount: Decimal },
    /// A fine was paid
    FinePaid { fine: FineId, amount: Decimal },
    /// A fine was waived
    FineWaived { fine: FineId, amount: Decimal },
    /// A member joined the queue for a book
    ReservationPlaced { reservation: ReservationId, member: MemberId, book: BookId },
    /// A copy is now held for a member
    ReservationActivated {
        reservation: ReservationId,
        member: MemberId,
        book: BookId,
        expires_on: NaiveDate,
    },
    /// A held copy was not collected in time
    ReservationExpired { reservation: ReservationId, member: MemberId, book: BookId },
    /// A member withdrew a reservation
    ReservationCancelled { reservation: ReservationId, member: MemberId, book: BookId },
    /// A member borrowed the book they had reserved
    ReservationCompleted { reservation: ReservationId, member: MemberId, loan: LoanId },
}

impl LedgerEvent {
    /// Get a human-readable description of the event
    #[must_use]
    pub fn get_description(&self) -> String {
        match self {
            Self::LoanCreated { loan, member, book, due_date } => {
                format!("{member} borrowed {book} as {loan}, due {due_date}")
            }
            Self::LoanRenewed { loan, due_date, .. } => format!("{loan} renewed until {due_date}"),
            Self::LoanOverdue { loan, due_date, .. } => format!("{loan} overdue since {due_date}"),
            Self::LoanReturned { loan, book, returned_on, .. } => {
                format!("{book} returned on {returned_on}, closing {loan}")
            }
            Self::FineIssued { fine, loan, amount, .. } => {
                format!("{fine} of {amount} issued for {loan}")
            }
            Self::FineAccrued { fine, amount, .. } => format!("{fine} accrued to {amount}"),
            Self::FinePaid { fine, amount } => format!("{fine} of {amount} paid"),
            Self::FineWaived { fine, amount } => format!("{fine} of {amount} waived"),
            Self::ReservationPlaced { reservation, member, book } => {
                format!("{member} queued for {book} as {reservation}")
            }
            Self::ReservationActivated { reservation, book, expires_on, .. } => {
                format!("{book} held for {reservation} until {expires_on}")
            }
            Self::ReservationExpired { reservation, .. } => format!("{reservation} expired"),
            Self::ReservationCancelled { reservation, .. } => format!("{reservation} cancelled"),
            Self::ReservationCompleted { reservation, loan, .. } => {
                format!("{reservation} fulfilled by {loan}")
            }
        }
    }
}
