//! Storage - the ledger's data-access seam.
//!
//! The ledger never holds rows between operations; it reads and writes them
//! through a [`LedgerStore`]. A relational database backs this trait in
//! production. [`InMemoryStore`] backs it in tests, demos and the `scan` CLI,
//! with whole-store transactions and JSON snapshots.

mod memory;

pub use memory::InMemoryStore;

use crate::{
    error::Result,
    records::{
        Book, BookId, Fine, FineId, Loan, LoanId, Member, MemberId, NewFine, NewLoan,
        NewReservation, Reservation, ReservationId,
    },
    states::{LoanState, ReservationState},
};

/// Row-level access to the tables the ledger works on.
///
/// Lookups of a missing row fail with `LedgerError::NotFound`. Writes made
/// between [`begin`](Self::begin) and [`rollback`](Self::rollback) must be
/// discarded.
pub trait LedgerStore {
    /// Open a transaction
    ///
    /// # Errors
    ///
    /// Fails if a transaction is already open.
    fn begin(&mut self) -> Result<()>;

    /// Make the open transaction's writes durable
    ///
    /// # Errors
    ///
    /// Fails if no transaction is open.
    fn commit(&mut self) -> Result<()>;

    /// Discard the open transaction's writes
    ///
    /// # Errors
    ///
    /// Fails if no transaction is open.
    fn rollback(&mut self) -> Result<()>;

    /// Fetch a member
    ///
    /// # Errors
    ///
    /// Fails if the member does not exist.
    fn member(&self, id: MemberId) -> Result<Member>;

    /// Fetch a book
    ///
    /// # Errors
    ///
    /// Fails if the book does not exist.
    fn book(&self, id: BookId) -> Result<Book>;

    /// Overwrite a book row
    ///
    /// # Errors
    ///
    /// Fails if the book does not exist.
    fn update_book(&mut self, book: &Book) -> Result<()>;

    /// Fetch a loan
    ///
    /// # Errors
    ///
    /// Fails if the loan does not exist.
    fn loan(&self, id: LoanId) -> Result<Loan>;

    /// Insert a loan in state `Loaned` and assign its id
    ///
    /// # Errors
    ///
    /// Fails if the member or book does not exist.
    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan>;

    /// Overwrite a loan row
    ///
    /// # Errors
    ///
    /// Fails if the loan does not exist.
    fn update_loan(&mut self, loan: &Loan) -> Result<()>;

    /// Every loan of a member, oldest first
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn loans_for_member(&self, member: MemberId) -> Result<Vec<Loan>>;

    /// Every loan of a book, oldest first
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn loans_for_book(&self, book: BookId) -> Result<Vec<Loan>>;

    /// Every loan in a state, oldest first
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn loans_in_state(&self, state: LoanState) -> Result<Vec<Loan>>;

    /// Fetch a fine
    ///
    /// # Errors
    ///
    /// Fails if the fine does not exist.
    fn fine(&self, id: FineId) -> Result<Fine>;

    /// The fine derived from a loan, if one was issued
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn fine_for_loan(&self, loan: LoanId) -> Result<Option<Fine>>;

    /// Insert a fine in state `Unpaid` and assign its id
    ///
    /// # Errors
    ///
    /// Fails if the loan does not exist or already has a fine.
    fn insert_fine(&mut self, fine: NewFine) -> Result<Fine>;

    /// Overwrite a fine row
    ///
    /// # Errors
    ///
    /// Fails if the fine does not exist.
    fn update_fine(&mut self, fine: &Fine) -> Result<()>;

    /// Fetch a reservation
    ///
    /// # Errors
    ///
    /// Fails if the reservation does not exist.
    fn reservation(&self, id: ReservationId) -> Result<Reservation>;

    /// Insert a reservation in state `Pending` and assign its id
    ///
    /// # Errors
    ///
    /// Fails if the member or book does not exist.
    fn insert_reservation(&mut self, reservation: NewReservation) -> Result<Reservation>;

    /// Overwrite a reservation row
    ///
    /// # Errors
    ///
    /// Fails if the reservation does not exist.
    fn update_reservation(&mut self, reservation: &Reservation) -> Result<()>;

    /// Every reservation on a book, in id order
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn reservations_for_book(&self, book: BookId) -> Result<Vec<Reservation>>;

    /// Every reservation in a state, in id order
    ///
    /// # Errors
    ///
    /// Fails if the backing store cannot be read.
    fn reservations_in_state(&self, state: ReservationState) -> Result<Vec<Reservation>>;
}
