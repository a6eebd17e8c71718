//! Loan lifecycle operations

use tracing::{debug, info};

use crate::{
    clock::Clock,
    error::{LedgerError, Result},
    events::LedgerEvent,
    records::{BookId, Loan, LoanId, MemberId, NewLoan},
    states::{Lifecycle, LoanAction, LoanState, ReservationAction, ReservationState},
    store::LedgerStore,
};

use super::LoanLedger;

impl<S: LedgerStore, C: Clock> LoanLedger<S, C> {
    /// Lend a copy of `book` to `member`.
    ///
    /// A member holding an open reservation on the book completes it by
    /// borrowing; an active reservation also lets them take its held copy.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Capacity` if the member already holds `MaxBookLoans`
    ///   active loans
    /// - `LedgerError::Unavailable` if no copy is free for this member
    /// - `LedgerError::NotFound` if the member or book does not exist
    pub fn create_loan(&mut self, member: MemberId, book: BookId) -> Result<Loan> {
        self.in_transaction(|ledger| {
            ledger.store.member(member)?;
            let mut row = ledger.store.book(book)?;

            let limit = ledger.settings.max_book_loans;
            let active = ledger
                .store
                .loans_for_member(member)?
                .iter()
                .filter(|loan| loan.state.is_active())
                .count();
            if active >= usize::try_from(limit).unwrap_or(usize::MAX) {
                return Err(LedgerError::Capacity { member, limit });
            }

            let mut open: Vec<_> = ledger
                .store
                .reservations_for_book(book)?
                .into_iter()
                .filter(|reservation| {
                    reservation.member_id == member && reservation.state.is_open()
                })
                .collect();
            let holds_copy =
                open.iter().any(|reservation| reservation.state == ReservationState::Active);
            if row.copies_available == 0 || (!holds_copy && ledger.free_copies(&row)? == 0) {
                return Err(LedgerError::Unavailable { book });
            }

            let today = ledger.clock.today();
            let due_date = Self::days_after(today, ledger.settings.default_loan_duration)?;
            row.copies_available = row.copies_available.saturating_sub(1);
            ledger.store.update_book(&row)?;
            let loan = ledger.store.insert_loan(NewLoan {
                member_id: member,
                book_id: book,
                loan_date: today,
                due_date,
            })?;
            ledger.emit(LedgerEvent::LoanCreated { loan: loan.id, member, book, due_date });

            for reservation in &mut open {
                reservation.state =
                    reservation.state.transition(reservation.id, ReservationAction::Complete)?;
                ledger.store.update_reservation(reservation)?;
                ledger.emit(LedgerEvent::ReservationCompleted {
                    reservation: reservation.id,
                    member,
                    loan: loan.id,
                });
            }

            info!(loan = %loan.id, %member, %book, %due_date, "loan created");
            Ok(loan)
        })
    }

    /// Take a book back.
    ///
    /// A loan returned after its due date passes through `Overdue` and its
    /// fine is settled at the final amount. The freed copy goes to the next
    /// waiting reservation, if any.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidState` if the loan was already returned
    /// - `LedgerError::Inconsistent` if the book already has every copy on
    ///   the shelf
    pub fn return_loan(&mut self, id: LoanId) -> Result<Loan> {
        self.in_transaction(|ledger| {
            let mut loan = ledger.store.loan(id)?;
            let today = ledger.clock.today();
            let late = today > loan.due_date;

            if late && loan.state == LoanState::Loaned {
                loan.state = loan.state.transition(loan.id, LoanAction::MarkOverdue)?;
                ledger.emit(LedgerEvent::LoanOverdue {
                    loan: loan.id,
                    member: loan.member_id,
                    due_date: loan.due_date,
                });
            }
            loan.state = loan.state.transition(loan.id, LoanAction::Return)?;
            loan.return_date = Some(today);
            ledger.store.update_loan(&loan)?;

            let mut book = ledger.store.book(loan.book_id)?;
            book.copies_available = book
                .copies_available
                .checked_add(1)
                .filter(|copies| *copies <= book.total_copies)
                .ok_or_else(|| {
                    LedgerError::Inconsistent(format!("{} has no copies out to return", book.id))
                })?;
            ledger.store.update_book(&book)?;
            ledger.emit(LedgerEvent::LoanReturned {
                loan: loan.id,
                member: loan.member_id,
                book: book.id,
                returned_on: today,
            });

            if late {
                ledger.assess_fine(&loan)?;
            }
            ledger.activate_waiting(book.id)?;

            info!(loan = %loan.id, late, "loan returned");
            Ok(loan)
        })
    }

    /// Push a loan's due date back by `DefaultLoanDuration`
    ///
    /// A loan past its due date counts as overdue even if no scan has
    /// flagged it yet.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidState` unless the loan is `Loaned` and not yet
    ///   past due
    /// - `LedgerError::State` while other members wait for the book
    pub fn renew_loan(&mut self, id: LoanId) -> Result<Loan> {
        self.in_transaction(|ledger| {
            let mut loan = ledger.store.loan(id)?;
            let past_due = loan.due_date < ledger.clock.today();
            let current = if past_due && loan.state == LoanState::Loaned {
                LoanState::Overdue
            } else {
                loan.state
            };
            loan.state = current.transition(loan.id, LoanAction::Renew)?;

            let waiting = ledger
                .store
                .reservations_for_book(loan.book_id)?
                .iter()
                .any(|reservation| reservation.state == ReservationState::Pending);
            if waiting {
                return Err(LedgerError::state(format!(
                    "{} cannot be renewed while {} has pending reservations",
                    loan.id, loan.book_id
                )));
            }

            loan.due_date = Self::days_after(loan.due_date, ledger.settings.default_loan_duration)?;
            ledger.store.update_loan(&loan)?;
            ledger.emit(LedgerEvent::LoanRenewed {
                loan: loan.id,
                member: loan.member_id,
                due_date: loan.due_date,
            });
            Ok(loan)
        })
    }

    /// Flag every loan that is past its due date and charge its fine.
    ///
    /// Safe to re-run: a loan is flagged once, and each overdue loan keeps a
    /// single fine whose amount is brought up to date on every run. Returns
    /// the loans flagged by this run.
    ///
    /// # Errors
    ///
    /// Returns any store error; the whole scan is rolled back.
    pub fn mark_overdue(&mut self) -> Result<Vec<LoanId>> {
        self.in_transaction(|ledger| {
            let today = ledger.clock.today();

            for loan in ledger.store.loans_in_state(LoanState::Overdue)? {
                ledger.assess_fine(&loan)?;
            }

            let mut flagged = Vec::new();
            for mut loan in ledger.store.loans_in_state(LoanState::Loaned)? {
                if loan.due_date >= today {
                    continue;
                }
                loan.state = loan.state.transition(loan.id, LoanAction::MarkOverdue)?;
                ledger.store.update_loan(&loan)?;
                ledger.emit(LedgerEvent::LoanOverdue {
                    loan: loan.id,
                    member: loan.member_id,
                    due_date: loan.due_date,
                });
                ledger.assess_fine(&loan)?;
                flagged.push(loan.id);
            }

            debug!(flagged = flagged.len(), %today, "overdue scan finished");
            Ok(flagged)
        })
    }

    /// Check that a book's available copies match its outstanding loans
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Inconsistent` describing the mismatch.
    pub fn audit_book(&self, book: BookId) -> Result<()> {
        let row = self.store.book(book)?;
        let out =
            self.store.loans_for_book(book)?.iter().filter(|loan| loan.state.is_active()).count();
        let expected = usize::try_from(row.total_copies)
            .unwrap_or(usize::MAX)
            .checked_sub(out)
            .ok_or_else(|| {
                LedgerError::Inconsistent(format!(
                    "{book} has {out} copies out but owns {}",
                    row.total_copies
                ))
            })?;
        if usize::try_from(row.copies_available).ok() != Some(expected) {
            return Err(LedgerError::Inconsistent(format!(
                "{book} shows {} copies available, loans imply {expected}",
                row.copies_available
            )));
        }
        Ok(())
    }
}
