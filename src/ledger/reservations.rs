//! Reservation queue and fulfillment

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::{
    clock::Clock,
    error::{LedgerError, Result},
    events::LedgerEvent,
    records::{BookId, MemberId, NewReservation, Reservation, ReservationId},
    states::{Lifecycle, ReservationAction, ReservationState},
    store::LedgerStore,
};

use super::LoanLedger;

impl<S: LedgerStore, C: Clock> LoanLedger<S, C> {
    /// Queue `member` for `book`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::State` if a copy is free (the member should
    /// borrow it), the member already has the book on loan, or the member
    /// already has an open reservation on the book.
    pub fn reserve(&mut self, member: MemberId, book: BookId) -> Result<Reservation> {
        self.in_transaction(|ledger| {
            ledger.store.member(member)?;
            let row = ledger.store.book(book)?;
            if ledger.free_copies(&row)? > 0 {
                return Err(LedgerError::state(format!(
                    "{book} has copies available; borrow it instead of reserving"
                )));
            }
            let borrowed = ledger
                .store
                .loans_for_member(member)?
                .iter()
                .any(|loan| loan.book_id == book && loan.state.is_active());
            if borrowed {
                return Err(LedgerError::state(format!("{member} already has {book} on loan")));
            }
            let duplicate = ledger
                .store
                .reservations_for_book(book)?
                .iter()
                .any(|reservation| reservation.member_id == member && reservation.state.is_open());
            if duplicate {
                return Err(LedgerError::state(format!(
                    "{member} already has an open reservation on {book}"
                )));
            }

            let reservation = ledger.store.insert_reservation(NewReservation {
                member_id: member,
                book_id: book,
                reservation_date: ledger.clock.now(),
            })?;
            ledger.emit(LedgerEvent::ReservationPlaced {
                reservation: reservation.id,
                member,
                book,
            });
            info!(reservation = %reservation.id, %member, %book, "reservation placed");
            Ok(reservation)
        })
    }

    /// Hold a free copy of `book` for the oldest pending reservation.
    ///
    /// Returns `None` when no copy is free or nobody is waiting.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the book does not exist.
    pub fn activate_next_reservation(&mut self, book: BookId) -> Result<Option<Reservation>> {
        self.in_transaction(|ledger| ledger.activate_next(book))
    }

    /// Cancel every active reservation whose hold has run out, handing each
    /// freed copy to the next reservation in line.
    ///
    /// Safe to re-run. Returns the reservations cancelled by this run.
    ///
    /// # Errors
    ///
    /// Returns any store error; the whole scan is rolled back.
    pub fn expire_reservations(&mut self) -> Result<Vec<ReservationId>> {
        self.in_transaction(|ledger| {
            let today = ledger.clock.today();
            let mut expired = Vec::new();
            let mut books = BTreeSet::new();

            for mut reservation in ledger.store.reservations_in_state(ReservationState::Active)? {
                if !reservation.expires_on.is_some_and(|last_day| last_day < today) {
                    continue;
                }
                reservation.state =
                    reservation.state.transition(reservation.id, ReservationAction::Expire)?;
                ledger.store.update_reservation(&reservation)?;
                ledger.emit(LedgerEvent::ReservationExpired {
                    reservation: reservation.id,
                    member: reservation.member_id,
                    book: reservation.book_id,
                });
                expired.push(reservation.id);
                books.insert(reservation.book_id);
            }

            for book in books {
                ledger.activate_waiting(book)?;
            }

            debug!(expired = expired.len(), %today, "reservation expiry scan finished");
            Ok(expired)
        })
    }

    /// Withdraw a pending or active reservation
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` if the reservation is already
    /// cancelled or completed.
    pub fn cancel_reservation(&mut self, id: ReservationId) -> Result<Reservation> {
        self.in_transaction(|ledger| {
            let mut reservation = ledger.store.reservation(id)?;
            let held_copy = reservation.state == ReservationState::Active;
            reservation.state =
                reservation.state.transition(reservation.id, ReservationAction::Cancel)?;
            ledger.store.update_reservation(&reservation)?;
            ledger.emit(LedgerEvent::ReservationCancelled {
                reservation: reservation.id,
                member: reservation.member_id,
                book: reservation.book_id,
            });
            if held_copy {
                ledger.activate_waiting(reservation.book_id)?;
            }
            Ok(reservation)
        })
    }

    /// Activate reservations on `book` until no copy is free or the queue is
    /// empty
    pub(super) fn activate_waiting(&mut self, book: BookId) -> Result<Vec<Reservation>> {
        let mut activated = Vec::new();
        while let Some(reservation) = self.activate_next(book)? {
            activated.push(reservation);
        }
        Ok(activated)
    }

    /// Activate the head of `book`'s queue if a copy is free
    fn activate_next(&mut self, book: BookId) -> Result<Option<Reservation>> {
        let row = self.store.book(book)?;
        if self.free_copies(&row)? == 0 {
            return Ok(None);
        }
        let next = self
            .store
            .reservations_for_book(book)?
            .into_iter()
            .filter(|reservation| reservation.state == ReservationState::Pending)
            .min_by_key(|reservation| (reservation.reservation_date, reservation.id));
        let Some(mut reservation) = next else {
            return Ok(None);
        };

        let today = self.clock.today();
        reservation.state =
            reservation.state.transition(reservation.id, ReservationAction::Activate)?;
        reservation.activated_on = Some(today);
        let expires_on = Self::days_after(today, self.settings.reservation_expiry_days)?;
        reservation.expires_on = Some(expires_on);
        self.store.update_reservation(&reservation)?;
        self.emit(LedgerEvent::ReservationActivated {
            reservation: reservation.id,
            member: reservation.member_id,
            book,
            expires_on,
        });
        Ok(Some(reservation))
    }
}
