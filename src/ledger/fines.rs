//! Fine computation and settlement

use rust_decimal::Decimal;
use tracing::info;

use crate::{
    clock::Clock,
    error::Result,
    events::LedgerEvent,
    records::{Fine, FineId, Loan, MemberId, NewFine},
    states::{FineAction, FineState, Lifecycle},
    store::LedgerStore,
};

use super::LoanLedger;

impl<S: LedgerStore, C: Clock> LoanLedger<S, C> {
    /// Amount owed for a loan: `FinePerDay` for each whole day between the
    /// due date and the return date (or today, while the book is out).
    ///
    /// A loan that is not late owes zero.
    #[must_use]
    pub fn compute_fine(&self, loan: &Loan) -> Decimal {
        let end = loan.return_date.unwrap_or_else(|| self.clock.today());
        let days_late = end.signed_duration_since(loan.due_date).num_days();
        if days_late <= 0 {
            return Decimal::ZERO;
        }
        self.settings.fine_per_day.saturating_mul(Decimal::from(days_late))
    }

    /// Mark an unpaid fine as paid
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` unless the fine is `Unpaid`.
    pub fn pay_fine(&mut self, id: FineId) -> Result<Fine> {
        self.settle(id, FineAction::Pay)
    }

    /// Mark an unpaid fine as waived
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` unless the fine is `Unpaid`.
    pub fn waive_fine(&mut self, id: FineId) -> Result<Fine> {
        self.settle(id, FineAction::Waive)
    }

    /// Total of a member's unpaid fines
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the member does not exist.
    pub fn outstanding_fines(&self, member: MemberId) -> Result<Decimal> {
        self.store.member(member)?;
        let mut total = Decimal::ZERO;
        for loan in self.store.loans_for_member(member)? {
            let unpaid =
                self.store.fine_for_loan(loan.id)?.filter(|fine| fine.state == FineState::Unpaid);
            if let Some(fine) = unpaid {
                total = total.saturating_add(fine.amount);
            }
        }
        Ok(total)
    }

    /// Move a fine out of `Unpaid`
    fn settle(&mut self, id: FineId, action: FineAction) -> Result<Fine> {
        self.in_transaction(|ledger| {
            let mut fine = ledger.store.fine(id)?;
            fine.state = fine.state.transition(fine.id, action)?;
            ledger.store.update_fine(&fine)?;
            ledger.emit(match action {
                FineAction::Pay => LedgerEvent::FinePaid { fine: fine.id, amount: fine.amount },
                FineAction::Waive => LedgerEvent::FineWaived { fine: fine.id, amount: fine.amount },
            });
            info!(fine = %fine.id, state = %fine.state, "fine settled");
            Ok(fine)
        })
    }

    /// Issue a loan's fine, or bring an unpaid one up to date.
    ///
    /// Paid and waived fines are left alone; a loan that owes nothing gets no
    /// fine row.
    pub(super) fn assess_fine(&mut self, loan: &Loan) -> Result<Option<Fine>> {
        let amount = self.compute_fine(loan);
        match self.store.fine_for_loan(loan.id)? {
            None if amount.is_zero() => Ok(None),
            None => {
                let fine = self.store.insert_fine(NewFine {
                    loan_id: loan.id,
                    amount,
                    issued_on: self.clock.today(),
                })?;
                self.emit(LedgerEvent::FineIssued {
                    fine: fine.id,
                    loan: loan.id,
                    member: loan.member_id,
                    amount,
                });
                Ok(Some(fine))
            }
            Some(mut fine) if fine.state == FineState::Unpaid && fine.amount != amount => {
                fine.amount = amount;
                self.store.update_fine(&fine)?;
                self.emit(LedgerEvent::FineAccrued { fine: fine.id, loan: loan.id, amount });
                Ok(Some(fine))
            }
            Some(fine) => Ok(Some(fine)),
        }
    }
}
