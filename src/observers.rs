use tracing::info;

use crate::events::LedgerEvent;

/// Trait for observing committed ledger transitions
pub trait LedgerObserver {
    /// Called once per event after its transaction commits
    fn on_event(&self, event: &LedgerEvent);
}

/// Logs every committed transition
#[derive(Debug)]
pub struct TransitionLogger;

impl LedgerObserver for TransitionLogger {
    fn on_event(&self, event: &LedgerEvent) {
        info!(target: "loan_ledger::transitions", "{}", event.get_description());
    }
}

/// Sends member-facing notices for the transitions members care about
#[derive(Debug)]
pub struct NotificationService;

impl LedgerObserver for NotificationService {
    fn on_event(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::ReservationActivated { member, book, expires_on, .. } => {
                info!(target: "loan_ledger::notify", %member, "{book} held until {expires_on}");
            }
            LedgerEvent::LoanOverdue { member, loan, due_date } => {
                info!(target: "loan_ledger::notify", %member, "{loan} was due on {due_date}");
            }
            LedgerEvent::FineIssued { member, amount, loan, .. } => {
                info!(target: "loan_ledger::notify", %member, "fine of {amount} for {loan}");
            }
            LedgerEvent::ReservationExpired { member, book, .. } => {
                info!(target: "loan_ledger::notify", %member, "hold on {book} expired");
            }
            _ => {}
        }
    }
}
