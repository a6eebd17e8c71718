use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::{LedgerError, Result},
    events::LedgerEvent,
    observers::LedgerObserver,
    records::Book,
    settings::LedgerSettings,
    states::ReservationState,
    store::LedgerStore,
};

mod fines;
mod loans;
mod reservations;

/// A committed event and when it was committed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordedEvent {
    /// What happened
    pub event: LedgerEvent,
    /// When the transaction that produced it committed
    pub committed_at: DateTime<Utc>,
}

/// Enforces the loan, fine and reservation rules over a [`LedgerStore`].
///
/// Every public operation runs in one store transaction. If the operation
/// fails, its writes are rolled back and none of its events are recorded.
/// Operations take `&mut self`, so a ledger value is the single writer for
/// its store; share it across threads behind a mutex.
pub struct LoanLedger<S, C = SystemClock> {
    /// Row access
    store: S,
    /// Settings read by every operation
    settings: LedgerSettings,
    /// Source of "today"
    clock: C,
    /// Events raised by the open transaction
    pending: Vec<LedgerEvent>,
    /// Committed events, oldest first
    history: VecDeque<RecordedEvent>,
    /// Maximum number of history entries to keep
    max_history_size: usize,
    /// Registered observers
    observers: Vec<Box<dyn LedgerObserver>>,
}

// Manual implementation of Debug for LoanLedger
impl<S: fmt::Debug, C: fmt::Debug> fmt::Debug for LoanLedger<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoanLedger")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .field("pending", &self.pending)
            .field("history", &self.history)
            .field("max_history_size", &self.max_history_size)
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl<S: LedgerStore, C: Clock> LoanLedger<S, C> {
    /// Create a ledger with no observers
    #[must_use]
    pub fn new(store: S, settings: LedgerSettings, clock: C) -> Self {
        Self {
            store,
            settings,
            clock,
            pending: Vec::new(),
            history: VecDeque::new(),
            max_history_size: 100,
            observers: Vec::new(),
        }
    }

    /// Register an observer to be notified of committed events
    pub fn register_observer(&mut self, observer: Box<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    /// Change how many committed events are kept
    pub fn set_max_history_size(&mut self, size: usize) {
        self.max_history_size = size;
        while self.history.len() > size {
            self.history.pop_front();
        }
    }

    /// The settings in force
    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// The clock the ledger reads
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Read access to the store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. to persist it
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Committed events, oldest first
    #[must_use]
    pub fn history(&self) -> &VecDeque<RecordedEvent> {
        &self.history
    }

    /// Run `op` inside a store transaction.
    ///
    /// Events raised by `op` reach history and observers only after commit.
    fn in_transaction<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.store.begin()?;
        match op(self) {
            Ok(value) => {
                if let Err(e) = self.store.commit() {
                    self.pending.clear();
                    return Err(e);
                }
                self.publish();
                Ok(value)
            }
            Err(e) => {
                self.pending.clear();
                warn!(error = %e, "rolling back ledger operation");
                if let Err(rollback) = self.store.rollback() {
                    error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Queue an event for the open transaction
    fn emit(&mut self, event: LedgerEvent) {
        self.pending.push(event);
    }

    /// Move committed events into history and notify observers
    fn publish(&mut self) {
        let committed_at = self.clock.now();
        for event in std::mem::take(&mut self.pending) {
            for observer in &self.observers {
                observer.on_event(&event);
            }
            self.history.push_back(RecordedEvent { event, committed_at });
            if self.history.len() > self.max_history_size {
                self.history.pop_front();
            }
        }
    }

    /// `days` after `from`
    fn days_after(from: NaiveDate, days: u32) -> Result<NaiveDate> {
        from.checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                LedgerError::Inconsistent(format!("{from} + {days} days is out of range"))
            })
    }

    /// Copies on the shelf that are not held for an active reservation
    fn free_copies(&self, book: &Book) -> Result<u32> {
        let held = self
            .store
            .reservations_for_book(book.id)?
            .iter()
            .filter(|reservation| reservation.state == ReservationState::Active)
            .count();
        Ok(book.copies_available.saturating_sub(u32::try_from(held).unwrap_or(u32::MAX)))
    }
}
