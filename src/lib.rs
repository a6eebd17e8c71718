//! Loan lifecycle, fine accrual and reservation rules for a library
//! management database.
//!
//! The tables live in an external relational store; this crate enforces the
//! rules the schema implies but cannot express on its own:
//! - loans move `Loaned → Overdue → Returned` and keep `CopiesAvailable` in
//!   step with the copies actually out
//! - overdue loans accrue one fine each, in fixed-point currency
//! - reservations queue FIFO and hold a freed copy until they expire
//!
//! [`LoanLedger`] drives everything through the [`LedgerStore`] trait, so the
//! rules can be tested against [`InMemoryStore`] without a database.

pub mod clock;
pub mod error;
pub mod events;
pub mod ledger;
pub mod observers;
pub mod records;
pub mod schema;
pub mod settings;
pub mod states;
pub mod store;
pub mod visualization;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, Result};
pub use events::LedgerEvent;
pub use ledger::{LoanLedger, RecordedEvent};
pub use settings::LedgerSettings;
pub use states::{FineState, Lifecycle, LoanState, ReservationState};
pub use store::{InMemoryStore, LedgerStore};
pub use visualization::StateVisualization;
