use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// A status column modelled as a closed state machine
pub trait Lifecycle: Copy + PartialEq + fmt::Debug + 'static {
    /// The actions that move an entity between states
    type Action: Copy + PartialEq + fmt::Debug + 'static;

    /// Entity name used in diagrams and errors
    const ENTITY: &'static str;

    /// Every state, in declaration order
    const STATES: &'static [Self];

    /// Every action, in declaration order
    const ACTIONS: &'static [Self::Action];

    /// The state reached by applying `action`, or `None` if it is not allowed
    fn apply(self, action: Self::Action) -> Option<Self>;

    /// Name stored in the status column
    fn as_str(self) -> &'static str;

    /// Human-readable description of the state
    fn description(self) -> &'static str;

    /// A state no action can leave
    fn is_terminal(self) -> bool {
        Self::ACTIONS.iter().all(|action| self.apply(*action).is_none_or(|next| next == self))
    }

    /// Apply `action` or report why it is not allowed
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` if `action` is not defined for
    /// the current state.
    fn transition(self, entity: impl fmt::Display, action: Self::Action) -> Result<Self> {
        self.apply(action).ok_or_else(|| LedgerError::InvalidState {
            entity: entity.to_string(),
            state: self.as_str(),
            action: format!("{action:?}").to_lowercase(),
        })
    }
}

/// Parse a status column value into a lifecycle state
fn parse_status<L: Lifecycle>(value: &str) -> Result<L> {
    L::STATES
        .iter()
        .copied()
        .find(|state| state.as_str() == value)
        .ok_or_else(|| LedgerError::UnknownStatus { kind: L::ENTITY, value: value.to_string() })
}

/// State of a book loan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LoanState {
    /// The member has the book and it is not yet late
    #[default]
    Loaned,
    /// The due date has passed and the book is still out
    Overdue,
    /// The book is back; terminal
    Returned,
}

/// Actions on a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LoanAction {
    /// The due date passed without a return
    MarkOverdue,
    /// Extend the due date
    Renew,
    /// The book came back
    Return,
}

impl LoanState {
    /// Loaned and overdue loans both hold a copy
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loaned | Self::Overdue)
    }
}

impl Lifecycle for LoanState {
    type Action = LoanAction;

    const ENTITY: &'static str = "loan";
    const STATES: &'static [Self] = &[Self::Loaned, Self::Overdue, Self::Returned];
    const ACTIONS: &'static [LoanAction] =
        &[LoanAction::MarkOverdue, LoanAction::Renew, LoanAction::Return];

    fn apply(self, action: LoanAction) -> Option<Self> {
        match (self, action) {
            (Self::Loaned, LoanAction::MarkOverdue) => Some(Self::Overdue),
            (Self::Loaned, LoanAction::Renew) => Some(Self::Loaned),
            (Self::Loaned | Self::Overdue, LoanAction::Return) => Some(Self::Returned),
            (Self::Overdue, LoanAction::MarkOverdue | LoanAction::Renew) | (Self::Returned, _) => {
                None
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Loaned => "Loaned",
            Self::Overdue => "Overdue",
            Self::Returned => "Returned",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Loaned => "Book is out on loan",
            Self::Overdue => "Book is out past its due date",
            Self::Returned => "Book has been returned",
        }
    }
}

/// State of a fine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FineState {
    /// Owed
    #[default]
    Unpaid,
    /// Settled by the member
    Paid,
    /// Forgiven by staff
    Waived,
}

/// Actions on a fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FineAction {
    /// The member paid
    Pay,
    /// Staff forgave the fine
    Waive,
}

impl Lifecycle for FineState {
    type Action = FineAction;

    const ENTITY: &'static str = "fine";
    const STATES: &'static [Self] = &[Self::Unpaid, Self::Paid, Self::Waived];
    const ACTIONS: &'static [FineAction] = &[FineAction::Pay, FineAction::Waive];

    fn apply(self, action: FineAction) -> Option<Self> {
        match (self, action) {
            (Self::Unpaid, FineAction::Pay) => Some(Self::Paid),
            (Self::Unpaid, FineAction::Waive) => Some(Self::Waived),
            (Self::Paid | Self::Waived, _) => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
            Self::Waived => "Waived",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Unpaid => "Fine is outstanding",
            Self::Paid => "Fine has been paid",
            Self::Waived => "Fine has been waived",
        }
    }
}

/// State of a reservation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ReservationState {
    /// Waiting in the queue for a copy
    #[default]
    Pending,
    /// A copy is held for the member until the expiry date
    Active,
    /// Withdrawn or expired
    Cancelled,
    /// The member borrowed the book
    Completed,
}

/// Actions on a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ReservationAction {
    /// A copy became free for the head of the queue
    Activate,
    /// The hold ran past its expiry date
    Expire,
    /// The member withdrew
    Cancel,
    /// The member borrowed the book
    Complete,
}

impl ReservationState {
    /// Pending and active reservations are still waiting to be fulfilled
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl Lifecycle for ReservationState {
    type Action = ReservationAction;

    const ENTITY: &'static str = "reservation";
    const STATES: &'static [Self] =
        &[Self::Pending, Self::Active, Self::Cancelled, Self::Completed];
    const ACTIONS: &'static [ReservationAction] = &[
        ReservationAction::Activate,
        ReservationAction::Expire,
        ReservationAction::Cancel,
        ReservationAction::Complete,
    ];

    fn apply(self, action: ReservationAction) -> Option<Self> {
        match (self, action) {
            (Self::Pending, ReservationAction::Activate) => Some(Self::Active),
            (Self::Active, ReservationAction::Expire)
            | (Self::Pending | Self::Active, ReservationAction::Cancel) => Some(Self::Cancelled),
            (Self::Pending | Self::Active, ReservationAction::Complete) => Some(Self::Completed),
            (Self::Pending, ReservationAction::Expire)
            | (Self::Active, ReservationAction::Activate)
            | (Self::Cancelled | Self::Completed, _) => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Pending => "Member is waiting for a copy",
            Self::Active => "A copy is held for the member",
            Self::Cancelled => "Reservation was cancelled or expired",
            Self::Completed => "Member borrowed the reserved book",
        }
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s)
    }
}

impl FromStr for FineState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s)
    }
}

impl FromStr for ReservationState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_transitions() {
        assert_eq!(LoanState::Loaned.apply(LoanAction::MarkOverdue), Some(LoanState::Overdue));
        assert_eq!(LoanState::Overdue.apply(LoanAction::Return), Some(LoanState::Returned));
        assert_eq!(LoanState::Overdue.apply(LoanAction::Renew), None);
        assert_eq!(LoanState::Returned.apply(LoanAction::Return), None);
        assert!(LoanState::Returned.is_terminal());
        assert!(!LoanState::Loaned.is_terminal());
    }

    #[test]
    fn test_fine_only_leaves_unpaid() {
        assert_eq!(FineState::Unpaid.apply(FineAction::Waive), Some(FineState::Waived));
        for state in [FineState::Paid, FineState::Waived] {
            for action in FineState::ACTIONS {
                assert_eq!(state.apply(*action), None);
            }
        }
    }

    #[test]
    fn test_reservation_terminal_states() {
        let terminal: Vec<_> =
            ReservationState::STATES.iter().filter(|state| state.is_terminal()).collect();
        assert_eq!(terminal, [&ReservationState::Cancelled, &ReservationState::Completed]);
        assert_eq!(ReservationState::Pending.apply(ReservationAction::Expire), None);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_invalid_transition_error() {
        let err = LoanState::Returned
            .transition("loan #4", LoanAction::Return)
            .expect_err("returned loans cannot be returned again");
        assert!(matches!(
            err,
            LedgerError::InvalidState { ref entity, state: "Returned", ref action }
                if entity == "loan #4" && action == "return"
        ));
    }

    #[test]
    fn test_status_column_parsing() {
        assert!(matches!("Overdue".parse::<LoanState>(), Ok(LoanState::Overdue)));
        assert!(matches!("Waived".parse::<FineState>(), Ok(FineState::Waived)));
        assert!(matches!(
            "On hold".parse::<ReservationState>(),
            Err(LedgerError::UnknownStatus { kind: "reservation", .. })
        ));
    }
}
