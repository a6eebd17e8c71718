use std::{fs::File, io::Write, path::Path};

use crate::{ledger::RecordedEvent, states::Lifecycle};

/// Visualization tools for the ledger's lifecycles
#[derive(Debug)]
pub struct StateVisualization;

impl StateVisualization {
    /// Generate a textual representation of a lifecycle
    #[must_use]
    pub fn describe<L: Lifecycle>() -> String {
        let mut text = format!("=== {} lifecycle ===\n", L::ENTITY);

        for (idx, state) in L::STATES.iter().enumerate() {
            let marker = if state.is_terminal() { " (terminal)" } else { "" };
            text.push_str(&format!("\nState {idx}: {}{marker}\n", state.as_str()));
            text.push_str(&format!("  {}\n", state.description()));

            let outgoing: Vec<_> = L::ACTIONS
                .iter()
                .filter_map(|action| state.apply(*action).map(|next| (action, next)))
                .collect();
            if outgoing.is_empty() {
                text.push_str("  (No outgoing transitions)\n");
            }
            for (action, next) in outgoing {
                text.push_str(&format!("  --({action:?})--> {}\n", next.as_str()));
            }
        }
        text
    }

    /// Generate a DOT graph representation of a lifecycle, optionally
    /// highlighting one state
    #[must_use]
    pub fn generate_dot<L: Lifecycle>(highlight: Option<L>) -> String {
        let mut dot = format!("digraph {} {{\n", L::ENTITY);
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=circle, style=filled, fillcolor=lightblue];\n");

        // Add states
        for state in L::STATES {
            let name = state.as_str();
            if highlight == Some(*state) {
                dot.push_str(&format!(
                    "  {name} [label=\"{name}\", fillcolor=palegreen, peripheries=2];\n"
                ));
            } else if state.is_terminal() {
                dot.push_str(&format!("  {name} [label=\"{name}\", shape=doublecircle];\n"));
            } else {
                dot.push_str(&format!("  {name} [label=\"{name}\"];\n"));
            }
        }

        // Add transitions
        for state in L::STATES {
            for action in L::ACTIONS {
                if let Some(next) = state.apply(*action) {
                    dot.push_str(&format!(
                        "  {} -> {} [label=\"{action:?}\"];\n",
                        state.as_str(),
                        next.as_str()
                    ));
                }
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// Save the DOT representation to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to
    pub fn save_dot_to_file(dot: &str, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path)?;
        file.write_all(dot.as_bytes())?;
        Ok(())
    }

    /// Generate a markdown table of committed events
    #[must_use]
    pub fn history_table(history: &[RecordedEvent]) -> String {
        if history.is_empty() {
            return "No transitions recorded yet.".to_string();
        }

        let mut table = String::from("| # | Committed | Event |\n");
        table.push_str("|---|-----------|-------|\n");

        for (i, recorded) in (1_usize..).zip(history) {
            table.push_str(&format!(
                "| {i} | {} | {} |\n",
                recorded.committed_at.format("%Y-%m-%d %H:%M"),
                recorded.event.get_description()
            ));
        }

        table
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        events::LedgerEvent,
        records::{FineId, LoanId},
        states::{FineState, LoanState, ReservationState},
    };

    #[test]
    fn test_dot_lists_every_transition() {
        let dot = StateVisualization::generate_dot::<LoanState>(Some(LoanState::Overdue));

        assert!(dot.starts_with("digraph loan {"));
        assert!(dot.contains("  Loaned -> Overdue [label=\"MarkOverdue\"];"));
        assert!(dot.contains("  Overdue -> Returned [label=\"Return\"];"));
        assert!(dot.contains("  Loaned -> Loaned [label=\"Renew\"];"));
        assert!(dot.contains("Overdue [label=\"Overdue\", fillcolor=palegreen"));
        assert!(dot.contains("Returned [label=\"Returned\", shape=doublecircle]"));
        assert!(!dot.contains("Returned -> "));
    }

    #[test]
    fn test_describe_marks_terminal_states() {
        let text = StateVisualization::describe::<ReservationState>();
        assert!(text.contains("State 2: Cancelled (terminal)"));
        assert!(text.contains("  --(Activate)--> Active"));

        let fines = StateVisualization::describe::<FineState>();
        assert_eq!(fines.matches("(No outgoing transitions)").count(), 2);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_history_table() {
        assert_eq!(StateVisualization::history_table(&[]), "No transitions recorded yet.");

        let recorded = RecordedEvent {
            event: LedgerEvent::FineAccrued {
                fine: FineId(3),
                loan: LoanId(7),
                amount: rust_decimal::Decimal::new(150, 2),
            },
            committed_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
        };
        let table = StateVisualization::history_table(&[recorded]);
        assert!(table.ends_with("| 1 | 2024-01-15 09:30 | fine #3 accrued to 1.50 |\n"));
    }
}
