//! Loan ledger CLI
//!
//! Prints the schema and lifecycle diagrams, runs a scripted lending demo, and
//! runs the periodic overdue and reservation-expiry scans over a JSON snapshot.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use loan_ledger::{
    Clock, FineState, InMemoryStore, LedgerSettings, LedgerStore, LoanLedger, LoanState,
    ManualClock, ReservationState, Result, StateVisualization, SystemClock,
    observers::{NotificationService, TransitionLogger},
    records::{Book, BookId, Member, MemberId},
    schema,
};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the loan ledger
#[derive(Parser, Debug)]
#[command(name = "loan-ledger", author, version, about, long_about = None)]
struct Cli {
    /// What to do
    #[command(subcommand)]
    command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the DDL and the settings seed rows
    Schema,

    /// Show the states and transitions of a lifecycle
    Diagram {
        /// Which lifecycle to show
        #[arg(value_enum)]
        entity: Entity,
        /// Emit Graphviz DOT instead of text
        #[arg(long)]
        dot: bool,
        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a scripted lending scenario against an in-memory store
    Demo,

    /// Run the overdue and reservation-expiry scans over a snapshot file
    Scan {
        /// JSON snapshot to scan; rewritten in place
        #[arg(short, long)]
        store: PathBuf,
        /// Scan as of this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Settings file layered under `LEDGER_*` variables
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Lifecycles that can be drawn
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Entity {
    /// `BookLoans.Status`
    Loan,
    /// `Fines.Status`
    Fine,
    /// `BookReservations.Status`
    Reservation,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Schema => {
            print!("{}", schema::script());
            Ok(())
        }
        Command::Diagram { entity, dot, output } => diagram(entity, dot, output),
        Command::Demo => demo(),
        Command::Scan { store, today, config } => scan(&store, today, config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Render one lifecycle
fn diagram(entity: Entity, dot: bool, output: Option<PathBuf>) -> Result<()> {
    let rendered = match (entity, dot) {
        (Entity::Loan, true) => StateVisualization::generate_dot::<LoanState>(None),
        (Entity::Loan, false) => StateVisualization::describe::<LoanState>(),
        (Entity::Fine, true) => StateVisualization::generate_dot::<FineState>(None),
        (Entity::Fine, false) => StateVisualization::describe::<FineState>(),
        (Entity::Reservation, true) => StateVisualization::generate_dot::<ReservationState>(None),
        (Entity::Reservation, false) => StateVisualization::describe::<ReservationState>(),
    };
    match output {
        Some(path) => {
            StateVisualization::save_dot_to_file(&rendered, &path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Load a snapshot, run both scans, and save it back
fn scan(path: &Path, today: Option<NaiveDate>, config: Option<PathBuf>) -> Result<()> {
    let settings = LedgerSettings::load(config.as_deref())?;
    let store = InMemoryStore::load_from_file(path)?;
    let store = match today {
        Some(day) => run_scans(store, settings, ManualClock::on(day))?,
        None => run_scans(store, settings, SystemClock)?,
    };
    store.save_to_file(path)
}

/// Run `mark_overdue` then `expire_reservations` on one ledger
fn run_scans<C: Clock>(
    store: InMemoryStore,
    settings: LedgerSettings,
    clock: C,
) -> Result<InMemoryStore> {
    let mut ledger = LoanLedger::new(store, settings, clock);
    ledger.register_observer(Box::new(TransitionLogger));
    ledger.register_observer(Box::new(NotificationService));

    let overdue = ledger.mark_overdue()?;
    let expired = ledger.expire_reservations()?;
    println!(
        "{} {} newly overdue, {} reservations expired (as of {})",
        "Scan complete:".green().bold(),
        overdue.len(),
        expired.len(),
        ledger.clock().today()
    );
    Ok(ledger.into_store())
}

/// Walk through borrowing, reserving, late return, fines and expiry
fn demo() -> Result<()> {
    println!("{}", "Loan Ledger Demonstration".green().bold());
    println!("=====================================\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let mut store = InMemoryStore::new();
    let people = [(1, "Ada", "Lovelace"), (2, "Grace", "Hopper"), (3, "Alan", "Turing")];
    for (id, first, last) in people {
        let email = format!("{}@example.org", first.to_lowercase());
        store.add_member(Member::new(MemberId(id), first, last, &email, start));
    }
    store.add_book(Book::new(BookId(1), "The Art of Computer Programming", 1))?;
    store.add_book(Book::new(BookId(2), "Structure and Interpretation of Computer Programs", 2))?;

    let settings = LedgerSettings { default_loan_duration: 9, ..LedgerSettings::default() };
    let mut ledger = LoanLedger::new(store, settings, ManualClock::on(start));
    ledger.register_observer(Box::new(TransitionLogger));
    ledger.register_observer(Box::new(NotificationService));

    println!("{}", "\n1. Ada borrows the only copy of TAOCP".yellow().bold());
    let loan = ledger.create_loan(MemberId(1), BookId(1))?;
    println!("   due back on {}", loan.due_date);

    println!("{}", "\n2. Grace tries to borrow it, then reserves".yellow().bold());
    if let Err(e) = ledger.create_loan(MemberId(2), BookId(1)) {
        println!("   {} {e}", "refused:".red());
    }
    ledger.reserve(MemberId(2), BookId(1))?;
    ledger.reserve(MemberId(3), BookId(1))?;

    println!("{}", "\n3. The nightly scan on 2024-01-12 finds the loan overdue".yellow().bold());
    ledger.clock().advance_days(11);
    ledger.mark_overdue()?;
    println!("   Ada owes {}", ledger.outstanding_fines(MemberId(1))?);

    println!("{}", "\n4. Ada returns the book on 2024-01-15".yellow().bold());
    ledger.clock().advance_days(3);
    ledger.return_loan(loan.id)?;
    println!("   Ada owes {}", ledger.outstanding_fines(MemberId(1))?);
    if let Some(fine) = ledger.store().fine_for_loan(loan.id)? {
        ledger.pay_fine(fine.id)?;
        println!("   fine paid");
    }

    println!("{}", "\n5. Grace never collects; her hold expires".yellow().bold());
    ledger.clock().advance_days(8);
    let expired = ledger.expire_reservations()?;
    println!("   {} reservation(s) expired, next in line is notified", expired.len());

    println!("{}", "\n6. Alan collects the held copy".yellow().bold());
    ledger.create_loan(MemberId(3), BookId(1))?;
    ledger.audit_book(BookId(1))?;
    println!("   copies still consistent with loans");

    let history: Vec<_> = ledger.history().iter().cloned().collect();
    println!("\n{}", StateVisualization::history_table(&history));
    println!("\n{}", "Demonstration complete!".green().bold());
    Ok(())
}
