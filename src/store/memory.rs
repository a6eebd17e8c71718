//! In-memory table storage with snapshot rollback and JSON files

use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{LedgerError, Result},
    records::{
        Author, AuthorId, Book, BookId, Fine, FineId, Loan, LoanId, Member, MemberId, NewFine,
        NewLoan, NewReservation, Reservation, ReservationId, RowId,
    },
    states::{FineState, LoanState, ReservationState},
    store::LedgerStore,
};

/// The rows held by an [`InMemoryStore`]
#[derive(Debug, Clone, Default)]
struct Tables {
    /// `Members`
    members: BTreeMap<MemberId, Member>,
    /// `Authors`
    authors: BTreeMap<AuthorId, Author>,
    /// `Books`
    books: BTreeMap<BookId, Book>,
    /// `BookLoans`
    loans: BTreeMap<LoanId, Loan>,
    /// `Fines`
    fines: BTreeMap<FineId, Fine>,
    /// `BookReservations`
    reservations: BTreeMap<ReservationId, Reservation>,
}

/// Serializable representation of the store contents
#[derive(Debug, Default, Deserialize, Serialize)]
struct Snapshot {
    /// `Members` rows
    members: Vec<Member>,
    /// `Authors` rows
    #[serde(default)]
    authors: Vec<Author>,
    /// `Books` rows
    books: Vec<Book>,
    /// `BookLoans` rows
    #[serde(default)]
    loans: Vec<Loan>,
    /// `Fines` rows
    #[serde(default)]
    fines: Vec<Fine>,
    /// `BookReservations` rows
    #[serde(default)]
    reservations: Vec<Reservation>,
}

/// A [`LedgerStore`] that keeps every table in memory.
///
/// A transaction snapshots all tables on `begin`; `rollback` restores the
/// snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Live rows
    tables: Tables,
    /// Rows as they were when the open transaction began
    savepoint: Option<Tables>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Add or replace a member
    pub fn add_member(&mut self, member: Member) {
        self.tables.members.insert(member.id, member);
    }

    /// Add or replace an author
    pub fn add_author(&mut self, author: Author) {
        self.tables.authors.insert(author.id, author);
    }

    /// Add or replace a book
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Inconsistent` if more copies are available than
    /// the library owns, or `LedgerError::NotFound` if the linked author is
    /// missing.
    pub fn add_book(&mut self, book: Book) -> Result<()> {
        check_copies(&book)?;
        let missing = book.author_id.filter(|author| !self.tables.authors.contains_key(author));
        if let Some(author) = missing {
            return Err(LedgerError::not_found(author));
        }
        self.tables.books.insert(book.id, book);
        Ok(())
    }

    /// Every member, in id order
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.tables.members.values()
    }

    /// Every book, in id order
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.tables.books.values()
    }

    /// Every loan, in id order
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.tables.loans.values()
    }

    /// Every fine, in id order
    pub fn fines(&self) -> impl Iterator<Item = &Fine> {
        self.tables.fines.values()
    }

    /// Every reservation, in id order
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.tables.reservations.values()
    }

    /// Save the store contents to a JSON file
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Transaction` while a transaction is open, or an
    /// IO or JSON error if the file cannot be written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if self.in_transaction() {
            return Err(LedgerError::Transaction(
                "cannot save while a transaction is open".to_string(),
            ));
        }
        let tables = &self.tables;
        let snapshot = Snapshot {
            members: tables.members.values().cloned().collect(),
            authors: tables.authors.values().cloned().collect(),
            books: tables.books.values().cloned().collect(),
            loans: tables.loans.values().cloned().collect(),
            fines: tables.fines.values().cloned().collect(),
            reservations: tables.reservations.values().cloned().collect(),
        };
        let serialized = serde_json::to_string_pretty(&snapshot)?;

        info!(path = %path.display(), "saving ledger snapshot");
        let mut file = File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    /// Load a store from a JSON file written by [`save_to_file`](Self::save_to_file)
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error if the file cannot be read, or
    /// `LedgerError::Inconsistent` if a book has more copies available than
    /// it owns.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading ledger snapshot");
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;

        for book in &snapshot.books {
            check_copies(book)?;
        }
        let tables = Tables {
            members: snapshot.members.into_iter().map(|row| (row.id, row)).collect(),
            authors: snapshot.authors.into_iter().map(|row| (row.id, row)).collect(),
            books: snapshot.books.into_iter().map(|row| (row.id, row)).collect(),
            loans: snapshot.loans.into_iter().map(|row| (row.id, row)).collect(),
            fines: snapshot.fines.into_iter().map(|row| (row.id, row)).collect(),
            reservations: snapshot.reservations.into_iter().map(|row| (row.id, row)).collect(),
        };
        debug!(books = tables.books.len(), loans = tables.loans.len(), "snapshot loaded");
        Ok(Self { tables, savepoint: None })
    }
}

impl LedgerStore for InMemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.savepoint.is_some() {
            return Err(LedgerError::Transaction("a transaction is already open".to_string()));
        }
        self.savepoint = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.savepoint
            .take()
            .map(drop)
            .ok_or_else(|| LedgerError::Transaction("no transaction to commit".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let saved = self
            .savepoint
            .take()
            .ok_or_else(|| LedgerError::Transaction("no transaction to roll back".to_string()))?;
        self.tables = saved;
        Ok(())
    }

    fn member(&self, id: MemberId) -> Result<Member> {
        fetch(&self.tables.members, id)
    }

    fn book(&self, id: BookId) -> Result<Book> {
        fetch(&self.tables.books, id)
    }

    fn update_book(&mut self, book: &Book) -> Result<()> {
        check_copies(book)?;
        replace(&mut self.tables.books, book.id, book)
    }

    fn loan(&self, id: LoanId) -> Result<Loan> {
        fetch(&self.tables.loans, id)
    }

    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        self.member(loan.member_id)?;
        self.book(loan.book_id)?;
        let row = Loan {
            id: LoanId(next_key(&self.tables.loans)),
            member_id: loan.member_id,
            book_id: loan.book_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: None,
            state: LoanState::Loaned,
        };
        self.tables.loans.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        replace(&mut self.tables.loans, loan.id, loan)
    }

    fn loans_for_member(&self, member: MemberId) -> Result<Vec<Loan>> {
        Ok(select(&self.tables.loans, |loan| loan.member_id == member))
    }

    fn loans_for_book(&self, book: BookId) -> Result<Vec<Loan>> {
        Ok(select(&self.tables.loans, |loan| loan.book_id == book))
    }

    fn loans_in_state(&self, state: LoanState) -> Result<Vec<Loan>> {
        Ok(select(&self.tables.loans, |loan| loan.state == state))
    }

    fn fine(&self, id: FineId) -> Result<Fine> {
        fetch(&self.tables.fines, id)
    }

    fn fine_for_loan(&self, loan: LoanId) -> Result<Option<Fine>> {
        Ok(self.tables.fines.values().find(|fine| fine.loan_id == loan).cloned())
    }

    fn insert_fine(&mut self, fine: NewFine) -> Result<Fine> {
        self.loan(fine.loan_id)?;
        if let Some(existing) = self.fine_for_loan(fine.loan_id)? {
            return Err(LedgerError::Inconsistent(format!(
                "{} already has {}",
                fine.loan_id, existing.id
            )));
        }
        let row = Fine {
            id: FineId(next_key(&self.tables.fines)),
            loan_id: fine.loan_id,
            amount: fine.amount,
            issued_on: fine.issued_on,
            state: FineState::Unpaid,
        };
        self.tables.fines.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_fine(&mut self, fine: &Fine) -> Result<()> {
        replace(&mut self.tables.fines, fine.id, fine)
    }

    fn reservation(&self, id: ReservationId) -> Result<Reservation> {
        fetch(&self.tables.reservations, id)
    }

    fn insert_reservation(&mut self, reservation: NewReservation) -> Result<Reservation> {
        self.member(reservation.member_id)?;
        self.book(reservation.book_id)?;
        let row = Reservation {
            id: ReservationId(next_key(&self.tables.reservations)),
            member_id: reservation.member_id,
            book_id: reservation.book_id,
            reservation_date: reservation.reservation_date,
            state: ReservationState::Pending,
            activated_on: None,
            expires_on: None,
        };
        self.tables.reservations.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        replace(&mut self.tables.reservations, reservation.id, reservation)
    }

    fn reservations_for_book(&self, book: BookId) -> Result<Vec<Reservation>> {
        Ok(select(&self.tables.reservations, |reservation| reservation.book_id == book))
    }

    fn reservations_in_state(&self, state: ReservationState) -> Result<Vec<Reservation>> {
        Ok(select(&self.tables.reservations, |reservation| reservation.state == state))
    }
}

/// Reject a book row with more copies on the shelf than it owns
fn check_copies(book: &Book) -> Result<()> {
    if book.copies_available > book.total_copies {
        return Err(LedgerError::Inconsistent(format!(
            "{} has {} copies available but only {} in total",
            book.id, book.copies_available, book.total_copies
        )));
    }
    Ok(())
}

/// The key after the largest one in use
fn next_key<K: RowId + Ord, V>(table: &BTreeMap<K, V>) -> u64 {
    table.keys().next_back().map_or(1, |last| last.raw().saturating_add(1))
}

/// Clone a row out of a table
fn fetch<K: RowId + Ord, V: Clone>(table: &BTreeMap<K, V>, id: K) -> Result<V> {
    table.get(&id).cloned().ok_or_else(|| LedgerError::not_found(id))
}

/// Overwrite an existing row
fn replace<K: RowId + Ord, V: Clone>(table: &mut BTreeMap<K, V>, id: K, row: &V) -> Result<()> {
    let slot = table.get_mut(&id).ok_or_else(|| LedgerError::not_found(id))?;
    slot.clone_from(row);
    Ok(())
}

/// Clone every row matching a predicate, in key order
fn select<K, V: Clone>(table: &BTreeMap<K, V>, keep: impl Fn(&V) -> bool) -> Vec<V> {
    table.values().filter(|row| keep(row)).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    /// A store with one member and one two-copy book
    fn seeded_store() -> InMemoryStore {
        let joined = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut store = InMemoryStore::new();
        store.add_member(Member::new(MemberId(1), "Ada", "Byron", "ada@example.org", joined));
        store.add_book(Book::new(BookId(1), "Dune", 2)).unwrap();
        store
    }

    /// Loan values for the seeded member and book
    fn new_loan() -> NewLoan {
        NewLoan {
            member_id: MemberId(1),
            book_id: BookId(1),
            loan_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_ids_are_assigned_in_order() {
        let mut store = seeded_store();
        let first = store.insert_loan(new_loan()).unwrap();
        let second = store.insert_loan(new_loan()).unwrap();
        assert_eq!((first.id, second.id), (LoanId(1), LoanId(2)));
        assert_eq!(store.loans_in_state(LoanState::Loaned).unwrap().len(), 2);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut store = seeded_store();
        store.begin().unwrap();
        store.insert_loan(new_loan()).unwrap();
        store.rollback().unwrap();

        assert_eq!(store.loans().count(), 0);
        assert!(!store.in_transaction());
        assert!(matches!(store.commit(), Err(LedgerError::Transaction(_))));
    }

    #[test]
    fn test_nested_begin_is_rejected() {
        let mut store = seeded_store();
        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(LedgerError::Transaction(_))));
        store.commit().unwrap();
    }

    #[test]
    fn test_missing_rows_and_fk_checks() {
        let mut store = seeded_store();
        assert!(matches!(
            store.book(BookId(9)),
            Err(LedgerError::NotFound { entity: "book", id: 9 })
        ));

        let mut orphan = new_loan();
        orphan.member_id = MemberId(42);
        let result = store.insert_loan(orphan);
        assert!(matches!(result, Err(LedgerError::NotFound { entity: "member", .. })));

        let mut book = Book::new(BookId(2), "Emma", 1);
        book.copies_available = 2;
        assert!(matches!(store.add_book(book), Err(LedgerError::Inconsistent(_))));

        let mut book = Book::new(BookId(3), "Persuasion", 1);
        book.author_id = Some(AuthorId(7));
        assert!(matches!(
            store.add_book(book.clone()),
            Err(LedgerError::NotFound { entity: "author", id: 7 })
        ));
        store.add_author(Author {
            id: AuthorId(7),
            first_name: "Jane".to_string(),
            last_name: "Austen".to_string(),
        });
        store.add_book(book).unwrap();
    }

    #[test]
    fn test_one_fine_per_loan() {
        let mut store = seeded_store();
        let loan = store.insert_loan(new_loan()).unwrap();
        let fine = NewFine {
            loan_id: loan.id,
            amount: rust_decimal::Decimal::ONE,
            issued_on: loan.due_date,
        };
        store.insert_fine(fine.clone()).unwrap();
        assert!(matches!(store.insert_fine(fine), Err(LedgerError::Inconsistent(_))));
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let mut store = seeded_store();
        store.insert_loan(new_loan()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        store.save_to_file(&path).unwrap();
        let loaded = InMemoryStore::load_from_file(&path).unwrap();

        assert_eq!(loaded.books().collect::<Vec<_>>(), store.books().collect::<Vec<_>>());
        assert_eq!(loaded.loan(LoanId(1)).unwrap(), store.loan(LoanId(1)).unwrap());
    }
}
