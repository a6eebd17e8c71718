//! DDL for the library database the ledger runs against.
//!
//! Status columns hold the variant names of the ledger's state enums, and the
//! `LibrarySettings` seed rows come from [`LedgerSettings::default`].

use crate::settings::LedgerSettings;

/// Every table, in creation order
pub const TABLES: [&str; 11] = [
    "Members",
    "Authors",
    "Books",
    "BookLoans",
    "Fines",
    "BookReservations",
    "LibraryStaff",
    "Events",
    "EventRegistrations",
    "BookReviews",
    "LibrarySettings",
];

/// `CREATE TABLE` statements for every table, in creation order
pub const DDL: &str = "\
CREATE TABLE Members (
    MemberID INT PRIMARY KEY,
    FirstName VARCHAR(50) NOT NULL,
    LastName VARCHAR(50) NOT NULL,
    Email VARCHAR(100) UNIQUE NOT NULL,
    Phone VARCHAR(20),
    Address VARCHAR(255),
    MembershipDate DATE NOT NULL
);

CREATE TABLE Authors (
    AuthorID INT PRIMARY KEY,
    FirstName VARCHAR(50) NOT NULL,
    LastName VARCHAR(50) NOT NULL,
    BirthDate DATE,
    Nationality VARCHAR(50)
);

CREATE TABLE Books (
    BookID INT PRIMARY KEY,
    Title VARCHAR(255) NOT NULL,
    AuthorID INT,
    ISBN VARCHAR(20) UNIQUE,
    Publisher VARCHAR(100),
    PublicationYear INT,
    Genre VARCHAR(50),
    TotalCopies INT NOT NULL DEFAULT 1,
    CopiesAvailable INT NOT NULL DEFAULT 1,
    CHECK (CopiesAvailable BETWEEN 0 AND TotalCopies),
    FOREIGN KEY (AuthorID) REFERENCES Authors(AuthorID)
);

CREATE TABLE BookLoans (
    LoanID INT PRIMARY KEY,
    MemberID INT NOT NULL,
    BookID INT NOT NULL,
    LoanDate DATE NOT NULL,
    DueDate DATE NOT NULL,
    ReturnDate DATE,
    Status VARCHAR(20) NOT NULL DEFAULT 'Loaned',
    CHECK (DueDate >= LoanDate),
    CHECK (ReturnDate IS NULL OR ReturnDate >= LoanDate),
    FOREIGN KEY (MemberID) REFERENCES Members(MemberID),
    FOREIGN KEY (BookID) REFERENCES Books(BookID)
);

CREATE TABLE Fines (
    FineID INT PRIMARY KEY,
    LoanID INT NOT NULL UNIQUE,
    FineAmount DECIMAL(10, 2) NOT NULL,
    FineDate DATE NOT NULL,
    Status VARCHAR(20) NOT NULL DEFAULT 'Unpaid',
    FOREIGN KEY (LoanID) REFERENCES BookLoans(LoanID)
);

CREATE TABLE BookReservations (
    ReservationID INT PRIMARY KEY,
    MemberID INT NOT NULL,
    BookID INT NOT NULL,
    ReservationDate TIMESTAMP NOT NULL,
    Status VARCHAR(20) NOT NULL DEFAULT 'Pending',
    ActivatedOn DATE,
    ExpiresOn DATE,
    FOREIGN KEY (MemberID) REFERENCES Members(MemberID),
    FOREIGN KEY (BookID) REFERENCES Books(BookID)
);

CREATE TABLE LibraryStaff (
    StaffID INT PRIMARY KEY,
    FirstName VARCHAR(50) NOT NULL,
    LastName VARCHAR(50) NOT NULL,
    Position VARCHAR(50),
    Email VARCHAR(100) UNIQUE,
    Phone VARCHAR(20),
    HireDate DATE
);

CREATE TABLE Events (
    EventID INT PRIMARY KEY,
    EventName VARCHAR(100) NOT NULL,
    EventDate DATE NOT NULL,
    Location VARCHAR(100),
    Description TEXT,
    StaffID INT,
    FOREIGN KEY (StaffID) REFERENCES LibraryStaff(StaffID)
);

CREATE TABLE EventRegistrations (
    RegistrationID INT PRIMARY KEY,
    EventID INT NOT NULL,
    MemberID INT NOT NULL,
    RegistrationDate DATE NOT NULL,
    FOREIGN KEY (EventID) REFERENCES Events(EventID),
    FOREIGN KEY (MemberID) REFERENCES Members(MemberID)
);

CREATE TABLE BookReviews (
    ReviewID INT PRIMARY KEY,
    BookID INT NOT NULL,
    MemberID INT NOT NULL,
    Rating INT CHECK (Rating BETWEEN 1 AND 5),
    ReviewText TEXT,
    ReviewDate DATE NOT NULL,
    FOREIGN KEY (BookID) REFERENCES Books(BookID),
    FOREIGN KEY (MemberID) REFERENCES Members(MemberID)
);

CREATE TABLE LibrarySettings (
    SettingID INT PRIMARY KEY,
    SettingName VARCHAR(50) UNIQUE NOT NULL,
    SettingValue VARCHAR(100) NOT NULL
);
";

/// `INSERT` statements for the `LibrarySettings` seed rows
#[must_use]
pub fn seed_statements(settings: &LedgerSettings) -> Vec<String> {
    settings
        .to_pairs()
        .iter()
        .zip(1_u32..)
        .map(|((name, value), id)| {
            format!(
                "INSERT INTO LibrarySettings (SettingID, SettingName, SettingValue) \
                 VALUES ({id}, '{name}', '{value}');"
            )
        })
        .collect()
}

/// The full script: tables followed by the default seed rows
#[must_use]
pub fn script() -> String {
    let mut script = String::from(DDL);
    script.push('\n');
    for statement in seed_statements(&LedgerSettings::default()) {
        script.push_str(&statement);
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_is_created_once() {
        assert_eq!(DDL.matches("CREATE TABLE").count(), TABLES.len());
        for table in TABLES {
            assert_eq!(DDL.matches(&format!("CREATE TABLE {table} (")).count(), 1, "{table}");
        }
    }

    #[test]
    fn test_foreign_keys_point_at_created_tables() {
        for line in DDL.lines().filter(|line| line.contains("REFERENCES")) {
            let target = line
                .split("REFERENCES ")
                .nth(1)
                .and_then(|rest| rest.split('(').next())
                .unwrap_or_default();
            assert!(TABLES.contains(&target), "dangling reference in {line:?}");
        }
        assert!(DDL.contains("FOREIGN KEY (LoanID) REFERENCES BookLoans(LoanID)"));
    }

    #[test]
    fn test_seed_rows() {
        let seeds = seed_statements(&LedgerSettings::default());
        assert_eq!(seeds.len(), 4);
        assert!(seeds.iter().any(|row| row.contains("(2, 'FinePerDay', '0.50')")));
        assert!(script().ends_with("'ReservationExpiryDays', '7');\n"));
    }
}
