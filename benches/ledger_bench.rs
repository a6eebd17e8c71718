use std::time::Duration;

use chrono::NaiveDate;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use loan_ledger::{
    InMemoryStore, LedgerSettings, LoanLedger, ManualClock,
    records::{Book, BookId, Member, MemberId},
};

/// Members and books seeded into every bench store
const POPULATION: u64 = 500;

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(1))
        .warm_up_time(Duration::from_secs(1))
}

/// A ledger over `POPULATION` members and single-copy books
fn seeded_ledger() -> LoanLedger<InMemoryStore, ManualClock> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let mut store = InMemoryStore::new();
    for id in 1..=POPULATION {
        let email = format!("member{id}@example.org");
        store.add_member(Member::new(MemberId(id), "Bench", "Member", &email, start));
        store.add_book(Book::new(BookId(id), "Bench Book", 1)).expect("valid book");
    }
    LoanLedger::new(store, LedgerSettings::default(), ManualClock::on(start))
}

fn ledger_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("LoanLedger Operations");

    group.bench_function("create_and_return_loan", |b| {
        b.iter_batched(
            seeded_ledger,
            |mut ledger| {
                let loan = ledger.create_loan(MemberId(1), BookId(1)).expect("loan should succeed");
                ledger.return_loan(loan.id).expect("return should succeed");
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("mark_overdue_500_loans", |b| {
        b.iter_batched(
            || {
                let mut ledger = seeded_ledger();
                for id in 1..=POPULATION {
                    ledger.create_loan(MemberId(id), BookId(id)).expect("loan should succeed");
                }
                ledger.clock().advance_days(30);
                ledger
            },
            |mut ledger| {
                ledger.mark_overdue().expect("scan should succeed");
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = ledger_bench
}
criterion_main!(benches);
