//! These benches measure computing progress for many requirements over a
//! large record set, in memory and from a freshly loaded ledger.

#![allow(missing_docs)]

use std::path::PathBuf;

use chrono::NaiveDate;
use cme_tracker::{
    CreditRecord, CreditTypes, Credits, Filters, Ledger, RecordSource, Requirement,
    RequirementKind, YearRange, compute_all,
};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tempfile::TempDir;

const TAGS: [&str; 4] = ["ama_cat1", "ama_cat2", "moc", "ethics"];
const PROVIDERS: [&str; 3] = ["Mayo Clinic", "AHA", "ABIM"];

fn records(count: usize) -> Vec<CreditRecord> {
    (0..count)
        .map(|i| {
            let year = 2020 + i32::try_from(i % 6).unwrap();
            let day = u32::try_from(i % 28).unwrap() + 1;
            CreditRecord::new(
                RecordSource::Certificate,
                format!("Activity {i}"),
                PROVIDERS[i % PROVIDERS.len()],
                Credits::new(Decimal::new(25, 2)).unwrap(),
                NaiveDate::from_ymd_opt(year, 1, day).unwrap(),
            )
            .unwrap()
            .with_credit_types(CreditTypes::normalize([TAGS[i % TAGS.len()]], None))
        })
        .collect()
}

fn requirements(count: usize) -> Vec<Requirement> {
    (0..count)
        .map(|i| {
            let year = 2020 + i32::try_from(i % 6).unwrap();
            Requirement::new(
                format!("Requirement {i}"),
                RequirementKind::LicenseRenewal,
                Filters {
                    credit_types: CreditTypes::normalize([TAGS[i % TAGS.len()]], None),
                    years: YearRange::new(Some(year), Some(year + 1)).unwrap(),
                    ..Filters::default()
                },
                Credits::new(Decimal::from(50)).unwrap(),
            )
            .unwrap()
        })
        .collect()
}

fn compute_all_in_memory(c: &mut Criterion) {
    let records = records(10_000);
    let requirements = requirements(50);

    c.bench_function("compute all in memory", |b| {
        b.iter(|| compute_all(&requirements, &records));
    });
}

fn preseed_ledger(path: PathBuf) {
    let mut ledger = Ledger::new(path).load_all().unwrap();
    for record in records(1_000) {
        ledger.add_record(record).unwrap();
    }
    for requirement in requirements(20) {
        ledger.add_requirement(requirement).unwrap();
    }
}

fn load_and_compute(c: &mut Criterion) {
    c.bench_function("load ledger and compute progress", |b| {
        b.iter_batched(
            || {
                let tmp_dir = TempDir::new().unwrap();
                preseed_ledger(tmp_dir.path().to_path_buf());
                tmp_dir
            },
            |tmp_dir| {
                Ledger::new(tmp_dir.path().to_path_buf())
                    .load_all()
                    .unwrap()
                    .progress_all(true)
                    .len()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, compute_all_in_memory, load_and_compute);
criterion_main!(benches);
