//! Requirement progress computation.
//!
//! Progress is a pure function of one requirement and a snapshot of the
//! user's records. Nothing here performs I/O or mutates its inputs, so the
//! same snapshot can be shared across threads and evaluated concurrently.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{CreditRecord, Credits, Filters, Requirement};

/// How far a requirement has been satisfied by a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Exact sum of the credits of every matching record.
    pub credits_earned: Decimal,
    /// The requirement's target, copied for convenience.
    pub credits_required: Decimal,
    /// Number of records that matched.
    pub matching_count: usize,
    /// Whether `credits_earned >= credits_required`.
    pub is_complete: bool,
}

impl Progress {
    /// Credits still needed; zero once complete.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.credits_required
            .saturating_sub(self.credits_earned)
            .max(Decimal::ZERO)
    }

    /// Percentage complete, capped at 100 and rounded to one decimal place.
    #[must_use]
    pub fn percent(&self) -> Decimal {
        self.credits_earned
            .checked_div(self.credits_required)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::ONE_HUNDRED, |percent| {
                percent.min(Decimal::ONE_HUNDRED).round_dp(1)
            })
    }
}

/// Whether `record` satisfies every filter of a requirement.
///
/// An empty filter always passes. A record with no credit types never passes
/// a non-empty credit type filter, and a record with no subject never passes
/// a non-empty subject filter. Provider and subject comparisons are exact and
/// case-sensitive.
#[must_use]
pub fn matches(filters: &Filters, record: &CreditRecord) -> bool {
    let credit_type_ok =
        filters.credit_types.is_empty() || filters.credit_types.intersects(&record.credit_types);

    let provider_ok = filters.providers.is_empty() || filters.providers.contains(&record.provider);

    let subject_ok = filters.subjects.is_empty()
        || record
            .subject
            .as_ref()
            .is_some_and(|subject| filters.subjects.contains(subject));

    let year_ok = filters.years.contains(record.year());

    credit_type_ok && provider_ok && subject_ok && year_ok
}

/// Iterates the records that count towards `requirement`.
pub fn matching_records<'a>(
    requirement: &'a Requirement,
    records: &'a [CreditRecord],
) -> impl Iterator<Item = &'a CreditRecord> + 'a {
    records
        .iter()
        .filter(move |record| matches(&requirement.filters, record))
}

/// Computes credits earned, matching record count and completion status.
#[must_use]
pub fn compute_progress(requirement: &Requirement, records: &[CreditRecord]) -> Progress {
    let (credits_earned, matching_count) = matching_records(requirement, records).fold(
        (Credits::ZERO, 0usize),
        |(sum, count), record| (sum + record.credits, count + 1),
    );

    let credits_required = requirement.credits_required.value();
    let credits_earned = credits_earned.value();

    Progress {
        credits_earned,
        credits_required,
        matching_count,
        is_complete: credits_earned >= credits_required,
    }
}

/// Computes progress for many requirements against one snapshot of records.
///
/// Requirements are evaluated in parallel; results are returned in the same
/// order as `requirements`.
#[must_use]
pub fn compute_all<'a>(
    requirements: &'a [Requirement],
    records: &[CreditRecord],
) -> Vec<(&'a Requirement, Progress)> {
    requirements
        .par_iter()
        .map(|requirement| (requirement, compute_progress(requirement, records)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;
    use crate::domain::{CreditTypes, RecordSource, RequirementKind, YearRange};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(types: &[&str], provider: &str, credits: Decimal, completed: &str) -> CreditRecord {
        CreditRecord::new(
            RecordSource::Certificate,
            "Activity",
            provider,
            Credits::new(credits).unwrap(),
            date(completed),
        )
        .unwrap()
        .with_credit_types(CreditTypes::normalize(types, None))
    }

    fn requirement(filters: Filters, required: Decimal) -> Requirement {
        Requirement::new(
            "Goal",
            RequirementKind::LicenseRenewal,
            filters,
            Credits::new(required).unwrap(),
        )
        .unwrap()
    }

    fn sample_records() -> Vec<CreditRecord> {
        vec![
            record(&["ama_cat1"], "Mayo Clinic", dec!(5), "2025-05-15"),
            record(&["moc"], "Mayo Clinic", dec!(5), "2025-06-01"),
            record(&["ama_cat1"], "Other Clinic", dec!(5), "2025-07-01"),
            record(&[], "AAFP", dec!(1.5), "2019-02-01"),
        ]
    }

    #[test]
    fn unrestricted_requirement_counts_every_record() {
        let records = sample_records();
        let progress = compute_progress(&requirement(Filters::default(), dec!(100)), &records);

        let total: Decimal = records.iter().map(|r| r.credits().value()).sum();
        assert_eq!(progress.matching_count, records.len());
        assert_eq!(progress.credits_earned, total);
        assert!(!progress.is_complete);
    }

    #[test]
    fn mayo_clinic_scenario() {
        let filters = Filters {
            credit_types: CreditTypes::normalize(["ama_cat1"], None),
            providers: Filters::names(["Mayo Clinic"]),
            subjects: Filters::names(Vec::<String>::new()),
            years: YearRange::single(2025),
        };
        let progress = compute_progress(&requirement(filters, dec!(10)), &sample_records());

        assert_eq!(progress.credits_earned, dec!(5));
        assert_eq!(progress.matching_count, 1);
        assert!(!progress.is_complete);
    }

    #[test]
    fn tagless_record_never_matches_type_filter() {
        let records = vec![record(&[], "Mayo Clinic", dec!(50), "2025-01-01")];
        let filters = Filters {
            credit_types: CreditTypes::normalize(["ama_cat1"], None),
            ..Filters::default()
        };
        let progress = compute_progress(&requirement(filters, dec!(1)), &records);

        assert_eq!(progress.matching_count, 0);
        assert_eq!(progress.credits_earned, Decimal::ZERO);
    }

    #[test]
    fn record_with_any_shared_type_matches() {
        let records = vec![record(&["moc", "ethics"], "X", dec!(2), "2025-01-01")];
        let filters = Filters {
            credit_types: CreditTypes::normalize(["ethics", "pain_mgmt"], None),
            ..Filters::default()
        };
        let progress = compute_progress(&requirement(filters, dec!(1)), &records);
        assert_eq!(progress.matching_count, 1);
    }

    #[test]
    fn legacy_and_list_shapes_match_identically() {
        let legacy = record(&[], "X", dec!(3), "2025-01-01")
            .with_credit_types(CreditTypes::normalize(Vec::<&str>::new(), Some("ama_cat1")));
        let list = record(&["ama_cat1"], "X", dec!(3), "2025-01-01");

        let requirements = [
            Filters::default(),
            Filters {
                credit_types: CreditTypes::normalize(["ama_cat1"], None),
                ..Filters::default()
            },
            Filters {
                credit_types: CreditTypes::normalize(["moc"], None),
                ..Filters::default()
            },
        ];

        for filters in &requirements {
            assert_eq!(matches(filters, &legacy), matches(filters, &list));
        }
    }

    #[test_case("2023-12-31" => false; "last day of previous year")]
    #[test_case("2024-01-01" => true; "first day of year")]
    #[test_case("2024-12-31" => true; "last day of year")]
    #[test_case("2025-01-01" => false; "first day of next year")]
    fn single_year_range_boundaries(completed: &str) -> bool {
        let filters = Filters {
            years: YearRange::new(Some(2024), Some(2024)).unwrap(),
            ..Filters::default()
        };
        matches(&filters, &record(&["moc"], "X", dec!(1), completed))
    }

    #[test_case(dec!(10.0) => true; "exactly meets target")]
    #[test_case(dec!(9.99) => false; "just below target")]
    #[test_case(dec!(12) => true; "above target")]
    fn completion_is_inclusive(earned: Decimal) -> bool {
        let records = vec![record(&["moc"], "X", earned, "2025-01-01")];
        compute_progress(&requirement(Filters::default(), dec!(10)), &records).is_complete
    }

    #[test]
    fn quarter_credits_sum_exactly() {
        let records: Vec<_> = (0..40)
            .map(|_| record(&["ama_cat1"], "X", dec!(0.25), "2025-03-01"))
            .collect();
        let progress = compute_progress(&requirement(Filters::default(), dec!(10)), &records);

        assert_eq!(progress.credits_earned, dec!(10.0));
        assert_eq!(progress.credits_earned.normalize().to_string(), "10");
        assert!(progress.is_complete);
    }

    #[test]
    fn subject_filter_excludes_records_without_subject() {
        let with_subject =
            record(&["moc"], "X", dec!(1), "2025-01-01").with_subject(Some("Cardiology".into()));
        let without_subject = record(&["moc"], "X", dec!(1), "2025-01-01");
        let filters = Filters {
            subjects: Filters::names(["Cardiology"]),
            ..Filters::default()
        };

        assert!(matches(&filters, &with_subject));
        assert!(!matches(&filters, &without_subject));
    }

    #[test]
    fn provider_match_is_case_sensitive() {
        let filters = Filters {
            providers: Filters::names(["Mayo Clinic"]),
            ..Filters::default()
        };
        assert!(!matches(
            &filters,
            &record(&["moc"], "mayo clinic", dec!(1), "2025-01-01")
        ));
    }

    #[test]
    fn computing_twice_gives_identical_results() {
        let records = sample_records();
        let requirement = requirement(
            Filters {
                credit_types: CreditTypes::normalize(["ama_cat1"], None),
                ..Filters::default()
            },
            dec!(8),
        );
        let before = records.clone();

        let first = compute_progress(&requirement, &records);
        let second = compute_progress(&requirement, &records);

        assert_eq!(first, second);
        assert_eq!(records, before);
    }

    #[test]
    fn compute_all_preserves_order() {
        let records = sample_records();
        let requirements: Vec<_> = [dec!(1), dec!(2), dec!(3)]
            .into_iter()
            .map(|target| requirement(Filters::default(), target))
            .collect();

        let results = compute_all(&requirements, &records);

        let ids: Vec<_> = results.iter().map(|(r, _)| r.id()).collect();
        let expected: Vec<_> = requirements.iter().map(Requirement::id).collect();
        assert_eq!(ids, expected);
        assert!(results.iter().all(|(_, p)| p.matching_count == records.len()));
    }

    #[test]
    fn remaining_and_percent_are_capped() {
        let progress = Progress {
            credits_earned: dec!(15),
            credits_required: dec!(10),
            matching_count: 3,
            is_complete: true,
        };
        assert_eq!(progress.remaining(), Decimal::ZERO);
        assert_eq!(progress.percent(), dec!(100));

        let partial = Progress {
            credits_earned: dec!(2.5),
            credits_required: dec!(7.5),
            matching_count: 1,
            is_complete: false,
        };
        assert_eq!(partial.remaining(), dec!(5));
        assert_eq!(partial.percent(), dec!(33.3));
    }

    #[test]
    fn percent_of_a_tiny_target_does_not_overflow() {
        let progress = Progress {
            credits_earned: dec!(1000000000000000000000000000),
            credits_required: dec!(0.001),
            matching_count: 1,
            is_complete: true,
        };
        assert_eq!(progress.percent(), dec!(100));
        assert_eq!(progress.remaining(), Decimal::ZERO);
    }

    #[test]
    fn largest_allowed_credits_sum_without_panicking() {
        let records: Vec<_> = (0..3)
            .map(|_| record(&["moc"], "X", Credits::MAX.value(), "2025-01-01"))
            .collect();
        let progress = compute_progress(&requirement(Filters::default(), dec!(0.01)), &records);

        assert_eq!(progress.credits_earned, dec!(30000));
        assert!(progress.is_complete);
        assert_eq!(progress.percent(), dec!(100));
    }
}
