//! Summaries over a user's records and requirements.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{CreditRecord, Credits, Requirement};

/// Bucket used for records that carry no credit type.
pub const UNKNOWN_CREDIT_TYPE: &str = "unknown";

/// Number of years shown by default in a year-over-year report.
pub const DEFAULT_YEAR_SPAN: i32 = 5;

/// Largest number of years a year-over-year report covers.
pub const MAX_YEAR_SPAN: i32 = 100;

/// Credits and record count under one credit type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeTotals {
    /// Sum of credits of records carrying the type.
    pub credits: Decimal,
    /// Number of records carrying the type.
    pub count: usize,
}

/// Credits completed in one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    /// The calendar year.
    pub year: i32,
    /// Records completed in the year.
    pub total_records: usize,
    /// Sum of their credits.
    pub total_credits: Decimal,
    /// Totals per credit type.
    ///
    /// A record counts in full under each of its types, so these do not sum
    /// to `total_credits` when records carry more than one type.
    pub by_credit_type: BTreeMap<String, TypeTotals>,
}

/// Summarises records completed in `year`.
#[must_use]
pub fn summarize_year(records: &[CreditRecord], year: i32) -> YearSummary {
    let mut summary = YearSummary {
        year,
        total_records: 0,
        total_credits: Decimal::ZERO,
        by_credit_type: BTreeMap::new(),
    };

    for record in records.iter().filter(|r| r.year() == year) {
        let credits = record.credits().value();
        summary.total_records += 1;
        summary.total_credits = summary.total_credits.saturating_add(credits);

        let mut add = |tag: &str| {
            let totals = summary.by_credit_type.entry(tag.to_string()).or_default();
            totals.credits = totals.credits.saturating_add(credits);
            totals.count += 1;
        };

        if record.credit_types().is_empty() {
            add(UNKNOWN_CREDIT_TYPE);
        } else {
            for tag in record.credit_types() {
                add(tag.as_str());
            }
        }
    }

    summary
}

/// One summary per year from `start` to `end` inclusive.
///
/// Returns an empty list if `start` is after `end`. Only the last
/// [`MAX_YEAR_SPAN`] years up to `end` are covered.
#[must_use]
pub fn year_over_year(records: &[CreditRecord], start: i32, end: i32) -> Vec<YearSummary> {
    let start = start.max(end.saturating_sub(MAX_YEAR_SPAN - 1));
    (start..=end)
        .map(|year| summarize_year(records, year))
        .collect()
}

/// The default year-over-year window: the five years ending at `end`.
#[must_use]
pub const fn default_year_window(end: i32) -> (i32, i32) {
    (end.saturating_sub(DEFAULT_YEAR_SPAN - 1), end)
}

/// Number of years from `start` to `end` inclusive, or zero if `start` is
/// after `end`.
#[must_use]
pub fn year_span(start: i32, end: i32) -> u64 {
    u64::try_from(i64::from(end) - i64::from(start) + 1).unwrap_or(0)
}

/// Active requirements due on or after `today`, soonest first.
#[must_use]
pub fn upcoming_deadlines(
    requirements: &[Requirement],
    today: NaiveDate,
    limit: usize,
) -> Vec<&Requirement> {
    let mut upcoming: Vec<_> = requirements
        .iter()
        .filter(|r| r.is_active())
        .filter(|r| r.due_date().is_some_and(|due| due >= today))
        .collect();
    upcoming.sort_by_key(|r| (r.due_date(), r.name().to_string()));
    upcoming.truncate(limit);
    upcoming
}

/// Records for a transcript, newest first, optionally limited to one year.
#[must_use]
pub fn transcript(records: &[CreditRecord], year: Option<i32>) -> Vec<&CreditRecord> {
    let mut rows: Vec<_> = records
        .iter()
        .filter(|r| year.is_none_or(|year| r.year() == year))
        .collect();
    rows.sort_by(|a, b| {
        b.completion_date()
            .cmp(&a.completion_date())
            .then_with(|| a.title().cmp(b.title()))
    });
    rows
}

/// Total credits across `records`.
#[must_use]
pub fn total_credits<'a>(records: impl IntoIterator<Item = &'a CreditRecord>) -> Credits {
    records.into_iter().map(CreditRecord::credits).sum()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{CreditTypes, Filters, RecordSource, RequirementKind};

    fn record(types: &[&str], credits: Decimal, completed: &str) -> CreditRecord {
        CreditRecord::new(
            RecordSource::Certificate,
            completed,
            "Provider",
            Credits::new(credits).unwrap(),
            completed.parse().unwrap(),
        )
        .unwrap()
        .with_credit_types(CreditTypes::normalize(types, None))
    }

    fn requirement(name: &str, due: Option<&str>, active: bool) -> Requirement {
        let mut requirement = Requirement::new(
            name,
            RequirementKind::Hospital,
            Filters::default(),
            Credits::new(dec!(10)).unwrap(),
        )
        .unwrap();
        requirement.set_due_date(due.map(|d| d.parse().unwrap()));
        if !active {
            requirement.deactivate();
        }
        requirement
    }

    #[test]
    fn summary_counts_only_the_requested_year() {
        let records = vec![
            record(&["ama_cat1"], dec!(2), "2024-03-01"),
            record(&["ama_cat1"], dec!(3), "2025-03-01"),
        ];
        let summary = summarize_year(&records, 2025);
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.total_credits, dec!(3));
    }

    #[test]
    fn multi_type_record_counts_under_each_type() {
        let records = vec![record(&["ama_cat1", "moc"], dec!(4), "2025-01-10")];
        let summary = summarize_year(&records, 2025);

        assert_eq!(summary.total_credits, dec!(4));
        assert_eq!(summary.by_credit_type["ama_cat1"].credits, dec!(4));
        assert_eq!(summary.by_credit_type["moc"].credits, dec!(4));
        assert_eq!(summary.by_credit_type["moc"].count, 1);
    }

    #[test]
    fn tagless_records_are_grouped_as_unknown() {
        let records = vec![
            record(&[], dec!(1), "2025-01-10"),
            record(&[], dec!(0.5), "2025-02-10"),
        ];
        let summary = summarize_year(&records, 2025);
        let unknown = summary.by_credit_type[UNKNOWN_CREDIT_TYPE];
        assert_eq!(unknown.count, 2);
        assert_eq!(unknown.credits, dec!(1.5));
    }

    #[test]
    fn year_over_year_covers_each_year() {
        let records = vec![record(&["moc"], dec!(1), "2023-06-01")];
        let (start, end) = default_year_window(2025);
        let years = year_over_year(&records, start, end);

        assert_eq!(
            years.iter().map(|y| y.year).collect::<Vec<_>>(),
            vec![2021, 2022, 2023, 2024, 2025]
        );
        assert_eq!(years[2].total_records, 1);
        assert!(year_over_year(&records, 2025, 2024).is_empty());
    }

    #[test]
    fn year_windows_near_the_limits_do_not_overflow() {
        assert_eq!(default_year_window(i32::MIN), (i32::MIN, i32::MIN));
        assert_eq!(year_span(i32::MIN, i32::MAX), 1 << 32);
        assert_eq!(year_span(2025, 2024), 0);

        let years = year_over_year(&[], i32::MIN, i32::MAX);
        assert_eq!(years.len(), usize::try_from(MAX_YEAR_SPAN).unwrap());
        assert_eq!(years.last().map(|y| y.year), Some(i32::MAX));
    }

    #[test]
    fn upcoming_deadlines_are_active_future_and_sorted() {
        let requirements = vec![
            requirement("Later", Some("2026-12-31"), true),
            requirement("Past", Some("2026-01-01"), true),
            requirement("Inactive", Some("2026-11-01"), false),
            requirement("Today", Some("2026-10-19"), true),
            requirement("Undated", None, true),
        ];
        let today = "2026-10-19".parse().unwrap();

        let names: Vec<_> = upcoming_deadlines(&requirements, today, 5)
            .into_iter()
            .map(Requirement::name)
            .collect();
        assert_eq!(names, vec!["Today", "Later"]);

        assert_eq!(upcoming_deadlines(&requirements, today, 1).len(), 1);
    }

    #[test]
    fn transcript_is_newest_first() {
        let records = vec![
            record(&["moc"], dec!(1), "2024-01-01"),
            record(&["moc"], dec!(1), "2025-06-01"),
            record(&["moc"], dec!(1), "2025-01-01"),
        ];
        let dates: Vec<_> = transcript(&records, None)
            .iter()
            .map(|r| r.completion_date().to_string())
            .collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-01-01", "2024-01-01"]);
        assert_eq!(transcript(&records, Some(2024)).len(), 1);
    }

    #[test]
    fn total_credits_sums_exactly() {
        let records: Vec<_> = (0..10)
            .map(|_| record(&["moc"], dec!(0.1), "2025-01-01"))
            .collect();
        assert_eq!(total_credits(&records).value(), dec!(1));
    }
}
