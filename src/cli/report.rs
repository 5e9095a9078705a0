use std::path::PathBuf;

use chrono::Datelike;
use clap::Parser;
use cme_tracker::{
    CreditRecord,
    domain::{
        Catalog, CreditType,
        report::{self, UNKNOWN_CREDIT_TYPE, YearSummary},
    },
};
use tracing::instrument;

use super::{
    load,
    record::{record_json, truncate},
    terminal::Colorize,
    today,
};

#[derive(Debug, clap::Subcommand)]
pub enum ReportCommand {
    /// Credits completed in one year, by credit type
    Summary(Summary),

    /// Credits per year across a range of years
    Years(Years),

    /// Every record, newest first
    Transcript(Transcript),
}

impl ReportCommand {
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Summary(command) => command.run(root),
            Self::Years(command) => command.run(root),
            Self::Transcript(command) => command.run(root),
        }
    }
}

#[derive(Debug, Parser)]
pub struct Summary {
    /// The year to summarise (defaults to the current year)
    #[arg(long, short)]
    year: Option<i32>,
}

impl Summary {
    #[instrument(level = "debug", skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = load(root)?;
        let summary = ledger.summary(self.year.unwrap_or_else(|| today().year()));
        let catalog = Catalog::new(
            ledger.config().profession,
            &ledger.config().custom_credit_types,
        );

        println!("Credits completed in {}", summary.year);
        println!("{}", "──────────────────────".dim());
        println!(
            "{} records, {} credits",
            summary.total_records,
            summary.total_credits.normalize()
        );

        if summary.by_credit_type.is_empty() {
            return Ok(());
        }

        println!();
        println!("{:<40} {:>8} {:>7}", "Credit type", "Credits", "Records");
        for (tag, totals) in &summary.by_credit_type {
            println!(
                "{:<40} {:>8} {:>7}",
                truncate(&type_label(&catalog, tag), 40),
                totals.credits.normalize().to_string(),
                totals.count
            );
        }
        println!(
            "{}",
            "Records with several credit types count under each of them.".dim()
        );
        Ok(())
    }
}

fn type_label(catalog: &Catalog<'_>, tag: &str) -> String {
    if tag == UNKNOWN_CREDIT_TYPE {
        return "Unknown".to_string();
    }
    CreditType::new(tag).map_or_else(
        |_| tag.to_string(),
        |tag| catalog.display_name(&tag).to_string(),
    )
}

#[derive(Debug, Parser)]
pub struct Years {
    /// First year (defaults to four years before the last)
    #[arg(long)]
    start: Option<i32>,

    /// Last year (defaults to the current year)
    #[arg(long)]
    end: Option<i32>,
}

impl Years {
    #[instrument(level = "debug", skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let end = self.end.unwrap_or_else(|| today().year());
        let start = self
            .start
            .unwrap_or_else(|| report::default_year_window(end).0);
        if start > end {
            anyhow::bail!("start year {start} is after end year {end}");
        }
        if report::year_span(start, end) > u64::from(report::MAX_YEAR_SPAN.unsigned_abs()) {
            anyhow::bail!(
                "a report covers at most {} years ({start} to {end} requested)",
                report::MAX_YEAR_SPAN
            );
        }

        let ledger = load(root)?;
        let summaries = ledger.year_over_year(start, end);
        print_years(&summaries);
        Ok(())
    }
}

fn print_years(summaries: &[YearSummary]) {
    println!("{:<6} {:>8} {:>8}", "Year", "Records", "Credits");
    for summary in summaries {
        println!(
            "{:<6} {:>8} {:>8}",
            summary.year,
            summary.total_records,
            summary.total_credits.normalize().to_string()
        );
    }
}

#[derive(Debug, Parser)]
pub struct Transcript {
    /// Only records completed in this year
    #[arg(long, short)]
    year: Option<i32>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

const CSV_HEADER: [&str; 8] = [
    "completion_date",
    "title",
    "provider",
    "credits",
    "credit_types",
    "subject",
    "source",
    "certificate_number",
];

impl Transcript {
    #[instrument(level = "debug", skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = load(root)?;
        let rows = report::transcript(ledger.records(), self.year);

        match self.output {
            OutputFormat::Json => {
                let rows: Vec<_> = rows.iter().map(|r| record_json(r)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Csv => {
                println!("{}", CSV_HEADER.join(","));
                for record in &rows {
                    println!("{}", csv_row(record));
                }
            }
            OutputFormat::Table => {
                if rows.is_empty() {
                    println!("No records found.");
                    return Ok(());
                }
                let npi = ledger.config().npi.as_ref();
                println!("CME transcript");
                if let Some(npi) = npi {
                    println!("NPI: {npi}");
                }
                println!("{}", "──────────────".dim());
                println!("{:<10}  {:>7}  {:<24}  Title", "Date", "Credits", "Provider");
                for record in &rows {
                    println!(
                        "{:<10}  {:>7}  {:<24}  {}",
                        record.completion_date(),
                        record.credits().to_string(),
                        truncate(record.provider(), 24),
                        record.title()
                    );
                }
                println!(
                    "{}",
                    format!(
                        "{} records, {} credits",
                        rows.len(),
                        report::total_credits(rows.iter().copied())
                    )
                    .dim()
                );
            }
        }
        Ok(())
    }
}

fn csv_row(record: &CreditRecord) -> String {
    [
        record.completion_date().to_string(),
        record.title().to_string(),
        record.provider().to_string(),
        record.credits().to_string(),
        record.credit_types().joined(";"),
        record.subject().unwrap_or_default().to_string(),
        record.source().to_string(),
        record.certificate_number().unwrap_or_default().to_string(),
    ]
    .iter()
    .map(|value| csv_escape(value))
    .collect::<Vec<_>>()
    .join(",")
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}
