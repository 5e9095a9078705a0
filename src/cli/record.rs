use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use cme_tracker::{
    CreditRecord, CreditTypes, Credits, Ledger, Loaded, RecordSource,
    domain::{Catalog, report},
};
use serde_json::json;
use tracing::instrument;

use super::{
    load, parse_date,
    terminal::{Colorize, confirm},
    today,
};

#[derive(Debug, clap::Subcommand)]
pub enum RecordCommand {
    /// Record a certificate or self-reported activity
    Add(Add),

    /// List records, newest first
    List(List),

    /// Change fields of an existing record
    Edit(Edit),

    /// Delete a record
    Remove(Remove),
}

impl RecordCommand {
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(root),
            Self::List(command) => command.run(root),
            Self::Edit(command) => command.run(root),
            Self::Remove(command) => command.run(root),
        }
    }
}

#[derive(Debug, Parser)]
pub struct Add {
    /// Activity title
    title: String,

    /// Issuing organization
    #[arg(long, short)]
    provider: String,

    /// Credits awarded
    #[arg(long, short)]
    credits: Credits,

    /// Credit types (comma-separated)
    #[arg(long = "credit-type", short = 't', value_delimiter = ',')]
    credit_types: Vec<String>,

    /// Subject or topic
    #[arg(long, short)]
    subject: Option<String>,

    /// Completion date (YYYY-MM-DD, defaults to today)
    #[arg(long, short, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Expiration date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    expires: Option<NaiveDate>,

    /// Certificate number
    #[arg(long)]
    certificate_number: Option<String>,

    /// Record a self-reported activity instead of a certificate
    #[arg(long)]
    self_reported: bool,
}

impl Add {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;

        let source = if self.self_reported {
            RecordSource::SelfReported
        } else {
            RecordSource::Certificate
        };
        let credit_types = CreditTypes::normalize(&self.credit_types, None);
        warn_unknown_tags(&ledger, &credit_types);

        let record = CreditRecord::new(
            source,
            self.title,
            self.provider,
            self.credits,
            self.date.unwrap_or_else(today),
        )?
        .with_credit_types(credit_types)
        .with_subject(self.subject)
        .with_certificate_number(self.certificate_number)
        .with_expiration_date(self.expires)?;

        let record = ledger.add_record(record)?;
        println!(
            "{}",
            format!(
                "✅ Added {} {} ({} credits)",
                record.source(),
                short_id(record.id()),
                record.credits()
            )
            .success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct List {
    /// Only records completed in this year
    #[arg(long, short)]
    year: Option<i32>,

    /// Only records from this source
    #[arg(long)]
    source: Option<RecordSource>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl List {
    #[instrument(level = "debug", skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = load(root)?;
        let records: Vec<&CreditRecord> = report::transcript(ledger.records(), self.year)
            .into_iter()
            .filter(|r| self.source.is_none_or(|source| r.source() == source))
            .collect();

        match self.output {
            OutputFormat::Json => {
                let rows: Vec<_> = records.iter().map(|r| record_json(r)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Table => {
                if records.is_empty() {
                    println!("No records found. Add one with 'cme record add'.");
                    return Ok(());
                }
                println!(
                    "{:<8}  {:<10}  {:>7}  {:<20}  {:<20}  Title",
                    "ID", "Date", "Credits", "Types", "Provider"
                );
                for record in &records {
                    println!(
                        "{:<8}  {:<10}  {:>7}  {:<20}  {:<20}  {}",
                        short_id(record.id()),
                        record.completion_date(),
                        record.credits().to_string(),
                        truncate(&record.credit_types().joined(","), 20),
                        truncate(record.provider(), 20),
                        record.title()
                    );
                }
                println!(
                    "{}",
                    format!(
                        "{} records, {} credits",
                        records.len(),
                        report::total_credits(records.iter().copied())
                    )
                    .dim()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Edit {
    /// Record id or unique id prefix
    id: String,

    /// New activity title
    #[arg(long)]
    title: Option<String>,

    /// New issuing organization
    #[arg(long, short)]
    provider: Option<String>,

    /// New credit amount
    #[arg(long, short)]
    credits: Option<Credits>,

    /// Replace the credit types (comma-separated, empty to clear)
    #[arg(long = "credit-type", short = 't', value_delimiter = ',', num_args = 0..)]
    credit_types: Option<Vec<String>>,

    /// New subject (an empty string clears it)
    #[arg(long, short)]
    subject: Option<String>,

    /// New completion date (YYYY-MM-DD)
    #[arg(long, short, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// New expiration date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    expires: Option<NaiveDate>,

    /// Remove the expiration date
    #[arg(long, conflicts_with = "expires")]
    clear_expires: bool,

    /// New certificate number (an empty string clears it)
    #[arg(long)]
    certificate_number: Option<String>,

    /// Move the record to another source (certificate, self-reported)
    #[arg(long)]
    source: Option<RecordSource>,
}

impl Edit {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let id = ledger.find_record(&self.id)?.id();

        let credit_types = self
            .credit_types
            .map(|tags| CreditTypes::normalize(&tags, None));
        if let Some(tags) = &credit_types {
            warn_unknown_tags(&ledger, tags);
        }

        let Self {
            title,
            provider,
            credits,
            subject,
            date,
            expires,
            clear_expires,
            certificate_number,
            source,
            ..
        } = self;

        let record = ledger.update_record(id, |record| {
            if let Some(source) = source {
                record.set_source(source);
            }
            if let Some(title) = title {
                record.set_title(title)?;
            }
            if let Some(provider) = provider {
                record.set_provider(provider)?;
            }
            if let Some(credits) = credits {
                record.set_credits(credits);
            }
            if let Some(credit_types) = credit_types {
                record.set_credit_types(credit_types);
            }
            if subject.is_some() {
                record.set_subject(subject);
            }
            if clear_expires || expires.is_some() {
                record.set_expiration_date(None)?;
            }
            if let Some(date) = date {
                record.set_completion_date(date)?;
            }
            if expires.is_some() {
                record.set_expiration_date(expires)?;
            }
            if certificate_number.is_some() {
                record.set_certificate_number(certificate_number);
            }
            Ok(())
        })?;

        println!(
            "{}",
            format!(
                "✅ Updated {} {} ({} credits)",
                record.source(),
                short_id(record.id()),
                record.credits()
            )
            .success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Remove {
    /// Record id or unique id prefix
    id: String,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Remove {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let record = ledger.find_record(&self.id)?;
        let id = record.id();

        if !self.yes {
            println!(
                "Will delete {} '{}' ({} credits, {})",
                record.source(),
                record.title(),
                record.credits(),
                record.completion_date()
            );
            if !confirm("\nProceed?")? {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        ledger.remove_record(id)?;
        println!("{}", format!("✅ Deleted record {}", short_id(id)).success());
        Ok(())
    }
}

/// Log a warning for each tag that is not in the ledger's credit type
/// catalog.
fn warn_unknown_tags(ledger: &Ledger<Loaded>, credit_types: &CreditTypes) {
    let catalog = Catalog::new(
        ledger.config().profession,
        &ledger.config().custom_credit_types,
    );
    let known: Vec<String> = catalog.entries().into_iter().map(|e| e.id).collect();
    for tag in credit_types {
        if !known.iter().any(|id| id == tag.as_str()) {
            tracing::warn!("'{tag}' is not in the credit type catalog");
        }
    }
}

/// The first eight characters of an id, enough to address it on the command
/// line in practice.
pub fn short_id(id: uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub fn record_json(record: &CreditRecord) -> serde_json::Value {
    let credit_types: Vec<&str> = record.credit_types().iter().map(|t| t.as_str()).collect();
    json!({
        "id": record.id(),
        "source": record.source(),
        "title": record.title(),
        "provider": record.provider(),
        "credits": record.credits().value(),
        "credit_types": credit_types,
        "subject": record.subject(),
        "completion_date": record.completion_date(),
        "expiration_date": record.expiration_date(),
        "certificate_number": record.certificate_number(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_a_prefix_of_the_full_id() {
        let id = uuid::Uuid::new_v4();
        assert!(id.to_string().starts_with(&short_id(id)));
    }

    #[test]
    fn truncate_marks_cut_values() {
        assert_eq!(truncate("Mayo Clinic", 20), "Mayo Clinic");
        assert_eq!(truncate("Mayo Clinic", 5), "Mayo…");
    }
}
