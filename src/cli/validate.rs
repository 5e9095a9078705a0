use std::{collections::BTreeSet, path::PathBuf, process};

use clap::Parser;
use cme_tracker::{
    CreditType, Ledger,
    domain::Catalog,
    storage::InvalidFile,
};
use serde_json::json;
use tracing::instrument;

use super::{record::short_id, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check every record and requirement file")]
pub struct Validate {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// A credit type tag that is not in the catalog.
#[derive(Debug)]
struct UnknownTag {
    /// Short id of the record or requirement carrying the tag.
    owner: String,
    tag: String,
}

#[derive(Debug, Default)]
struct ValidationResult {
    record_count: usize,
    requirement_count: usize,
    invalid_files: Vec<InvalidFile>,
    unknown_record_tags: Vec<UnknownTag>,
    unknown_requirement_tags: Vec<UnknownTag>,
}

impl ValidationResult {
    fn has_errors(&self) -> bool {
        !self.invalid_files.is_empty()
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let (ledger, invalid_files) = Ledger::new(root).load_lenient()?;

        let catalog = Catalog::new(
            ledger.config().profession,
            &ledger.config().custom_credit_types,
        );
        let known: BTreeSet<String> = catalog.entries().into_iter().map(|e| e.id).collect();
        let unknown = |owner: uuid::Uuid, tag: &CreditType| {
            (!known.contains(tag.as_str())).then(|| UnknownTag {
                owner: short_id(owner),
                tag: tag.to_string(),
            })
        };

        let result = ValidationResult {
            record_count: ledger.records().len(),
            requirement_count: ledger.requirements().len(),
            invalid_files,
            unknown_record_tags: ledger
                .records()
                .iter()
                .flat_map(|r| r.credit_types().iter().filter_map(move |t| unknown(r.id(), t)))
                .collect(),
            unknown_requirement_tags: ledger
                .requirements()
                .iter()
                .flat_map(|r| {
                    r.filters()
                        .credit_types
                        .iter()
                        .filter_map(move |t| unknown(r.id(), t))
                })
                .collect(),
        };

        match self.output {
            OutputFormat::Json => Self::output_json(&result)?,
            OutputFormat::Table if !self.quiet => Self::output_table(&result),
            OutputFormat::Table => {}
        }

        if result.has_errors() {
            process::exit(1);
        }
        Ok(())
    }

    fn output_json(result: &ValidationResult) -> anyhow::Result<()> {
        let invalid: Vec<_> = result
            .invalid_files
            .iter()
            .map(|f| json!({ "path": f.path, "error": f.error.to_string() }))
            .collect();
        let tags = |tags: &[UnknownTag]| -> Vec<serde_json::Value> {
            tags.iter()
                .map(|t| json!({ "id": t.owner, "credit_type": t.tag }))
                .collect()
        };

        let output = json!({
            "records": result.record_count,
            "requirements": result.requirement_count,
            "invalid_files": invalid,
            "unknown_record_credit_types": tags(&result.unknown_record_tags),
            "unknown_requirement_credit_types": tags(&result.unknown_requirement_tags),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(result: &ValidationResult) {
        println!(
            "Checked {} records and {} requirements",
            result.record_count, result.requirement_count
        );
        println!();

        if result.invalid_files.is_empty() {
            println!("Files: {} ✅", "all valid".success());
        } else {
            println!(
                "Files: {} ❌",
                format!("{} invalid", result.invalid_files.len()).error()
            );
            for file in &result.invalid_files {
                println!("  - {file}");
            }
        }

        if !result.unknown_record_tags.is_empty() {
            println!();
            println!(
                "{}",
                "⚠️  Records with credit types outside the catalog:".warning()
            );
            for tag in &result.unknown_record_tags {
                println!("  - {} {}", tag.owner, tag.tag);
            }
        }

        if !result.unknown_requirement_tags.is_empty() {
            println!();
            println!(
                "{}",
                "⚠️  Requirements accepting credit types outside the catalog:".warning()
            );
            for tag in &result.unknown_requirement_tags {
                println!("  - {} {}", tag.owner, tag.tag);
            }
            println!(
                "{}",
                "Only records tagged with exactly these ids will count.".dim()
            );
        }
    }
}
