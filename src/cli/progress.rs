use std::path::PathBuf;

use clap::Parser;
use cme_tracker::{
    Ledger, Loaded, Progress as RequirementProgress, Requirement,
    domain::progress::matching_records,
};
use serde_json::json;
use tracing::instrument;

use super::{
    is_initialized, load,
    record::{record_json, short_id, truncate},
    terminal::{Colorize, is_narrow, progress_bar},
    today,
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show progress towards requirements")]
pub struct Progress {
    /// Show one requirement and the records counting towards it
    id: Option<String>,

    /// Include inactive requirements
    #[arg(long, short)]
    all: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Progress {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let initialized = is_initialized(&root);
        let ledger = load(root)?;

        if let Some(id) = &self.id {
            let requirement = ledger.find_requirement(id)?;
            return self.show_one(&ledger, requirement);
        }

        let rows = ledger.progress_all(self.all);

        if rows.is_empty() && !self.quiet && matches!(self.output, OutputFormat::Table) {
            if initialized {
                println!("No requirements found yet. Create one with 'cme requirement create'.");
            } else {
                println!("No credit ledger here. Create one with 'cme init'.");
            }
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&ledger, &rows)?,
            OutputFormat::Table if self.quiet => Self::output_quiet(&rows),
            OutputFormat::Table => Self::output_table(&ledger, &rows),
        }
        Ok(())
    }

    fn show_one(&self, ledger: &Ledger<Loaded>, requirement: &Requirement) -> anyhow::Result<()> {
        let progress = ledger.progress(requirement);
        let records: Vec<_> = matching_records(requirement, ledger.records()).collect();

        match self.output {
            OutputFormat::Json => {
                let mut value = requirement_json(requirement, &progress);
                value["records"] = records.iter().map(|r| record_json(r)).collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Table if self.quiet => Self::output_quiet(&[(requirement, progress)]),
            OutputFormat::Table => {
                let filters = requirement.filters();
                println!("{}", requirement.name());
                println!("{}", "─".repeat(requirement.name().chars().count()).dim());
                println!("Id:           {}", requirement.id());
                println!("Kind:         {}", requirement.kind());
                println!("Status:       {}", status_label(requirement, &progress));
                println!(
                    "Progress:     {} / {} ({}%)",
                    progress.credits_earned.normalize(),
                    progress.credits_required.normalize(),
                    progress.percent()
                );
                println!("Credit types: {}", or_any(&filters.credit_types.joined(", ")));
                println!("Providers:    {}", or_any(&join(&filters.providers)));
                println!("Subjects:     {}", or_any(&join(&filters.subjects)));
                println!("Years:        {}", filters.years);
                if let Some(due) = requirement.due_date() {
                    println!("Due:          {due}");
                }
                if let Some(notes) = requirement.notes() {
                    println!("Notes:        {notes}");
                }

                println!();
                if records.is_empty() {
                    println!("{}", "No matching records.".dim());
                } else {
                    println!("Matching records ({})", records.len());
                    for record in records {
                        println!(
                            "  {}  {}  {:>6}  {}",
                            short_id(record.id()),
                            record.completion_date(),
                            record.credits().to_string(),
                            record.title()
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn output_json(
        ledger: &Ledger<Loaded>,
        rows: &[(&Requirement, RequirementProgress)],
    ) -> anyhow::Result<()> {
        let requirements: Vec<_> = rows
            .iter()
            .map(|(requirement, progress)| requirement_json(requirement, progress))
            .collect();
        let upcoming: Vec<_> = ledger
            .upcoming_deadlines(today())
            .into_iter()
            .map(|r| json!({ "id": r.id(), "name": r.name(), "due_date": r.due_date() }))
            .collect();

        let output = json!({
            "requirements": requirements,
            "upcoming_deadlines": upcoming,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(rows: &[(&Requirement, RequirementProgress)]) {
        for (requirement, progress) in rows {
            println!(
                "{} earned={} required={} complete={}",
                short_id(requirement.id()),
                progress.credits_earned.normalize(),
                progress.credits_required.normalize(),
                progress.is_complete
            );
        }
    }

    fn output_table(ledger: &Ledger<Loaded>, rows: &[(&Requirement, RequirementProgress)]) {
        let narrow = is_narrow();

        println!("Requirement progress");
        println!("{}", "────────────────────".dim());

        if narrow {
            for (requirement, progress) in rows {
                println!(
                    "{}: {} / {} {}",
                    requirement.name(),
                    progress.credits_earned.normalize(),
                    progress.credits_required.normalize(),
                    status_label(requirement, progress)
                );
            }
        } else {
            println!(
                "{:<8}  {:<28}  {:<20}  {:>15}  Status",
                "ID", "Requirement", "", "Credits"
            );
            for (requirement, progress) in rows {
                let credits = format!(
                    "{} / {}",
                    progress.credits_earned.normalize(),
                    progress.credits_required.normalize()
                );
                println!(
                    "{:<8}  {:<28}  {}  {credits:>15}  {}",
                    short_id(requirement.id()),
                    truncate(requirement.name(), 28),
                    progress_bar(progress.percent()),
                    status_label(requirement, progress)
                );
            }
        }

        let upcoming = ledger.upcoming_deadlines(today());
        if !upcoming.is_empty() {
            println!();
            println!("Upcoming deadlines");
            for requirement in upcoming {
                if let Some(due) = requirement.due_date() {
                    println!("  {due}  {}", requirement.name());
                }
            }
        }
    }
}

fn status_label(requirement: &Requirement, progress: &RequirementProgress) -> String {
    if !requirement.is_active() {
        "inactive".dim()
    } else if progress.is_complete {
        "✅ complete".success()
    } else {
        format!("{} remaining", progress.remaining().normalize()).warning()
    }
}

fn requirement_json(requirement: &Requirement, progress: &RequirementProgress) -> serde_json::Value {
    let filters = requirement.filters();
    let credit_types: Vec<&str> = filters.credit_types.iter().map(|t| t.as_str()).collect();
    json!({
        "id": requirement.id(),
        "name": requirement.name(),
        "requirement_type": requirement.kind(),
        "is_active": requirement.is_active(),
        "credit_types": credit_types,
        "providers": filters.providers,
        "subjects": filters.subjects,
        "start_year": filters.years.start(),
        "end_year": filters.years.end(),
        "due_date": requirement.due_date(),
        "credits_required": progress.credits_required,
        "credits_earned": progress.credits_earned,
        "remaining": progress.remaining(),
        "percent": progress.percent(),
        "matching_count": progress.matching_count,
        "is_complete": progress.is_complete,
    })
}

fn join(values: &std::collections::BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn or_any(value: &str) -> &str {
    if value.is_empty() { "any" } else { value }
}
