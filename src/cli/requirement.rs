use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use cme_tracker::{CreditTypes, Credits, Filters, Requirement, RequirementKind, YearRange};
use tracing::instrument;

use super::{
    load, parse_date,
    record::short_id,
    terminal::{Colorize, confirm},
};

#[derive(Debug, clap::Subcommand)]
pub enum RequirementCommand {
    /// Create a requirement
    Create(Create),

    /// Change an existing requirement
    Edit(Edit),

    /// Resume tracking an inactive requirement
    Activate(Target),

    /// Stop tracking a requirement but keep it for history
    Deactivate(Target),

    /// Permanently delete a requirement
    ///
    /// Records are never deleted with it.
    Delete(Delete),
}

impl RequirementCommand {
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Create(command) => command.run(root),
            Self::Edit(command) => command.run(root),
            Self::Activate(target) => target.set_active(root, true),
            Self::Deactivate(target) => target.set_active(root, false),
            Self::Delete(command) => command.run(root),
        }
    }
}

/// Matching criteria shared by `create` and `edit`.
#[derive(Debug, clap::Args)]
struct FilterArgs {
    /// Accepted credit types (comma-separated)
    #[arg(long = "credit-type", short = 't', value_delimiter = ',')]
    credit_types: Option<Vec<String>>,

    /// Accepted providers (comma-separated)
    #[arg(long = "provider", short = 'p', value_delimiter = ',')]
    providers: Option<Vec<String>>,

    /// Accepted subjects (comma-separated)
    #[arg(long = "subject", short = 's', value_delimiter = ',')]
    subjects: Option<Vec<String>>,

    /// First eligible completion year
    #[arg(long)]
    start_year: Option<i32>,

    /// Last eligible completion year
    #[arg(long)]
    end_year: Option<i32>,

    /// Only count records from this year
    #[arg(long, conflicts_with_all = ["start_year", "end_year"])]
    year: Option<i32>,
}

impl FilterArgs {
    /// Apply the given options over `filters`, leaving unspecified ones alone.
    fn apply(self, filters: &mut Filters) -> Result<(), cme_tracker::domain::RequirementError> {
        if let Some(credit_types) = self.credit_types {
            filters.credit_types = CreditTypes::normalize(&credit_types, None);
        }
        if let Some(providers) = self.providers {
            filters.providers = Filters::names(&providers);
        }
        if let Some(subjects) = self.subjects {
            filters.subjects = Filters::names(&subjects);
        }
        if let Some(year) = self.year {
            filters.years = YearRange::single(year);
        } else if self.start_year.is_some() || self.end_year.is_some() {
            filters.years = YearRange::new(
                self.start_year.or(filters.years.start()),
                self.end_year.or(filters.years.end()),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Create {
    /// Requirement name
    name: String,

    /// Credits required
    #[arg(long, short)]
    credits: Credits,

    /// Kind of obligation (license_renewal, board_recert, hospital, personal)
    #[arg(long, short, default_value = "personal")]
    kind: RequirementKind,

    #[command(flatten)]
    filters: FilterArgs,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    due: Option<NaiveDate>,

    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,
}

impl Create {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;

        let mut filters = Filters::default();
        self.filters.apply(&mut filters)?;

        let mut requirement = Requirement::new(self.name, self.kind, filters, self.credits)?;
        requirement.set_due_date(self.due);
        requirement.set_notes(self.notes);

        let requirement = ledger.add_requirement(requirement)?.clone();
        let progress = ledger.progress(&requirement);
        println!(
            "{}",
            format!(
                "✅ Created requirement {} '{}'",
                short_id(requirement.id()),
                requirement.name()
            )
            .success()
        );
        println!(
            "   {} of {} credits already earned from {} records",
            progress.credits_earned.normalize(),
            progress.credits_required.normalize(),
            progress.matching_count
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Edit {
    /// Requirement id or unique id prefix
    id: String,

    /// New name
    #[arg(long)]
    name: Option<String>,

    /// New credit target
    #[arg(long, short)]
    credits: Option<Credits>,

    /// New kind of obligation
    #[arg(long, short)]
    kind: Option<RequirementKind>,

    #[command(flatten)]
    filters: FilterArgs,

    /// Accept records from any year
    #[arg(long, conflicts_with_all = ["start_year", "end_year", "year"])]
    any_year: bool,

    /// New due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    due: Option<NaiveDate>,

    /// Remove the due date
    #[arg(long, conflicts_with = "due")]
    clear_due: bool,

    /// New notes (an empty string clears them)
    #[arg(long)]
    notes: Option<String>,
}

impl Edit {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let id = ledger.find_requirement(&self.id)?.id();

        let Self {
            name,
            credits,
            kind,
            filters,
            any_year,
            due,
            clear_due,
            notes,
            ..
        } = self;

        let requirement = ledger.update_requirement(id, |requirement| {
            if let Some(name) = name {
                requirement.set_name(name)?;
            }
            if let Some(credits) = credits {
                requirement.set_credits_required(credits)?;
            }
            if let Some(kind) = kind {
                requirement.set_kind(kind);
            }
            filters.apply(requirement.filters_mut())?;
            if any_year {
                requirement.filters_mut().years = YearRange::UNBOUNDED;
            }
            if due.is_some() || clear_due {
                requirement.set_due_date(due);
            }
            if notes.is_some() {
                requirement.set_notes(notes);
            }
            Ok(())
        })?;

        println!(
            "{}",
            format!("✅ Updated requirement '{}'", requirement.name()).success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Target {
    /// Requirement id or unique id prefix
    id: String,
}

impl Target {
    #[instrument]
    fn set_active(self, root: PathBuf, active: bool) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let requirement = ledger.find_requirement(&self.id)?;
        let id = requirement.id();

        if requirement.is_active() == active {
            let state = if active { "active" } else { "inactive" };
            println!("Requirement '{}' is already {state}", requirement.name());
            return Ok(());
        }

        let requirement = ledger.update_requirement(id, |requirement| {
            if active {
                requirement.reactivate();
            } else {
                requirement.deactivate();
            }
            Ok(())
        })?;

        let verb = if active { "Activated" } else { "Deactivated" };
        println!(
            "{}",
            format!("✅ {verb} requirement '{}'", requirement.name()).success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Delete {
    /// Requirement id or unique id prefix
    id: String,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Delete {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let requirement = ledger.find_requirement(&self.id)?;
        let id = requirement.id();

        if !self.yes {
            println!(
                "Will permanently delete requirement '{}'. Records are kept.",
                requirement.name()
            );
            println!(
                "{}",
                "Use 'cme requirement deactivate' to keep it for history instead.".dim()
            );
            if !confirm("\nProceed?")? {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        let requirement = ledger.delete_requirement(id)?;
        println!(
            "{}",
            format!("✅ Deleted requirement '{}'", requirement.name()).success()
        );
        Ok(())
    }
}
