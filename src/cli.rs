use std::path::{Path, PathBuf};

mod progress;
mod record;
mod report;
mod requirement;
mod terminal;
mod types;
mod validate;

use anyhow::Context;
use clap::ArgAction;
use cme_tracker::{
    Config, Ledger, Loaded,
    domain::{Npi, Profession},
    storage::import,
};
use progress::Progress;
use record::RecordCommand;
use report::ReportCommand;
use requirement::RequirementCommand;
use terminal::Colorize;
use tracing::instrument;
use types::TypesCommand;
use validate::Validate;

/// Load every record and requirement under `root`.
fn load(root: PathBuf) -> anyhow::Result<Ledger<Loaded>> {
    let display = root.display().to_string();
    Ledger::new(root)
        .load_all()
        .with_context(|| format!("failed to load the credit ledger in {display}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the credit ledger
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Progress(Progress::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show progress towards requirements (default)
    Progress(Progress),

    /// Initialize a new credit ledger
    Init(Init),

    /// Show or change the clinician profile
    Profile(Profile),

    /// Add, list, or remove certificates and self-reported activities
    #[command(subcommand)]
    Record(RecordCommand),

    /// Import records from a YAML list
    Import(Import),

    /// Manage requirements
    #[command(subcommand)]
    Requirement(RequirementCommand),

    /// Summaries and transcripts
    #[command(subcommand)]
    Report(ReportCommand),

    /// List and manage credit types
    #[command(subcommand)]
    Types(TypesCommand),

    /// Check every file in the ledger
    Validate(Validate),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Progress(command) => command.run(root)?,
            Self::Init(command) => command.run(root)?,
            Self::Profile(command) => command.run(root)?,
            Self::Record(command) => command.run(root)?,
            Self::Import(command) => command.run(root)?,
            Self::Requirement(command) => command.run(root)?,
            Self::Report(command) => command.run(root)?,
            Self::Types(command) => command.run(root)?,
            Self::Validate(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Profession, which selects the standard credit types
    #[arg(long, default_value = "physician")]
    profession: Profession,

    /// National Provider Identifier
    #[arg(long)]
    npi: Option<Npi>,
}

impl Init {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut config = Config::default();
        config.profession = self.profession;
        config.npi = self.npi;
        let ledger = Ledger::new(root).init(config)?;

        println!("Initialized credit ledger in {}", ledger.root().display());
        println!("  Profession: {}", ledger.config().profession);
        println!();
        println!("Next steps:");
        println!("  cme requirement create \"State licence\" --credits 50 --credit-type ama_cat1");
        println!("  cme record add \"Grand Rounds\" --provider \"Mayo Clinic\" --credits 1");
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Profile {
    /// Change the profession
    #[arg(long)]
    profession: Option<Profession>,

    /// Set the National Provider Identifier
    #[arg(long, conflicts_with = "clear_npi")]
    npi: Option<Npi>,

    /// Remove the stored National Provider Identifier
    #[arg(long)]
    clear_npi: bool,
}

impl Profile {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;

        let changed = self.profession.is_some() || self.npi.is_some() || self.clear_npi;
        let config = ledger.config_mut();
        if let Some(profession) = self.profession {
            config.profession = profession;
        }
        if let Some(npi) = self.npi {
            config.npi = Some(npi);
        }
        if self.clear_npi {
            config.npi = None;
        }
        if changed {
            ledger.save_config()?;
            println!("{}", "✅ Profile updated".success());
        }

        Self::print(ledger.config());
        Ok(())
    }

    fn print(config: &Config) {
        println!("Profession:   {}", config.profession);
        println!(
            "NPI:          {}",
            config.npi.as_ref().map_or("–", Npi::as_str)
        );
        println!("Custom types: {}", config.custom_credit_types.len());
    }
}

#[derive(Debug, clap::Parser)]
pub struct Import {
    /// YAML file containing a list of records
    path: PathBuf,
}

impl Import {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let rows = import::read_rows(&self.path)?;
        let report = ledger.import(rows);

        println!(
            "{}",
            format!("✅ Imported {} records", report.imported.len()).success()
        );
        if !report.errors.is_empty() {
            eprintln!(
                "{}",
                format!("⚠️  {} rows were skipped:", report.errors.len()).warning()
            );
            for (row, error) in &report.errors {
                eprintln!("  row {row}: {error}");
            }
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date argument.
fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected a date as YYYY-MM-DD: {e}"))
}

/// Today's date in local time.
fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Returns whether the ledger root has been initialized.
fn is_initialized(root: &Path) -> bool {
    root.join(cme_tracker::storage::ledger::META_DIR).is_dir()
}
