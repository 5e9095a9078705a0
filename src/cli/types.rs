use std::path::PathBuf;

use clap::Parser;
use cme_tracker::domain::{Catalog, catalog};
use tracing::instrument;

use super::{load, terminal::Colorize};

#[derive(Debug, clap::Subcommand)]
pub enum TypesCommand {
    /// List the credit types for the current profession
    List(List),

    /// Add a custom credit type
    Add(Add),

    /// Remove a custom credit type
    Remove(Remove),
}

impl TypesCommand {
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(root),
            Self::Add(command) => command.run(root),
            Self::Remove(command) => command.run(root),
        }
    }
}

#[derive(Debug, Parser)]
pub struct List {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl List {
    #[instrument(level = "debug", skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let ledger = load(root)?;
        let config = ledger.config();
        let entries = Catalog::new(config.profession, &config.custom_credit_types).entries();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        println!("Credit types for {}", config.profession);
        println!("{:<18} {:<40} Description", "Id", "Name");
        for entry in &entries {
            let line = format!("{:<18} {:<40} {}", entry.id, entry.name, entry.description);
            if entry.is_custom {
                println!("{}", line.dim());
            } else {
                println!("{line}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Add {
    /// Display name
    name: String,

    /// Description
    #[arg(long, short)]
    description: Option<String>,
}

impl Add {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let id = catalog::add_custom_type(
            &mut ledger.config_mut().custom_credit_types,
            &self.name,
            self.description,
        )?;
        ledger.save_config()?;

        println!("{}", format!("✅ Added credit type {id}").success());
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Remove {
    /// Id of the custom credit type
    id: String,
}

impl Remove {
    #[instrument]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut ledger = load(root)?;
        let removed =
            catalog::remove_custom_type(&mut ledger.config_mut().custom_credit_types, &self.id)?;
        ledger.save_config()?;

        let in_use = ledger
            .records()
            .iter()
            .filter(|r| r.credit_types().contains(&removed.id))
            .count();
        println!(
            "{}",
            format!("✅ Removed credit type {} ({})", removed.id, removed.name).success()
        );
        if in_use > 0 {
            println!(
                "{}",
                format!("{in_use} records still carry this tag; it is shown by id from now on.")
                    .dim()
            );
        }
        Ok(())
    }
}
