//! `catalog init` command - Create a catalog database

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::database_path;
use crate::cli::GlobalOpts;
use crate::core::store::schema::schema_version;
use crate::core::{open_connection, Config};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Database file (default: --db, $CATALOG_DB, config, or the user data dir)
    pub path: Option<PathBuf>,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = match args.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
            path
        }
        None => database_path(global)?,
    };

    let existed = path.exists();
    let conn = open_connection(&path)?;
    let version = schema_version(&conn)?.unwrap_or_default();

    if global.quiet {
        return Ok(());
    }

    if existed {
        println!(
            "{} Catalog already exists at {} (schema v{})",
            style("!").yellow(),
            style(path.display()).cyan(),
            version
        );
        return Ok(());
    }

    println!(
        "{} Initialized catalog at {} (schema v{})",
        style("✓").green(),
        style(path.display()).cyan(),
        version
    );
    println!();
    println!("Next steps:");
    println!(
        "  {} Define tier titles",
        style("catalog hierarchy add account Retail").yellow()
    );
    println!(
        "  {} Load products",
        style("catalog import products products.csv").yellow()
    );
    if let Some(config_path) = Config::global_config_path() {
        println!(
            "  {} Set a default database in {}",
            style("database:").yellow(),
            config_path.display()
        );
    }
    Ok(())
}
