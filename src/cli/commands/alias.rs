//! `catalog alias` command - External names for canonical variables

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{escape_csv, open_engine, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Subcommand, Debug)]
pub enum AliasCommands {
    /// List aliases, optionally for one variable
    List(ListArgs),

    /// Map an external name to a variable
    Add(AliasArgs),

    /// Change an existing alias
    Set(SetArgs),

    /// Remove an alias
    Remove(AliasArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only this variable
    #[arg(long)]
    pub variable: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AliasArgs {
    /// Canonical variable
    pub variable: String,

    /// External name (matched case-insensitively)
    pub alias: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Canonical variable
    pub variable: String,

    /// Current alias
    pub old: String,

    /// Replacement alias
    pub new: String,
}

pub fn run(cmd: AliasCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AliasCommands::List(args) => run_list(args, global),
        AliasCommands::Add(args) => run_add(args, global),
        AliasCommands::Set(args) => run_set(args, global),
        AliasCommands::Remove(args) => run_remove(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let mut entries = engine.aliases().all()?;
    if let Some(ref variable) = args.variable {
        entries.retain(|e| &e.variable == variable);
    }

    match resolve_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&entries).into_diagnostic()?),
        OutputFormat::Csv => {
            println!("variable,alias");
            for entry in &entries {
                println!("{},{}", escape_csv(&entry.variable), escape_csv(&entry.alias));
            }
        }
        OutputFormat::Id => {
            for entry in &entries {
                println!("{}", entry.alias);
            }
        }
        _ => {
            if entries.is_empty() {
                if !global.quiet {
                    println!("No aliases defined.");
                }
                return Ok(());
            }
            println!("{:<20} {}", style("VARIABLE").bold(), style("ALIAS").bold());
            println!("{}", "-".repeat(44));
            for entry in &entries {
                println!("{:<20} {}", style(&entry.variable).cyan(), entry.alias);
            }
        }
    }
    Ok(())
}

fn run_add(args: AliasArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    if let Some(existing) = engine.aliases().resolve(&args.alias)? {
        return Err(miette::miette!(
            "Alias '{}' already maps to '{}'",
            args.alias,
            existing
        ));
    }
    engine.alias_add(&args.variable, &args.alias)?;

    if !global.quiet {
        println!(
            "{} {} now maps to {}",
            style("✓").green(),
            style(&args.alias).cyan(),
            style(&args.variable).cyan()
        );
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    engine.alias_set(&args.variable, &args.old, &args.new)?;

    if !global.quiet {
        println!(
            "{} Alias {} of {} is now {}",
            style("✓").green(),
            args.old,
            style(&args.variable).cyan(),
            style(&args.new).cyan()
        );
    }
    Ok(())
}

fn run_remove(args: AliasArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    engine.alias_remove(&args.variable, &args.alias)?;

    if !global.quiet {
        println!(
            "{} Removed alias {} of {}",
            style("✓").green(),
            args.alias,
            style(&args.variable).cyan()
        );
    }
    Ok(())
}
