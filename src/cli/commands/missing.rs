//! `catalog missing` command - Unresolved SKU queue
//!
//! `assign` works like the operator form it replaces: the whole assignment
//! runs in one transaction that is committed only once the operator accepts,
//! including the overwrite prompt when the product already has a SKU.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{database_path, open_engine, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{open_connection, Engine, StageOutcome};

#[derive(clap::Subcommand, Debug)]
pub enum MissingCommands {
    /// List staged SKUs in the order they were found
    List,

    /// Stage a SKU that has no product yet
    Stage(StageArgs),

    /// Give a staged SKU to a product
    Assign(AssignArgs),
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    /// SKU to stage
    pub basis: String,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Staged SKU
    pub basis: String,

    /// Product to assign it to (prompted when omitted)
    pub product: Option<String>,

    /// Overwrite an existing SKU without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: MissingCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MissingCommands::List => run_list(global),
        MissingCommands::Stage(args) => run_stage(args, global),
        MissingCommands::Assign(args) => run_assign(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let entries = engine.missing().list()?;

    if entries.is_empty() {
        if !global.quiet {
            println!("No missing SKUs.");
        }
        return Ok(());
    }

    match resolve_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&entries).into_diagnostic()?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["id", "basis", "placeholder"]).into_diagnostic()?;
            for entry in &entries {
                wtr.write_record([entry.id.to_string(), entry.basis.clone(), entry.placeholder()])
                    .into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["ID", "SKU", "Placeholder"]);
            for entry in &entries {
                builder.push_record([entry.id.to_string(), entry.basis.clone(), entry.placeholder()]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Id => {
            for entry in &entries {
                println!("{}", entry.basis);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<6} {:<20} {}",
                style("ID").bold(),
                style("SKU").bold(),
                style("PLACEHOLDER").bold()
            );
            println!("{}", "-".repeat(44));
            for entry in &entries {
                println!(
                    "{:<6} {:<20} {}",
                    style(entry.id).cyan(),
                    entry.basis,
                    style(entry.placeholder()).dim()
                );
            }
            if !global.quiet {
                println!();
                println!("{} missing SKU(s).", style(entries.len()).cyan());
            }
        }
    }
    Ok(())
}

fn run_stage(args: StageArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;

    match engine.stage_missing(&args.basis)? {
        StageOutcome::Known(product) => {
            if !global.quiet {
                println!(
                    "{} SKU {} already belongs to {}",
                    style("!").yellow(),
                    style(&args.basis).cyan(),
                    style(product).cyan()
                );
            }
        }
        StageOutcome::Staged(entry) => {
            if !global.quiet {
                println!(
                    "{} Staged SKU {} as #{}",
                    style("✓").green(),
                    style(&entry.basis).cyan(),
                    entry.id
                );
            }
        }
    }
    Ok(())
}

fn run_assign(args: AssignArgs, global: &GlobalOpts) -> Result<()> {
    let mut conn = open_connection(&database_path(global)?)?;
    let tx = conn.transaction().into_diagnostic()?;
    let engine = Engine::attach(&tx)?;

    if engine.missing().id_of(&args.basis)?.is_none() {
        return Err(miette::miette!(
            "SKU '{}' is not in the missing queue",
            args.basis
        ));
    }

    let product = match args.product {
        Some(product) => product,
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Product for SKU {}", args.basis))
            .interact_text()
            .into_diagnostic()?,
    };

    let target = engine
        .catalog()
        .get(&product)?
        .ok_or_else(|| miette::miette!("Product '{}' not found", product))?;

    if let Some(existing) = target.sku.as_deref() {
        let accepted = args.yes
            || Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!(
                    "{} already has SKU {}. Replace it with {}?",
                    product, existing, args.basis
                ))
                .default(false)
                .interact()
                .into_diagnostic()?;
        if !accepted {
            // dropping the transaction rolls it back
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcome = engine.assign_missing(&args.basis, &product)?;
    drop(engine);
    tx.commit().into_diagnostic()?;

    if global.quiet {
        return Ok(());
    }
    println!(
        "{} Assigned SKU {} to {}",
        style("✓").green(),
        style(&args.basis).cyan(),
        style(&product).cyan()
    );
    if let Some(previous) = &outcome.previous_sku {
        println!("  replaced SKU {}", previous);
    }
    if outcome.placeholder_found() {
        println!(
            "  moved {} row(s) from {}",
            outcome.placeholder_rows, outcome.placeholder
        );
    } else {
        println!(
            "  {} no data was held under {}",
            style("!").yellow(),
            outcome.placeholder
        );
    }
    Ok(())
}
