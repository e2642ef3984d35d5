//! `catalog hierarchy` command - Tier titles

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{escape_csv, open_engine, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Attribute;

#[derive(clap::Subcommand, Debug)]
pub enum HierarchyCommands {
    /// List titles, optionally for one tier
    List(ListArgs),

    /// Add a title to a tier
    Add(TitleArgs),

    /// Rename a title and every product attribute holding it
    Rename(RenameArgs),

    /// Remove a title and clear it from every product holding it
    Remove(TitleArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Tier (account, class, category, subcategory)
    #[arg(long, short = 't')]
    pub tier: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct TitleArgs {
    /// Tier (account, class, category, subcategory)
    pub tier: String,

    /// Title
    pub title: String,
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    /// Tier (account, class, category, subcategory)
    pub tier: String,

    /// Current title
    pub old: String,

    /// New title
    pub new: String,
}

pub fn run(cmd: HierarchyCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        HierarchyCommands::List(args) => run_list(args, global),
        HierarchyCommands::Add(args) => run_add(args, global),
        HierarchyCommands::Rename(args) => run_rename(args, global),
        HierarchyCommands::Remove(args) => run_remove(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let mut entries = engine.hierarchy().all()?;
    if let Some(ref tier) = args.tier {
        let tier = Attribute::parse_tier(tier)?;
        entries.retain(|e| e.tier == tier);
    }

    match resolve_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&entries).into_diagnostic()?),
        OutputFormat::Csv => {
            println!("tier,title");
            for entry in &entries {
                println!("{},{}", entry.tier, escape_csv(&entry.title));
            }
        }
        OutputFormat::Id => {
            for entry in &entries {
                println!("{}", entry.title);
            }
        }
        _ => {
            for tier in Attribute::tiers() {
                let titles: Vec<&str> = entries
                    .iter()
                    .filter(|e| e.tier == *tier)
                    .map(|e| e.title.as_str())
                    .collect();
                if titles.is_empty() {
                    continue;
                }
                println!("{}", style(tier).bold());
                for title in titles {
                    println!("  {}", title);
                }
            }
            if entries.is_empty() && !global.quiet {
                println!("No titles defined.");
            }
        }
    }
    Ok(())
}

fn run_add(args: TitleArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let tier = Attribute::parse_tier(&args.tier)?;
    let added = engine.hierarchy_add(tier, &args.title)?;

    if !global.quiet {
        if added {
            println!(
                "{} Added {} title {}",
                style("✓").green(),
                tier,
                style(&args.title).cyan()
            );
        } else {
            println!(
                "{} {} title {} already exists",
                style("!").yellow(),
                tier,
                style(&args.title).cyan()
            );
        }
    }
    Ok(())
}

fn run_rename(args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let tier = Attribute::parse_tier(&args.tier)?;
    let products = engine.hierarchy_rename(tier, &args.old, &args.new)?;

    if !global.quiet {
        println!(
            "{} Renamed {} {} to {} ({} product(s) updated)",
            style("✓").green(),
            tier,
            style(&args.old).cyan(),
            style(&args.new).cyan(),
            products
        );
    }
    Ok(())
}

fn run_remove(args: TitleArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let tier = Attribute::parse_tier(&args.tier)?;
    let products = engine.hierarchy_remove(tier, &args.title)?;

    if !global.quiet {
        println!(
            "{} Removed {} {} ({} product(s) cleared)",
            style("✓").green(),
            tier,
            style(&args.title).cyan(),
            products
        );
    }
    Ok(())
}
