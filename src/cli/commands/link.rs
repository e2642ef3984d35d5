//! `catalog link` command - Rename/merge links between product identities

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, open_engine, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::RelinkPivot;

#[derive(clap::Subcommand, Debug)]
pub enum LinkCommands {
    /// List every link
    List,

    /// Record that OLD is now NEW (replaces any link leaving OLD)
    Add(LinkArgs),

    /// Rewrite existing links
    Relink(RelinkArgs),

    /// Remove a link
    Remove(LinkArgs),

    /// Identities that now map to a product
    To(ToArgs),

    /// Follow links from a name to its current identity
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct LinkArgs {
    /// Earlier identity
    pub old: String,

    /// Current identity
    pub new: String,
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
PIVOTS:
  --by old          the link leaving OLD is pointed at NEW (default)
  --by new          links pointing at NEW get OLD as their source
  --anchor NAME     the link leaving NAME is replaced by OLD -> NEW
")]
pub struct RelinkArgs {
    pub old: String,

    pub new: String,

    /// Which endpoint selects the link to rewrite
    #[arg(long, value_enum, default_value = "old", conflicts_with = "anchor")]
    pub by: PivotEnd,

    /// Rewrite the link leaving this name instead
    #[arg(long)]
    pub anchor: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PivotEnd {
    Old,
    New,
}

#[derive(clap::Args, Debug)]
pub struct ToArgs {
    /// Product name
    pub product: String,

    /// Only direct predecessors
    #[arg(long)]
    pub direct: bool,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Any earlier or current name
    pub name: String,
}

pub fn run(cmd: LinkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        LinkCommands::List => run_list(global),
        LinkCommands::Add(args) => run_add(args, global),
        LinkCommands::Relink(args) => run_relink(args, global),
        LinkCommands::Remove(args) => run_remove(args, global),
        LinkCommands::To(args) => run_to(args, global),
        LinkCommands::Resolve(args) => run_resolve(args, global),
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let edges = engine.links().all()?;

    if edges.is_empty() {
        if !global.quiet {
            println!("No links.");
        }
        return Ok(());
    }

    match resolve_format(global, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&edges).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&edges).into_diagnostic()?),
        OutputFormat::Csv => {
            println!("old,new");
            for edge in &edges {
                println!("{},{}", escape_csv(&edge.old), escape_csv(&edge.new));
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Old", "New"]);
            for edge in &edges {
                builder.push_record([&edge.old, &edge.new]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Id => {
            for edge in &edges {
                println!("{}", edge.old);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            for edge in &edges {
                println!(
                    "{:<24} {} {}",
                    edge.old,
                    style("→").dim(),
                    style(&edge.new).cyan()
                );
            }
            if !global.quiet {
                println!();
                println!("{} link(s).", style(edges.len()).cyan());
            }
        }
    }
    Ok(())
}

fn run_add(args: LinkArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    engine.link(&args.old, &args.new)?;

    if !global.quiet {
        println!(
            "{} Linked {} {} {}",
            style("✓").green(),
            style(&args.old).cyan(),
            style("→").dim(),
            style(&args.new).cyan()
        );
    }
    Ok(())
}

fn run_relink(args: RelinkArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let pivot = match (args.anchor, args.by) {
        (Some(anchor), _) => RelinkPivot::Anchor(anchor),
        (None, PivotEnd::Old) => RelinkPivot::ByOld,
        (None, PivotEnd::New) => RelinkPivot::ByNew,
    };
    let changed = engine.relink(&args.old, &args.new, &pivot)?;

    if !global.quiet {
        println!(
            "{} Rewrote {} link(s); {} {} {}",
            style("✓").green(),
            changed,
            style(&args.old).cyan(),
            style("→").dim(),
            style(&args.new).cyan()
        );
    }
    Ok(())
}

fn run_remove(args: LinkArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    engine.unlink(&args.old, &args.new)?;

    if !global.quiet {
        println!(
            "{} Removed link {} {} {}",
            style("✓").green(),
            style(&args.old).cyan(),
            style("→").dim(),
            style(&args.new).cyan()
        );
    }
    Ok(())
}

fn run_to(args: ToArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let names = if args.direct {
        engine.links().incoming_to(&args.product)?
    } else {
        engine.prior_identities(&args.product)?
    };

    match resolve_format(global, OutputFormat::Id) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&names).into_diagnostic()?),
        _ => {
            for name in &names {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

fn run_resolve(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let chain = engine.links().chain_from(&args.name)?;

    match resolve_format(global, OutputFormat::Id) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chain).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&chain).into_diagnostic()?),
        OutputFormat::Id => {
            println!("{}", engine.resolve_current(&args.name)?);
        }
        _ => println!("{}", chain.join(" → ")),
    }
    Ok(())
}
