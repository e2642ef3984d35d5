//! `catalog rename` and `catalog merge` commands

use console::style;
use miette::Result;

use crate::cli::helpers::open_engine;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    /// Current product name
    pub old: String,

    /// New product name
    pub new: String,
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
The source product is removed. Its observations move to the target, the
target takes its SKU when it has none, and a link SOURCE -> TARGET records
the merge.
")]
pub struct MergeArgs {
    /// Product being folded away
    pub from: String,

    /// Product that survives
    pub into: String,
}

pub fn run_rename(args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let outcome = engine.rename(&args.old, &args.new)?;

    if !global.quiet {
        println!(
            "{} Renamed {} to {}",
            style("✓").green(),
            style(&args.old).cyan(),
            style(&args.new).cyan()
        );
        println!(
            "  {} link(s) and {} observation(s) updated",
            outcome.links, outcome.observations
        );
    }
    Ok(())
}

pub fn run_merge(args: MergeArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let outcome = engine.merge(&args.from, &args.into)?;

    if !global.quiet {
        println!(
            "{} Merged {} into {}",
            style("✓").green(),
            style(&args.from).cyan(),
            style(&args.into).cyan()
        );
        println!("  {} observation(s) moved", outcome.observations);
        if outcome.sku_moved {
            println!("  SKU moved to {}", args.into);
        }
    }
    Ok(())
}
