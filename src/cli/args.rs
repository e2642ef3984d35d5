//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    alias::AliasCommands,
    completions::CompletionsArgs,
    hierarchy::HierarchyCommands,
    identity::{MergeArgs, RenameArgs},
    import::ImportCommands,
    init::InitArgs,
    link::LinkCommands,
    missing::MissingCommands,
    product::ProductCommands,
};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Product catalog for forecasting pipelines")]
#[command(long_about = "Keeps canonical products, the naming hierarchy, variable aliases, the missing-SKU queue and the rename/merge link graph consistent in one SQLite file.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Catalog database file (default: $CATALOG_DB, config, or the user data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a catalog database
    Init(InitArgs),

    /// Product records
    #[command(subcommand)]
    Product(ProductCommands),

    /// Import products or observations from CSV
    #[command(subcommand)]
    Import(ImportCommands),

    /// Unresolved SKUs awaiting assignment
    #[command(subcommand)]
    Missing(MissingCommands),

    /// Tier titles (account, class, category, subcategory)
    #[command(subcommand)]
    Hierarchy(HierarchyCommands),

    /// External names for canonical variables
    #[command(subcommand)]
    Alias(AliasCommands),

    /// Rename/merge links between product identities
    #[command(subcommand)]
    Link(LinkCommands),

    /// Rename a product everywhere it is referenced
    Rename(RenameArgs),

    /// Fold one product into another
    Merge(MergeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just names, one per line
    Id,
}
