//! `catalog product` command - Product record management

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    collect_names, escape_csv, open_engine, parse_assignments, resolve_format, truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Attribute, Filter, Patch, ProductRecord};

const HEADERS: [&str; 6] = ["PRODUCT", "SKU", "ACCOUNT", "CLASS", "CATEGORY", "SUBCATEGORY"];

#[derive(clap::Subcommand, Debug)]
pub enum ProductCommands {
    /// List products, optionally filtered
    List(ListArgs),

    /// Show one product with its prior identities
    Show(ShowArgs),

    /// Add a product
    Add(AddArgs),

    /// Change attributes of one product (key=value, empty value clears)
    Set(SetArgs),

    /// Apply the same tier attributes to many products
    BulkSet(BulkSetArgs),

    /// Remove a product
    Remove(RemoveArgs),

    /// Distinct values held by one attribute
    Values(ValuesArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Product name prefix
    #[arg(long)]
    pub product: Option<String>,

    /// SKU prefix
    #[arg(long)]
    pub sku: Option<String>,

    /// Exact account
    #[arg(long)]
    pub account: Option<String>,

    /// Exact class
    #[arg(long)]
    pub class: Option<String>,

    /// Exact category
    #[arg(long)]
    pub category: Option<String>,

    /// Exact subcategory
    #[arg(long)]
    pub subcategory: Option<String>,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Product name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Product name
    pub name: String,

    #[arg(long)]
    pub sku: Option<String>,

    #[arg(long)]
    pub account: Option<String>,

    #[arg(long)]
    pub class: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub subcategory: Option<String>,
}

#[derive(clap::Args, Debug)]
#[command(after_help = "\
EXAMPLES:
  catalog product set Widget sku=SKU1 class=Tools
  catalog product set Widget category=          # clear category
  catalog product set Widget product=Gadget     # rename (cascades into links)
")]
pub struct SetArgs {
    /// Product name
    pub name: String,

    /// Changes as key=value
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub changes: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct BulkSetArgs {
    /// Product names (use - to read names from stdin)
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Changes as key=value (product and sku are rejected)
    #[arg(long = "set", short = 's', required = true, value_name = "KEY=VALUE")]
    pub changes: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Product name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ValuesArgs {
    /// Attribute name (product, sku, account, class, category, subcategory)
    pub attribute: String,
}

pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::List(args) => run_list(args, global),
        ProductCommands::Show(args) => run_show(args, global),
        ProductCommands::Add(args) => run_add(args, global),
        ProductCommands::Set(args) => run_set(args, global),
        ProductCommands::BulkSet(args) => run_bulk_set(args, global),
        ProductCommands::Remove(args) => run_remove(args, global),
        ProductCommands::Values(args) => run_values(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;

    let mut filter = Filter::new();
    for (attr, value) in [
        (Attribute::Product, &args.product),
        (Attribute::Sku, &args.sku),
        (Attribute::Account, &args.account),
        (Attribute::Class, &args.class),
        (Attribute::Category, &args.category),
        (Attribute::Subcategory, &args.subcategory),
    ] {
        if let Some(value) = value {
            filter = filter.with(attr, value.as_str());
        }
    }

    let products = engine.catalog().query(&filter)?;

    if args.count {
        println!("{}", products.len());
        return Ok(());
    }

    if products.is_empty() {
        if !global.quiet {
            println!("No products found.");
        }
        return Ok(());
    }

    print_products(&products, resolve_format(global, OutputFormat::Tsv), global.quiet)
}

/// Render product rows in any list format
pub fn print_products(products: &[ProductRecord], format: OutputFormat, quiet: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(products).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&products).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(Attribute::all().iter().map(|a| a.as_str()))
                .into_diagnostic()?;
            for product in products {
                wtr.write_record(product.to_row()).into_diagnostic()?;
            }
            wtr.flush().into_diagnostic()?;
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(Attribute::all().iter().map(|a| a.as_str()));
            for product in products {
                builder.push_record(product.to_row());
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Id => {
            for product in products {
                println!("{}", product.product);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            let header: Vec<String> = HEADERS
                .iter()
                .enumerate()
                .map(|(i, h)| format!("{:<w$}", style(h).bold(), w = column_width(i)))
                .collect();
            println!("{}", header.join(" "));
            println!("{}", "-".repeat(100));

            for product in products {
                let row: Vec<String> = product
                    .to_row()
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let w = column_width(i);
                        let cell = if cell.is_empty() { "-" } else { cell.as_str() };
                        format!("{:<w$}", truncate_str(cell, w - 2), w = w)
                    })
                    .collect();
                println!("{}", row.join(" "));
            }

            if !quiet {
                println!();
                println!("{} product(s) found.", style(products.len()).cyan());
            }
        }
    }
    Ok(())
}

fn column_width(column: usize) -> usize {
    match column {
        0 => 24,
        1 => 14,
        _ => 15,
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let product = engine
        .catalog()
        .get(&args.name)?
        .ok_or_else(|| miette::miette!("Product '{}' not found", args.name))?;
    let prior = engine.prior_identities(&product.product)?;
    let observations = engine.observations().count_for(&product.product)?;

    match resolve_format(global, OutputFormat::Yaml) {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "product": product,
                "prior_identities": prior,
                "observations": observations,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&product).into_diagnostic()?);
            if !prior.is_empty() {
                println!("prior_identities:");
                for name in &prior {
                    println!("- {}", name);
                }
            }
            println!("observations: {}", observations);
        }
        OutputFormat::Id => println!("{}", product.product),
        format => {
            print_products(std::slice::from_ref(&product), format, true)?;
            if !prior.is_empty() && !global.quiet {
                println!();
                println!("Previously known as: {}", prior.join(", "));
            }
        }
    }
    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;

    let mut record = ProductRecord::new(args.name.as_str());
    for (attr, value) in [
        (Attribute::Sku, &args.sku),
        (Attribute::Account, &args.account),
        (Attribute::Class, &args.class),
        (Attribute::Category, &args.category),
        (Attribute::Subcategory, &args.subcategory),
    ] {
        if let Some(value) = value {
            record.set(attr, value);
        }
    }

    engine.add_product(&record)?;

    if !global.quiet {
        println!(
            "{} Added product {}",
            style("✓").green(),
            style(&record.product).cyan()
        );
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let patch = Patch::from_fields(&parse_assignments(&args.changes)?)?;

    engine.set_product(&args.name, &patch)?;

    if !global.quiet {
        let name = patch.get(Attribute::Product).unwrap_or(&args.name);
        println!(
            "{} Updated product {}",
            style("✓").green(),
            style(name).cyan()
        );
    }
    Ok(())
}

fn run_bulk_set(args: BulkSetArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let names = collect_names(&args.names)?;
    let patch = Patch::from_fields(&parse_assignments(&args.changes)?)?;

    let updated = engine.set_products(&names, &patch)?;

    if !global.quiet {
        println!(
            "{} Updated {} of {} product(s)",
            style("✓").green(),
            style(updated).cyan(),
            names.len()
        );
    }
    Ok(())
}

fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let removed = engine.remove_product(&args.name)?;

    if !global.quiet {
        if removed {
            println!(
                "{} Removed product {}",
                style("✓").green(),
                style(&args.name).cyan()
            );
        } else {
            println!(
                "{} Product {} did not exist",
                style("!").yellow(),
                style(&args.name).cyan()
            );
        }
    }
    Ok(())
}

fn run_values(args: ValuesArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let attr: Attribute = args.attribute.parse()?;
    let values = engine.catalog().attribute_values(attr)?;

    match resolve_format(global, OutputFormat::Id) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&values).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&values).into_diagnostic()?),
        OutputFormat::Csv => {
            println!("{}", attr);
            for value in &values {
                println!("{}", escape_csv(value));
            }
        }
        _ => {
            for value in &values {
                println!("{}", value);
            }
        }
    }
    Ok(())
}
