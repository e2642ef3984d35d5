//! `catalog import` command - Load products or observations from CSV
//!
//! Header names pass through the alias store first, so an export with
//! `Item Number` and `Units Sold` columns can be loaded once aliases map
//! them to `sku` and `units`.

use chrono::{NaiveDate, Utc};
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::cli::helpers::open_engine;
use crate::cli::GlobalOpts;
use crate::core::{Attribute, Engine, ObservationRow};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(clap::Subcommand, Debug)]
pub enum ImportCommands {
    /// Import product rows (columns: product, sku, account, class, category, subcategory)
    Products(ProductsArgs),

    /// Import observations (columns: sku, date, then one column per variable)
    Data(DataArgs),
}

#[derive(clap::Args, Debug)]
pub struct ProductsArgs {
    /// CSV file
    pub file: PathBuf,

    /// Update existing products with the values in the file
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(clap::Args, Debug)]
pub struct DataArgs {
    /// CSV file
    pub file: PathBuf,

    /// Source label recorded in the import log (default: file name)
    #[arg(long)]
    pub source: Option<String>,
}

pub fn run(cmd: ImportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ImportCommands::Products(args) => run_products(args, global),
        ImportCommands::Data(args) => run_data(args, global),
    }
}

/// Read a CSV file into header → value rows with normalized header names
fn read_rows(engine: &Engine<'_>, path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let file = File::open(path)
        .map_err(|e| miette::miette!("Cannot open {}: {}", path.display(), e))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = rdr.headers().into_diagnostic()?.clone();
    let mut rows = Vec::new();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // +2 for 1-indexed and header row
        let record = result
            .map_err(|e| miette::miette!("CSV parse error at row {}: {}", row_num, e))?;

        let fields: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(engine.normalize_fields(&fields)?);
    }

    Ok(rows)
}

fn run_products(args: ProductsArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let mut rows = read_rows(&engine, &args.file)?;

    let mut ignored: Vec<String> = Vec::new();
    for row in &mut rows {
        row.retain(|key, _| {
            let known = key.parse::<Attribute>().is_ok();
            if !known && !ignored.contains(key) {
                ignored.push(key.clone());
            }
            known
        });
    }
    for column in &ignored {
        warn!(column = %column, "ignoring column that is not a product attribute");
    }

    let summary = engine.bulk_import(&rows, args.overwrite)?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Imported {} row(s) from {}",
        style("✓").green(),
        rows.len(),
        style(args.file.display()).cyan()
    );
    println!("  inserted:  {}", style(summary.inserted).green());
    println!("  updated:   {}", style(summary.updated).yellow());
    println!("  unchanged: {}", summary.unchanged);
    if summary.known_skus > 0 {
        println!("  known skus: {}", summary.known_skus);
    }
    for basis in &summary.settled {
        println!("  {} staged sku {} now assigned", style("✓").green(), basis);
    }
    if !summary.staged.is_empty() {
        println!();
        println!(
            "{} {} unknown sku(s) staged. Use {} to assign them.",
            style("!").yellow(),
            summary.staged.len(),
            style("catalog missing assign").yellow()
        );
    }
    Ok(())
}

fn run_data(args: DataArgs, global: &GlobalOpts) -> Result<()> {
    let engine = open_engine(global)?;
    let rows = read_rows(&engine, &args.file)?;

    let mut observations = Vec::new();
    for (row_idx, fields) in rows.iter().enumerate() {
        let row_num = row_idx + 2;
        let sku = fields
            .get("sku")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| miette::miette!("Missing required field 'sku' at row {}", row_num))?;
        let date = fields
            .get("date")
            .ok_or_else(|| miette::miette!("Missing required field 'date' at row {}", row_num))?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
            miette::miette!("Invalid date '{}' at row {}: {}", date, row_num, e)
        })?;

        let mut variables: Vec<(&String, &String)> = fields
            .iter()
            .filter(|(k, v)| k.as_str() != "sku" && k.as_str() != "date" && !v.is_empty())
            .collect();
        variables.sort();

        for (variable, value) in variables {
            let value: f64 = value.parse().map_err(|_| {
                miette::miette!(
                    "Invalid number '{}' for '{}' at row {}",
                    value,
                    variable,
                    row_num
                )
            })?;
            observations.push(ObservationRow {
                sku: sku.clone(),
                variable: variable.clone(),
                date,
                value,
            });
        }
    }

    let source = args.source.clone().unwrap_or_else(|| {
        args.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.file.display().to_string())
    });
    let result = engine.import_observations(&source, &observations, Utc::now())?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "{} Recorded {} value(s) from {} (import #{})",
        style("✓").green(),
        style(result.recorded).cyan(),
        style(&source).cyan(),
        result.import_id
    );
    if !result.staged.is_empty() {
        println!();
        println!(
            "{} {} unknown sku(s) staged; their values are held under placeholders:",
            style("!").yellow(),
            result.staged.len()
        );
        for entry in &result.staged {
            println!("  {:<16} {}", entry.basis, style(entry.placeholder()).dim());
        }
    }
    Ok(())
}
