mod config;
mod logging;

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use tablecraft_core::{
    Error as CoreError, TableSchema, ValidationOptions, dependencies_of, load_schema_dir,
    resolve_generation_order, validate_schema_set,
};
use tablecraft_generate::{GenerationEngine, GenerationError};
use thiserror::Error;

use config::{GenerateOverrides, TablecraftConfig, load_config, parse_anchor};
use logging::{LogFormat, init_logging};

#[derive(Debug, Error)]
enum CliError {
    #[error("schema error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "tablecraft", version, about = "Synthetic relational dataset generator")]
struct Cli {
    /// Config file (defaults to ./tablecraft.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate every table and write one CSV per table.
    Generate(GenerateArgs),
    /// Print the resolved generation order.
    Order(SchemaArgs),
    /// Load and validate the schema set without generating.
    Validate(SchemaArgs),
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Directory holding one schema document per table.
    #[arg(long, value_name = "DIR")]
    schema_dir: Option<PathBuf>,
    /// Treat unrecognized field types as errors.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Output directory for CSV files and the run report.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Pinned "now" for date windows, as YYYY-MM-DDTHH:MM:SS.
    #[arg(long, value_parser = parse_anchor)]
    anchor: Option<NaiveDateTime>,
    /// Skip writing generation_report.json.
    #[arg(long, default_value_t = false)]
    no_report: bool,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.log_format.or(config.log_format).unwrap_or_default())?;

    match cli.command {
        Command::Generate(args) => run_generate(&config, args),
        Command::Order(args) => run_order(&config, args),
        Command::Validate(args) => run_validate(&config, args),
    }
}

/// Load, resolve and cross-check the schema set.
fn load_ordered(config: &TablecraftConfig, args: SchemaArgs) -> Result<Vec<TableSchema>, CliError> {
    let dir = config.schema_dir(args.schema_dir);
    let options = ValidationOptions {
        strict: config.strict(args.strict),
    };
    let schemas = load_schema_dir(&dir, &options)?;
    let ordered = resolve_generation_order(schemas)?;
    validate_schema_set(&ordered)?;
    Ok(ordered)
}

fn run_generate(config: &TablecraftConfig, args: GenerateArgs) -> Result<(), CliError> {
    let GenerateArgs {
        schema,
        out_dir,
        seed,
        anchor,
        no_report,
    } = args;

    let timer = Instant::now();
    let options = config.generate_options(GenerateOverrides {
        out_dir,
        seed,
        anchor,
        strict: schema.strict,
        no_report,
    })?;
    let schemas = load_schema_dir(
        &config.schema_dir(schema.schema_dir),
        &ValidationOptions {
            strict: options.strict,
        },
    )?;

    let result = GenerationEngine::new(options).run(schemas)?;
    for table in &result.report.tables {
        match &table.file {
            Some(file) => println!("{:<24} {:>8} rows  {file}", table.table, table.rows_generated),
            None => println!("{:<24} {:>8} rows  (no file)", table.table, table.rows_generated),
        }
    }

    tracing::info!(
        out_dir = %result.out_dir.display(),
        rows = result.report.rows_total,
        warnings = result.report.warnings.len(),
        duration_ms = timer.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(())
}

fn run_order(config: &TablecraftConfig, args: SchemaArgs) -> Result<(), CliError> {
    let ordered = load_ordered(config, args)?;
    for (index, schema) in ordered.iter().enumerate() {
        let deps: Vec<String> = dependencies_of(schema).into_iter().collect();
        if deps.is_empty() {
            println!("{:>3}. {} ({})", index + 1, schema.name, schema.kind);
        } else {
            println!(
                "{:>3}. {} ({}) <- {}",
                index + 1,
                schema.name,
                schema.kind,
                deps.join(", ")
            );
        }
    }
    Ok(())
}

fn run_validate(config: &TablecraftConfig, args: SchemaArgs) -> Result<(), CliError> {
    let ordered = load_ordered(config, args)?;
    let fields: usize = ordered.iter().map(|schema| schema.fields.len()).sum();
    println!("{} tables, {} fields: ok", ordered.len(), fields);
    Ok(())
}
