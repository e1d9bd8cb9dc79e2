pub mod cli;
pub mod config;
pub mod data;
pub mod delineation;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod preview;
pub mod record;
pub mod schema;
pub mod sink;
pub mod specification;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, SpecificationArgs},
    config::LoadConfig,
    loader::{RecordLoader, build_table_schema},
    sink::CsvSink,
};

pub use crate::{
    config::ErrorPolicy,
    data::{TypedRow, Value},
    error::LoadError,
    loader::{LoadReport, LoadState},
    schema::{ColumnSpec, DataType, TableSchema},
    sink::{MemorySink, Sink, SinkError},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("fwf_loader", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Schema(args) => handle_schema(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Load(args) => handle_load(&args),
    }
}

/// Applies specification flags on top of `config`.
pub(crate) fn apply_specification_args(config: &mut LoadConfig, args: &SpecificationArgs) {
    if let Some(path) = &args.specification {
        config.specification = path.clone();
    }
    let fields = args
        .fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .collect::<Vec<_>>();
    if !fields.is_empty() {
        config.fieldnames = fields;
    }
    if let Some(delimiter) = args.spec_delimiter {
        config.spec_delimiter = delimiter as char;
    }
    if let Some(table) = &args.table {
        config.table_name = Some(table.clone());
    }
}

pub(crate) fn ensure_specification(config: &LoadConfig) -> Result<()> {
    if config.specification.as_os_str().is_empty() {
        bail!("A specification file is required (--spec or 'specification' in the config file)");
    }
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let mut config = LoadConfig::default();
    apply_specification_args(&mut config, &args.spec);
    ensure_specification(&config)?;
    info!(
        "Reading specification {:?} with delimiter '{}'",
        config.specification,
        io_utils::printable_delimiter(config.spec_delimiter_byte()?)
    );
    let schema = build_table_schema(&config)
        .with_context(|| format!("Deriving schema from {:?}", config.specification))?;
    println!("{}", schema.create_table_statement());
    if let Some(output) = &args.output {
        schema
            .save(output)
            .with_context(|| format!("Writing schema to {output:?}"))?;
        info!(
            "Schema for {} column(s) written to {:?}",
            schema.columns.len(),
            output
        );
    }
    Ok(())
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            LoadConfig::load(path).with_context(|| format!("Loading config from {path:?}"))?
        }
        None => LoadConfig::default(),
    };
    apply_specification_args(&mut config, &args.spec);
    if let Some(data) = &args.data {
        config.data = data.clone();
    }
    if args.input_encoding.is_some() {
        config.input_encoding = args.input_encoding.clone();
    }
    if args.no_create {
        config.create = false;
    }
    if args.no_recreate {
        config.recreate = false;
    }
    if let Some(policy) = args.on_error {
        config.on_error = policy;
    }
    if args.max_rows.is_some() {
        config.max_rows = args.max_rows;
    }
    ensure_specification(&config)?;
    if config.data.as_os_str().is_empty() {
        bail!("A data file is required (--data or 'data' in the config file)");
    }
    debug!("Effective load configuration: {:?}", config);

    let data = config.data.clone();
    let mut sink = CsvSink::new(&args.output_dir)
        .with_context(|| format!("Opening output directory {:?}", args.output_dir))?;
    let mut loader = RecordLoader::new(config);
    let report = loader
        .run(&mut sink)
        .with_context(|| format!("Loading {data:?}"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Serializing load report")?
    );
    Ok(())
}
