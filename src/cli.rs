use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::ErrorPolicy, io_utils::parse_delimiter};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load fixed-width files into tables described by a column specification", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the CREATE TABLE statement derived from a specification file
    Schema(SchemaArgs),
    /// Parse the first rows of a data file and display them as typed values
    Preview(PreviewArgs),
    /// Parse a data file and load it into a table directory
    Load(LoadArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SpecificationArgs {
    /// Column specification file (header row, then name/width/type rows)
    #[arg(short = 's', long = "spec")]
    pub specification: Option<PathBuf>,
    /// Order of the fields in each specification row
    #[arg(long = "fields", value_delimiter = ',')]
    pub fields: Vec<String>,
    /// Delimiter of the specification file (supports ',', 'tab', ';', '|')
    #[arg(long = "spec-delimiter", value_parser = parse_delimiter)]
    pub spec_delimiter: Option<u8>,
    /// Table name (defaults to the specification file name without extension)
    #[arg(long = "table")]
    pub table: Option<String>,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub spec: SpecificationArgs,
    /// Also write the derived schema, with byte ranges, to this YAML file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub spec: SpecificationArgs,
    /// Fixed-width data file ('-' reads stdin)
    #[arg(short = 'd', long = "data")]
    pub data: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Character encoding of the data file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// YAML run configuration; flags below override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub spec: SpecificationArgs,
    /// Fixed-width data file ('-' reads stdin)
    #[arg(short = 'd', long = "data")]
    pub data: Option<PathBuf>,
    /// Directory receiving <table>.sql and <table>.csv
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Character encoding of the data file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Assume the table already exists
    #[arg(long = "no-create")]
    pub no_create: bool,
    /// Keep an existing table instead of dropping and recreating it
    #[arg(long = "no-recreate")]
    pub no_recreate: bool,
    /// How to treat lines that fail to decode or coerce
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<ErrorPolicy>,
    /// Fail the run if more than this many rows would be held for insert
    #[arg(long = "max-rows")]
    pub max_rows: Option<usize>,
}
