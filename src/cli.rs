use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{config::ConfigFile, names::DuplicateNamePolicy};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Prepare delimited text files for bulk loading into a columnar store",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer column types from a sample of rows and write a table definition
    Infer(InferArgs),
    /// Rewrite every row of a file according to an existing table definition
    Normalize(NormalizeArgs),
    /// Infer the table definition and normalize the data in one run
    Prepare(PrepareArgs),
}

#[derive(Debug, Args, Default)]
pub struct SourceArgs {
    /// YAML file with run settings; command-line options take precedence
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Input delimited text file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Destination table name (defaults to the normalized input file name)
    #[arg(long)]
    pub table: Option<String>,
    /// Field delimiter (supports ',', 'tab', ';', '|' or any ASCII character)
    #[arg(long)]
    pub delimiter: Option<String>,
    /// Quote character, or 'none' to read quotes literally (defaults to '"')
    #[arg(long)]
    pub quote: Option<String>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How to handle headers that normalize to the same column name
    #[arg(long = "duplicate-names", value_enum)]
    pub duplicate_names: Option<DuplicateNamePolicy>,
}

impl SourceArgs {
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            table: self.table.clone(),
            source: self.input.clone(),
            delimiter: self.delimiter.clone(),
            quote: self.quote.clone(),
            input_encoding: self.input_encoding.clone(),
            duplicate_names: self.duplicate_names,
            ..ConfigFile::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct InferArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of data rows to sample when inferring types
    #[arg(long = "sample-rows")]
    pub sample_rows: Option<usize>,
    /// Destination for the table definition (stdout if omitted)
    #[arg(long)]
    pub ddl: Option<PathBuf>,
    /// Also write the resolved schema as YAML
    #[arg(long = "schema-yaml")]
    pub schema_yaml: Option<PathBuf>,
    /// Print the resolved columns and their type evidence as a table
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Table definition written by `infer`
    #[arg(long)]
    pub ddl: Option<PathBuf>,
    /// Destination for the normalized data (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Text written for null dates (defaults to an empty field)
    #[arg(long = "null-marker")]
    pub null_marker: Option<String>,
}

#[derive(Debug, Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of data rows to sample when inferring types
    #[arg(long = "sample-rows")]
    pub sample_rows: Option<usize>,
    /// Destination for the table definition
    #[arg(long)]
    pub ddl: Option<PathBuf>,
    /// Destination for the normalized data
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Text written for null dates (defaults to an empty field)
    #[arg(long = "null-marker")]
    pub null_marker: Option<String>,
    /// Also write the resolved schema as YAML
    #[arg(long = "schema-yaml")]
    pub schema_yaml: Option<PathBuf>,
}

impl InferArgs {
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            sample_rows: self.sample_rows,
            ddl: self.ddl.clone(),
            ..self.source.overrides()
        }
    }
}

impl NormalizeArgs {
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            ddl: self.ddl.clone(),
            output: self.output.clone(),
            null_marker: self.null_marker.clone(),
            ..self.source.overrides()
        }
    }
}

impl PrepareArgs {
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            sample_rows: self.sample_rows,
            ddl: self.ddl.clone(),
            output: self.output.clone(),
            null_marker: self.null_marker.clone(),
            ..self.source.overrides()
        }
    }
}
