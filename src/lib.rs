pub mod classify;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod ddl;
pub mod io_utils;
pub mod names;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    config::{ConfigFile, PipelineConfig},
    schema::DatasetSchema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_loadprep", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(args) => {
            let config = load_config(args.source.config.as_deref(), args.overrides())?;
            handle_infer(&config, args.schema_yaml.as_deref(), args.show)
        }
        Commands::Normalize(args) => {
            let config = load_config(args.source.config.as_deref(), args.overrides())?;
            handle_normalize(&config)
        }
        Commands::Prepare(args) => {
            let config = load_config(args.source.config.as_deref(), args.overrides())?;
            handle_prepare(&config, args.schema_yaml.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>, overrides: ConfigFile) -> Result<PipelineConfig> {
    let base = match path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = PipelineConfig::resolve(base.merge(overrides)).context("Resolving settings")?;
    debug!("Run configuration: {config:?}");
    Ok(config)
}

fn handle_infer(
    config: &PipelineConfig,
    schema_yaml: Option<&Path>,
    show: bool,
) -> Result<()> {
    info!("Inferring schema for table '{}'", config.table);
    let inferred = pipeline::infer(config)?;
    if show {
        table::print_schema(&inferred);
    }
    pipeline::write_ddl(config, &inferred.schema)?;
    save_schema_yaml(&inferred.schema, schema_yaml)?;
    Ok(())
}

fn handle_normalize(config: &PipelineConfig) -> Result<()> {
    let ddl_path = config
        .ddl_output
        .as_deref()
        .ok_or_else(|| anyhow!("Normalizing requires a table definition (--ddl or 'ddl' in config)"))?;
    let definition = ddl::load(ddl_path)?;
    info!(
        "Normalizing {:?} for table '{}' ({} column(s))",
        config.source,
        definition.table,
        definition.schema.len()
    );
    let summary = pipeline::normalize(config, &definition.schema)?;
    debug!("Normalized {} row(s)", summary.rows);
    Ok(())
}

fn handle_prepare(config: &PipelineConfig, schema_yaml: Option<&Path>) -> Result<()> {
    if io_utils::is_dash(&config.source) {
        return Err(anyhow!(
            "Prepare reads the input twice and cannot use stdin; run infer and normalize separately"
        ));
    }
    let ddl_to_stdout = config
        .ddl_output
        .as_deref()
        .is_none_or(io_utils::is_dash);
    let data_to_stdout = config
        .data_output
        .as_deref()
        .is_none_or(io_utils::is_dash);
    if ddl_to_stdout && data_to_stdout {
        return Err(anyhow!(
            "Prepare writes two artifacts; give --ddl or --output a file path so they do not share stdout"
        ));
    }
    info!("Preparing {:?} for table '{}'", config.source, config.table);
    let inferred = pipeline::infer(config)?;
    pipeline::write_ddl(config, &inferred.schema)?;
    save_schema_yaml(&inferred.schema, schema_yaml)?;
    pipeline::normalize(config, &inferred.schema)?;
    Ok(())
}

fn save_schema_yaml(schema: &DatasetSchema, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        schema
            .save(path)
            .with_context(|| format!("Writing schema to {path:?}"))?;
        info!("Schema with {} column(s) written to {:?}", schema.len(), path);
    }
    Ok(())
}
