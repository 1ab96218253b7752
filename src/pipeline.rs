//! File-level orchestration of the inference and normalization stages.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    config::PipelineConfig,
    ddl, io_utils,
    names::normalize_headers,
    normalize::{ValueNormalizer, render_record},
    schema::{DatasetSchema, InferredSchema, RowWidthReport, infer_schema},
};

#[derive(Debug, Clone)]
pub struct NormalizeSummary {
    pub rows: usize,
    pub row_widths: RowWidthReport,
}

/// Reads the header and the configured sample of rows and resolves a schema.
pub fn infer(config: &PipelineConfig) -> Result<InferredSchema> {
    info!(
        "Sampling up to {} row(s) from {:?} with delimiter '{}'",
        config.sample_rows,
        config.source,
        io_utils::printable_delimiter(config.delimiter)
    );
    let mut reader =
        io_utils::open_csv_reader_from_path(&config.source, config.delimiter, config.quote)?;
    let (header, rows) =
        io_utils::read_records(&mut reader, config.input_encoding, Some(config.sample_rows))
            .with_context(|| format!("Reading sample from {:?}", config.source))?;
    let inferred = infer_schema(&header, &rows, config.sample_rows, config.duplicate_names)
        .with_context(|| format!("Normalizing header of {:?}", config.source))?;
    report_row_widths(&inferred.row_widths, header.len());
    info!(
        "Resolved {} column(s) from {} sampled row(s)",
        inferred.schema.len(),
        inferred.rows_sampled()
    );
    Ok(inferred)
}

/// Writes the table definition to `ddl_output`, or stdout when unset.
pub fn write_ddl(config: &PipelineConfig, schema: &DatasetSchema) -> Result<()> {
    match config.ddl_output.as_deref() {
        Some(path) if !io_utils::is_dash(path) => {
            ddl::save(path, schema, &config.table)?;
            info!("Table definition for '{}' written to {:?}", config.table, path);
        }
        _ => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", ddl::format(schema, &config.table))
                .context("Writing table definition to stdout")?;
        }
    }
    Ok(())
}

/// Rewrites the whole source file according to `schema` and writes it out.
///
/// The source header must normalize to the schema's column names. Nothing
/// is written when the source cannot be read or a value fails to normalize.
pub fn normalize(config: &PipelineConfig, schema: &DatasetSchema) -> Result<NormalizeSummary> {
    let mut reader =
        io_utils::open_csv_reader_from_path(&config.source, config.delimiter, config.quote)?;
    let (header, rows) = io_utils::read_records(&mut reader, config.input_encoding, None)
        .with_context(|| format!("Reading {:?}", config.source))?;
    let names = normalize_headers(&header, config.duplicate_names)?;
    schema
        .validate_names(&names)
        .with_context(|| format!("Validating header of {:?} against schema", config.source))?;

    let mut row_widths = RowWidthReport::default();
    for row in &rows {
        row_widths.record(row.len());
    }
    report_row_widths(&row_widths, header.len());

    let normalizer = ValueNormalizer::new(schema, config.null_marker.as_str());
    let normalized = normalizer
        .normalize_rows(&rows)
        .with_context(|| format!("Normalizing {:?}", config.source))?;

    let mut writer = io_utils::open_csv_writer(config.data_output.as_deref())?;
    writer
        .write_record(schema.columns.iter().map(|c| c.name.as_str()))
        .context("Writing output headers")?;
    for (idx, record) in normalized.iter().enumerate() {
        writer
            .write_record(render_record(record, normalizer.null_marker()))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;

    info!(
        "Normalized {} row(s) across {} column(s) -> {}",
        normalized.len(),
        schema.len(),
        describe_destination(config.data_output.as_deref())
    );
    Ok(NormalizeSummary {
        rows: normalized.len(),
        row_widths,
    })
}

fn report_row_widths(report: &RowWidthReport, header_width: usize) {
    if report.is_uniform() && report.widths().iter().all(|w| *w == header_width) {
        return;
    }
    let detail = report
        .widths()
        .into_iter()
        .map(|width| format!("{width} field(s): {} row(s)", report.rows_with_width(width)))
        .collect::<Vec<_>>()
        .join(", ");
    warn!("Header has {header_width} field(s) but data rows vary: {detail}");
}

fn describe_destination(path: Option<&Path>) -> String {
    match path {
        Some(p) if !io_utils::is_dash(p) => p.display().to_string(),
        _ => "stdout".to_string(),
    }
}
