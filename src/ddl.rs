//! Table definition text for the external loader.
//!
//! [`format`] renders a [`DatasetSchema`] as a `create or replace table`
//! statement with one column per line. [`parse`] reads that exact text back
//! so a later normalization run knows which columns hold decimals and dates.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use thiserror::Error;

use crate::schema::{ColumnSchema, DatasetSchema, DeclaredType};

const HEADER_PREFIX: &str = "create or replace table ";
const COLUMN_INDENT: &str = "    ";
const FOOTER: &str = ");";

#[derive(Debug, Error)]
pub enum DdlError {
    #[error("Table definition must start with 'create or replace table <name> ('")]
    MissingHeader,
    #[error("Table definition must end with ');'")]
    MissingFooter,
    #[error("Line {line}: expected '<name> <type>' but found '{text}'")]
    MalformedColumn { line: usize, text: String },
    #[error("Line {line}: {message}")]
    UnsupportedType { line: usize, message: String },
}

/// A table definition read back from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub table: String,
    pub schema: DatasetSchema,
}

pub fn format(schema: &DatasetSchema, table: &str) -> String {
    let body = schema
        .columns
        .iter()
        .map(|column| format!("{COLUMN_INDENT}{} {}", column.name, column.declared_type))
        .join(",\n");
    if body.is_empty() {
        format!("{HEADER_PREFIX}{table} (\n{FOOTER}")
    } else {
        format!("{HEADER_PREFIX}{table} (\n{body}\n{FOOTER}")
    }
}

pub fn parse(text: &str) -> Result<TableDefinition, DdlError> {
    let lines = text.trim_end().lines().collect::<Vec<_>>();
    let table = lines
        .first()
        .and_then(|line| line.trim().strip_prefix(HEADER_PREFIX))
        .and_then(|rest| rest.strip_suffix('('))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(DdlError::MissingHeader)?;
    if lines.len() < 2 || lines[lines.len() - 1].trim() != FOOTER {
        return Err(DdlError::MissingFooter);
    }

    let mut columns = Vec::with_capacity(lines.len() - 2);
    for (offset, raw) in lines[1..lines.len() - 1].iter().enumerate() {
        let line = offset + 2;
        let entry = raw.trim().trim_end_matches(',');
        let (name, declared) = entry
            .split_once(' ')
            .filter(|(name, declared)| !name.is_empty() && !declared.trim().is_empty())
            .ok_or_else(|| DdlError::MalformedColumn {
                line,
                text: raw.to_string(),
            })?;
        let declared_type = declared
            .parse::<DeclaredType>()
            .map_err(|err| DdlError::UnsupportedType {
                line,
                message: err.to_string(),
            })?;
        columns.push(ColumnSchema {
            name: name.to_string(),
            declared_type,
            source_name: None,
        });
    }

    Ok(TableDefinition {
        table: table.to_string(),
        schema: DatasetSchema { columns },
    })
}

pub fn save(path: &Path, schema: &DatasetSchema, table: &str) -> Result<()> {
    fs::write(path, format(schema, table))
        .with_context(|| format!("Writing table definition to {path:?}"))
}

pub fn load(path: &Path) -> Result<TableDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Reading table definition {path:?}"))?;
    parse(&text).with_context(|| format!("Parsing table definition {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DecimalSpec;

    fn column(name: &str, declared_type: DeclaredType) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            declared_type,
            source_name: None,
        }
    }

    fn sample_schema() -> DatasetSchema {
        DatasetSchema {
            columns: vec![
                column("datum", DeclaredType::Date),
                column("cena", DeclaredType::Decimal(DecimalSpec::INFERRED)),
                column("pozn", DeclaredType::Varchar),
            ],
        }
    }

    #[test]
    fn format_writes_one_column_per_line() {
        let text = format(&sample_schema(), "t");
        assert_eq!(
            text,
            "create or replace table t (\n    datum date,\n    cena decimal(18, 3),\n    pozn varchar\n);"
        );
    }

    #[test]
    fn parse_reads_formatted_text_back() {
        let parsed = parse(&format(&sample_schema(), "orders")).unwrap();
        assert_eq!(parsed.table, "orders");
        assert_eq!(parsed.schema, sample_schema());
    }

    #[test]
    fn parse_tolerates_trailing_newline() {
        let parsed = parse("create or replace table t (\n    id integer\n);\n").unwrap();
        assert_eq!(parsed.schema.columns, vec![column("id", DeclaredType::Integer)]);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert!(matches!(
            parse("create table t (\n    id integer\n);"),
            Err(DdlError::MissingHeader)
        ));
        assert!(matches!(
            parse("create or replace table t (\n    id integer"),
            Err(DdlError::MissingFooter)
        ));
        assert!(matches!(
            parse("create or replace table t (\n    id\n);"),
            Err(DdlError::MalformedColumn { line: 2, .. })
        ));
        assert!(matches!(
            parse("create or replace table t (\n    id blob\n);"),
            Err(DdlError::UnsupportedType { line: 2, .. })
        ));
    }
}
