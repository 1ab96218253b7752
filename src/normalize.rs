//! Rewrites raw cells into the canonical text a bulk loader expects.
//!
//! Decimal columns get `.` as the fractional separator, date and timestamp
//! columns become `YYYY-MM-DD HH:MM:SS`, everything else passes through. A
//! cell the schema cannot accommodate aborts the whole run.

use thiserror::Error;

use crate::{
    classify::parse_decimal_token,
    datetime::parse_strict_ddmmyyyy_or_timestamp,
    schema::{DatasetSchema, RawRecord},
};

/// A rewritten row; `None` marks an explicit null.
pub type NormalizedRecord = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Data row {row}, column '{column}': '{value}' is not a dd.mm.yyyy[ HH:MM:SS] date")]
    Date {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Data row {row}, column '{column}': '{value}' is not a decimal number")]
    Decimal {
        row: usize,
        column: String,
        value: String,
    },
}

pub struct ValueNormalizer<'a> {
    schema: &'a DatasetSchema,
    null_marker: String,
}

impl<'a> ValueNormalizer<'a> {
    /// `null_marker` is the text nulls are written as; date cells equal to it
    /// are read back as null.
    pub fn new(schema: &'a DatasetSchema, null_marker: impl Into<String>) -> Self {
        Self {
            schema,
            null_marker: null_marker.into(),
        }
    }

    pub fn null_marker(&self) -> &str {
        &self.null_marker
    }

    /// Normalizes one row. `row` is the 1-based data row number used in errors.
    pub fn normalize_row(
        &self,
        row: usize,
        record: &[String],
    ) -> Result<NormalizedRecord, NormalizeError> {
        record
            .iter()
            .enumerate()
            .map(|(idx, value)| self.normalize_value(row, idx, value))
            .collect()
    }

    pub fn normalize_rows(
        &self,
        records: &[RawRecord],
    ) -> Result<Vec<NormalizedRecord>, NormalizeError> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| self.normalize_row(idx + 1, record))
            .collect()
    }

    fn normalize_value(
        &self,
        row: usize,
        idx: usize,
        value: &str,
    ) -> Result<Option<String>, NormalizeError> {
        let Some(column) = self.schema.columns.get(idx) else {
            return Ok(Some(value.to_string()));
        };
        let declared = column.declared_type;
        if declared.is_decimal() {
            let rewritten = value.replace(',', ".");
            if !rewritten.trim().is_empty() && parse_decimal_token(&rewritten).is_none() {
                return Err(NormalizeError::Decimal {
                    row,
                    column: column.name.clone(),
                    value: value.to_string(),
                });
            }
            Ok(Some(rewritten))
        } else if declared.is_temporal() {
            if !self.null_marker.is_empty() && value == self.null_marker {
                return Ok(None);
            }
            parse_strict_ddmmyyyy_or_timestamp(value).map_err(|_| NormalizeError::Date {
                row,
                column: column.name.clone(),
                value: value.to_string(),
            })
        } else {
            Ok(Some(value.to_string()))
        }
    }
}

/// Renders a normalized row with nulls replaced by `null_marker`.
pub fn render_record<'r>(record: &'r [Option<String>], null_marker: &'r str) -> Vec<&'r str> {
    record
        .iter()
        .map(|cell| cell.as_deref().unwrap_or(null_marker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, DecimalSpec, DeclaredType};

    fn schema(types: &[(&str, DeclaredType)]) -> DatasetSchema {
        DatasetSchema {
            columns: types
                .iter()
                .map(|(name, declared_type)| ColumnSchema {
                    name: name.to_string(),
                    declared_type: *declared_type,
                    source_name: None,
                })
                .collect(),
        }
    }

    fn row(values: &[&str]) -> RawRecord {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn decimal() -> DeclaredType {
        DeclaredType::Decimal(DecimalSpec::INFERRED)
    }

    #[test]
    fn decimal_cells_switch_separator() {
        let schema = schema(&[("cena", decimal())]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let rows = normalizer
            .normalize_rows(&[row(&["12,5"]), row(&["7"]), row(&[""])])
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Some("12.5".to_string())],
                vec![Some("7".to_string())],
                vec![Some(String::new())],
            ]
        );
    }

    #[test]
    fn date_cells_become_canonical_or_null() {
        let schema = schema(&[("datum", DeclaredType::Date), ("cas", DeclaredType::Timestamp)]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let rows = normalizer
            .normalize_rows(&[row(&["1.1.2024", "31.12.2024 10:00:00"]), row(&["", ""])])
            .unwrap();
        assert_eq!(rows[0][0].as_deref(), Some("2024-01-01 00:00:00"));
        assert_eq!(rows[0][1].as_deref(), Some("2024-12-31 10:00:00"));
        assert_eq!(rows[1], vec![None, None]);
    }

    #[test]
    fn text_and_integer_cells_pass_through() {
        let schema = schema(&[("id", DeclaredType::Integer), ("pozn", DeclaredType::Varchar)]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let rows = normalizer.normalize_rows(&[row(&["0", "a,b"])]).unwrap();
        assert_eq!(rows[0], vec![Some("0".to_string()), Some("a,b".to_string())]);
    }

    #[test]
    fn unparseable_date_names_row_and_column() {
        let schema = schema(&[("datum", DeclaredType::Date)]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let err = normalizer
            .normalize_rows(&[row(&["1.1.2024"]), row(&["2024/01/02"])])
            .unwrap_err();
        assert_eq!(
            err,
            NormalizeError::Date {
                row: 2,
                column: "datum".to_string(),
                value: "2024/01/02".to_string(),
            }
        );
    }

    #[test]
    fn short_year_date_is_fatal() {
        let schema = schema(&[("datum", DeclaredType::Date)]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let err = normalizer
            .normalize_rows(&[row(&["30.06.25"]), row(&["1.7.25"])])
            .unwrap_err();
        assert_eq!(
            err,
            NormalizeError::Date {
                row: 1,
                column: "datum".to_string(),
                value: "30.06.25".to_string(),
            }
        );
    }

    #[test]
    fn unparseable_decimal_is_fatal() {
        let schema = schema(&[("cena", decimal())]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let err = normalizer.normalize_rows(&[row(&["abc"])]).unwrap_err();
        assert!(matches!(err, NormalizeError::Decimal { row: 1, .. }));
    }

    #[test]
    fn rows_keep_their_own_width() {
        let schema = schema(&[("cena", decimal())]);
        let normalizer = ValueNormalizer::new(&schema, "");
        let rows = normalizer
            .normalize_rows(&[row(&["1,5", "x,y"]), row(&[])])
            .unwrap();
        assert_eq!(rows[0], vec![Some("1.5".to_string()), Some("x,y".to_string())]);
        assert!(rows[1].is_empty());
    }

    #[test]
    fn null_marker_reads_back_as_null() {
        let schema = schema(&[("datum", DeclaredType::Date)]);
        let normalizer = ValueNormalizer::new(&schema, "\\N");
        let first = normalizer.normalize_rows(&[row(&[""])]).unwrap();
        let rendered = render_record(&first[0], normalizer.null_marker());
        assert_eq!(rendered, vec!["\\N"]);
        let again = normalizer.normalize_rows(&[row(&["\\N"])]).unwrap();
        assert_eq!(again, first);
    }
}
