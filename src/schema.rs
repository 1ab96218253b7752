//! Declared column types and sample-based schema resolution.
//!
//! A [`ColumnSample`] collects the [`TypeTag`] of every sampled cell in one
//! column and resolves them into a single [`DeclaredType`]:
//!
//! 1. the mode is the most frequent tag, ties going to the tag seen first;
//! 2. any decimal evidence declares `decimal(18, 3)` whatever the mode;
//! 3. a `Null` mode becomes `varchar` if any text was seen, else `integer`;
//! 4. otherwise the mode is declared as is.
//!
//! [`DatasetSchema`] is the ordered, index-aligned result for a whole file and
//! can be persisted as YAML.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    classify::{TypeTag, classify},
    names::{DuplicateColumnError, DuplicateNamePolicy, normalize_headers},
};

/// One source row, header included, as decoded text fields.
pub type RawRecord = Vec<String>;

pub const DEFAULT_SAMPLE_ROWS: usize = 1000;

const DECIMAL_MAX_PRECISION: u32 = 38;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalSpec {
    pub precision: u32,
    pub scale: u32,
}

impl DecimalSpec {
    /// The width every inferred decimal column is declared with.
    pub const INFERRED: DecimalSpec = DecimalSpec {
        precision: 18,
        scale: 3,
    };

    pub fn new(precision: u32, scale: u32) -> Result<Self> {
        let spec = Self { precision, scale };
        spec.ensure_valid()?;
        Ok(spec)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(self.precision > 0, "Decimal precision must be positive");
        ensure!(
            self.precision <= DECIMAL_MAX_PRECISION,
            "Decimal precision must be <= {}",
            DECIMAL_MAX_PRECISION
        );
        ensure!(
            self.scale <= self.precision,
            "Decimal scale ({}) cannot exceed precision ({})",
            self.scale,
            self.precision
        );
        Ok(())
    }
}

/// The type a column is created with in the destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Decimal(DecimalSpec),
    Integer,
    Varchar,
    Date,
    Timestamp,
}

impl DeclaredType {
    pub fn is_decimal(&self) -> bool {
        matches!(self, DeclaredType::Decimal(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DeclaredType::Date | DeclaredType::Timestamp)
    }

    pub fn signature(&self) -> String {
        match self {
            DeclaredType::Decimal(spec) => format!("decimal({}, {})", spec.precision, spec.scale),
            DeclaredType::Integer => "integer".to_string(),
            DeclaredType::Varchar => "varchar".to_string(),
            DeclaredType::Date => "date".to_string(),
            DeclaredType::Timestamp => "timestamp".to_string(),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl FromStr for DeclaredType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "integer" => return Ok(DeclaredType::Integer),
            "varchar" => return Ok(DeclaredType::Varchar),
            "date" => return Ok(DeclaredType::Date),
            "timestamp" => return Ok(DeclaredType::Timestamp),
            _ => {}
        }
        let args = normalized
            .strip_prefix("decimal(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| anyhow!("Unsupported column type '{value}'"))?;
        let (precision, scale) = args
            .split_once(',')
            .ok_or_else(|| anyhow!("Decimal type '{value}' must be decimal(precision, scale)"))?;
        let precision = precision
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Decimal precision in '{value}'"))?;
        let scale = scale
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Decimal scale in '{value}'"))?;
        Ok(DeclaredType::Decimal(DecimalSpec::new(precision, scale)?))
    }
}

impl Serialize for DeclaredType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.signature())
    }
}

impl<'de> Deserialize<'de> for DeclaredType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        DeclaredType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

/// Per-column type evidence drawn from the sampled rows.
#[derive(Debug, Clone, Default)]
pub struct ColumnSample {
    total: usize,
    // (tag, count) in first-seen order; ties in the mode resolve by position here
    counts: Vec<(TypeTag, usize)>,
}

impl ColumnSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<I>(tags: I) -> Self
    where
        I: IntoIterator<Item = TypeTag>,
    {
        let mut sample = Self::new();
        for tag in tags {
            sample.push(tag);
        }
        sample
    }

    pub fn push(&mut self, tag: TypeTag) {
        self.total += 1;
        match self.counts.iter_mut().find(|(seen, _)| *seen == tag) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((tag, 1)),
        }
    }

    pub fn observe(&mut self, token: &str) {
        self.push(classify(token));
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count(&self, tag: TypeTag) -> usize {
        self.counts
            .iter()
            .find(|(seen, _)| *seen == tag)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Tag counts in first-seen order.
    pub fn counts(&self) -> &[(TypeTag, usize)] {
        &self.counts
    }

    /// The most frequent tag; on equal counts the one that appeared first.
    pub fn mode(&self) -> Option<TypeTag> {
        let mut best: Option<(TypeTag, usize)> = None;
        for &(tag, count) in &self.counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((tag, count));
            }
        }
        best.map(|(tag, _)| tag)
    }

    pub fn resolve(&self) -> DeclaredType {
        if self.count(TypeTag::Decimal) > 0 {
            return DeclaredType::Decimal(DecimalSpec::INFERRED);
        }
        match self.mode().unwrap_or(TypeTag::Null) {
            TypeTag::Null => {
                if self.count(TypeTag::Varchar) > 0 {
                    DeclaredType::Varchar
                } else {
                    DeclaredType::Integer
                }
            }
            TypeTag::Date => DeclaredType::Date,
            TypeTag::Timestamp => DeclaredType::Timestamp,
            TypeTag::Integer => DeclaredType::Integer,
            TypeTag::Varchar => DeclaredType::Varchar,
            TypeTag::Decimal => DeclaredType::Decimal(DecimalSpec::INFERRED),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
}

impl DatasetSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn declared_types(&self) -> Vec<DeclaredType> {
        self.columns.iter().map(|c| c.declared_type).collect()
    }

    /// Checks that `names` (already normalized) line up with this schema.
    pub fn validate_names(&self, names: &[String]) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(anyhow!(
                "Header length mismatch: schema expects {} column(s) but file contains {}",
                self.columns.len(),
                names.len()
            ));
        }
        for (idx, (column, name)) in self.columns.iter().zip(names).enumerate() {
            if column.name != *name {
                return Err(anyhow!(
                    "Header mismatch at position {}: expected '{}' but found '{}'",
                    idx + 1,
                    column.name,
                    name
                ));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Ok(schema)
    }
}

/// Count of data rows per observed field count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowWidthReport {
    counts: BTreeMap<usize, usize>,
}

impl RowWidthReport {
    pub fn record(&mut self, width: usize) {
        *self.counts.entry(width).or_insert(0) += 1;
    }

    pub fn widths(&self) -> Vec<usize> {
        self.counts.keys().copied().collect()
    }

    pub fn rows_with_width(&self, width: usize) -> usize {
        self.counts.get(&width).copied().unwrap_or(0)
    }

    pub fn is_uniform(&self) -> bool {
        self.counts.len() <= 1
    }

    pub fn rows(&self) -> usize {
        self.counts.values().sum()
    }
}

/// A resolved schema together with the evidence it was resolved from.
#[derive(Debug, Clone)]
pub struct InferredSchema {
    pub schema: DatasetSchema,
    pub samples: Vec<ColumnSample>,
    pub row_widths: RowWidthReport,
}

impl InferredSchema {
    pub fn rows_sampled(&self) -> usize {
        self.row_widths.rows()
    }
}

/// Resolves a schema from a header and at most `sample_rows` data rows.
///
/// Cells past the header width are ignored; missing cells contribute no
/// evidence to their column.
pub fn infer_schema(
    headers: &[String],
    rows: &[RawRecord],
    sample_rows: usize,
    policy: DuplicateNamePolicy,
) -> Result<InferredSchema, DuplicateColumnError> {
    let names = normalize_headers(headers, policy)?;
    let mut samples = vec![ColumnSample::new(); headers.len()];
    let mut row_widths = RowWidthReport::default();

    for row in rows.iter().take(sample_rows) {
        row_widths.record(row.len());
        for (sample, value) in samples.iter_mut().zip(row) {
            sample.observe(value);
        }
    }

    let columns = names
        .into_iter()
        .zip(headers)
        .zip(&samples)
        .map(|((name, header), sample)| ColumnSchema {
            name,
            declared_type: sample.resolve(),
            source_name: Some(header.clone()),
        })
        .collect();

    Ok(InferredSchema {
        schema: DatasetSchema { columns },
        samples,
        row_widths,
    })
}
