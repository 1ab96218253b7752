//! Run configuration.
//!
//! Settings come from an optional YAML file and command-line overrides,
//! merged field by field (command line wins) and then resolved into a typed
//! [`PipelineConfig`] that is handed to every stage explicitly.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow, ensure};
use encoding_rs::Encoding;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    io_utils,
    names::{DuplicateNamePolicy, normalize_column_name},
    schema::DEFAULT_SAMPLE_ROWS,
};

const DEFAULT_CSV_DELIMITER: u8 = b',';
const DEFAULT_TSV_DELIMITER: u8 = b'\t';
const DEFAULT_QUOTE: u8 = b'"';

static TABLE_NAME: OnceLock<Regex> = OnceLock::new();

fn table_name_pattern() -> &'static Regex {
    TABLE_NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid")
    })
}

/// Raw settings as written in a config file or given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub table: Option<String>,
    pub source: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub quote: Option<String>,
    pub input_encoding: Option<String>,
    pub sample_rows: Option<usize>,
    pub ddl: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub null_marker: Option<String>,
    pub duplicate_names: Option<DuplicateNamePolicy>,
}

impl ConfigFile {
    /// Loads a YAML config; relative paths in it are taken relative to the file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut config: ConfigFile = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            for slot in [&mut config.source, &mut config.ddl, &mut config.output] {
                if let Some(value) = slot.as_mut()
                    && value.is_relative()
                    && !io_utils::is_dash(value.as_path())
                {
                    *value = base.join(&*value);
                }
            }
        }
        Ok(config)
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            table: overrides.table.or(self.table),
            source: overrides.source.or(self.source),
            delimiter: overrides.delimiter.or(self.delimiter),
            quote: overrides.quote.or(self.quote),
            input_encoding: overrides.input_encoding.or(self.input_encoding),
            sample_rows: overrides.sample_rows.or(self.sample_rows),
            ddl: overrides.ddl.or(self.ddl),
            output: overrides.output.or(self.output),
            null_marker: overrides.null_marker.or(self.null_marker),
            duplicate_names: overrides.duplicate_names.or(self.duplicate_names),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub table: String,
    pub source: PathBuf,
    pub delimiter: u8,
    pub quote: Option<u8>,
    pub input_encoding: &'static Encoding,
    pub sample_rows: usize,
    pub ddl_output: Option<PathBuf>,
    pub data_output: Option<PathBuf>,
    pub null_marker: String,
    pub duplicate_names: DuplicateNamePolicy,
}

impl PipelineConfig {
    pub fn resolve(raw: ConfigFile) -> Result<Self> {
        let source = raw
            .source
            .ok_or_else(|| anyhow!("An input file is required (--input or 'source' in config)"))?;
        let delimiter = match raw.delimiter.as_deref() {
            Some(token) => io_utils::parse_delimiter(token)
                .map_err(|err| anyhow!("Invalid delimiter '{token}': {err}"))?,
            None => default_delimiter(&source),
        };
        let quote = match raw.quote.as_deref() {
            Some(token) => io_utils::parse_quote(token)
                .map_err(|err| anyhow!("Invalid quote '{token}': {err}"))?,
            None => Some(DEFAULT_QUOTE),
        };
        let input_encoding = io_utils::resolve_encoding(raw.input_encoding.as_deref())?;
        let table = match raw.table {
            Some(table) => table,
            None => default_table_name(&source),
        };
        let config = PipelineConfig {
            table,
            source,
            delimiter,
            quote,
            input_encoding,
            sample_rows: raw.sample_rows.unwrap_or(DEFAULT_SAMPLE_ROWS),
            ddl_output: raw.ddl,
            data_output: raw.output,
            null_marker: raw.null_marker.unwrap_or_default(),
            duplicate_names: raw.duplicate_names.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            table_name_pattern().is_match(&self.table),
            "Table name '{}' must be a plain identifier (letters, digits, underscore)",
            self.table
        );
        ensure!(self.sample_rows > 0, "Sample size must be at least one row");
        ensure!(
            self.quote != Some(self.delimiter),
            "Delimiter and quote character must differ"
        );
        ensure!(
            !self.null_marker.contains(['\n', '\r']),
            "Null marker cannot contain line breaks"
        );
        Ok(())
    }
}

fn default_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

fn default_table_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(normalize_column_name)
        .unwrap_or_default()
        .replace(|c: char| !c.is_ascii_alphanumeric() && c != '_', "_");
    match stem.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => stem,
        Some(_) => format!("t_{stem}"),
        None => "data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn with_source(path: &str) -> ConfigFile {
        ConfigFile {
            source: Some(PathBuf::from(path)),
            ..ConfigFile::default()
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let config = PipelineConfig::resolve(with_source("data/Výkaz práce.csv")).unwrap();
        assert_eq!(config.table, "vykazprace");
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.quote, Some(b'"'));
        assert_eq!(config.sample_rows, 1000);
        assert_eq!(config.null_marker, "");
        assert_eq!(config.duplicate_names, DuplicateNamePolicy::Suffix);

        let tsv = PipelineConfig::resolve(with_source("2024 export.tsv")).unwrap();
        assert_eq!(tsv.delimiter, b'\t');
        assert_eq!(tsv.table, "t_2024export");
    }

    #[test]
    fn resolve_requires_source() {
        let err = PipelineConfig::resolve(ConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("input file is required"));
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut raw = with_source("a.csv");
        raw.table = Some("drop table x".to_string());
        assert!(PipelineConfig::resolve(raw).is_err());

        let mut raw = with_source("a.csv");
        raw.delimiter = Some("\"".to_string());
        assert!(PipelineConfig::resolve(raw).is_err());

        let mut raw = with_source("a.csv");
        raw.sample_rows = Some(0);
        assert!(PipelineConfig::resolve(raw).is_err());
    }

    #[test]
    fn quote_can_be_disabled() {
        let mut raw = with_source("a.csv");
        raw.quote = Some("None".to_string());
        assert_eq!(PipelineConfig::resolve(raw).unwrap().quote, None);
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = ConfigFile {
            table: Some("from_file".to_string()),
            delimiter: Some(";".to_string()),
            ..with_source("a.csv")
        };
        let overrides = ConfigFile {
            table: Some("from_cli".to_string()),
            ..ConfigFile::default()
        };
        let merged = file.merge(overrides);
        assert_eq!(merged.table.as_deref(), Some("from_cli"));
        assert_eq!(merged.delimiter.as_deref(), Some(";"));
        assert_eq!(merged.source, Some(PathBuf::from("a.csv")));
    }

    #[test]
    fn load_resolves_paths_relative_to_config() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("job.yml");
        fs::write(
            &path,
            "table: orders\nsource: input.csv\ndelimiter: semicolon\nquote: none\nddl: out/create.sql\nduplicate_names: reject\n",
        )
        .expect("write config");
        let config = ConfigFile::load(&path).expect("load config");
        assert_eq!(config.source, Some(dir.path().join("input.csv")));
        assert_eq!(config.ddl, Some(dir.path().join("out/create.sql")));
        assert_eq!(config.duplicate_names, Some(DuplicateNamePolicy::Reject));

        let resolved = PipelineConfig::resolve(config).unwrap();
        assert_eq!(resolved.delimiter, b';');
        assert_eq!(resolved.quote, None);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("job.yml");
        fs::write(&path, "tabel: typo\n").expect("write config");
        assert!(ConfigFile::load(&path).is_err());
    }
}
