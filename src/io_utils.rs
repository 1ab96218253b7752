//! CSV reading and writing, input decoding and delimiter parsing.
//!
//! All file I/O in csv-loadprep flows through this module:
//!
//! - **Readers** are flexible (rows may differ in width) and honour the
//!   configured delimiter and optional quote character.
//! - **Encoding**: input bytes are decoded via `encoding_rs`, defaulting to
//!   UTF-8. Output is always UTF-8, which is what the bulk loader reads.
//! - **Writers** use the loader's fixed dialect: `;` delimiter, `"` quote,
//!   quoting only where necessary, `\n` line endings.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::{QuoteStyle, Terminator};
use encoding_rs::{Encoding, UTF_8};

use crate::schema::RawRecord;

pub const OUTPUT_DELIMITER: u8 = b';';
pub const OUTPUT_QUOTE: u8 = b'"';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => single_ascii(other, "Delimiter"),
    }
}

/// Parses a quote setting; `none` disables quoting altogether.
pub fn parse_quote(value: &str) -> Result<Option<u8>, String> {
    match value {
        "none" | "None" | "" => Ok(None),
        "double" => Ok(Some(b'"')),
        "single" => Ok(Some(b'\'')),
        other => single_ascii(other, "Quote").map(Some),
    }
}

fn single_ascii(value: &str, what: &str) -> Result<u8, String> {
    let mut chars = value.chars();
    let first = chars
        .next()
        .ok_or_else(|| format!("{what} cannot be empty"))?;
    if chars.next().is_some() {
        return Err(format!("{what} must be a single character"));
    }
    if !first.is_ascii() {
        return Err(format!("{what} must be ASCII"));
    }
    Ok(first as u8)
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, quote: Option<u8>) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true);
    match quote {
        Some(quote) => builder.quote(quote).double_quote(true),
        None => builder.quoting(false),
    };
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    quote: Option<u8>,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter, quote))
}

pub fn open_csv_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(csv_writer(base))
}

pub fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(OUTPUT_DELIMITER)
        .quote(OUTPUT_QUOTE)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true);
    builder.from_writer(writer)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<RawRecord> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads the header row and up to `limit` data rows (all rows when `None`).
pub fn read_records<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
    limit: Option<usize>,
) -> Result<(RawRecord, Vec<RawRecord>)>
where
    R: Read,
{
    let mut record = csv::ByteRecord::new();
    if !reader.read_byte_record(&mut record).context("Reading header row")? {
        return Err(anyhow!("Input is empty; a header row is required"));
    }
    let header = decode_record(&record, encoding).context("Decoding header row")?;

    let mut rows = Vec::new();
    while limit.is_none_or(|limit| rows.len() < limit) {
        let line = rows.len() + 2;
        if !reader
            .read_byte_record(&mut record)
            .with_context(|| format!("Reading row {line}"))?
        {
            break;
        }
        rows.push(decode_record(&record, encoding).with_context(|| format!("Decoding row {line}"))?);
    }
    Ok((header, rows))
}
