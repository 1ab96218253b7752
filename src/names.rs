//! Column identifier normalization.
//!
//! Header tokens are lowercased, stripped of Czech diacritics, punctuation and
//! unit suffixes, and remapped away from reserved words so they can be used
//! unquoted in table definitions.

use std::collections::HashSet;

use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TRANSLITERATION: &[(char, char)] = &[
    ('á', 'a'),
    ('é', 'e'),
    ('í', 'i'),
    ('ý', 'y'),
    ('ó', 'o'),
    ('ů', 'u'),
    ('ú', 'u'),
    ('ě', 'e'),
    ('š', 's'),
    ('č', 'c'),
    ('ř', 'r'),
    ('ž', 'z'),
];

const UNIT_SUFFIXES: &[&str] = &["(kc)", "(h)"];

const BRACKET_CHARS: &[char] = &['(', ')', '/', '\\', '[', ']'];

const RESERVED_NAMES: &[(&str, &str)] = &[("index", "ix"), ("key2", "neco")];

/// How to treat two headers that normalize to the same identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum DuplicateNamePolicy {
    /// Rename later occurrences to `name_2`, `name_3`, ...
    #[default]
    Suffix,
    /// Fail the run.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Headers '{first}' (position {first_position}) and '{second}' (position {second_position}) both normalize to '{name}'"
)]
pub struct DuplicateColumnError {
    pub name: String,
    pub first: String,
    pub first_position: usize,
    pub second: String,
    pub second_position: usize,
}

/// Turns a raw header token into a lowercase identifier.
pub fn normalize_column_name(token: &str) -> String {
    let mut name: String = token
        .to_lowercase()
        .chars()
        .map(transliterate)
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .collect();
    for suffix in UNIT_SUFFIXES {
        name = name.replace(suffix, "");
    }
    name.retain(|c| !BRACKET_CHARS.contains(&c));
    match RESERVED_NAMES.iter().find(|(reserved, _)| *reserved == name) {
        Some((_, replacement)) => (*replacement).to_string(),
        None => name,
    }
}

fn transliterate(c: char) -> char {
    TRANSLITERATION
        .iter()
        .find(|(accented, _)| *accented == c)
        .map(|(_, plain)| *plain)
        .unwrap_or(c)
}

/// Normalizes a full header row, making the result unique per `policy`.
pub fn normalize_headers(
    headers: &[String],
    policy: DuplicateNamePolicy,
) -> Result<Vec<String>, DuplicateColumnError> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    let mut used = HashSet::new();
    for (idx, header) in headers.iter().enumerate() {
        let mut name = normalize_column_name(header);
        if name.is_empty() {
            name = format!("column_{}", idx + 1);
        }
        if used.contains(&name) {
            match policy {
                DuplicateNamePolicy::Reject => {
                    let first_idx = names.iter().position(|n| *n == name).unwrap_or_default();
                    return Err(DuplicateColumnError {
                        name,
                        first: headers[first_idx].clone(),
                        first_position: first_idx + 1,
                        second: header.clone(),
                        second_position: idx + 1,
                    });
                }
                DuplicateNamePolicy::Suffix => {
                    let renamed = next_free_name(&name, &used);
                    warn!(
                        "Header '{}' at position {} normalizes to duplicate '{}'; using '{}'",
                        header,
                        idx + 1,
                        name,
                        renamed
                    );
                    name = renamed;
                }
            }
        }
        used.insert(name.clone());
        names.push(name);
    }
    Ok(names)
}

fn next_free_name(base: &str, used: &HashSet<String>) -> String {
    (2usize..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
