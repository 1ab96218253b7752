use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

use crate::datetime::parse_datetime;

/// Classification of a single raw cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Date,
    Timestamp,
    Decimal,
    Integer,
    Varchar,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Date => "date",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Decimal => "decimal",
            TypeTag::Integer => "integer",
            TypeTag::Varchar => "varchar",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies one raw value. Never fails: anything unrecognized is `Varchar`.
///
/// Empty and `"0"` values count as `Null` so zero-heavy numeric columns do not
/// tilt the statistics. Three dot-separated parts without a colon are tried
/// as a date before the value is ever considered numeric.
pub fn classify(token: &str) -> TypeTag {
    if token.is_empty() || token == "0" {
        return TypeTag::Null;
    }
    let has_colon = token.contains(':');
    if !has_colon && token.contains('.') && token.split('.').count() == 3 {
        return date_or_varchar(token, TypeTag::Date);
    }
    if has_colon {
        return date_or_varchar(token, TypeTag::Timestamp);
    }
    if token.contains(['.', ',']) {
        return if parse_decimal_token(token).is_some() {
            TypeTag::Decimal
        } else {
            TypeTag::Varchar
        };
    }
    // Integers wider than i64 fall through to varchar.
    match token.trim().parse::<i64>() {
        Ok(_) => TypeTag::Integer,
        Err(_) => TypeTag::Varchar,
    }
}

fn date_or_varchar(token: &str, tag: TypeTag) -> TypeTag {
    match parse_datetime(token) {
        Ok(_) => tag,
        Err(_) => TypeTag::Varchar,
    }
}

/// Parses a decimal written with either `,` or `.` as the fractional separator.
pub fn parse_decimal_token(token: &str) -> Option<Decimal> {
    let candidate = token.trim().replace(',', ".");
    if candidate.is_empty() {
        return None;
    }
    Decimal::from_str(&candidate)
        .or_else(|_| Decimal::from_scientific(&candidate))
        .ok()
}
