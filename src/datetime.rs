//! Date and timestamp recognition for raw cell values.
//!
//! Two entry points exist. [`parse_datetime`] walks an ordered table of
//! fourteen day-first, slash, ISO and month-name layouts and returns the
//! first match; it backs type classification. [`parse_strict_ddmmyyyy_or_timestamp`]
//! accepts only `dd.mm.yyyy[ HH:MM:SS]` and is used when rewriting values
//! into canonical `YYYY-MM-DD HH:MM:SS` text.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized date format: '{token}'")]
pub struct DateFormatError {
    pub token: String,
}

impl DateFormatError {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

struct Layout {
    format: &'static str,
    // chrono accepts short years for %Y and full month names for %b, so each
    // layout is gated by the exact token shape it stands for.
    shape: &'static str,
    has_time: bool,
}

const LAYOUTS: [Layout; 14] = [
    Layout {
        format: "%d.%m.%Y %H:%M:%S",
        shape: r"^\d{1,2}\.\d{1,2}\.\d{4} \d{1,2}:\d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d.%m.%Y %H:%M",
        shape: r"^\d{1,2}\.\d{1,2}\.\d{4} \d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d.%m.%Y",
        shape: r"^\d{1,2}\.\d{1,2}\.\d{4}$",
        has_time: false,
    },
    Layout {
        format: "%d.%m.%y",
        shape: r"^\d{1,2}\.\d{1,2}\.\d{2}$",
        has_time: false,
    },
    Layout {
        format: "%d/%m/%Y %H:%M:%S",
        shape: r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d/%m/%Y %H:%M",
        shape: r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d/%m/%Y",
        shape: r"^\d{1,2}/\d{1,2}/\d{4}$",
        has_time: false,
    },
    Layout {
        format: "%Y-%m-%d %H:%M:%S",
        shape: r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%Y-%m-%d %H:%M",
        shape: r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%Y-%m-%d",
        shape: r"^\d{4}-\d{1,2}-\d{1,2}$",
        has_time: false,
    },
    Layout {
        format: "%d %b %Y %H:%M",
        shape: r"^\d{1,2} [A-Za-z]{3} \d{4} \d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d %B %Y %H:%M",
        shape: r"^\d{1,2} [A-Za-z]{3,9} \d{4} \d{1,2}:\d{1,2}$",
        has_time: true,
    },
    Layout {
        format: "%d %b %Y",
        shape: r"^\d{1,2} [A-Za-z]{3} \d{4}$",
        has_time: false,
    },
    Layout {
        format: "%d %B %Y",
        shape: r"^\d{1,2} [A-Za-z]{3,9} \d{4}$",
        has_time: false,
    },
];

static SHAPES: OnceLock<Vec<Regex>> = OnceLock::new();

fn layout_shapes() -> &'static [Regex] {
    SHAPES.get_or_init(|| {
        LAYOUTS
            .iter()
            .map(|layout| Regex::new(layout.shape).expect("layout shape is a valid pattern"))
            .collect()
    })
}

impl Layout {
    fn parse(&self, token: &str) -> Option<NaiveDateTime> {
        if self.has_time {
            NaiveDateTime::parse_from_str(token, self.format).ok()
        } else {
            NaiveDate::parse_from_str(token, self.format)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        }
    }
}

/// Parses `token` against the known layouts in order, returning the first match.
///
/// Surrounding whitespace is ignored. Date-only layouts resolve to midnight.
pub fn parse_datetime(token: &str) -> Result<NaiveDateTime, DateFormatError> {
    let trimmed = token.trim();
    LAYOUTS
        .iter()
        .zip(layout_shapes())
        .filter(|(_, shape)| shape.is_match(trimmed))
        .find_map(|(layout, _)| layout.parse(trimmed))
        .ok_or_else(|| DateFormatError::new(token))
}

// Four-digit years only; chrono alone would read `30.06.25` as year 25.
const STRICT_SHAPES: [&str; 2] = [
    r"^\d{1,2}\.\d{1,2}\.\d{4}( \d{1,2}:\d{1,2}:\d{1,2})?$",
    r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$",
];

static STRICT: OnceLock<Vec<Regex>> = OnceLock::new();

fn strict_shapes() -> &'static [Regex] {
    STRICT.get_or_init(|| {
        STRICT_SHAPES
            .iter()
            .map(|shape| Regex::new(shape).expect("strict shape is a valid pattern"))
            .collect()
    })
}

/// Rewrites a `dd.mm.yyyy` or `dd.mm.yyyy HH:MM:SS` token to canonical text.
///
/// Returns `Ok(None)` for empty input. Tokens already in canonical form are
/// accepted unchanged so the rewrite can be applied repeatedly.
pub fn parse_strict_ddmmyyyy_or_timestamp(token: &str) -> Result<Option<String>, DateFormatError> {
    if token.is_empty() {
        return Ok(None);
    }
    if !strict_shapes().iter().any(|shape| shape.is_match(token)) {
        return Err(DateFormatError::new(token));
    }
    let parsed = if token.contains(':') {
        NaiveDateTime::parse_from_str(token, "%d.%m.%Y %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(token, CANONICAL_DATETIME_FORMAT))
    } else {
        NaiveDate::parse_from_str(token, "%d.%m.%Y").map(|date| date.and_time(NaiveTime::MIN))
    };
    parsed
        .map(|value| Some(value.format(CANONICAL_DATETIME_FORMAT).to_string()))
        .map_err(|_| DateFormatError::new(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn parse_datetime_supports_day_first_layouts() {
        assert_eq!(
            parse_datetime("30.06.2025 14:30:00").unwrap(),
            at(2025, 6, 30, 14, 30, 0)
        );
        assert_eq!(
            parse_datetime("30.06.2025 14:30").unwrap(),
            at(2025, 6, 30, 14, 30, 0)
        );
        assert_eq!(parse_datetime("1.1.2024").unwrap(), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(
            parse_datetime("30/06/2025 08:05").unwrap(),
            at(2025, 6, 30, 8, 5, 0)
        );
    }

    #[test]
    fn short_year_is_not_taken_as_four_digit_year() {
        assert_eq!(parse_datetime("30.06.25").unwrap(), at(2025, 6, 30, 0, 0, 0));
    }

    #[test]
    fn parse_datetime_supports_iso_and_month_names() {
        assert_eq!(
            parse_datetime("2025-06-30 14:30:15").unwrap(),
            at(2025, 6, 30, 14, 30, 15)
        );
        assert_eq!(parse_datetime("2025-06-30").unwrap(), at(2025, 6, 30, 0, 0, 0));
        assert_eq!(
            parse_datetime("30 Jun 2025 14:30").unwrap(),
            at(2025, 6, 30, 14, 30, 0)
        );
        assert_eq!(
            parse_datetime(" 30 June 2025 ").unwrap(),
            at(2025, 6, 30, 0, 0, 0)
        );
    }

    #[test]
    fn parse_datetime_reports_input_token() {
        let err = parse_datetime("31.02.2024").unwrap_err();
        assert_eq!(err.token, "31.02.2024");
        assert!(parse_datetime("1.2.3").is_err());
        assert!(parse_datetime("10:00").is_err());
    }

    #[test]
    fn strict_parser_canonicalizes_dates_and_timestamps() {
        assert_eq!(
            parse_strict_ddmmyyyy_or_timestamp("2.1.2024").unwrap().as_deref(),
            Some("2024-01-02 00:00:00")
        );
        assert_eq!(
            parse_strict_ddmmyyyy_or_timestamp("31.12.2024 23:59:58")
                .unwrap()
                .as_deref(),
            Some("2024-12-31 23:59:58")
        );
        assert_eq!(parse_strict_ddmmyyyy_or_timestamp("").unwrap(), None);
    }

    #[test]
    fn strict_parser_accepts_canonical_output() {
        assert_eq!(
            parse_strict_ddmmyyyy_or_timestamp("2024-01-02 00:00:00")
                .unwrap()
                .as_deref(),
            Some("2024-01-02 00:00:00")
        );
    }

    #[test]
    fn strict_parser_rejects_other_layouts() {
        assert!(parse_strict_ddmmyyyy_or_timestamp("2024-01-02").is_err());
        assert!(parse_strict_ddmmyyyy_or_timestamp("02/01/2024").is_err());
        assert!(parse_strict_ddmmyyyy_or_timestamp("31.12.2024 10:00").is_err());
    }

    #[test]
    fn strict_parser_requires_four_digit_year() {
        assert!(parse_datetime("30.06.25").is_ok());
        assert!(parse_strict_ddmmyyyy_or_timestamp("30.06.25").is_err());
        assert!(parse_strict_ddmmyyyy_or_timestamp("30.06.25 10:00:00").is_err());
        assert!(parse_strict_ddmmyyyy_or_timestamp("30.06.025").is_err());
        assert!(parse_strict_ddmmyyyy_or_timestamp("25-06-30 10:00:00").is_err());
        assert_eq!(
            parse_strict_ddmmyyyy_or_timestamp("30.06.2025 10:00:00")
                .unwrap()
                .as_deref(),
            Some("2025-06-30 10:00:00")
        );
    }
}
