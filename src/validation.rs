//! Caller input checks run before anything touches the limiter or the network.

use crate::error::ValidationError;
use crate::upstream::SearchQuery;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

pub const MAX_QUERY_LEN: usize = 200;
pub const MAX_CITY_LEN: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: u32 = 25;
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// Normalise an EIN to its nine bare digits.
///
/// Accepts `NN-NNNNNNN` or `NNNNNNNNN`, ignoring surrounding whitespace.
pub fn normalize_ein(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::for_field("ein", "EIN is required"));
    }

    let digits = match trimmed.split_once('-') {
        Some((prefix, rest)) if prefix.len() == 2 => format!("{prefix}{rest}"),
        Some(_) => {
            return Err(ValidationError::for_field(
                "ein",
                "EIN must be formatted as NN-NNNNNNN or NNNNNNNNN",
            ))
        }
        None => trimmed.to_string(),
    };

    if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::for_field("ein", "EIN must contain exactly 9 digits"));
    }
    Ok(digits)
}

/// Raw search arguments as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchArgs {
    pub query: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Sanitise and bound search arguments.
pub fn validate_search(args: &SearchArgs) -> Result<SearchQuery, ValidationError> {
    let query = clean_text(args.query.as_deref(), "query", MAX_QUERY_LEN)?;
    let city = clean_text(args.city.as_deref(), "city", MAX_CITY_LEN)?;
    let state = match args.state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(state) if state.len() == 2 && state.bytes().all(|b| b.is_ascii_alphabetic()) => {
            Some(state.to_ascii_uppercase())
        }
        Some(_) => {
            return Err(ValidationError::for_field("state", "state must be a 2-letter code"))
        }
        None => None,
    };

    if query.is_none() && city.is_none() && state.is_none() {
        return Err(ValidationError::new("provide at least one of query, city or state"));
    }

    let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(ValidationError::for_field(
            "limit",
            format!("limit must be between 1 and {MAX_SEARCH_LIMIT}"),
        ));
    }

    Ok(SearchQuery { query, city, state, limit: Some(limit), offset: Some(args.offset.unwrap_or(0)) })
}

fn clean_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let cleaned: String = value.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    if cleaned.chars().count() > max_len {
        return Err(ValidationError::for_field(
            field,
            format!("{field} must be at most {max_len} characters"),
        ));
    }
    Ok(Some(cleaned.to_string()))
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC) that is not after `now`.
pub fn parse_since(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    let since = if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        ts.with_timezone(&Utc)
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| ValidationError::for_field("since", "invalid date"))?
    } else {
        return Err(ValidationError::for_field(
            "since",
            "since must be an RFC 3339 timestamp or a YYYY-MM-DD date",
        ));
    };

    if since > now {
        return Err(ValidationError::for_field("since", "since must not be in the future"));
    }
    Ok(since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ein_forms() {
        assert_eq!(normalize_ein("12-3456789").unwrap(), "123456789");
        assert_eq!(normalize_ein(" 123456789 ").unwrap(), "123456789");
        assert_eq!(normalize_ein("00-0000000").unwrap(), "000000000");
    }

    #[test]
    fn ein_rejections() {
        for bad in ["", "   ", "1234", "123-456789", "12-345678a", "1234567890", "12-34-56789"] {
            let err = normalize_ein(bad).unwrap_err();
            assert_eq!(err.field(), Some("ein"), "input {bad:?}");
        }
    }

    #[test]
    fn search_defaults_and_normalisation() {
        let query = validate_search(&SearchArgs {
            query: Some("  food\u{7}bank ".into()),
            state: Some("wa".into()),
            ..SearchArgs::default()
        })
        .unwrap();
        assert_eq!(query.query.as_deref(), Some("foodbank"));
        assert_eq!(query.state.as_deref(), Some("WA"));
        assert_eq!(query.city, None);
        assert_eq!(query.limit, Some(DEFAULT_SEARCH_LIMIT));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn search_requires_some_criterion() {
        let err = validate_search(&SearchArgs { query: Some("   ".into()), ..Default::default() })
            .unwrap_err();
        assert_eq!(err.field(), None);
    }

    #[test]
    fn search_bounds() {
        let too_long = "x".repeat(MAX_QUERY_LEN + 1);
        let err = validate_search(&SearchArgs { query: Some(too_long), ..Default::default() })
            .unwrap_err();
        assert_eq!(err.field(), Some("query"));

        let err = validate_search(&SearchArgs {
            city: Some("Austin".into()),
            limit: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.field(), Some("limit"));

        let err = validate_search(&SearchArgs { state: Some("Texas".into()), ..Default::default() })
            .unwrap_err();
        assert_eq!(err.field(), Some("state"));
    }

    #[test]
    fn since_parsing() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_since("2024-01-15", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_since("2024-01-15T10:00:00+02:00", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
        );
        assert!(parse_since("yesterday", now).is_err());
        assert!(parse_since("2030-01-01", now).is_err());
    }
}
