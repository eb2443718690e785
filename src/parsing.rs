//! Small parsers shared by metadata directives, document accessors and the
//! table-of-contents builder.
//!
//! ## Dates
//!
//! Directive dates are either RFC 3339 timestamps or bare `YYYY-MM-DD`
//! days (taken as midnight UTC). Anything else is an error; there is no
//! fallback to "now".
//!
//! ## Tags
//!
//! A comma-separated list, trimmed and lower-cased. A few tokens are
//! workflow markers from the writing tool rather than topics and are dropped:
//! see [`RESERVED_TAGS`].
//!
//! ## Ids
//!
//! Articles migrated from the old blog carry integer ids. Those are replaced
//! by a short base-64 form (`1234` → `JI`) so permalinks stay compact;
//! [`decode_id`] reverses it for redirects.

use crate::types::Status;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

/// Tokens that are never kept as tags.
pub const RESERVED_TAGS: &[&str] = &["for-blog", "published", "draft"];

const ID_ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

const MAX_SLUG_LEN: usize = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date")]
pub struct DateParseError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a valid status")]
pub struct StatusParseError(pub String);

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` day.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, DateParseError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| DateParseError(s.to_string()))
}

/// Split, trim and lower-case a tag list, dropping reserved and empty tokens.
///
/// Order is preserved and duplicates are kept.
pub fn parse_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && !RESERVED_TAGS.contains(&t.as_str()))
        .collect()
}

/// Map a status word (case-insensitive) to a [`Status`]. Empty means published.
pub fn parse_status(s: &str) -> Result<Status, StatusParseError> {
    match s.trim().to_lowercase().as_str() {
        "" | "published" => Ok(Status::Published),
        "idea" => Ok(Status::Idea),
        "draft" => Ok(Status::Draft),
        "revise" => Ok(Status::Revise),
        _ => Err(StatusParseError(s.trim().to_string())),
    }
}

/// Short reversible encoding of an integer id.
pub fn encode_id(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ID_ALPHABET[(n % 64) as usize]);
        n /= 64;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Inverse of [`encode_id`]. `None` for empty input, foreign characters or
/// overflow.
pub fn decode_id(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.bytes().try_fold(0u64, |acc, b| {
        let digit = ID_ALPHABET.iter().position(|&c| c == b)? as u64;
        acc.checked_mul(64)?.checked_add(digit)
    })
}

/// Normalize a source identity: dashes removed, lower-cased.
pub fn normalize_id(id: &str) -> String {
    id.trim().replace('-', "").to_lowercase()
}

/// Lower-case URL slug of a title.
///
/// - Non-alphanumeric characters become dashes
/// - Consecutive dashes collapse into one
/// - Leading and trailing dashes are stripped
/// - Longer than `MAX_SLUG_LEN` is cut at the last dash before the limit
pub fn urlify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    let trimmed = slug.trim_matches('-');
    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}
