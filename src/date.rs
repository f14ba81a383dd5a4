//! Publish dates. A page's date comes from its front matter when that parses,
//! else from a `YYYY-MM-DD` prefix on its file name, else from the file
//! system.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// Matches a file name prefixed with a date, e.g. `2025-02-03-file.md`.
static FILE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}).*\..*").unwrap());

/// `strftime` format for dates exposed to templates and front matter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `strftime` format for dates that carry a time of day.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longer format for display, e.g. `2025 February 03`.
pub const DISPLAY_FORMAT: &str = "%Y %B %d";

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

/// The template form of a date: [`DATE_FORMAT`] at midnight, else
/// [`DATETIME_FORMAT`] so the time of day survives.
pub fn format(date: &NaiveDateTime) -> String {
    match date.num_seconds_from_midnight() {
        0 => date.format(DATE_FORMAT).to_string(),
        _ => date.format(DATETIME_FORMAT).to_string(),
    }
}

/// Parses the date embedded at the start of a file name, if any.
pub fn from_file_name(path: &Path) -> Option<NaiveDateTime> {
    let file_name = path.file_name()?.to_str()?;
    let captures = FILE_DATE.captures(file_name)?;
    let date = NaiveDate::parse_from_str(&captures[1], DATE_FORMAT).ok()?;
    midnight(date)
}

/// Parses a front-matter date: `YYYY-MM-DD`, optionally followed by a time
/// as `YYYY-MM-DD HH:MM[:SS]` or RFC 3339.
pub fn from_front_matter(value: &serde_yaml::Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(midnight)
}

/// The file's creation time, falling back to its modification time on
/// platforms that don't record creation.
pub fn from_file_system(path: &Path) -> io::Result<NaiveDateTime> {
    let metadata = std::fs::metadata(path)?;
    let time = match metadata.created() {
        Ok(time) => time,
        Err(_) => metadata.modified()?,
    };
    Ok(DateTime::<Local>::from(time).naive_local())
}

/// Determines the date of a source file without front matter: the file name
/// date if present, else the file system timestamp.
pub fn file_date(path: &Path) -> io::Result<NaiveDateTime> {
    match from_file_name(path) {
        Some(date) => Ok(date),
        None => from_file_system(path),
    }
}
