//! Schema normalization for tracker CSV exports.
//!
//! Turns a raw export into an [`IssueTable`]:
//! - fails fast when a required column is missing
//! - parses date columns under an ordered list of format candidates
//! - converts estimates from seconds to hours (exactly once, here)
//! - consolidates repeated `Sprint` columns into one `;`-joined field
//! - derives each issue's [`Category`](crate::models::Category)
//!
//! Individual malformed values never fail the load: dates become `None` and
//! estimates become zero.

use crate::models::{Issue, IssueTable, SPRINT_DELIMITER, categorize};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::io::Read;
use tracing::{debug, info, warn};

/// Columns every export must carry.
pub const REQUIRED_COLUMNS: [&str; 19] = [
    ISSUE_TYPE_COLUMN,
    "Issue key",
    "Issue id",
    "Summary",
    "Assignee",
    "Assignee Id",
    "Reporter",
    "Reporter Id",
    "Priority",
    "Status",
    "Resolution",
    "Created",
    "Updated",
    "Due date",
    "Original estimate",
    "Parent",
    "Parent summary",
    "Description",
    SPRINT_COLUMN,
];

pub const ISSUE_TYPE_COLUMN: &str = "Issue Type";

/// Newer exports name the issue-type column this way.
pub const WORK_TYPE_COLUMN: &str = "Work type";

pub const SPRINT_COLUMN: &str = "Sprint";

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Date formats tried in order; the first one that parses any value wins.
pub const DATE_FORMATS: [&str; 8] = [
    "%d/%b/%y %I:%M %p",
    "%d/%b/%y %H:%M",
    "%d/%b/%Y %I:%M %p",
    "%d/%b/%Y",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
];

/// Day-first formats used per value when no candidate format fits the column.
const LENIENT_FORMATS: [&str; 14] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d",
    "%d/%m/%Y %H:%M",
    "%d/%m/%y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
];

/// A raw export: headers plus string rows, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a CSV export. Ragged rows are tolerated; missing cells read as empty.
    ///
    /// Cells that are not valid UTF-8 are decoded lossily.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let mut lossy = 0usize;
        let headers = decode_record(reader.byte_headers()?, &mut lossy)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.byte_records() {
            rows.push(decode_record(&record?, &mut lossy));
        }
        if lossy > 0 {
            warn!(cells = lossy, "replaced invalid UTF-8 in export");
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column with this exact name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indexes of every column sharing a base name, in column order.
    ///
    /// Matches the bare name and pandas-style suffixed copies (`Sprint.1`).
    pub fn repeated_columns(&self, base: &str) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| is_repeat_of(h, base))
            .map(|(i, _)| i)
            .collect()
    }

    fn cell(&self, row: usize, column: Option<usize>) -> &str {
        column
            .and_then(|c| self.rows[row].get(c))
            .map(|v| v.trim())
            .unwrap_or_default()
    }

    fn column_values(&self, column: Option<usize>) -> Vec<&str> {
        (0..self.rows.len()).map(|r| self.cell(r, column)).collect()
    }

    /// Required columns absent from this table.
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|&&required| match required {
                ISSUE_TYPE_COLUMN => self.issue_type_column().is_none(),
                SPRINT_COLUMN => self.repeated_columns(SPRINT_COLUMN).is_empty(),
                other => self.column(other).is_none(),
            })
            .map(|c| c.to_string())
            .collect()
    }

    fn issue_type_column(&self) -> Option<usize> {
        self.column(ISSUE_TYPE_COLUMN)
            .or_else(|| self.column(WORK_TYPE_COLUMN))
    }
}

fn decode_record(record: &csv::ByteRecord, lossy: &mut usize) -> Vec<String> {
    record
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(text) => text.to_string(),
            Err(_) => {
                *lossy += 1;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect()
}

fn is_repeat_of(header: &str, base: &str) -> bool {
    match header.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

/// Read and normalize a CSV export into an issue table.
pub fn normalize<R: Read>(reader: R) -> Result<IssueTable> {
    let raw = RawTable::from_reader(reader)?;
    normalize_raw(&raw)
}

/// Normalize an already-read raw table.
pub fn normalize_raw(raw: &RawTable) -> Result<IssueTable> {
    let missing = raw.missing_columns();
    if !missing.is_empty() {
        warn!(?missing, "export is missing required columns");
        return Err(Error::MissingColumns(missing));
    }

    let col = |name: &str| raw.column(name);
    let created = parse_date_column("Created", &raw.column_values(col("Created")));
    let updated = parse_date_column("Updated", &raw.column_values(col("Updated")));
    let due = parse_date_column("Due date", &raw.column_values(col("Due date")));
    let sprint_columns = raw.repeated_columns(SPRINT_COLUMN);
    let issue_type = raw.issue_type_column();

    let mut bad_estimates = 0usize;
    let issues = (0..raw.row_count())
        .map(|r| {
            let text = |name: &str| optional(raw.cell(r, col(name)));
            let estimate_raw = raw.cell(r, col("Original estimate"));
            let estimate_hours = parse_estimate_hours(estimate_raw);
            if estimate_hours == 0.0 && !estimate_raw.is_empty() && !is_zero(estimate_raw) {
                bad_estimates += 1;
            }

            let parent_summary = text("Parent summary");
            let category = categorize(parent_summary.as_deref());

            Issue {
                issue_type: raw.cell(r, issue_type).to_string(),
                key: raw.cell(r, col("Issue key")).to_string(),
                id: raw.cell(r, col("Issue id")).to_string(),
                summary: raw.cell(r, col("Summary")).to_string(),
                assignee: text("Assignee"),
                assignee_id: text("Assignee Id"),
                reporter: text("Reporter"),
                reporter_id: text("Reporter Id"),
                priority: text("Priority"),
                status: raw.cell(r, col("Status")).to_string(),
                resolution: text("Resolution"),
                created: created[r],
                updated: updated[r],
                due: due[r],
                estimate_hours,
                parent: text("Parent"),
                parent_summary,
                description: text("Description"),
                sprints: consolidate(sprint_columns.iter().map(|&c| raw.cell(r, Some(c)))),
                category,
            }
        })
        .collect::<Vec<_>>();

    if bad_estimates > 0 {
        warn!(count = bad_estimates, "non-numeric estimates treated as zero");
    }
    info!(
        rows = issues.len(),
        sprint_columns = sprint_columns.len(),
        "normalized export"
    );
    Ok(IssueTable::new(issues))
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn is_zero(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(|v| v == 0.0)
}

/// Join non-empty values with `;`, in the order given. No values yields "".
pub fn consolidate<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(&SPRINT_DELIMITER.to_string())
}

/// Convert a raw seconds value to hours. Missing or non-numeric → 0.
pub fn parse_estimate_hours(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() => seconds / SECONDS_PER_HOUR,
        _ => 0.0,
    }
}

/// Parse a whole date column.
///
/// Tries each of [`DATE_FORMATS`] against the column and keeps the first
/// under which at least one value parses; values that don't fit it become
/// `None`. When no candidate fits, each value goes through the lenient parser.
pub fn parse_date_column(name: &str, values: &[&str]) -> Vec<Option<NaiveDateTime>> {
    if values.iter().all(|v| v.is_empty()) {
        return vec![None; values.len()];
    }

    for format in DATE_FORMATS {
        let parsed: Vec<_> = values.iter().map(|v| parse_with_format(v, format)).collect();
        if parsed.iter().any(Option::is_some) {
            debug!(column = name, format, "date column format detected");
            report_unparsed(name, values, &parsed);
            return parsed;
        }
    }

    debug!(column = name, "no date format matched, using lenient parsing");
    let parsed: Vec<_> = values.iter().map(|v| parse_lenient(v)).collect();
    report_unparsed(name, values, &parsed);
    parsed
}

fn report_unparsed(name: &str, values: &[&str], parsed: &[Option<NaiveDateTime>]) {
    let unparsed = values
        .iter()
        .zip(parsed)
        .filter(|(v, p)| !v.is_empty() && p.is_none())
        .count();
    if unparsed > 0 {
        warn!(column = name, count = unparsed, "unparseable dates treated as missing");
    }
}

/// Parse one value under one format. Date-only formats yield midnight.
pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Day-first best-effort parsing of a single value.
pub fn parse_lenient(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    DATE_FORMATS
        .iter()
        .chain(LENIENT_FORMATS.iter())
        .find_map(|format| parse_with_format(value, format))
}
