use std::collections::HashSet;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{IngestError, RowFailure};
use crate::models::{Platform, Review, Sentiment, Theme};

/// Columns every store export must carry, checked verbatim.
pub const REQUIRED_HEADERS: [&str; 6] = [
    "Star Rating",
    "Review Text",
    "Review Submit Date and Time",
    "Review Submit Millis Since Epoch",
    "Review Link",
    "Device",
];

/// Column order written by the review explorer export.
pub const EXPORT_HEADERS: [&str; 8] = [
    "ID",
    "Platform",
    "Author",
    "Rating",
    "Date",
    "Sentiment",
    "Theme",
    "Text",
];

const MAX_REPORTED_FAILURES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// Raw app-store export, unclassified.
    StoreExport,
    /// A file previously written by `export`, already classified.
    ReviewExplorer,
}

impl SourceLayout {
    pub fn label(&self) -> &'static str {
        match self {
            SourceLayout::StoreExport => "store export",
            SourceLayout::ReviewExplorer => "review explorer export",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                if idx == 0 {
                    header.trim_start_matches('\u{feff}').to_string()
                } else {
                    header.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |values| RawRow {
            headers: &self.headers,
            values,
        })
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|header| header == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl<'a> RawRow<'a> {
    /// Value of a column, `None` when the column is absent or the cell is blank.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.raw(column).filter(|value| !value.trim().is_empty())
    }

    /// Cell exactly as written, whitespace included.
    pub fn raw(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|header| header == column)?;
        self.values.get(idx).map(String::as_str)
    }
}

/// Checks the header contract once per upload, before any row is touched.
pub fn validate_headers(table: &RawTable) -> Result<SourceLayout, IngestError> {
    if EXPORT_HEADERS.iter().all(|header| table.has_header(header)) {
        return Ok(SourceLayout::ReviewExplorer);
    }

    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|header| !table.has_header(header))
        .map(|header| header.to_string())
        .collect();

    if missing.is_empty() {
        Ok(SourceLayout::StoreExport)
    } else {
        Err(IngestError::HeaderMismatch { missing })
    }
}

/// Best-effort record produced by `coerce_row`. Values that could not be
/// interpreted are carried verbatim so `validate_candidates` can name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReview {
    pub id: String,
    pub platform: String,
    pub author: String,
    pub rating: i64,
    pub text: String,
    pub date: String,
    pub sentiment: String,
    pub theme: String,
}

pub fn coerce_row(layout: SourceLayout, row: &RawRow<'_>) -> CandidateReview {
    match layout {
        SourceLayout::StoreExport => coerce_store_row(row),
        SourceLayout::ReviewExplorer => coerce_explorer_row(row),
    }
}

fn coerce_store_row(row: &RawRow<'_>) -> CandidateReview {
    let millis = row.get("Review Submit Millis Since Epoch");
    let id = row
        .get("Review Link")
        .or(millis)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let platform = Platform::from_device(row.get("Device").unwrap_or_default());
    let author = match millis {
        Some(value) => format!("User {}", last_chars(value.trim(), 4)),
        None => "Anonymous".to_string(),
    };

    CandidateReview {
        id,
        platform: platform.as_str().to_string(),
        author,
        rating: leading_int(row.get("Star Rating").unwrap_or_default()),
        text: row.raw("Review Text").unwrap_or_default().to_string(),
        date: coerce_date(row.get("Review Submit Date and Time").unwrap_or_default()),
        sentiment: Sentiment::default().as_str().to_string(),
        theme: Theme::default().as_str().to_string(),
    }
}

fn coerce_explorer_row(row: &RawRow<'_>) -> CandidateReview {
    CandidateReview {
        id: row
            .get("ID")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        platform: row.get("Platform").unwrap_or("iOS").trim().to_string(),
        author: row.get("Author").unwrap_or("Anonymous").to_string(),
        rating: leading_int(row.get("Rating").unwrap_or_default()),
        text: row.raw("Text").unwrap_or_default().to_string(),
        date: coerce_date(row.get("Date").unwrap_or_default()),
        sentiment: row
            .get("Sentiment")
            .unwrap_or(Sentiment::default().as_str())
            .trim()
            .to_string(),
        theme: row
            .get("Theme")
            .unwrap_or(Theme::default().as_str())
            .trim()
            .to_string(),
    }
}

fn last_chars(value: &str, count: usize) -> String {
    let total = value.chars().count();
    value.chars().skip(total.saturating_sub(count)).collect()
}

/// Reads an optional sign and the leading digits, ignoring whatever follows.
/// Anything without leading digits is the missing-rating sentinel 0.
pub fn leading_int(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(parsed) if negative => -parsed,
        Ok(parsed) => parsed,
        Err(_) => 0,
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn coerce_date(value: &str) -> String {
    match parse_timestamp(value) {
        Some(parsed) => format_timestamp(&parsed),
        None => value.trim().to_string(),
    }
}

/// Strict schema check over the whole batch. Nothing is imported unless every
/// candidate passes; the error reports only the first few failures.
pub fn validate_candidates(candidates: Vec<CandidateReview>) -> Result<Vec<Review>, IngestError> {
    let mut failures = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut reviews = Vec::with_capacity(candidates.len());

    for (row, candidate) in candidates.into_iter().enumerate() {
        match validate_candidate(row, candidate, &mut seen_ids) {
            Ok(review) => reviews.push(review),
            Err(row_failures) => failures.extend(row_failures),
        }
    }

    if failures.is_empty() {
        Ok(reviews)
    } else {
        failures.truncate(MAX_REPORTED_FAILURES);
        Err(IngestError::RowValidationFailure { failures })
    }
}

fn validate_candidate(
    row: usize,
    candidate: CandidateReview,
    seen_ids: &mut HashSet<String>,
) -> Result<Review, Vec<RowFailure>> {
    let mut failures = Vec::new();
    let mut fail = |field: &'static str, reason: String| {
        failures.push(RowFailure { row, field, reason });
    };

    let id = candidate.id.trim().to_string();
    if id.is_empty() {
        fail("id", "must not be empty".to_string());
    } else if !seen_ids.insert(id.clone()) {
        fail("id", format!("duplicate id '{id}'"));
    }

    let platform = candidate
        .platform
        .parse::<Platform>()
        .map_err(|reason| fail("platform", reason))
        .ok();

    let rating = match u8::try_from(candidate.rating) {
        Ok(value) if value <= 5 => Some(value),
        _ => {
            fail(
                "rating",
                format!("must be between 0 and 5, got {}", candidate.rating),
            );
            None
        }
    };

    let date = match DateTime::parse_from_rfc3339(&candidate.date) {
        Ok(parsed) => Some(format_timestamp(&parsed.with_timezone(&Utc))),
        Err(_) => {
            fail("date", format!("invalid date '{}'", candidate.date));
            None
        }
    };

    let sentiment = candidate
        .sentiment
        .parse::<Sentiment>()
        .map_err(|reason| fail("sentiment", reason))
        .ok();
    let theme = candidate
        .theme
        .parse::<Theme>()
        .map_err(|reason| fail("theme", reason))
        .ok();

    match (platform, rating, date, sentiment, theme) {
        (Some(platform), Some(rating), Some(date), Some(sentiment), Some(theme))
            if failures.is_empty() =>
        {
            Ok(Review {
                id,
                platform,
                author: candidate.author,
                rating,
                text: candidate.text,
                date,
                sentiment,
                theme,
            })
        }
        _ => Err(failures),
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedUpload {
    pub layout: SourceLayout,
    pub reviews: Vec<Review>,
}

/// Header check, per-row coercion, then strict validation of the whole set.
pub fn normalize_table(table: &RawTable) -> Result<NormalizedUpload, IngestError> {
    let layout = validate_headers(table)?;
    let candidates = table
        .rows()
        .map(|row| coerce_row(layout, &row))
        .collect();
    let reviews = validate_candidates(candidates)?;

    tracing::debug!(rows = table.len(), ?layout, "normalized upload");
    Ok(NormalizedUpload { layout, reviews })
}

pub fn load_reviews<R: Read>(reader: R) -> Result<NormalizedUpload, IngestError> {
    let table = RawTable::from_reader(reader)?;
    normalize_table(&table)
}
