use std::{fmt, path::PathBuf, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Environment variable selecting the API base URL
pub const API_URL_ENV: &str = "FILEHUB_API_URL";

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Reduced reference from a duplicate to the record holding the content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalFileDetails {
    pub id: String,
    pub original_filename: String,
    pub file_type: String,
    pub size: u64,
    pub uploaded_at: String,
}

/// One stored upload as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    /// URL of the stored content, null for duplicates
    #[serde(default)]
    pub file: Option<String>,
    pub original_filename: String,
    pub file_type: String,
    pub size: u64,
    pub uploaded_at: String,
    pub is_duplicate: bool,
    /// id of the canonical record when this is a duplicate
    #[serde(default)]
    pub original_file: Option<String>,
    #[serde(default)]
    pub original_file_details: Option<OriginalFileDetails>,
    #[serde(default)]
    pub reference_count: i64,
    #[serde(default)]
    pub duplicates_count: i64,
}

/// Deduplication status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStatus<'a> {
    Original,
    /// Details are missing when the original was deleted on the server
    Duplicate(Option<&'a OriginalFileDetails>),
}

impl FileRecord {
    /// Enforce the `is_duplicate` / `original_file_details` pairing.
    pub fn normalize(mut self) -> Self {
        if !self.is_duplicate && self.original_file_details.is_some() {
            warn!(
                "file {} is not a duplicate but carries original details, dropping them",
                self.id
            );
            self.original_file_details = None;
        }
        if self.is_duplicate && self.original_file_details.is_none() {
            warn!("duplicate file {} has no original details", self.id);
        }
        self
    }

    pub fn status(&self) -> DedupStatus<'_> {
        if self.is_duplicate {
            DedupStatus::Duplicate(self.original_file_details.as_ref())
        } else {
            DedupStatus::Original
        }
    }

    /// Upload time parsed as an instant, `None` if the server string is not RFC 3339
    pub fn uploaded_at_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.uploaded_at)
    }
}

pub(crate) fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Aggregate storage statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_files: u64,
    pub unique_files: u64,
    pub duplicate_files: u64,
    pub total_size_bytes: u64,
    pub unique_size_bytes: u64,
    pub storage_savings_bytes: u64,
    pub storage_savings_percentage: f64,
}

/// Relative upload window ending now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    Today,
    Week,
    Month,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Week => "week",
            DateRange::Month => "month",
        }
    }

    /// Whether `uploaded` falls into the window ending at `now`
    pub fn contains(&self, uploaded: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            DateRange::Today => uploaded.date_naive() == now.date_naive(),
            DateRange::Week => uploaded >= now - Duration::days(7),
            DateRange::Month => uploaded >= now - Duration::days(30),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(DateRange::Today),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            other => Err(format!(
                "invalid date range '{}', expected one of today, week, month",
                other
            )),
        }
    }
}

/// Search criteria. Absent fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub date_range: Option<DateRange>,
}

/// Blank text fields count as absent
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Query parameters for the present fields, in wire order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(filename) = non_empty(&self.filename) {
            pairs.push(("filename", filename.to_string()));
        }
        if let Some(file_type) = non_empty(&self.file_type) {
            pairs.push(("file_type", file_type.to_string()));
        }
        if let Some(min) = self.min_size {
            pairs.push(("min_size", min.to_string()));
        }
        if let Some(max) = self.max_size {
            pairs.push(("max_size", max.to_string()));
        }
        if let Some(range) = self.date_range {
            pairs.push(("date_range", range.as_str().to_string()));
        }
        pairs
    }

    /// Evaluate the filter against a record the way the server does.
    ///
    /// Text fields match case-insensitive substrings, size bounds are
    /// inclusive. A record whose upload time cannot be parsed never matches a
    /// date range.
    pub fn matches(&self, record: &FileRecord, now: DateTime<Utc>) -> bool {
        if let Some(filename) = non_empty(&self.filename) {
            if !contains_ignore_case(&record.original_filename, filename) {
                return false;
            }
        }
        if let Some(file_type) = non_empty(&self.file_type) {
            if !contains_ignore_case(&record.file_type, file_type) {
                return false;
            }
        }
        if matches!(self.min_size, Some(min) if record.size < min) {
            return false;
        }
        if matches!(self.max_size, Some(max) if record.size > max) {
            return false;
        }
        if let Some(range) = self.date_range {
            match record.uploaded_at_instant() {
                Some(uploaded) if range.contains(uploaded, now) => {}
                _ => return false,
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Configuration for the filehub client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Timeout for API requests in seconds
    pub timeout_seconds: u64,
    /// Directory downloads are saved into
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 30,
            download_dir: PathBuf::from("."),
        }
    }
}
