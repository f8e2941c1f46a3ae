//! Data models for SIDRA ETL
//!
//! This module defines the core data structures used throughout the
//! application: the immutable description of one table request, the period
//! and classification metadata returned by IBGE, and the records the
//! fetcher hands to the loader.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::sidra;

/// Territorial level code -> territory ids (empty = every territory)
pub type Territories = IndexMap<String, Vec<String>>;

/// Classification id -> category ids
pub type Classifications = IndexMap<String, Vec<String>>;

/// Response descriptor format (`/f/` in the values API)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Format {
    /// Codes and names of the descriptors
    #[serde(rename = "A")]
    CodesAndNames,
    /// Codes only
    #[serde(rename = "C")]
    #[default]
    Codes,
    /// Names only
    #[serde(rename = "N")]
    Names,
    /// Codes and names, plus units
    #[serde(rename = "U")]
    CodesNamesUnits,
}

impl Format {
    /// Code used in cache filenames (`_f-C`)
    pub fn code(&self) -> &'static str {
        match self {
            Self::CodesAndNames => "A",
            Self::Codes => "C",
            Self::Names => "N",
            Self::CodesNamesUnits => "U",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::CodesAndNames),
            "C" => Ok(Self::Codes),
            "N" => Ok(Self::Names),
            "U" => Ok(Self::CodesNamesUnits),
            other => Err(format!("unknown format '{}', expected A, C, N or U", other)),
        }
    }
}

/// Decimal precision of returned values (`/d/` in the values API)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// Maximum precision available
    #[default]
    Maximum,
    /// Precision in which the table is published
    Standard,
    /// Fixed number of decimal places
    Digits(u8),
}

impl Precision {
    /// Code used in URLs and filenames (`m`, `s`, `0`..`9`)
    pub fn code(&self) -> String {
        match self {
            Self::Maximum => "m".to_string(),
            Self::Standard => "s".to_string(),
            Self::Digits(d) => d.to_string(),
        }
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" => Ok(Self::Maximum),
            "s" => Ok(Self::Standard),
            digits => digits
                .parse::<u8>()
                .ok()
                .filter(|d| *d <= 9)
                .map(Self::Digits)
                .ok_or_else(|| format!("unknown precision '{}', expected m, s or 0-9", s)),
        }
    }
}

impl Serialize for Precision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for Precision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One fully-specified request against the values API
///
/// Built once per (query, period) and never mutated; it determines both the
/// remote URL and the cache filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    /// SIDRA table (aggregate) id, e.g. "1612"
    pub table_id: String,
    /// Period ids, normally exactly one
    pub periods: Vec<String>,
    /// Territorial filter
    pub territories: Territories,
    /// Variable codes, `["all"]` when unspecified
    pub variables: Vec<String>,
    /// Classification filter
    pub classifications: Classifications,
    /// Response descriptor format
    pub format: Format,
    /// Decimal precision
    pub precision: Precision,
}

/// Which categories to request for each classification of a table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassificationFilter {
    /// Every classification of the table with no category filter
    #[default]
    Unfiltered,
    /// Exactly these classifications and categories
    Explicit(Classifications),
    /// One download per concrete category combination
    Unnested,
}

/// A table-level download request, expanded into one `TableRequest` per period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    /// SIDRA table id
    pub table_id: String,
    /// Territorial filter
    pub territories: Territories,
    /// Variable codes; `None` means every variable
    pub variables: Option<Vec<String>>,
    /// Classification filter mode
    pub classifications: ClassificationFilter,
}

impl TableQuery {
    /// Create a query over every variable and classification of a table
    pub fn new(table_id: impl Into<String>, territories: Territories) -> Self {
        Self {
            table_id: table_id.into(),
            territories,
            variables: None,
            classifications: ClassificationFilter::Unfiltered,
        }
    }

    /// Restrict the variables requested
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Request exactly these classifications
    pub fn with_classifications(mut self, classifications: Classifications) -> Self {
        self.classifications = ClassificationFilter::Explicit(classifications);
        self
    }

    /// Enumerate every category combination
    pub fn unnested(mut self) -> Self {
        self.classifications = ClassificationFilter::Unnested;
        self
    }

    /// Variables to send, defaulting to the `all` sentinel
    pub fn variables_or_all(&self) -> Vec<String> {
        self.variables
            .clone()
            .unwrap_or_else(|| vec![sidra::ALL.to_string()])
    }
}

/// A time slice of a table, versioned by its modification date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Period id, e.g. "2017" or "201703"
    pub id: String,
    /// Human-readable literals
    #[serde(default, rename = "literals")]
    pub literals: Vec<String>,
    /// Date the period's data was last modified
    #[serde(rename = "modificacao", deserialize_with = "deserialize_modification")]
    pub modification: NaiveDate,
}

impl Period {
    /// Create a period record
    pub fn new(id: impl Into<String>, modification: NaiveDate) -> Self {
        Self {
            id: id.into(),
            literals: Vec::new(),
            modification,
        }
    }

    /// ISO representation used in cache filenames
    pub fn modification_stamp(&self) -> String {
        self.modification.format("%Y-%m-%d").to_string()
    }
}

/// IBGE publishes `dd/mm/yyyy`; ISO dates are accepted as well
fn deserialize_modification<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_modification_date(&raw).map_err(serde::de::Error::custom)
}

/// Parse a period modification date in either accepted format
pub fn parse_modification_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| format!("invalid modification date '{}'", raw))
}

/// One category of a classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id; "0" is the aggregate total
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Category name
    #[serde(default, rename = "nome")]
    pub name: String,
}

impl Category {
    /// Whether this category is the aggregate total
    pub fn is_total(&self) -> bool {
        self.id == sidra::TOTAL_CATEGORY_ID
    }
}

/// A classification (facet) of a table and its categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationMetadata {
    /// Classification id
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Classification name
    #[serde(default, rename = "nome")]
    pub name: String,
    /// Categories in API order
    #[serde(default, rename = "categorias")]
    pub categories: Vec<Category>,
}

impl ClassificationMetadata {
    /// Build metadata from bare ids (handy for tests and fixtures)
    pub fn from_ids<I, S>(id: impl Into<String>, category_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: String::new(),
            categories: category_ids
                .into_iter()
                .map(|c| Category {
                    id: c.into(),
                    name: String::new(),
                })
                .collect(),
        }
    }
}

/// IBGE returns ids as JSON numbers; normalize them to strings
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// A response persisted in the cache, ready to be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// The request that produced the file
    pub request: TableRequest,
    /// Period the file covers
    pub period: Period,
    /// Location in the cache
    pub path: PathBuf,
}

impl fmt::Display for DownloadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
