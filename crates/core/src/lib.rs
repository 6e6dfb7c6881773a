//! FleetDeck core types: record field access, sort and page primitives, global filter.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod kinds;

/// Page size used by cards that do not pick their own.
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid sort direction {0:?} (expected asc or desc)")]
    Direction(String),
    #[error("invalid page limit {0:?} (expected a positive integer or \"unlimited\")")]
    PageLimit(String),
    #[error("unknown sort field {field:?} (known: {known})")]
    SortField { field: String, known: String },
}

// ---------------- Record field access ----------------

/// A field read off a record. Absent covers both "missing" and "null".
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Absent,
    Text(Cow<'a, str>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl<'a> FieldValue<'a> {
    pub fn text(s: &'a str) -> Self { FieldValue::Text(Cow::Borrowed(s)) }

    pub fn opt_text(s: Option<&'a str>) -> Self {
        s.map(FieldValue::text).unwrap_or(FieldValue::Absent)
    }

    pub fn is_absent(&self) -> bool { matches!(self, FieldValue::Absent) }

    /// Text form used for substring search. Absent reads as the empty string.
    pub fn search_text(&self) -> Cow<'a, str> {
        match self {
            FieldValue::Absent => Cow::Borrowed(""),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(i) => Cow::Owned(i.to_string()),
            FieldValue::Float(f) => Cow::Owned(f.to_string()),
            FieldValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    /// Non-empty string value, if this field holds one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) if !s.is_empty() => Some(s.as_ref()),
            _ => None,
        }
    }
}

/// Records that expose named fields for search, sorting and cluster scoping.
pub trait Fields {
    fn field(&self, name: &str) -> FieldValue<'_>;
}

impl<T: Fields + ?Sized> Fields for &T {
    fn field(&self, name: &str) -> FieldValue<'_> { (**self).field(name) }
}

impl<T: Fields + ?Sized> Fields for std::sync::Arc<T> {
    fn field(&self, name: &str) -> FieldValue<'_> { (**self).field(name) }
}

/// Untyped records: `name` is a top-level key, a JSON pointer (`/spec/x`) or a dotted path (`spec.x`).
impl Fields for serde_json::Value {
    fn field(&self, name: &str) -> FieldValue<'_> {
        if name.starts_with('/') {
            return json_field(self.pointer(name));
        }
        if let Some(v) = self.get(name) {
            return json_field(Some(v));
        }
        if !name.contains('.') {
            return FieldValue::Absent;
        }
        let mut cur = Some(self);
        for seg in name.split('.') {
            cur = cur.and_then(|v| match v {
                serde_json::Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
                other => other.get(seg),
            });
        }
        json_field(cur)
    }
}

fn json_field(v: Option<&serde_json::Value>) -> FieldValue<'_> {
    use serde_json::Value;
    match v {
        None | Some(Value::Null) => FieldValue::Absent,
        Some(Value::String(s)) => FieldValue::text(s),
        Some(Value::Bool(b)) => FieldValue::Bool(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Absent),
        },
        Some(other) => FieldValue::Text(Cow::Owned(other.to_string())),
    }
}

// ---------------- Sorting primitives ----------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self { SortDirection::Asc => SortDirection::Desc, SortDirection::Desc => SortDirection::Asc }
    }

    /// Orient an ascending comparison result.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self { SortDirection::Asc => ord, SortDirection::Desc => ord.reverse() }
    }

    pub fn as_str(self) -> &'static str {
        match self { SortDirection::Asc => "asc", SortDirection::Desc => "desc" }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SortDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(ParseError::Direction(s.to_string())),
        }
    }
}

/// Closed set of sortable fields for one record kind.
pub trait SortField: Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    /// Every variant, in display order.
    fn all() -> &'static [Self];

    /// Stable key used in CLI flags and persisted state.
    fn key(self) -> &'static str;

    fn parse_key(s: &str) -> Result<Self, ParseError> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::SortField {
                field: s.to_string(),
                known: Self::all().iter().map(|f| f.key()).collect::<Vec<_>>().join(", "),
            })
    }
}

// ---------------- Paging primitives ----------------

/// Items per page. `Unlimited` means a single page holding everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageLimit {
    Limited(usize),
    Unlimited,
}

impl PageLimit {
    /// Page size guarded to at least one item.
    pub fn per_page(n: usize) -> Self { PageLimit::Limited(n.max(1)) }

    pub fn size(self) -> Option<usize> {
        match self { PageLimit::Limited(n) => Some(n.max(1)), PageLimit::Unlimited => None }
    }

    pub fn is_unlimited(self) -> bool { matches!(self, PageLimit::Unlimited) }
}

impl Default for PageLimit {
    fn default() -> Self { PageLimit::Limited(DEFAULT_PAGE_SIZE) }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() { Some(n) => write!(f, "{}", n), None => f.write_str("unlimited") }
    }
}

impl FromStr for PageLimit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("unlimited") || t.eq_ignore_ascii_case("all") {
            return Ok(PageLimit::Unlimited);
        }
        match t.parse::<i64>() {
            Ok(n) if n > 0 => Ok(PageLimit::per_page(n as usize)),
            Ok(_) => Ok(PageLimit::per_page(1)),
            Err(_) => Err(ParseError::PageLimit(s.to_string())),
        }
    }
}

impl Serialize for PageLimit {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self.size() {
            Some(n) => ser.serialize_u64(n as u64),
            None => ser.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for PageLimit {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw { Num(i64), Text(String) }
        match Raw::deserialize(de)? {
            Raw::Num(n) => Ok(PageLimit::per_page(n.max(1) as usize)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------- Global filter ----------------

/// Dashboard-wide selection shared by every card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalFilter {
    pub selected_clusters: Vec<String>,
    #[serde(rename = "isAllClustersSelected")]
    pub all_clusters: bool,
    pub custom_filter: String,
}

impl Default for GlobalFilter {
    fn default() -> Self { Self::all() }
}

impl GlobalFilter {
    pub fn all() -> Self {
        Self { selected_clusters: Vec::new(), all_clusters: true, custom_filter: String::new() }
    }

    pub fn clusters<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected_clusters: names.into_iter().map(Into::into).collect(),
            all_clusters: false,
            custom_filter: String::new(),
        }
    }

    pub fn with_custom_filter(mut self, text: impl Into<String>) -> Self {
        self.custom_filter = text.into();
        self
    }

    /// Whether the global scope lets `cluster` through.
    pub fn admits(&self, cluster: &str) -> bool {
        self.all_clusters || self.selected_clusters.iter().any(|c| c == cluster)
    }
}

pub mod prelude {
    pub use super::{FieldValue, Fields, GlobalFilter, PageLimit, ParseError, SortDirection, SortField};
}
