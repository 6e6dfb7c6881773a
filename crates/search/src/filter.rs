//! Filter engine: case-insensitive substring match over named record fields.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use fleetdeck_core::Fields;

/// Extra match rule, OR-ed with the field match. Receives the normalized query.
pub type Predicate<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

pub struct SearchConfig<T: ?Sized> {
    /// Fields whose text is searched, in order.
    pub search_fields: Vec<String>,
    pub custom_predicate: Option<Predicate<T>>,
    /// Field holding the record's cluster; None disables cluster scoping.
    pub cluster_field: Option<String>,
    /// Per-card key for the persisted local cluster selection.
    pub storage_key: Option<String>,
}

impl<T: ?Sized> SearchConfig<T> {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_fields: fields.into_iter().map(Into::into).collect(),
            custom_predicate: None,
            cluster_field: None,
            storage_key: None,
        }
    }

    pub fn predicate(mut self, f: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        self.custom_predicate = Some(Arc::new(f));
        self
    }

    pub fn cluster_field(mut self, name: impl Into<String>) -> Self {
        self.cluster_field = Some(name.into());
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }
}

impl<T: ?Sized> Clone for SearchConfig<T> {
    fn clone(&self) -> Self {
        Self {
            search_fields: self.search_fields.clone(),
            custom_predicate: self.custom_predicate.clone(),
            cluster_field: self.cluster_field.clone(),
            storage_key: self.storage_key.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for SearchConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("search_fields", &self.search_fields)
            .field("custom_predicate", &self.custom_predicate.is_some())
            .field("cluster_field", &self.cluster_field)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

pub fn normalize_query(q: &str) -> String {
    q.trim().to_lowercase()
}

/// Match one record against an already normalized query.
pub fn matches<T: Fields + ?Sized>(record: &T, needle: &str, cfg: &SearchConfig<T>) -> bool {
    if needle.is_empty() {
        return true;
    }
    let by_field = cfg
        .search_fields
        .iter()
        .any(|f| record.field(f).search_text().to_lowercase().contains(needle));
    by_field || cfg.custom_predicate.as_ref().map(|p| p(record, needle)).unwrap_or(false)
}

/// Records matching `query`. An empty (or blank) query keeps every record in input order.
pub fn filter_records<'a, T, I>(records: I, query: &str, cfg: &SearchConfig<T>) -> Vec<&'a T>
where
    T: Fields + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let needle = normalize_query(query);
    if needle.is_empty() {
        return records.into_iter().collect();
    }
    let started = Instant::now();
    let out: Vec<&'a T> = records.into_iter().filter(|r| matches(*r, &needle, cfg)).collect();
    metrics::histogram!("card_filter_ms", started.elapsed().as_secs_f64() * 1_000.0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn recs() -> Vec<Value> {
        vec![
            json!({ "name": "alpha", "cluster": "c1", "replicas": 12 }),
            json!({ "name": "beta", "cluster": "c2" }),
            json!({ "name": "gamma", "cluster": "c1", "replicas": null }),
        ]
    }

    fn names(v: &[&Value]) -> Vec<String> {
        v.iter().map(|r| r["name"].as_str().unwrap_or("").to_string()).collect()
    }

    #[test]
    fn substring_match_is_case_insensitive_and_trimmed() {
        let data = recs();
        let cfg = SearchConfig::<Value>::new(["name"]);
        assert_eq!(names(&filter_records(&data, "a", &cfg)), ["alpha", "beta", "gamma"]);
        assert_eq!(names(&filter_records(&data, "  ALPHA ", &cfg)), ["alpha"]);
        assert_eq!(names(&filter_records(&data, "mm", &cfg)), ["gamma"]);
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let data = recs();
        let cfg = SearchConfig::<Value>::new(["name"]);
        assert_eq!(filter_records(&data, "   ", &cfg).len(), 3);
    }

    #[test]
    fn numbers_are_coerced_and_nulls_are_empty() {
        let data = recs();
        let cfg = SearchConfig::<Value>::new(["name", "replicas"]);
        assert_eq!(names(&filter_records(&data, "12", &cfg)), ["alpha"]);
        assert!(filter_records(&data, "null", &cfg).is_empty());
    }

    #[test]
    fn custom_predicate_is_or_ed_with_fields() {
        let data = recs();
        let cfg = SearchConfig::<Value>::new(["name"])
            .predicate(|r, q| q == "east" && r["cluster"] == "c2");
        assert_eq!(names(&filter_records(&data, "East", &cfg)), ["beta"]);
        // field matches still count when the predicate says no
        assert_eq!(names(&filter_records(&data, "alp", &cfg)), ["alpha"]);
    }

    #[test]
    fn missing_cluster_does_not_affect_text_search() {
        let data = vec![json!({ "name": "orphan" })];
        let cfg = SearchConfig::<Value>::new(["name"]).cluster_field("cluster");
        assert_eq!(filter_records(&data, "orph", &cfg).len(), 1);
    }
}
