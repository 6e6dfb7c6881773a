//! Cluster scoping: global selection intersected with a card's local selection.

use std::borrow::Cow;
use std::collections::BTreeSet;

use fleetdeck_core::{Fields, GlobalFilter};
use tracing::debug;

/// Non-empty cluster value of a record, if the card scopes by cluster at all.
pub fn cluster_of<'r, T: Fields + ?Sized>(record: &'r T, cluster_field: Option<&str>) -> Option<Cow<'r, str>> {
    let field = cluster_field?;
    let value = record.field(field);
    if value.is_absent() {
        return None;
    }
    let text = value.search_text();
    if text.is_empty() { None } else { Some(text) }
}

/// Result of applying both cluster scopes.
#[derive(Debug, Clone)]
pub struct ScopeOutcome<'a, T: ?Sized> {
    pub records: Vec<&'a T>,
    /// Clusters present after the global scope, deduplicated and sorted.
    pub available: Vec<String>,
    /// Local selection entries that still name an available cluster.
    pub effective_local: Vec<String>,
}

/// Clusters present in `records` that the global scope admits, sorted by name.
pub fn available_clusters<'a, T, I>(records: I, cluster_field: Option<&str>, global: &GlobalFilter) -> Vec<String>
where
    T: Fields + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut set = BTreeSet::new();
    for r in records {
        if let Some(c) = cluster_of(r, cluster_field) {
            if global.admits(&c) {
                set.insert(c.into_owned());
            }
        }
    }
    set.into_iter().collect()
}

/// Narrow `records` by the global scope, then by the local selection.
///
/// Records without a cluster value pass both scopes. Local entries that name no
/// available cluster are ignored; when none remain the local selection does not narrow.
pub fn apply_cluster_scope<'a, T, I>(
    records: I,
    cluster_field: Option<&str>,
    global: &GlobalFilter,
    local: &[String],
) -> ScopeOutcome<'a, T>
where
    T: Fields + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let Some(field) = cluster_field else {
        return ScopeOutcome { records: records.into_iter().collect(), available: Vec::new(), effective_local: Vec::new() };
    };
    let globally: Vec<&'a T> = records
        .into_iter()
        .filter(|r| cluster_of(*r, Some(field)).map(|c| global.admits(&c)).unwrap_or(true))
        .collect();
    let available = available_clusters(globally.iter().copied(), Some(field), global);
    let mut effective_local: Vec<String> = Vec::new();
    for name in local {
        if available.binary_search(name).is_ok() && !effective_local.contains(name) {
            effective_local.push(name.clone());
        }
    }
    if effective_local.len() < local.len() {
        debug!(selected = local.len(), effective = effective_local.len(), "ignoring stale local cluster entries");
    }
    let records = if effective_local.is_empty() {
        globally
    } else {
        globally
            .into_iter()
            .filter(|r| cluster_of(*r, Some(field)).map(|c| effective_local.iter().any(|l| *l == *c)).unwrap_or(true))
            .collect()
    };
    ScopeOutcome { records, available, effective_local }
}
