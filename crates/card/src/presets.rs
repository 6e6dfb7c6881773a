//! Stock configurations for the built-in dashboard cards.

use std::cmp::Ordering;

use fleetdeck_core::kinds::{
    AlertRecord, AlertSort, HelmReleaseRecord, HelmSort, PvcRecord, PvcSort, RbacBindingRecord, RbacSort, CLUSTER_FIELD,
};
use fleetdeck_core::{PageLimit, SortDirection, SortField, DEFAULT_PAGE_SIZE};
use fleetdeck_search::{by_field, compare_text, Comparator, SearchConfig, SortConfig};
use std::sync::Arc;

use crate::CardConfig;

fn opt_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare_text(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp<T>(f: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Comparator<T> {
    Arc::new(f)
}

/// Active alerts, most severe first. `firing` and `resolved` also match alert state.
pub fn alerts() -> CardConfig<AlertRecord, AlertSort> {
    let filter = SearchConfig::new(["name", "message", "namespace", "cluster", "severity"])
        .predicate(|a: &AlertRecord, q| match q {
            "firing" => !a.resolved,
            "resolved" => a.resolved,
            _ => false,
        })
        .cluster_field(CLUSTER_FIELD)
        .storage_key("alerts");
    let sort = SortConfig::exhaustive(AlertSort::Severity, SortDirection::Desc, |f| match f {
        AlertSort::Severity => cmp(|a: &AlertRecord, b: &AlertRecord| a.severity.cmp(&b.severity).then(a.fired_at.cmp(&b.fired_at))),
        AlertSort::Name => cmp(|a: &AlertRecord, b: &AlertRecord| compare_text(&a.name, &b.name)),
        AlertSort::Cluster => cmp(|a: &AlertRecord, b: &AlertRecord| opt_text(a.cluster.as_deref(), b.cluster.as_deref())),
        AlertSort::FiredAt => cmp(|a: &AlertRecord, b: &AlertRecord| a.fired_at.cmp(&b.fired_at)),
    });
    CardConfig { filter, sort, default_limit: PageLimit::per_page(DEFAULT_PAGE_SIZE) }
}

/// PVC status card.
pub fn pvcs() -> CardConfig<PvcRecord, PvcSort> {
    let filter = SearchConfig::new(["name", "namespace", "status", "storageClass", "volume"])
        .cluster_field(CLUSTER_FIELD)
        .storage_key("pvc-status");
    let sort = SortConfig::exhaustive(PvcSort::Name, SortDirection::Asc, |f| match f {
        PvcSort::Name => cmp(|a: &PvcRecord, b: &PvcRecord| compare_text(&a.name, &b.name)),
        PvcSort::Namespace => cmp(|a: &PvcRecord, b: &PvcRecord| {
            compare_text(&a.namespace, &b.namespace).then_with(|| compare_text(&a.name, &b.name))
        }),
        PvcSort::Status => cmp(|a: &PvcRecord, b: &PvcRecord| compare_text(&a.status, &b.status)),
        // unknown capacity sorts last
        PvcSort::Capacity => cmp(|a: &PvcRecord, b: &PvcRecord| match (a.capacity_bytes(), b.capacity_bytes()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        // youngest first
        PvcSort::Age => cmp(|a: &PvcRecord, b: &PvcRecord| b.created_at.cmp(&a.created_at)),
    });
    CardConfig { filter, sort, default_limit: PageLimit::per_page(DEFAULT_PAGE_SIZE) }
}

/// Helm release history, most recently updated first.
pub fn helm_releases() -> CardConfig<HelmReleaseRecord, HelmSort> {
    let filter = SearchConfig::new(["name", "namespace", "chart", "status", "appVersion"])
        .cluster_field(CLUSTER_FIELD)
        .storage_key("helm-history");
    let sort = SortConfig::exhaustive(HelmSort::Updated, SortDirection::Desc, |f| match f {
        HelmSort::Name => cmp(|a: &HelmReleaseRecord, b: &HelmReleaseRecord| compare_text(&a.name, &b.name)),
        HelmSort::Status => cmp(|a: &HelmReleaseRecord, b: &HelmReleaseRecord| compare_text(&a.status, &b.status)),
        HelmSort::Revision => cmp(|a: &HelmReleaseRecord, b: &HelmReleaseRecord| a.revision.cmp(&b.revision)),
        HelmSort::Updated => cmp(|a: &HelmReleaseRecord, b: &HelmReleaseRecord| a.updated_at.cmp(&b.updated_at)),
    });
    CardConfig { filter, sort, default_limit: PageLimit::per_page(DEFAULT_PAGE_SIZE) }
}

/// RBAC browser. Subjects are searchable as `Kind:name`.
pub fn rbac_bindings() -> CardConfig<RbacBindingRecord, RbacSort> {
    let filter = SearchConfig::new(["name", "namespace", "kind", "roleRef", "subjects"])
        .cluster_field(CLUSTER_FIELD)
        .storage_key("rbac-browser");
    let sort = SortConfig::exhaustive(RbacSort::Name, SortDirection::Asc, |f| match f {
        RbacSort::Name => cmp(|a: &RbacBindingRecord, b: &RbacBindingRecord| compare_text(&a.name, &b.name)),
        RbacSort::Kind => cmp(|a: &RbacBindingRecord, b: &RbacBindingRecord| compare_text(&a.kind, &b.kind)),
        RbacSort::Role => cmp(|a: &RbacBindingRecord, b: &RbacBindingRecord| compare_text(&a.role_ref, &b.role_ref)),
        RbacSort::Subjects => cmp(|a: &RbacBindingRecord, b: &RbacBindingRecord| a.subjects.len().cmp(&b.subjects.len())),
    });
    CardConfig { filter, sort, default_limit: PageLimit::per_page(DEFAULT_PAGE_SIZE) }
}

/// Sort fields for untyped JSON records, read by conventional key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonSort { Name, Namespace, Cluster, Status, Created }

impl SortField for JsonSort {
    fn all() -> &'static [Self] {
        &[JsonSort::Name, JsonSort::Namespace, JsonSort::Cluster, JsonSort::Status, JsonSort::Created]
    }

    fn key(self) -> &'static str {
        match self {
            JsonSort::Name => "name",
            JsonSort::Namespace => "namespace",
            JsonSort::Cluster => "cluster",
            JsonSort::Status => "status",
            JsonSort::Created => "createdAt",
        }
    }
}

/// Card over arbitrary JSON objects. `search_fields` may use dotted paths or JSON pointers.
pub fn json<I, S>(search_fields: I, cluster_field: Option<&str>, storage_key: Option<&str>) -> CardConfig<serde_json::Value, JsonSort>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut filter = SearchConfig::new(search_fields);
    if let Some(c) = cluster_field {
        filter = filter.cluster_field(c);
    }
    if let Some(k) = storage_key {
        filter = filter.storage_key(k);
    }
    let sort = SortConfig::exhaustive(JsonSort::Name, SortDirection::Asc, |f| by_field(f.key()));
    CardConfig { filter, sort, default_limit: PageLimit::per_page(DEFAULT_PAGE_SIZE) }
}
