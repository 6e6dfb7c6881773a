//! Record files for the CLI: loading, per-kind projection and table rows.
//!
//! A file holds either a flat list of records (JSON array, YAML sequence, or a
//! Kubernetes `List` with `items`) or a map from cluster name to such a list.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use fleetdeck_core::kinds::{AlertRecord, HelmReleaseRecord, PvcRecord, RbacBindingRecord};
use fleetdeck_core::Fields;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Records grouped by cluster name. Records without a cluster sit under `""`.
pub type Fleet<T> = BTreeMap<String, Vec<T>>;

pub trait CardRecord: Fields + Serialize + Clone + Send + Sync + 'static {
    const HEADERS: &'static [&'static str];

    /// Build a record from one raw entry. `cluster` overrides whatever the entry says.
    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self>;

    fn cluster(&self) -> Option<&str>;

    fn row(&self) -> Vec<String>;
}

fn typed<T: serde::de::DeserializeOwned>(raw: &Value, cluster: Option<&str>) -> Option<T> {
    let mut raw = raw.clone();
    if let (Some(c), Some(obj)) = (cluster, raw.as_object_mut()) {
        obj.insert("cluster".into(), Value::String(c.to_string()));
    }
    serde_json::from_value(raw).ok()
}

impl CardRecord for AlertRecord {
    const HEADERS: &'static [&'static str] = &["SEVERITY", "CLUSTER", "NAME", "STATE", "AGE", "MESSAGE"];

    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self> { typed(raw, cluster) }

    fn cluster(&self) -> Option<&str> { self.cluster.as_deref() }

    fn row(&self) -> Vec<String> {
        vec![
            self.severity.as_str().to_string(),
            dash(self.cluster.as_deref()),
            self.name.clone(),
            if self.resolved { "resolved" } else { "firing" }.to_string(),
            render_age(self.fired_at),
            self.message.clone(),
        ]
    }
}

impl CardRecord for PvcRecord {
    const HEADERS: &'static [&'static str] = &["CLUSTER", "NAMESPACE/NAME", "STATUS", "CAPACITY", "CLASS", "AGE"];

    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self> {
        if raw.get("metadata").is_some() {
            let own = raw.get("cluster").and_then(|v| v.as_str());
            PvcRecord::from_k8s(raw, cluster.or(own))
        } else {
            typed(raw, cluster)
        }
    }

    fn cluster(&self) -> Option<&str> { self.cluster.as_deref() }

    fn row(&self) -> Vec<String> {
        vec![
            dash(self.cluster.as_deref()),
            format!("{}/{}", self.namespace, self.name),
            self.status.clone(),
            dash(self.capacity.as_deref()),
            dash(self.storage_class.as_deref()),
            render_age(self.created_at),
        ]
    }
}

impl CardRecord for HelmReleaseRecord {
    const HEADERS: &'static [&'static str] = &["CLUSTER", "NAMESPACE/NAME", "CHART", "REV", "STATUS", "UPDATED"];

    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self> {
        // `helm list -o json` prints `updated` as text and `revision` as a string
        if raw.get("updated").map(|v| v.is_string()).unwrap_or(false) {
            let own = raw.get("cluster").and_then(|v| v.as_str());
            HelmReleaseRecord::from_helm_list(raw, cluster.or(own))
        } else {
            typed(raw, cluster)
        }
    }

    fn cluster(&self) -> Option<&str> { self.cluster.as_deref() }

    fn row(&self) -> Vec<String> {
        vec![
            dash(self.cluster.as_deref()),
            format!("{}/{}", self.namespace, self.name),
            self.chart.clone(),
            self.revision.to_string(),
            self.status.clone(),
            render_age(self.updated_at),
        ]
    }
}

impl CardRecord for RbacBindingRecord {
    const HEADERS: &'static [&'static str] = &["CLUSTER", "KIND", "NAMESPACE/NAME", "ROLE", "SUBJECTS"];

    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self> {
        if raw.get("metadata").is_some() {
            let own = raw.get("cluster").and_then(|v| v.as_str());
            RbacBindingRecord::from_k8s(raw, cluster.or(own))
        } else {
            typed(raw, cluster)
        }
    }

    fn cluster(&self) -> Option<&str> { self.cluster.as_deref() }

    fn row(&self) -> Vec<String> {
        let name = match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        };
        vec![dash(self.cluster.as_deref()), self.kind.clone(), name, self.role_ref.clone(), self.subjects.len().to_string()]
    }
}

impl CardRecord for Value {
    const HEADERS: &'static [&'static str] = &["CLUSTER", "NAMESPACE/NAME", "STATUS"];

    fn from_raw(raw: &Value, cluster: Option<&str>) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        let mut v = raw.clone();
        if let (Some(c), Some(obj)) = (cluster, v.as_object_mut()) {
            obj.insert("cluster".into(), Value::String(c.to_string()));
        }
        Some(v)
    }

    fn cluster(&self) -> Option<&str> { self.get("cluster").and_then(|v| v.as_str()) }

    fn row(&self) -> Vec<String> {
        let name = self.field("name").search_text().into_owned();
        let name = if name.is_empty() { self.field("metadata.name").search_text().into_owned() } else { name };
        let ns = self.field("namespace").search_text().into_owned();
        let ns = if ns.is_empty() { self.field("metadata.namespace").search_text().into_owned() } else { ns };
        let status = self.field("status").as_str().map(|s| s.to_string());
        let key = if ns.is_empty() { name } else { format!("{}/{}", ns, name) };
        vec![dash(CardRecord::cluster(self)), key, dash(status.as_deref())]
    }
}

/// Read and project a record file. Entries that do not project are skipped with a warning.
pub fn load_fleet<T: CardRecord>(path: &Path) -> Result<Fleet<T>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    // YAML parses JSON documents as well
    let doc: Value = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let mut fleet: Fleet<T> = BTreeMap::new();
    let mut skipped = 0usize;
    match &doc {
        Value::Array(items) => project_into(&mut fleet, items, None, &mut skipped),
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(items)) => project_into(&mut fleet, items, None, &mut skipped),
            _ => {
                for (cluster, entries) in obj {
                    let Value::Array(items) = entries else {
                        bail!("cluster {} in {} does not map to a list", cluster, path.display());
                    };
                    fleet.entry(cluster.clone()).or_default();
                    project_into(&mut fleet, items, Some(cluster), &mut skipped);
                }
            }
        },
        Value::Null => {}
        _ => bail!("{} holds neither a record list nor a cluster map", path.display()),
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "entries skipped; not recognised as records of this kind");
    }
    debug!(path = %path.display(), clusters = fleet.len(), "record file loaded");
    Ok(fleet)
}

fn project_into<T: CardRecord>(fleet: &mut Fleet<T>, items: &[Value], cluster: Option<&str>, skipped: &mut usize) {
    for raw in items {
        match T::from_raw(raw, cluster) {
            Some(rec) => {
                let key = rec.cluster().unwrap_or_default().to_string();
                fleet.entry(key).or_default().push(rec);
            }
            None => *skipped += 1,
        }
    }
}

pub fn flatten<T>(fleet: Fleet<T>) -> Vec<T> {
    fleet.into_values().flatten().collect()
}

/// Aligned columns, two spaces apart.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let mut out = String::new();
    push_line(&mut out, &widths, headers.iter().copied());
    for row in rows {
        push_line(&mut out, &widths, row.iter().map(|s| s.as_str()));
    }
    out
}

fn push_line<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let parts: Vec<String> = cells
        .enumerate()
        .map(|(i, cell)| format!("{:<w$}", cell, w = widths.get(i).copied().unwrap_or(0)))
        .collect();
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

fn dash(v: Option<&str>) -> String {
    match v {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "-".to_string(),
    }
}

pub fn render_age(ts: i64) -> String {
    if ts <= 0 { return "-".to_string(); }
    let now = chrono::Utc::now().timestamp();
    let mut secs = (now - ts).max(0) as u64;
    let days = secs / 86_400; secs %= 86_400;
    let hours = secs / 3600; secs %= 3600;
    let mins = secs / 60; secs %= 60;
    if days > 0 { format!("{}d{}h", days, hours) }
    else if hours > 0 { format!("{}h{}m", hours, mins) }
    else if mins > 0 { format!("{}m", mins) }
    else { format!("{}s", secs) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, body: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("fleetdeck-cli-{}-{}", std::process::id(), name));
        let mut f = std::fs::File::create(&p).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        p
    }

    #[test]
    fn cluster_map_assigns_clusters() {
        let p = temp_file("map.yaml", "east:\n  - metadata: { name: data-0, namespace: db }\n    status: { phase: Bound }\nwest: []\n");
        let fleet: Fleet<PvcRecord> = load_fleet(&p).unwrap();
        assert_eq!(fleet.keys().collect::<Vec<_>>(), ["east", "west"]);
        assert_eq!(fleet["east"][0].cluster.as_deref(), Some("east"));
        assert!(fleet["west"].is_empty());
        let _ = std::fs::remove_file(p);
    }

    #[test]
    fn flat_json_list_groups_by_record_cluster() {
        let p = temp_file(
            "flat.json",
            r#"[{"id":"1","name":"a","cluster":"c2"},{"id":"2","name":"b"},{"nope":true}]"#,
        );
        let fleet: Fleet<AlertRecord> = load_fleet(&p).unwrap();
        assert_eq!(fleet["c2"].len(), 1);
        assert_eq!(fleet[""].len(), 1);
        assert_eq!(flatten(fleet).len(), 2);
        let _ = std::fs::remove_file(p);
    }

    #[test]
    fn scalar_document_is_rejected() {
        let p = temp_file("scalar.yaml", "42\n");
        assert!(load_fleet::<Value>(&p).is_err());
        let _ = std::fs::remove_file(p);
    }

    #[test]
    fn table_columns_align() {
        let out = render_table(&["A", "BB"], &[vec!["long".into(), "x".into()]]);
        assert_eq!(out, "A     BB\nlong  x\n");
    }

    #[test]
    fn age_renders_coarse_units() {
        assert_eq!(render_age(0), "-");
        let hour_ago = chrono::Utc::now().timestamp() - 3_660;
        assert_eq!(render_age(hour_ago), "1h1m");
    }
}
