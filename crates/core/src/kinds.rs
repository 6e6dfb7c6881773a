//! Built-in dashboard record kinds.
//!
//! This module provides:
//! - Typed records for the stock cards (alerts, PVCs, Helm releases, RBAC bindings)
//! - Field access by name for search and cluster scoping
//! - A closed sort-field enum per kind
//! - Projection from raw Kubernetes JSON into the typed record

#![forbid(unsafe_code)]

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{FieldValue, Fields, SortField};

/// Field name every built-in kind uses for its cluster.
pub const CLUSTER_FIELD: &str = "cluster";

// ---------------- Alerts ----------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self { Severity::Info => "info", Severity::Warning => "warning", Severity::Critical => "critical" }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub resolved: bool,
    /// Seconds since epoch.
    #[serde(default)]
    pub fired_at: i64,
}

impl Fields for AlertRecord {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::text(&self.id),
            "name" => FieldValue::text(&self.name),
            "severity" => FieldValue::text(self.severity.as_str()),
            "cluster" => FieldValue::opt_text(self.cluster.as_deref()),
            "namespace" => FieldValue::opt_text(self.namespace.as_deref()),
            "message" => FieldValue::text(&self.message),
            "resolved" => FieldValue::Bool(self.resolved),
            "firedAt" | "fired_at" => FieldValue::Int(self.fired_at),
            _ => FieldValue::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSort { Severity, Name, Cluster, FiredAt }

impl SortField for AlertSort {
    fn all() -> &'static [Self] { &[AlertSort::Severity, AlertSort::Name, AlertSort::Cluster, AlertSort::FiredAt] }

    fn key(self) -> &'static str {
        match self {
            AlertSort::Severity => "severity",
            AlertSort::Name => "name",
            AlertSort::Cluster => "cluster",
            AlertSort::FiredAt => "fired",
        }
    }
}

// ---------------- PersistentVolumeClaims ----------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub capacity: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub access_modes: SmallVec<[String; 2]>,
    /// Seconds since epoch; 0 when unknown.
    #[serde(default)]
    pub created_at: i64,
}

impl PvcRecord {
    /// Project a raw `v1/PersistentVolumeClaim` object.
    pub fn from_k8s(raw: &serde_json::Value, cluster: Option<&str>) -> Option<Self> {
        let meta = raw.get("metadata")?;
        let name = meta.get("name").and_then(|v| v.as_str())?.to_string();
        let namespace = meta.get("namespace").and_then(|v| v.as_str()).unwrap_or("default").to_string();
        let access_modes = raw
            .pointer("/spec/accessModes")
            .and_then(|v| v.as_array())
            .map(|modes| modes.iter().filter_map(|m| m.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default();
        Some(Self {
            name,
            namespace,
            cluster: cluster.map(|s| s.to_string()),
            status: ptr_str(raw, "/status/phase").unwrap_or_else(|| "Unknown".to_string()),
            capacity: ptr_str(raw, "/status/capacity/storage")
                .or_else(|| ptr_str(raw, "/spec/resources/requests/storage")),
            storage_class: ptr_str(raw, "/spec/storageClassName"),
            volume: ptr_str(raw, "/spec/volumeName"),
            access_modes,
            created_at: creation_ts(meta),
        })
    }

    /// Capacity in bytes, if the quantity parses.
    pub fn capacity_bytes(&self) -> Option<f64> {
        self.capacity.as_deref().and_then(parse_quantity)
    }
}

impl Fields for PvcRecord {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "name" => FieldValue::text(&self.name),
            "namespace" => FieldValue::text(&self.namespace),
            "cluster" => FieldValue::opt_text(self.cluster.as_deref()),
            "status" => FieldValue::text(&self.status),
            "capacity" => FieldValue::opt_text(self.capacity.as_deref()),
            "storageClass" | "storage_class" => FieldValue::opt_text(self.storage_class.as_deref()),
            "volume" => FieldValue::opt_text(self.volume.as_deref()),
            "accessModes" | "access_modes" => {
                if self.access_modes.is_empty() { FieldValue::Absent } else { FieldValue::Text(Cow::Owned(self.access_modes.join(","))) }
            }
            "createdAt" | "created_at" => FieldValue::Int(self.created_at),
            _ => FieldValue::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PvcSort { Name, Namespace, Status, Capacity, Age }

impl SortField for PvcSort {
    fn all() -> &'static [Self] { &[PvcSort::Name, PvcSort::Namespace, PvcSort::Status, PvcSort::Capacity, PvcSort::Age] }

    fn key(self) -> &'static str {
        match self {
            PvcSort::Name => "name",
            PvcSort::Namespace => "namespace",
            PvcSort::Status => "status",
            PvcSort::Capacity => "capacity",
            PvcSort::Age => "age",
        }
    }
}

// ---------------- Helm releases ----------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseRecord {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub status: String,
    /// Seconds since epoch; 0 when unknown.
    #[serde(default)]
    pub updated_at: i64,
}

impl HelmReleaseRecord {
    /// Project one entry of `helm list -o json`.
    pub fn from_helm_list(raw: &serde_json::Value, cluster: Option<&str>) -> Option<Self> {
        let name = raw.get("name").and_then(|v| v.as_str())?.to_string();
        let revision = match raw.get("revision") {
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
            Some(v) => v.as_u64().unwrap_or(0) as u32,
            None => 0,
        };
        let updated_at = raw.get("updated").and_then(|v| v.as_str()).map(parse_helm_time).unwrap_or(0);
        Some(Self {
            name,
            namespace: raw.get("namespace").and_then(|v| v.as_str()).unwrap_or("default").to_string(),
            cluster: cluster.map(|s| s.to_string()),
            chart: raw.get("chart").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            app_version: raw.get("app_version").and_then(|v| v.as_str()).map(|s| s.to_string()),
            revision,
            status: raw.get("status").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
            updated_at,
        })
    }
}

impl Fields for HelmReleaseRecord {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "name" => FieldValue::text(&self.name),
            "namespace" => FieldValue::text(&self.namespace),
            "cluster" => FieldValue::opt_text(self.cluster.as_deref()),
            "chart" => FieldValue::text(&self.chart),
            "appVersion" | "app_version" => FieldValue::opt_text(self.app_version.as_deref()),
            "revision" => FieldValue::Int(self.revision as i64),
            "status" => FieldValue::text(&self.status),
            "updatedAt" | "updated_at" => FieldValue::Int(self.updated_at),
            _ => FieldValue::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelmSort { Name, Status, Revision, Updated }

impl SortField for HelmSort {
    fn all() -> &'static [Self] { &[HelmSort::Name, HelmSort::Status, HelmSort::Revision, HelmSort::Updated] }

    fn key(self) -> &'static str {
        match self {
            HelmSort::Name => "name",
            HelmSort::Status => "status",
            HelmSort::Revision => "revision",
            HelmSort::Updated => "updated",
        }
    }
}

// ---------------- RBAC bindings ----------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RbacBindingRecord {
    pub name: String,
    /// None for ClusterRoleBindings.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    pub kind: String,
    pub role_ref: String,
    #[serde(default)]
    pub subjects: SmallVec<[Subject; 4]>,
}

impl RbacBindingRecord {
    /// Project a raw RoleBinding or ClusterRoleBinding object.
    pub fn from_k8s(raw: &serde_json::Value, cluster: Option<&str>) -> Option<Self> {
        let meta = raw.get("metadata")?;
        let name = meta.get("name").and_then(|v| v.as_str())?.to_string();
        let kind = raw.get("kind").and_then(|v| v.as_str()).unwrap_or("RoleBinding").to_string();
        let role_ref = match (ptr_str(raw, "/roleRef/kind"), ptr_str(raw, "/roleRef/name")) {
            (Some(k), Some(n)) => format!("{}/{}", k, n),
            (None, Some(n)) => n,
            _ => String::new(),
        };
        let subjects = raw
            .get("subjects")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| {
                        Some(Subject {
                            kind: s.get("kind").and_then(|v| v.as_str()).unwrap_or("User").to_string(),
                            name: s.get("name").and_then(|v| v.as_str())?.to_string(),
                            namespace: s.get("namespace").and_then(|v| v.as_str()).map(|x| x.to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            name,
            namespace: meta.get("namespace").and_then(|v| v.as_str()).map(|s| s.to_string()),
            cluster: cluster.map(|s| s.to_string()),
            kind,
            role_ref,
            subjects,
        })
    }

    fn subjects_text(&self) -> String {
        self.subjects.iter().map(|s| format!("{}:{}", s.kind, s.name)).collect::<Vec<_>>().join(" ")
    }
}

impl Fields for RbacBindingRecord {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "name" => FieldValue::text(&self.name),
            "namespace" => FieldValue::opt_text(self.namespace.as_deref()),
            "cluster" => FieldValue::opt_text(self.cluster.as_deref()),
            "kind" => FieldValue::text(&self.kind),
            "roleRef" | "role_ref" => FieldValue::text(&self.role_ref),
            "subjects" => FieldValue::Text(Cow::Owned(self.subjects_text())),
            "subjectCount" => FieldValue::Int(self.subjects.len() as i64),
            _ => FieldValue::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RbacSort { Name, Kind, Role, Subjects }

impl SortField for RbacSort {
    fn all() -> &'static [Self] { &[RbacSort::Name, RbacSort::Kind, RbacSort::Role, RbacSort::Subjects] }

    fn key(self) -> &'static str {
        match self {
            RbacSort::Name => "name",
            RbacSort::Kind => "kind",
            RbacSort::Role => "role",
            RbacSort::Subjects => "subjects",
        }
    }
}

// ---------------- Helpers ----------------

fn ptr_str(raw: &serde_json::Value, ptr: &str) -> Option<String> {
    raw.pointer(ptr).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn creation_ts(meta: &serde_json::Value) -> i64 {
    meta.get("creationTimestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

// helm prints e.g. "2024-03-01 10:22:13.123456 +0000 UTC"
fn parse_helm_time(s: &str) -> i64 {
    let trimmed = s.trim().trim_end_matches(" UTC");
    chrono::DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f %z")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(trimmed))
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Parse a Kubernetes resource quantity ("10Gi", "500M", "1.5Ti") into bytes.
pub fn parse_quantity(q: &str) -> Option<f64> {
    let q = q.trim();
    let split = q.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(q.len());
    let (num, suffix) = q.split_at(split);
    let n: f64 = num.parse().ok()?;
    let mult = match suffix {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        _ => return None,
    };
    Some(n * mult)
}
