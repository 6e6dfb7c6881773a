//! Local cluster selection for one card, persisted per card key.
//!
//! An empty selection means "no local narrowing" and is stored as `[]`.

use std::sync::Arc;

use fleetdeck_persist::{load_json, save_json, scoped_key, KvStore};
use tracing::debug;

/// Namespace prefix for persisted selections.
pub const STORAGE_NAMESPACE: &str = "fleetdeck:cluster-filter";

pub struct ClusterFilter {
    selected: Vec<String>,
    store: Option<(Arc<dyn KvStore>, String)>,
}

impl ClusterFilter {
    /// Selection that lives only as long as this value.
    pub fn ephemeral() -> Self {
        Self { selected: Vec::new(), store: None }
    }

    /// Load the selection stored under `storage_key`. Anything unreadable starts empty.
    pub fn persisted(store: Arc<dyn KvStore>, storage_key: &str) -> Self {
        let key = scoped_key(STORAGE_NAMESPACE, storage_key);
        let loaded: Vec<String> = load_json(store.as_ref(), &key).unwrap_or_default();
        let mut selected: Vec<String> = Vec::with_capacity(loaded.len());
        for name in loaded {
            if !name.is_empty() && !selected.contains(&name) {
                selected.push(name);
            }
        }
        debug!(key = %key, selected = selected.len(), "cluster filter loaded");
        Self { selected, store: Some((store, key)) }
    }

    pub fn local(&self) -> &[String] { &self.selected }

    pub fn is_narrowing(&self) -> bool { !self.selected.is_empty() }

    /// Storage key in use, if persisted.
    pub fn storage_key(&self) -> Option<&str> { self.store.as_ref().map(|(_, k)| k.as_str()) }

    /// Flip `name` in the selection. When `available` is known, a name that is neither
    /// available nor already selected is refused, and entries naming clusters that are
    /// gone are dropped first. Returns whether `name` is now selected.
    pub fn toggle(&mut self, name: &str, available: Option<&[String]>) -> bool {
        if let Some(avail) = available {
            if !avail.iter().any(|a| a == name) && !self.selected.iter().any(|c| c == name) {
                debug!(cluster = name, "ignoring toggle of unavailable cluster");
                return false;
            }
            let before = self.selected.len();
            self.selected.retain(|c| c == name || avail.iter().any(|a| a == c));
            if self.selected.len() < before {
                debug!(pruned = before - self.selected.len(), "dropped stale cluster entries");
            }
        }
        let now_selected = match self.selected.iter().position(|c| c == name) {
            Some(idx) => {
                self.selected.remove(idx);
                false
            }
            None => {
                self.selected.push(name.to_string());
                true
            }
        };
        self.persist();
        now_selected
    }

    /// Back to "no local narrowing".
    pub fn clear(&mut self) {
        self.selected.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Some((store, key)) = &self.store {
            save_json(store.as_ref(), key, &self.selected);
        }
    }
}

impl std::fmt::Debug for ClusterFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterFilter")
            .field("selected", &self.selected)
            .field("storage_key", &self.storage_key())
            .finish()
    }
}
