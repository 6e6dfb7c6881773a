//! FleetDeck store: merges per-cluster record snapshots into one fleet-wide view for cards.
//! Data sources push whole per-cluster arrays; the latest array for a cluster wins.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Fleet-wide records at one epoch. Items are grouped by cluster name order.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub epoch: u64,
    pub items: Vec<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self { Self { epoch: 0, items: Vec::new() } }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind<T> {
    /// Full replacement of the cluster's records.
    Replaced(Vec<T>),
    /// Cluster went away (disconnected or deselected upstream).
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterUpdate<T> {
    pub cluster: String,
    pub kind: UpdateKind<T>,
}

impl<T> ClusterUpdate<T> {
    pub fn replaced(cluster: impl Into<String>, items: Vec<T>) -> Self {
        Self { cluster: cluster.into(), kind: UpdateKind::Replaced(items) }
    }

    pub fn removed(cluster: impl Into<String>) -> Self {
        Self { cluster: cluster.into(), kind: UpdateKind::Removed }
    }
}

/// Coalescing queue keyed by cluster with FIFO order.
/// A newer update for a queued cluster replaces the older one in place; nothing is
/// ever evicted, so the queue holds at most one entry per cluster.
pub struct Coalescer<T> {
    map: FxHashMap<String, ClusterUpdate<T>>,
    order: VecDeque<String>,
    flush_at: usize,
    superseded: u64,
}

impl<T> Coalescer<T> {
    /// `flush_at` is the number of queued clusters at which [`Coalescer::push`] asks for a publish.
    pub fn with_capacity(flush_at: usize) -> Self {
        Self { map: FxHashMap::default(), order: VecDeque::new(), flush_at: flush_at.max(1), superseded: 0 }
    }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
    pub fn superseded(&self) -> u64 { self.superseded }

    /// Queue `u`. Returns true once the queue is full and should be drained before the next tick.
    pub fn push(&mut self, u: ClusterUpdate<T>) -> bool {
        if self.map.contains_key(&u.cluster) {
            self.superseded += 1;
        } else {
            self.order.push_back(u.cluster.clone());
        }
        self.map.insert(u.cluster.clone(), u);
        self.order.len() >= self.flush_at
    }

    /// Drain all currently coalesced updates in arrival order.
    pub fn drain_ready(&mut self) -> Vec<ClusterUpdate<T>> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(cluster) = self.order.pop_front() {
            if let Some(u) = self.map.remove(&cluster) {
                out.push(u);
            }
        }
        out
    }
}

/// Builds fleet snapshots from per-cluster updates.
pub struct FleetBuilder<T> {
    epoch: u64,
    parts: BTreeMap<String, Vec<T>>,
}

impl<T> Default for FleetBuilder<T> {
    fn default() -> Self { Self::new() }
}

impl<T> FleetBuilder<T> {
    pub fn new() -> Self { Self { epoch: 0, parts: BTreeMap::new() } }

    pub fn epoch(&self) -> u64 { self.epoch }

    /// Clusters currently holding records, by name.
    pub fn clusters(&self) -> Vec<String> { self.parts.keys().cloned().collect() }

    /// Apply a batch of updates and bump the epoch.
    pub fn apply(&mut self, batch: Vec<ClusterUpdate<T>>) {
        for u in batch {
            match u.kind {
                UpdateKind::Replaced(items) => {
                    debug!(cluster = %u.cluster, items = items.len(), "cluster records replaced");
                    self.parts.insert(u.cluster, items);
                }
                UpdateKind::Removed => {
                    debug!(cluster = %u.cluster, "cluster removed");
                    self.parts.remove(&u.cluster);
                }
            }
        }
        self.epoch = self.epoch.saturating_add(1);
    }
}

impl<T: Clone> FleetBuilder<T> {
    pub fn freeze(&self) -> Arc<Snapshot<T>> {
        let items = self.parts.values().flat_map(|v| v.iter().cloned()).collect();
        Arc::new(Snapshot { epoch: self.epoch, items })
    }
}

/// Handle for readers to access the current snapshot and subscribe to swaps.
pub struct FeedHandle<T> {
    snap: Arc<ArcSwap<Snapshot<T>>>,
    epoch_rx: watch::Receiver<u64>,
}

impl<T> Clone for FeedHandle<T> {
    fn clone(&self) -> Self { Self { snap: Arc::clone(&self.snap), epoch_rx: self.epoch_rx.clone() } }
}

impl<T> FeedHandle<T> {
    pub fn current(&self) -> Arc<Snapshot<T>> { self.snap.load_full() }
    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_rx.clone() }

    /// Wait until the epoch reaches `min` or `timeout` elapses. Returns the epoch seen last.
    pub async fn wait_for_epoch(&self, min: u64, timeout: Duration) -> u64 {
        let mut rx = self.subscribe_epoch();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let cur = *rx.borrow_and_update();
            if cur >= min {
                return cur;
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                _ => return *rx.borrow(),
            }
        }
    }
}

/// Spawn an ingest loop consuming cluster updates and swapping snapshots.
/// Returns a sender for updates and a handle for reads.
pub fn spawn_feed<T>(cap: usize) -> (mpsc::Sender<ClusterUpdate<T>>, FeedHandle<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ClusterUpdate<T>>(cap.max(1));
    let snap = Arc::new(ArcSwap::from_pointee(Snapshot::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut coalescer = Coalescer::with_capacity(cap);
        let mut builder = FleetBuilder::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(8));
        let publish = |coalescer: &mut Coalescer<T>, builder: &mut FleetBuilder<T>| {
            let batch = coalescer.drain_ready();
            if batch.is_empty() {
                return;
            }
            builder.apply(batch);
            let next = builder.freeze();
            let epoch = next.epoch;
            metrics::gauge!("feed_items", next.items.len() as f64);
            metrics::gauge!("feed_clusters", builder.clusters().len() as f64);
            snap_clone.store(next);
            let _ = epoch_tx.send(epoch);
        };
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(u) => {
                            if coalescer.push(u) {
                                publish(&mut coalescer, &mut builder);
                            }
                        }
                        None => {
                            debug!("update channel closed; draining and exiting feed loop");
                            publish(&mut coalescer, &mut builder);
                            break;
                        }
                    }
                }
                _ = ticker.tick() => publish(&mut coalescer, &mut builder),
            }
        }
        metrics::counter!("feed_superseded_total", coalescer.superseded());
        info!(epoch = builder.epoch(), superseded = coalescer.superseded(), "feed loop stopped");
    });

    (tx, FeedHandle { snap, epoch_rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalescer_keeps_latest_per_cluster_in_arrival_order() {
        let mut c = Coalescer::with_capacity(8);
        c.push(ClusterUpdate::replaced("east", vec![1]));
        c.push(ClusterUpdate::replaced("west", vec![2]));
        c.push(ClusterUpdate::replaced("east", vec![3, 4]));
        assert_eq!(c.len(), 2);
        assert_eq!(c.superseded(), 1);
        let out = c.drain_ready();
        assert_eq!(out[0], ClusterUpdate::replaced("east", vec![3, 4]));
        assert_eq!(out[1].cluster, "west");
        assert!(c.is_empty());
    }

    #[test]
    fn full_queue_keeps_every_cluster_and_asks_for_a_flush() {
        let mut c = Coalescer::with_capacity(2);
        assert!(!c.push(ClusterUpdate::replaced("a", vec![1])));
        assert!(c.push(ClusterUpdate::replaced("b", vec![2])));
        assert!(c.push(ClusterUpdate::replaced("c", vec![3])));
        let clusters: Vec<String> = c.drain_ready().into_iter().map(|u| u.cluster).collect();
        assert_eq!(clusters, ["a", "b", "c"]);
    }

    #[test]
    fn removal_survives_an_overflowing_refresh() {
        let mut b = FleetBuilder::new();
        b.apply(vec![ClusterUpdate::replaced("west", vec!["w1"]), ClusterUpdate::replaced("east", vec!["e1"])]);
        let mut c = Coalescer::with_capacity(1);
        c.push(ClusterUpdate::removed("west"));
        c.push(ClusterUpdate::replaced("east", vec!["e2"]));
        b.apply(c.drain_ready());
        assert_eq!(b.freeze().items, vec!["e2"]);
        assert_eq!(b.clusters(), ["east"]);
    }

    #[test]
    fn builder_replaces_and_removes_clusters() {
        let mut b = FleetBuilder::new();
        b.apply(vec![ClusterUpdate::replaced("west", vec!["w1"]), ClusterUpdate::replaced("east", vec!["e1", "e2"])]);
        assert_eq!(b.freeze().items, vec!["e1", "e2", "w1"]);
        b.apply(vec![ClusterUpdate::replaced("east", vec!["e3"])]);
        assert_eq!(b.freeze().items, vec!["e3", "w1"]);
        b.apply(vec![ClusterUpdate::removed("west")]);
        let snap = b.freeze();
        assert_eq!(snap.items, vec!["e3"]);
        assert_eq!(snap.epoch, 3);
        assert_eq!(b.clusters(), ["east"]);
    }
}
