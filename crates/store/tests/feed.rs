#![forbid(unsafe_code)]

use std::time::Duration;

use fleetdeck_store::{spawn_feed, ClusterUpdate};

fn pvc(name: &str, cluster: &str) -> serde_json::Value {
    serde_json::json!({ "name": name, "cluster": cluster })
}

fn names(items: &[serde_json::Value]) -> Vec<String> {
    items.iter().map(|v| v["name"].as_str().unwrap_or("").to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn latest_snapshot_per_cluster_wins() {
    let (tx, feed) = spawn_feed::<serde_json::Value>(64);
    tx.send(ClusterUpdate::replaced("east", vec![pvc("a", "east")])).await.unwrap();
    tx.send(ClusterUpdate::replaced("west", vec![pvc("w", "west")])).await.unwrap();
    // a burst for one cluster: only the last array survives
    tx.send(ClusterUpdate::replaced("east", vec![pvc("b", "east"), pvc("c", "east")])).await.unwrap();
    drop(tx);
    let epoch = feed.wait_for_epoch(1, Duration::from_secs(2)).await;
    assert!(epoch >= 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let snap = feed.current();
    assert_eq!(names(&snap.items), ["b", "c", "w"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removed_clusters_disappear() {
    let (tx, feed) = spawn_feed::<serde_json::Value>(64);
    tx.send(ClusterUpdate::replaced("east", vec![pvc("a", "east")])).await.unwrap();
    tx.send(ClusterUpdate::replaced("west", vec![pvc("w", "west")])).await.unwrap();
    let first = feed.wait_for_epoch(1, Duration::from_secs(2)).await;
    assert!(first >= 1);
    tx.send(ClusterUpdate::removed("west")).await.unwrap();
    drop(tx);
    // channel close flushes the final batch
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(names(&feed.current().items), ["a"]);
}

#[tokio::test]
async fn wait_times_out_without_updates() {
    let (_tx, feed) = spawn_feed::<serde_json::Value>(4);
    let epoch = feed.wait_for_epoch(1, Duration::from_millis(30)).await;
    assert_eq!(epoch, 0);
    assert!(feed.current().items.is_empty());
}
