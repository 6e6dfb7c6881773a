//! FleetDeck persistence: a small key-value port for per-card UI state.
//! Keep code tiny and predictable. Last writer wins; no schema versioning.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use anyhow::{anyhow, Context, Result};
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Durable string storage keyed by string.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Compose a namespaced key: `<namespace>:<key>`.
pub fn scoped_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() { key.to_string() } else { format!("{}:{}", namespace, key) }
}

/// Read and decode a JSON value. Missing keys, read failures and bad JSON all yield None.
pub fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "kv read failed; using default");
            counter!("persist_read_errors_total", 1u64);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed persisted value");
            counter!("persist_decode_errors_total", 1u64);
            None
        }
    }
}

/// Encode and write a JSON value; failures are logged and swallowed.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> bool {
    let res = serde_json::to_string(value)
        .context("encoding value")
        .and_then(|raw| store.set(key, &raw));
    if let Err(e) = res {
        warn!(key, error = %e, "kv write failed; change kept in memory only");
        counter!("persist_write_errors_total", 1u64);
        return false;
    }
    true
}

/// In-process store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().map(|m| m.len()).unwrap_or(0) }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.map.read().map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.map.write().map_err(|_| anyhow!("memory store lock poisoned"))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.map.write().map_err(|_| anyhow!("memory store lock poisoned"))?;
        map.remove(key);
        Ok(())
    }
}

/// SQLite-backed store. Simple, synchronous; writes are tiny and rare.
pub struct SqliteStore {
    db: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = std::env::var("FLEETDECK_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> Result<Self> {
        let started = std::time::Instant::now();
        let db = rusqlite::Connection::open(path).with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", "WAL").ok();
        db.pragma_update(None, "synchronous", "NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                ts    INTEGER NOT NULL
            )",
            [],
        )
        .context("creating kv table")?;
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.db.lock().map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let started = std::time::Instant::now();
        let db = self.conn()?;
        let mut stmt = db.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        let out = match rows.next()? {
            Some(row) => Some(row.get::<_, String>(0)?),
            None => None,
        };
        histogram!("persist_get_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let started = std::time::Instant::now();
        let db = self.conn()?;
        db.execute(
            "INSERT INTO kv(key, value, ts) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, ts = excluded.ts",
            (key, value, now_ts()),
        )
        .with_context(|| format!("writing key {}", key))?;
        histogram!("persist_put_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_put_total", 1u64);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.conn()?;
        db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".fleetdeck");
        let _ = std::fs::create_dir_all(&p);
        p.push("fleetdeck.db");
        return p.to_string_lossy().to_string();
    }
    // Fallback to current directory
    "fleetdeck.db".to_string()
}

pub fn now_ts() -> i64 {
    // seconds since epoch
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    now.as_secs() as i64
}
