// Persistent Store - device-local key/value mirror of the two collections
//
// Each collection lives under its own key as a JSON array. The store is a
// passive mirror: only the state controller writes to it, after every
// committed mutation. Every mutation is also appended to an `events` table
// as an audit trail, capped per record.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::warn;

pub const BUDGETS_KEY: &str = "applemar_budgets";
pub const INVESTMENTS_KEY: &str = "applemar_investments";

/// History kept per record; older events are pruned on insert
pub const MAX_EVENTS_PER_ENTITY: usize = 50;

// ============================================================================
// EVENT (audit trail)
// ============================================================================

/// One committed change ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable key/value storage local to this device.
///
/// Writes must be visible to the next `get` in the same process.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    fn insert_event(&self, event: &Event) -> Result<()>;

    fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>>;
}

/// Load a collection, falling back to `default` when nothing usable is stored.
///
/// Storage failures and corrupted payloads are logged, never raised.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: Vec<T>) -> Vec<T> {
    match store.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(items) => items,
            Err(e) => {
                warn!(key, error = %e, "stored collection is corrupted, using defaults");
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            warn!(key, error = %e, "storage unavailable on load, using defaults");
            default
        }
    }
}

/// Serialize the whole collection under `key`, replacing what was there.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string(items).context("Failed to serialize collection")?;
    store.put(key, &json)
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }

    fn insert_event(&self, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;

        self.conn.execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;

        // Keep only the newest rows for this entity
        self.conn.execute(
            "DELETE FROM events
             WHERE entity_type = ?1 AND entity_id = ?2 AND id NOT IN (
                 SELECT id FROM events
                 WHERE entity_type = ?1 AND entity_id = ?2
                 ORDER BY id DESC
                 LIMIT ?3
             )",
            params![event.entity_type, event.entity_id, MAX_EVENTS_PER_ENTITY as i64],
        )?;

        Ok(())
    }

    fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id ASC",
        )?;

        let events = stmt
            .query_map(params![entity_type, entity_id], event_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read history for {entity_type} {entity_id}"))?;

        Ok(events)
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let bad_column = |idx: usize, e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e)
    };

    let timestamp: String = row.get(1)?;
    let data: String = row.get(5)?;

    Ok(Event {
        event_id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| bad_column(1, Box::new(e)))?
            .with_timezone(&Utc),
        event_type: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        data: serde_json::from_str(&data).map_err(|e| bad_column(5, Box::new(e)))?,
        actor: row.get(6)?,
    })
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store. Used when the database cannot be opened, and in tests.
///
/// `set_unavailable(true)` makes every call fail, to exercise the
/// storage-error paths.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    events: Mutex<Vec<Event>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn insert_event(&self, event: &Event) -> Result<()> {
        self.check()?;
        let mut events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        events.push(event.clone());

        let same_entity =
            |e: &Event| e.entity_type == event.entity_type && e.entity_id == event.entity_id;
        let excess = events
            .iter()
            .filter(|e| same_entity(e))
            .count()
            .saturating_sub(MAX_EVENTS_PER_ENTITY);
        if excess > 0 {
            let mut dropped = 0;
            events.retain(|e| {
                if dropped < excess && same_entity(e) {
                    dropped += 1;
                    false
                } else {
                    true
                }
            });
        }
        Ok(())
    }

    fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        self.check()?;
        let events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(events
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetEntry, Investment};
    use crate::seed::{default_budgets, default_investments};

    #[test]
    fn test_load_missing_key_uses_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let budgets: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, default_budgets());
        assert_eq!(budgets, default_budgets());
    }

    #[test]
    fn test_round_trip_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut investments = default_investments();
        investments.push(Investment {
            id: "x".to_string(),
            name: "Depósito a prazo".to_string(),
            kind: crate::models::InvestmentType::Cash,
            amount: 0.0,
            current_value: 0.0,
            performance: -1.25,
        });

        save(&store, INVESTMENTS_KEY, &investments).unwrap();
        let loaded: Vec<Investment> = load(&store, INVESTMENTS_KEY, Vec::new());

        assert_eq!(loaded, investments);
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        save(&store, BUDGETS_KEY, &default_budgets()).unwrap();
        save(&store, BUDGETS_KEY, &default_budgets()[..2]).unwrap();

        let loaded: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, Vec::new());
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_empty_collection_is_not_replaced_by_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        save::<BudgetEntry>(&store, BUDGETS_KEY, &[]).unwrap();

        let loaded: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, default_budgets());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupted_payload_falls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put(BUDGETS_KEY, "{not json").unwrap();

        let loaded: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, default_budgets());
        assert_eq!(loaded, default_budgets());
    }

    #[test]
    fn test_unavailable_store_falls_back() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let loaded: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, default_budgets());
        assert_eq!(loaded.len(), 5);
        assert!(save(&store, BUDGETS_KEY, &loaded).is_err());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            save(&store, BUDGETS_KEY, &default_budgets()[1..]).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded: Vec<BudgetEntry> = load(&store, BUDGETS_KEY, default_budgets());
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[0].id, "2");
    }

    #[test]
    fn test_event_log() {
        let store = SqliteStore::open_in_memory().unwrap();

        let event = Event::new(
            "budget_added",
            "budget",
            "abc",
            serde_json::json!({"amount": 1000.0}),
            "planner",
        );
        store.insert_event(&event).unwrap();

        let events = store.events_for_entity("budget", "abc").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "budget_added");
        assert_eq!(events[0].data["amount"], 1000.0);
    }

    fn record(store: &dyn KeyValueStore, entity_id: &str, n: usize) {
        let event = Event::new(
            "budget_updated",
            "budget",
            entity_id,
            serde_json::json!({ "n": n }),
            "planner",
        );
        store.insert_event(&event).unwrap();
    }

    #[test]
    fn test_event_history_is_capped_per_entity() {
        let sqlite = SqliteStore::open_in_memory().unwrap();
        let memory = MemoryStore::new();

        for store in [&sqlite as &dyn KeyValueStore, &memory] {
            record(store, "other", 0);
            for n in 0..MAX_EVENTS_PER_ENTITY + 7 {
                record(store, "busy", n);
            }

            let busy = store.events_for_entity("budget", "busy").unwrap();
            assert_eq!(busy.len(), MAX_EVENTS_PER_ENTITY);
            assert_eq!(busy[0].data["n"], 7);
            assert_eq!(busy.last().unwrap().data["n"], MAX_EVENTS_PER_ENTITY + 6);

            assert_eq!(store.events_for_entity("budget", "other").unwrap().len(), 1);
        }
    }
}
