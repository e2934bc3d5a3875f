/// Persistent service state.
///
/// Three things survive between polling cycles: the last forecast sent for
/// each point, the checksum of the last analyzed radar download, and the
/// subscriber list. Production uses PostgreSQL (`PgStore`, schema in
/// `sql/001_schema.sql`); tests use `MemoryStore`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls};

use crate::model::{AnchoredStatus, Category};

const SCHEMA_SQL: &str = include_str!("../sql/001_schema.sql");

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    /// Connection or query failure.
    Database(String),
    /// A stored row no longer matches the domain model.
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "Corrupt stored state: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Store interface
// ---------------------------------------------------------------------------

/// A chat subscribed to forecasts for one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub chat_id: i64,
    pub point_key: String,
}

pub trait StateStore {
    /// Last forecast sent, per point key. Points without an entry had none.
    fn get_statuses(&mut self) -> Result<BTreeMap<String, AnchoredStatus>, StoreError>;
    fn set_status(&mut self, point_key: &str, status: &AnchoredStatus) -> Result<(), StoreError>;
    fn clear_status(&mut self, point_key: &str) -> Result<(), StoreError>;

    fn get_checksum(&mut self) -> Result<Option<String>, StoreError>;
    fn set_checksum(&mut self, checksum: &str) -> Result<(), StoreError>;

    /// Subscribes `chat_id` to `point_key`, moving it if already subscribed.
    fn add_subscriber(&mut self, chat_id: i64, point_key: &str) -> Result<(), StoreError>;
    fn remove_subscriber(&mut self, chat_id: i64) -> Result<(), StoreError>;
    fn list_subscribers(&mut self) -> Result<Vec<Subscriber>, StoreError>;
    fn subscriber_point(&mut self, chat_id: i64) -> Result<Option<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Connects and makes sure the schema exists.
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let mut client = Client::connect(database_url, NoTls)?;
        ensure_schema(&mut client)?;
        Ok(PgStore { client })
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

/// Creates the service tables if they do not exist yet.
pub fn ensure_schema(client: &mut Client) -> Result<(), StoreError> {
    client.batch_execute(SCHEMA_SQL)?;
    Ok(())
}

impl StateStore for PgStore {
    fn get_statuses(&mut self) -> Result<BTreeMap<String, AnchoredStatus>, StoreError> {
        let rows = self.client.query(
            "SELECT point_key, start_at, end_at, category FROM forecast_status",
            &[],
        )?;

        let mut statuses = BTreeMap::new();
        for row in rows {
            let point_key: String = row.get(0);
            let category_name: String = row.get(3);
            let category = Category::from_name(&category_name).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown category '{}' for {}", category_name, point_key))
            })?;
            statuses.insert(
                point_key,
                AnchoredStatus {
                    start: row.get::<_, DateTime<Utc>>(1),
                    end: row.get::<_, DateTime<Utc>>(2),
                    category,
                },
            );
        }
        Ok(statuses)
    }

    fn set_status(&mut self, point_key: &str, status: &AnchoredStatus) -> Result<(), StoreError> {
        self.client.execute(
            "INSERT INTO forecast_status (point_key, start_at, end_at, category, updated_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (point_key) DO UPDATE
             SET start_at = EXCLUDED.start_at,
                 end_at = EXCLUDED.end_at,
                 category = EXCLUDED.category,
                 updated_at = now()",
            &[&point_key, &status.start, &status.end, &status.category.as_str()],
        )?;
        Ok(())
    }

    fn clear_status(&mut self, point_key: &str) -> Result<(), StoreError> {
        self.client.execute(
            "DELETE FROM forecast_status WHERE point_key = $1",
            &[&point_key],
        )?;
        Ok(())
    }

    fn get_checksum(&mut self) -> Result<Option<String>, StoreError> {
        let row = self.client.query_opt(
            "SELECT checksum FROM source_state WHERE id = 1",
            &[],
        )?;
        Ok(row.map(|r| r.get(0)))
    }

    fn set_checksum(&mut self, checksum: &str) -> Result<(), StoreError> {
        self.client.execute(
            "INSERT INTO source_state (id, checksum, updated_at)
             VALUES (1, $1, now())
             ON CONFLICT (id) DO UPDATE
             SET checksum = EXCLUDED.checksum, updated_at = now()",
            &[&checksum],
        )?;
        Ok(())
    }

    fn add_subscriber(&mut self, chat_id: i64, point_key: &str) -> Result<(), StoreError> {
        self.client.execute(
            "INSERT INTO subscribers (chat_id, point_key)
             VALUES ($1, $2)
             ON CONFLICT (chat_id) DO UPDATE SET point_key = EXCLUDED.point_key",
            &[&chat_id, &point_key],
        )?;
        Ok(())
    }

    fn remove_subscriber(&mut self, chat_id: i64) -> Result<(), StoreError> {
        self.client.execute(
            "DELETE FROM subscribers WHERE chat_id = $1",
            &[&chat_id],
        )?;
        Ok(())
    }

    fn list_subscribers(&mut self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = self.client.query(
            "SELECT chat_id, point_key FROM subscribers ORDER BY subscribed_at",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .map(|row| Subscriber {
                chat_id: row.get(0),
                point_key: row.get(1),
            })
            .collect())
    }

    fn subscriber_point(&mut self, chat_id: i64) -> Result<Option<String>, StoreError> {
        let row = self.client.query_opt(
            "SELECT point_key FROM subscribers WHERE chat_id = $1",
            &[&chat_id],
        )?;
        Ok(row.map(|r| r.get(0)))
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Non-persistent store, used by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub statuses: BTreeMap<String, AnchoredStatus>,
    pub checksum: Option<String>,
    pub subscribers: Vec<Subscriber>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_statuses(&mut self) -> Result<BTreeMap<String, AnchoredStatus>, StoreError> {
        Ok(self.statuses.clone())
    }

    fn set_status(&mut self, point_key: &str, status: &AnchoredStatus) -> Result<(), StoreError> {
        self.statuses.insert(point_key.to_string(), status.clone());
        Ok(())
    }

    fn clear_status(&mut self, point_key: &str) -> Result<(), StoreError> {
        self.statuses.remove(point_key);
        Ok(())
    }

    fn get_checksum(&mut self) -> Result<Option<String>, StoreError> {
        Ok(self.checksum.clone())
    }

    fn set_checksum(&mut self, checksum: &str) -> Result<(), StoreError> {
        self.checksum = Some(checksum.to_string());
        Ok(())
    }

    fn add_subscriber(&mut self, chat_id: i64, point_key: &str) -> Result<(), StoreError> {
        match self.subscribers.iter_mut().find(|s| s.chat_id == chat_id) {
            Some(existing) => existing.point_key = point_key.to_string(),
            None => self.subscribers.push(Subscriber {
                chat_id,
                point_key: point_key.to_string(),
            }),
        }
        Ok(())
    }

    fn remove_subscriber(&mut self, chat_id: i64) -> Result<(), StoreError> {
        self.subscribers.retain(|s| s.chat_id != chat_id);
        Ok(())
    }

    fn list_subscribers(&mut self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self.subscribers.clone())
    }

    fn subscriber_point(&mut self, chat_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self
            .subscribers
            .iter()
            .find(|s| s.chat_id == chat_id)
            .map(|s| s.point_key.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_status() -> AnchoredStatus {
        AnchoredStatus {
            start: Utc.with_ymd_and_hms(2024, 6, 1, 15, 20, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap(),
            category: Category::Storm,
        }
    }

    #[test]
    fn test_memory_store_status_round_trip() {
        let mut store = MemoryStore::new();
        store.set_status("nnov", &sample_status()).unwrap();
        assert_eq!(store.get_statuses().unwrap()["nnov"], sample_status());
        store.clear_status("nnov").unwrap();
        assert!(store.get_statuses().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_subscribers_are_unique_per_chat() {
        let mut store = MemoryStore::new();
        store.add_subscriber(42, "nnov").unwrap();
        store.add_subscriber(42, "test").unwrap();
        store.add_subscriber(7, "nnov").unwrap();
        assert_eq!(store.list_subscribers().unwrap().len(), 2);
        assert_eq!(store.subscriber_point(42).unwrap().as_deref(), Some("test"));

        store.remove_subscriber(42).unwrap();
        assert_eq!(store.subscriber_point(42).unwrap(), None);
        assert_eq!(store.list_subscribers().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_checksum() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_checksum().unwrap(), None);
        store.set_checksum("abc").unwrap();
        assert_eq!(store.get_checksum().unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_schema_defines_all_tables() {
        for table in ["forecast_status", "source_state", "subscribers"] {
            assert!(SCHEMA_SQL.contains(table), "schema is missing {}", table);
        }
    }
}
