use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ToSql};

use super::{AuditError, AuditFilter, AuditOrder, AuditRecord, AuditStore};

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite audit store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                ticket_id INTEGER,
                teller_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_ticket_id ON audit_events(ticket_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_teller_id ON audit_events(teller_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Storage("audit store lock poisoned".to_string()))
    }

    fn insert_row(conn: &Connection, record: &AuditRecord) -> Result<i64, AuditError> {
        let data_json = serde_json::to_string(&record.data)?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, teller_id, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ts(record.timestamp),
                record.event_type,
                record.ticket_id,
                record.teller_id,
                data_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ticket_id) = filter.ticket_id {
            conditions.push("ticket_id = ?".to_string());
            params.push(Box::new(ticket_id));
        }

        if let Some(ref teller_id) = filter.teller_id {
            conditions.push("teller_id = ?".to_string());
            params.push(Box::new(teller_id.clone()));
        }

        if !filter.event_types.is_empty() {
            let slots = vec!["?"; filter.event_types.len()].join(", ");
            conditions.push(format!("event_type IN ({})", slots));
            for event_type in &filter.event_types {
                params.push(Box::new(event_type.clone()));
            }
        }

        if let Some(since) = filter.since {
            conditions.push("timestamp >= ?".to_string());
            params.push(Box::new(ts(since)));
        }

        if let Some(until) = filter.until {
            conditions.push("timestamp <= ?".to_string());
            params.push(Box::new(ts(until)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn decode(row: StoredRow) -> Result<AuditRecord, AuditError> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| AuditError::Storage(format!("bad timestamp on event {}: {}", row.id, e)))?
            .with_timezone(&Utc);
        Ok(AuditRecord {
            id: row.id,
            timestamp,
            event_type: row.event_type,
            ticket_id: row.ticket_id,
            teller_id: row.teller_id,
            data: serde_json::from_str(&row.data)?,
        })
    }
}

/// Columns as stored, before timestamp and payload decoding.
struct StoredRow {
    id: i64,
    timestamp: String,
    event_type: String,
    ticket_id: Option<i64>,
    teller_id: Option<String>,
    data: String,
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let conn = self.lock()?;
        Self::insert_row(&conn, record)
    }

    fn append_batch(&self, records: &[AuditRecord]) -> Result<usize, AuditError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for record in records {
            Self::insert_row(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.lock()?;

        let (where_clause, mut params) = Self::build_where_clause(filter);
        let direction = match filter.order {
            AuditOrder::NewestFirst => "DESC",
            AuditOrder::OldestFirst => "ASC",
        };
        let sql = format!(
            "SELECT id, timestamp, event_type, ticket_id, teller_id, data FROM audit_events {} \
             ORDER BY timestamp {dir}, id {dir} LIMIT ? OFFSET ?",
            where_clause,
            dir = direction
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                event_type: row.get(2)?,
                ticket_id: row.get(3)?,
                teller_id: row.get(4)?,
                data: row.get(5)?,
            })
        })?;

        let records = rows
            .map(|row| Self::decode(row?))
            .collect::<Result<Vec<_>, AuditError>>()?;
        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }
}
