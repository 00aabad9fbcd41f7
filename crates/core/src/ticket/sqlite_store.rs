//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, ToSql, TransactionBehavior};

use super::{
    BoardRows, CreateTicketRequest, NumberLookup, QueueQuery, QueueStats, StateCount, StateParts,
    Status, Step, StepNotes, Ticket, TicketError, TicketEvent, TicketFilter, TicketState,
    TicketStore,
};

const TICKET_COLUMNS: &str = "id, number, transaction_type, is_priority, step, status, \
     served_by_step1, served_by_step2, classification, remarks, \
     started_at_step1, finished_at_step1, started_at_step2, finished_at_step2, \
     sequence_day, created_at, updated_at";

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Per-step column names: `(served_by, started_at, finished_at)`.
fn step_columns(step: Step) -> (&'static str, &'static str, &'static str) {
    match step {
        Step::One => ("served_by_step1", "started_at_step1", "finished_at_step1"),
        Step::Two => ("served_by_step2", "started_at_step2", "finished_at_step2"),
    }
}

/// Transaction type a ticket is queued under: the intake type at step 1, the
/// step-1 classification (falling back to intake) at step 2.
fn queue_type_column(step: Step) -> &'static str {
    match step {
        Step::One => "transaction_type",
        Step::Two => "COALESCE(classification, transaction_type)",
    }
}

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number INTEGER NOT NULL CHECK (number >= 1),
                transaction_type INTEGER NOT NULL,
                is_priority INTEGER NOT NULL DEFAULT 0,
                step INTEGER NOT NULL,
                status TEXT NOT NULL,
                served_by_step1 TEXT,
                served_by_step2 TEXT,
                classification INTEGER,
                remarks TEXT,
                started_at_step1 TEXT,
                finished_at_step1 TEXT,
                started_at_step2 TEXT,
                finished_at_step2 TEXT,
                sequence_lane TEXT NOT NULL,
                sequence_day TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (
                    (step = 1 AND status IN ('waiting', 'serving', 'no_show'))
                    OR (step = 2 AND status IN ('waiting', 'serving', 'no_show', 'done'))
                )
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_tickets_sequence
                ON tickets(transaction_type, sequence_lane, sequence_day, number);
            CREATE INDEX IF NOT EXISTS idx_tickets_queue
                ON tickets(step, status, is_priority, created_at);
            CREATE INDEX IF NOT EXISTS idx_tickets_updated_at ON tickets(updated_at);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("ticket store lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(step) = filter.step {
            conditions.push("step = ?");
            params.push(Box::new(step.as_u8()));
        }

        if let Some(transaction_type) = filter.transaction_type {
            conditions.push("transaction_type = ?");
            params.push(Box::new(transaction_type));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let step: u8 = row.get(4)?;
        let status: String = row.get(5)?;

        let step = Step::try_from(step)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;
        let status = Status::from_str(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
        let state = TicketState::try_from(StateParts { step, status })
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

        Ok(Ticket {
            id: row.get(0)?,
            number: row.get(1)?,
            transaction_type: row.get(2)?,
            is_priority: row.get(3)?,
            state,
            served_by_step1: row.get(6)?,
            served_by_step2: row.get(7)?,
            classification: row.get(8)?,
            remarks: row.get(9)?,
            started_at_step1: opt_timestamp(row, 10)?,
            finished_at_step1: opt_timestamp(row, 11)?,
            started_at_step2: opt_timestamp(row, 12)?,
            finished_at_step2: opt_timestamp(row, 13)?,
            sequence_day: row.get(14)?,
            created_at: timestamp(row, 15)?,
            updated_at: timestamp(row, 16)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<Ticket>, TicketError> {
        let ticket = conn
            .query_row(
                &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
                params![id],
                Self::row_to_ticket,
            )
            .optional()?;
        Ok(ticket)
    }

    fn query_tickets(
        conn: &Connection,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Ticket>, TicketError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_ticket)?;

        let mut tickets = Vec::new();
        for row_result in rows {
            tickets.push(row_result?);
        }
        Ok(tickets)
    }
}

fn timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let mut conn = self.lock()?;

        // Immediate: take the write lock before reading the max so no other
        // writer can allocate the same number in between.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM tickets \
             WHERE transaction_type = ?1 AND sequence_lane = ?2 AND sequence_day = ?3",
            params![
                request.transaction_type,
                request.partition.lane,
                request.partition.day
            ],
            |row| row.get(0),
        )?;

        let now = Utc::now();
        tx.execute(
            "INSERT INTO tickets (number, transaction_type, is_priority, step, status, sequence_lane, sequence_day, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 1, 'waiting', ?4, ?5, ?6, ?6)",
            params![
                number,
                request.transaction_type,
                request.is_priority,
                request.partition.lane,
                request.partition.day,
                ts(now),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Ticket {
            id,
            number,
            transaction_type: request.transaction_type,
            is_priority: request.is_priority,
            state: TicketState::initial(),
            served_by_step1: None,
            served_by_step2: None,
            classification: None,
            remarks: None,
            started_at_step1: None,
            finished_at_step1: None,
            started_at_step2: None,
            finished_at_step2: None,
            sequence_day: request.partition.day,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn find_by_number(&self, lookup: &NumberLookup) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;

        let mut sql = format!(
            "SELECT {} FROM tickets WHERE step = ? AND {} = ? AND number = ?",
            TICKET_COLUMNS,
            queue_type_column(lookup.step)
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(lookup.step.as_u8()),
            Box::new(lookup.transaction_type),
            Box::new(lookup.number),
        ];

        if let Some(is_priority) = lookup.is_priority {
            sql.push_str(" AND is_priority = ?");
            values.push(Box::new(is_priority));
        }
        if let Some(ref day) = lookup.sequence_day {
            sql.push_str(" AND sequence_day = ?");
            values.push(Box::new(day.clone()));
        }
        // Numbers repeat across intake types that share a step-2 queue, so an
        // absent ticket wins over a newer one with the same number.
        sql.push_str(" ORDER BY status = 'no_show' DESC, id DESC LIMIT 1");

        let param_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let mut tickets = Self::query_tickets(&conn, &sql, param_refs.as_slice())?;
        Ok(tickets.pop())
    }

    fn next_candidate(&self, query: &QueueQuery) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM tickets \
             WHERE step = ?1 AND status = 'waiting' AND is_priority = ?2 AND {} = ?3 \
             ORDER BY created_at ASC, id ASC LIMIT 1",
            TICKET_COLUMNS,
            queue_type_column(query.step)
        );

        let ticket = conn
            .query_row(
                &sql,
                params![
                    query.step.as_u8(),
                    query.priority.is_priority(),
                    query.transaction_type
                ],
                Self::row_to_ticket,
            )
            .optional()?;
        Ok(ticket)
    }

    fn claim(&self, id: i64, step: Step, teller_id: &str) -> Result<Ticket, TicketError> {
        let conn = self.lock()?;
        let (served_by, started_at, _) = step_columns(step);

        // A teller holds at most one serving ticket, at either step.
        let busy: Option<i64> = conn
            .query_row(
                "SELECT id FROM tickets WHERE status = 'serving' \
                 AND ((step = 1 AND served_by_step1 = ?1) OR (step = 2 AND served_by_step2 = ?1)) \
                 LIMIT 1",
                params![teller_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(ticket_id) = busy {
            return Err(TicketError::TellerBusy {
                teller_id: teller_id.to_string(),
                ticket_id,
            });
        }

        let now = ts(Utc::now());
        let changed = conn.execute(
            &format!(
                "UPDATE tickets SET status = 'serving', {} = ?1, {} = ?2, updated_at = ?2 \
                 WHERE id = ?3 AND step = ?4 AND status = 'waiting'",
                served_by, started_at
            ),
            params![teller_id, now, id, step.as_u8()],
        )?;

        if changed == 0 {
            return match Self::fetch(&conn, id)? {
                None => Err(TicketError::NotFound(id.to_string())),
                Some(_) => Err(TicketError::Conflict(id.to_string())),
            };
        }

        Self::fetch(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn transition(
        &self,
        id: i64,
        from: TicketState,
        event: TicketEvent,
        notes: Option<&StepNotes>,
    ) -> Result<Ticket, TicketError> {
        let invalid = |current: TicketState| TicketError::InvalidState {
            ticket_id: id.to_string(),
            current_state: current.to_string(),
            operation: event.to_string(),
        };

        if event == TicketEvent::Claim {
            return Err(invalid(from));
        }
        let to = from.apply(event).ok_or_else(|| invalid(from))?;

        let conn = self.lock()?;
        let now = ts(Utc::now());
        let (_, _, finished_at) = step_columns(from.step());

        let mut assignments = vec![
            "step = ?".to_string(),
            "status = ?".to_string(),
            "updated_at = ?".to_string(),
        ];
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(to.step().as_u8()),
            Box::new(to.status().as_str()),
            Box::new(now.clone()),
        ];

        // Recovering at step 1 keeps the times the no-show recorded.
        if !(event == TicketEvent::Override && from.step() == Step::One) {
            assignments.push(format!("{} = ?", finished_at));
            values.push(Box::new(now));
        }

        if let (Some(notes), Step::One, TicketEvent::Complete) = (notes, from.step(), event) {
            assignments.push("classification = ?".to_string());
            values.push(Box::new(notes.classification));
            assignments.push("remarks = ?".to_string());
            values.push(Box::new(notes.remarks.clone()));
        }

        let sql = format!(
            "UPDATE tickets SET {} WHERE id = ? AND step = ? AND status = ?",
            assignments.join(", ")
        );
        values.push(Box::new(id));
        values.push(Box::new(from.step().as_u8()));
        values.push(Box::new(from.status().as_str()));

        let param_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let changed = conn.execute(&sql, param_refs.as_slice())?;

        if changed == 0 {
            return match Self::fetch(&conn, id)? {
                None => Err(TicketError::NotFound(id.to_string())),
                Some(current) => Err(invalid(current.state)),
            };
        }

        Self::fetch(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn serving_for(&self, teller_id: &str, step: Step) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;
        let (served_by, _, _) = step_columns(step);

        let ticket = conn
            .query_row(
                &format!(
                    "SELECT {} FROM tickets WHERE step = ?1 AND status = 'serving' AND {} = ?2 \
                     ORDER BY updated_at DESC LIMIT 1",
                    TICKET_COLUMNS, served_by
                ),
                params![step.as_u8(), teller_id],
                Self::row_to_ticket,
            )
            .optional()?;
        Ok(ticket)
    }

    fn snapshot(&self, serving_limit: u32, waiting_limit: u32) -> Result<BoardRows, TicketError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let serving = Self::query_tickets(
            &tx,
            &format!(
                "SELECT {} FROM tickets WHERE status = 'serving' \
                 ORDER BY updated_at DESC, id DESC LIMIT ?",
                TICKET_COLUMNS
            ),
            params![serving_limit],
        )?;
        let waiting = Self::query_tickets(
            &tx,
            &format!(
                "SELECT {} FROM tickets WHERE status = 'waiting' \
                 ORDER BY created_at ASC, id ASC LIMIT ?",
                TICKET_COLUMNS
            ),
            params![waiting_limit],
        )?;
        tx.commit()?;

        Ok(BoardRows {
            serving,
            waiting,
            read_at: Utc::now(),
        })
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut all_params: Vec<Box<dyn ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn ToSql> = all_params.iter().map(|p| p.as_ref()).collect();
        Self::query_tickets(&conn, &sql, param_refs.as_slice())
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn stats(&self) -> Result<QueueStats, TicketError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut counts = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT step, status, COUNT(*) FROM tickets GROUP BY step, status ORDER BY step, status",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, u8>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for row in rows {
                let (step, status, count) = row?;
                let step =
                    Step::try_from(step).map_err(|e| TicketError::Database(e.to_string()))?;
                let status =
                    Status::from_str(&status).map_err(|e| TicketError::Database(e.to_string()))?;
                counts.push(StateCount {
                    step,
                    status,
                    count,
                });
            }
        }

        let (avg_wait_secs_step1, avg_service_secs_step1, avg_service_secs_step2) = tx.query_row(
            "SELECT \
                AVG((julianday(started_at_step1) - julianday(created_at)) * 86400.0), \
                AVG((julianday(finished_at_step1) - julianday(started_at_step1)) * 86400.0), \
                AVG((julianday(finished_at_step2) - julianday(started_at_step2)) * 86400.0) \
             FROM tickets",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )?;
        tx.commit()?;

        Ok(QueueStats {
            generated_at: Utc::now(),
            counts,
            avg_wait_secs_step1,
            avg_service_secs_step1,
            avg_service_secs_step2,
        })
    }
}
