//! Escalation tickets: creation, listing, forward-only status updates,
//! and aggregate stats for the operator dashboard.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::{Result, ServiceError};

/// Ticket lifecycle. Transitions only move forward; `Closed` is terminal and
/// reachable from every other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(ServiceError::InvalidStatus(other.to_string())),
        }
    }

    fn can_become(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        match (self, next) {
            (_, Closed) => self != Closed,
            (Open, InProgress) | (Open, Resolved) | (InProgress, Resolved) => true,
            _ => false,
        }
    }
}

/// An escalation ticket as stored.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: String,
    pub session_id: String,
    /// Originating channel (`web`, `tg`, ...), derived from the session id.
    pub channel: String,
    /// Channel-level user identity, when the channel provides one.
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub chat_id: Option<String>,
    /// Pipeline stage that triggered the escalation.
    pub escalation_stage: String,
    pub escalation_reason: String,
    pub original_query: String,
    pub history_snippet: String,
    /// Quality-gate score at escalation time, when that stage produced one.
    pub quality_score: Option<f64>,
    pub status: TicketStatus,
    pub assigned_to: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Everything known about an escalation at creation time.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub session_id: String,
    pub channel: String,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub chat_id: Option<String>,
    pub escalation_stage: String,
    pub escalation_reason: String,
    pub original_query: String,
    pub history_snippet: String,
    pub quality_score: Option<f64>,
}

/// One page of tickets, newest first, with the unpaginated total.
#[derive(Debug, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: u64,
}

/// Fields an operator may change on a ticket.
#[derive(Debug, Default, Clone)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<String>,
    pub resolution_note: Option<String>,
}

/// Counts by status plus mean time-to-resolution.
#[derive(Debug, Serialize)]
pub struct TicketStats {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
    /// Mean hours from creation to resolution, `None` when nothing resolved.
    pub avg_resolution_hours: Option<f64>,
}

/// SQLite-backed ticket store.
pub struct TicketService {
    conn: Mutex<Connection>,
    /// Reuse an existing open ticket for a session instead of creating
    /// another one.
    dedupe_open: bool,
}

impl TicketService {
    pub fn open(path: impl AsRef<Path>, dedupe_open: bool) -> Result<Self> {
        Self::init(Connection::open(path)?, dedupe_open)
    }

    pub fn open_in_memory(dedupe_open: bool) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, dedupe_open)
    }

    fn init(conn: Connection, dedupe_open: bool) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tickets (
                 id                TEXT PRIMARY KEY,
                 session_id        TEXT NOT NULL,
                 channel           TEXT NOT NULL,
                 user_id           TEXT,
                 username          TEXT,
                 chat_id           TEXT,
                 escalation_stage  TEXT NOT NULL,
                 escalation_reason TEXT NOT NULL,
                 original_query    TEXT NOT NULL,
                 history_snippet   TEXT NOT NULL,
                 quality_score     REAL,
                 status            TEXT NOT NULL,
                 assigned_to       TEXT,
                 resolution_note   TEXT,
                 created_at        TEXT NOT NULL,
                 updated_at        TEXT NOT NULL,
                 resolved_at       TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_tickets_session
                 ON tickets (session_id, status);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            dedupe_open,
        })
    }

    /// Create a ticket for an escalated query. With dedupe enabled, an
    /// existing open ticket for the session is returned instead.
    pub fn create(&self, new: NewTicket) -> Result<Ticket> {
        let conn = self.lock();
        if self.dedupe_open {
            let existing = conn
                .query_row(
                    "SELECT * FROM tickets
                     WHERE session_id = ?1 AND status = 'open'
                     ORDER BY created_at DESC LIMIT 1",
                    params![new.session_id],
                    row_to_ticket,
                )
                .optional()?;
            if let Some(t) = existing {
                info!(target: "services::tickets", ticket_id = %t.id, session_id = %new.session_id, "reusing open ticket");
                return Ok(t);
            }
        }

        let id = new_ticket_id();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO tickets
                 (id, session_id, channel, user_id, username, chat_id,
                  escalation_stage, escalation_reason, original_query,
                  history_snippet, quality_score, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'open', ?12, ?12)",
            params![
                id,
                new.session_id,
                new.channel,
                new.user_id,
                new.username,
                new.chat_id,
                new.escalation_stage,
                new.escalation_reason,
                new.original_query,
                new.history_snippet,
                new.quality_score,
                now.to_rfc3339()
            ],
        )?;
        info!(
            target: "services::tickets",
            ticket_id = %id,
            session_id = %new.session_id,
            stage = %new.escalation_stage,
            "ticket created"
        );
        fetch(&conn, &id)
    }

    pub fn get(&self, id: &str) -> Result<Ticket> {
        let conn = self.lock();
        fetch(&conn, id)
    }

    /// Page through tickets, newest first, optionally filtered by status.
    pub fn list(
        &self,
        status: Option<TicketStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<TicketPage> {
        let conn = self.lock();
        let (total, tickets) = match status {
            Some(s) => {
                let total: u64 = conn.query_row(
                    "SELECT COUNT(*) FROM tickets WHERE status = ?1",
                    params![s.as_str()],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(
                    "SELECT * FROM tickets WHERE status = ?1
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(
                    params![s.as_str(), limit as i64, offset as i64],
                    row_to_ticket,
                )?;
                (total, rows.collect::<rusqlite::Result<Vec<_>>>()?)
            }
            None => {
                let total: u64 =
                    conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
                let mut stmt = conn.prepare(
                    "SELECT * FROM tickets ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                )?;
                let rows =
                    stmt.query_map(params![limit as i64, offset as i64], row_to_ticket)?;
                (total, rows.collect::<rusqlite::Result<Vec<_>>>()?)
            }
        };
        Ok(TicketPage { tickets, total })
    }

    /// Apply an operator update. Status changes must follow the forward-only
    /// lifecycle; `resolved_at` is stamped on the first transition into
    /// `resolved` or `closed` and never overwritten.
    ///
    /// The connection lock is held from read to write, so concurrent updates
    /// serialize instead of writing back stale snapshots of each other.
    pub fn update(&self, id: &str, update: TicketUpdate) -> Result<Ticket> {
        let conn = self.lock();
        let current = fetch(&conn, id)?;
        let now = Utc::now();

        let mut status = current.status;
        let mut resolved_at = current.resolved_at;
        if let Some(next) = update.status {
            if next != current.status {
                if !current.status.can_become(next) {
                    return Err(ServiceError::InvalidTransition {
                        from: current.status.as_str().to_string(),
                        to: next.as_str().to_string(),
                    });
                }
                status = next;
                let terminalish =
                    matches!(next, TicketStatus::Resolved | TicketStatus::Closed);
                if terminalish && resolved_at.is_none() {
                    resolved_at = Some(now);
                }
            }
        }
        let assigned_to = update.assigned_to.or(current.assigned_to);
        let resolution_note = update.resolution_note.or(current.resolution_note);

        conn.execute(
            "UPDATE tickets
             SET status = ?2, assigned_to = ?3, resolution_note = ?4,
                 updated_at = ?5, resolved_at = ?6
             WHERE id = ?1",
            params![
                id,
                status.as_str(),
                assigned_to,
                resolution_note,
                now.to_rfc3339(),
                resolved_at.map(|t| t.to_rfc3339())
            ],
        )?;
        info!(target: "services::tickets", ticket_id = %id, status = status.as_str(), "ticket updated");
        fetch(&conn, id)
    }

    pub fn stats(&self) -> Result<TicketStats> {
        let conn = self.lock();
        let mut stats = TicketStats {
            total: 0,
            open: 0,
            in_progress: 0,
            resolved: 0,
            closed: 0,
            avg_resolution_hours: None,
        };
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM tickets GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            stats.total += count;
            match TicketStatus::parse(&status)? {
                TicketStatus::Open => stats.open = count,
                TicketStatus::InProgress => stats.in_progress = count,
                TicketStatus::Resolved => stats.resolved = count,
                TicketStatus::Closed => stats.closed = count,
            }
        }
        // julianday difference is in days; resolved_at is only ever set once.
        stats.avg_resolution_hours = conn.query_row(
            "SELECT AVG((julianday(resolved_at) - julianday(created_at)) * 24.0)
             FROM tickets WHERE resolved_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(stats)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `tkt_` plus twelve hex characters from a v4 UUID.
fn new_ticket_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("tkt_{}", &raw[..12])
}

fn fetch(conn: &Connection, id: &str) -> Result<Ticket> {
    conn.query_row("SELECT * FROM tickets WHERE id = ?1", params![id], row_to_ticket)
        .optional()?
        .ok_or_else(|| ServiceError::TicketNotFound(id.to_string()))
}

fn row_to_ticket(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let status: String = row.get("status")?;
    let resolved_at: Option<String> = row.get("resolved_at")?;
    Ok(Ticket {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        channel: row.get("channel")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        chat_id: row.get("chat_id")?,
        escalation_stage: row.get("escalation_stage")?,
        escalation_reason: row.get("escalation_reason")?,
        original_query: row.get("original_query")?,
        history_snippet: row.get("history_snippet")?,
        quality_score: row.get("quality_score")?,
        status: TicketStatus::parse(&status).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                status.clone().into(),
            )
        })?,
        assigned_to: row.get("assigned_to")?,
        resolution_note: row.get("resolution_note")?,
        created_at: parse_ts(row.get::<_, String>("created_at")?)?,
        updated_at: parse_ts(row.get::<_, String>("updated_at")?)?,
        resolved_at: resolved_at.map(parse_ts).transpose()?,
    })
}

fn parse_ts(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> TicketService {
        TicketService::open_in_memory(false).unwrap()
    }

    fn new_ticket(session: &str, query: &str) -> NewTicket {
        NewTicket {
            session_id: session.to_string(),
            channel: "web".to_string(),
            user_id: None,
            username: None,
            chat_id: None,
            escalation_stage: "quality_gate".to_string(),
            escalation_reason: "poor evidence".to_string(),
            original_query: query.to_string(),
            history_snippet: String::new(),
            quality_score: Some(-0.4),
        }
    }

    #[test]
    fn create_assigns_prefixed_id_and_open_status() {
        let s = svc();
        let t = s.create(new_ticket("tg_private_1", "refund lama")).unwrap();
        assert!(t.id.starts_with("tkt_"));
        assert_eq!(t.id.len(), 4 + 12);
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.escalation_stage, "quality_gate");
        assert_eq!(t.quality_score, Some(-0.4));
        assert!(t.resolved_at.is_none());
    }

    #[test]
    fn lifecycle_is_forward_only() {
        let s = svc();
        let t = s.create(new_ticket("s", "q")).unwrap();

        let t = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::InProgress), ..Default::default() })
            .unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);

        // Backwards is rejected.
        let err = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::Open), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let t = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::Resolved), ..Default::default() })
            .unwrap();
        assert!(t.resolved_at.is_some());
        let first_resolved = t.resolved_at;

        // Closing after resolution keeps the original resolved_at.
        let t = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::Closed), ..Default::default() })
            .unwrap();
        assert_eq!(t.status, TicketStatus::Closed);
        assert_eq!(t.resolved_at, first_resolved);

        // Closed is terminal.
        let err = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::Open), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }

    #[test]
    fn open_can_close_directly() {
        let s = svc();
        let t = s.create(new_ticket("s", "q")).unwrap();
        let t = s
            .update(&t.id, TicketUpdate { status: Some(TicketStatus::Closed), ..Default::default() })
            .unwrap();
        assert_eq!(t.status, TicketStatus::Closed);
        // Closing counts as resolution for time-to-resolution purposes.
        assert!(t.resolved_at.is_some());
    }

    #[test]
    fn same_status_update_is_a_noop_transition() {
        let s = svc();
        let t = s.create(new_ticket("s", "q")).unwrap();
        let t = s
            .update(
                &t.id,
                TicketUpdate {
                    status: Some(TicketStatus::Open),
                    assigned_to: Some("agent-1".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.assigned_to.as_deref(), Some("agent-1"));
    }

    #[test]
    fn list_filters_and_counts() {
        let s = svc();
        for i in 0..3 {
            s.create(new_ticket("s", &format!("q{i}"))).unwrap();
        }
        let t = s.create(new_ticket("s", "q3")).unwrap();
        s.update(&t.id, TicketUpdate { status: Some(TicketStatus::Closed), ..Default::default() })
            .unwrap();

        let page = s.list(Some(TicketStatus::Open), 2, 0).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.tickets.len(), 2);

        let all = s.list(None, 10, 0).unwrap();
        assert_eq!(all.total, 4);
    }

    #[test]
    fn missing_ticket_is_not_found() {
        let s = svc();
        assert!(matches!(
            s.get("tkt_missing00000").unwrap_err(),
            ServiceError::TicketNotFound(_)
        ));
    }

    #[test]
    fn dedupe_reuses_open_ticket_per_session() {
        let s = TicketService::open_in_memory(true).unwrap();
        let a = s.create(new_ticket("s1", "q")).unwrap();
        let b = s.create(new_ticket("s1", "q again")).unwrap();
        assert_eq!(a.id, b.id);
        let c = s.create(new_ticket("s2", "q")).unwrap();
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn identity_fields_are_stored_and_returned() {
        let s = svc();
        let t = s
            .create(NewTicket {
                user_id: Some("12345".into()),
                username: Some("budi".into()),
                chat_id: Some("67890".into()),
                ..new_ticket("tg_private_12345", "refund")
            })
            .unwrap();
        let t = s.get(&t.id).unwrap();
        assert_eq!(t.user_id.as_deref(), Some("12345"));
        assert_eq!(t.username.as_deref(), Some("budi"));
        assert_eq!(t.chat_id.as_deref(), Some("67890"));
    }

    #[test]
    fn concurrent_close_and_assign_never_reopen() {
        use std::sync::{Arc, Barrier};

        // A close racing an assignee-only update must leave the ticket
        // closed with resolved_at intact, whichever order they land in.
        let s = Arc::new(svc());
        for i in 0..50 {
            let t = s.create(new_ticket("s", &format!("q{i}"))).unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let closer = {
                let s = Arc::clone(&s);
                let barrier = Arc::clone(&barrier);
                let id = t.id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    s.update(
                        &id,
                        TicketUpdate {
                            status: Some(TicketStatus::Closed),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                })
            };
            let assigner = {
                let s = Arc::clone(&s);
                let barrier = Arc::clone(&barrier);
                let id = t.id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    s.update(
                        &id,
                        TicketUpdate {
                            assigned_to: Some("agent-1".into()),
                            ..Default::default()
                        },
                    )
                    .unwrap();
                })
            };
            closer.join().unwrap();
            assigner.join().unwrap();

            let t = s.get(&t.id).unwrap();
            assert_eq!(t.status, TicketStatus::Closed);
            assert!(t.resolved_at.is_some());
        }
    }

    #[test]
    fn stats_counts_by_status() {
        let s = svc();
        let t1 = s.create(new_ticket("s", "q")).unwrap();
        s.create(new_ticket("s", "q2")).unwrap();
        s.update(&t1.id, TicketUpdate { status: Some(TicketStatus::Resolved), ..Default::default() })
            .unwrap();
        let st = s.stats().unwrap();
        assert_eq!(st.total, 2);
        assert_eq!(st.open, 1);
        assert_eq!(st.resolved, 1);
        assert!(st.avg_resolution_hours.is_some());
    }
}
