use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::warn;

use crate::error::AppError;
use crate::models::{AuditLogEntry, Paginated};

pub fn append_audit(
  conn: &Connection,
  owner: Option<&str>,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload_json: String,
  details: Option<String>,
) -> Result<(), AppError> {
  let ts = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO audit_log (ts, owner_id, action, entity_type, entity_id, payload_json, details) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![ts, owner, action, entity_type, entity_id, payload_json, details],
  )?;
  Ok(())
}

pub fn record(
  conn: &Connection,
  owner: &str,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload: &impl serde::Serialize,
) {
  let payload_json = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
  if let Err(err) = append_audit(conn, Some(owner), action, entity_type, entity_id, payload_json, None) {
    warn!(action, code = %err.code, "activity log write failed: {}", err.message);
  }
}

pub fn list_audit_log(
  conn: &Connection,
  owner: &str,
  page: i64,
  page_size: i64,
) -> Result<Paginated<AuditLogEntry>, AppError> {
  let page = if page < 1 { 1 } else { page };
  let page_size = if page_size < 1 { 100 } else { page_size };
  let offset = (page - 1) * page_size;

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM audit_log WHERE owner_id = ?1",
    params![owner],
    |row| row.get(0),
  )?;
  let mut stmt = conn.prepare(
    "SELECT id, ts, owner_id, action, entity_type, entity_id, payload_json, details
     FROM audit_log
     WHERE owner_id = ?1
     ORDER BY ts DESC, id DESC
     LIMIT ?2 OFFSET ?3",
  )?;
  let rows = stmt.query_map(params![owner, page_size, offset], |row| {
    Ok(AuditLogEntry {
      id: row.get(0)?,
      ts: row.get(1)?,
      owner_id: row.get(2)?,
      action: row.get(3)?,
      entity_type: row.get(4)?,
      entity_id: row.get(5)?,
      payload_json: row.get(6)?,
      details: row.get(7)?,
    })
  })?;

  let mut items = Vec::new();
  for row in rows {
    items.push(row?);
  }

  Ok(Paginated { total, items })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn entries_are_paged_per_owner() {
    let db = db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      for idx in 0..3 {
        record(conn, "u-1", "ORDER_CREATE", "ORDER", Some(idx.to_string()), &serde_json::json!({ "idx": idx }));
      }
      record(conn, "u-2", "ORDER_CREATE", "ORDER", None, &"{}");

      let page = list_audit_log(conn, "u-1", 1, 2)?;
      assert_eq!(page.total, 3);
      assert_eq!(page.items.len(), 2);
      assert_eq!(page.items[0].entity_id.as_deref(), Some("2"));
      Ok(())
    })
    .unwrap();
  }

  #[test]
  fn failed_write_is_swallowed() {
    let db = db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      conn.execute_batch("DROP TABLE audit_log")?;
      record(conn, "u-1", "ORDER_CREATE", "ORDER", None, &"{}");
      Ok(())
    })
    .unwrap();
  }
}
