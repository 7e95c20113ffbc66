use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::AppError;
use crate::models::{Order, OrderInput, OrderLabel};
use crate::store::{ensure_found, now};

const COLUMNS: &str = "id, owner_id, quantity, unit_rate, total, date, note, label, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Order> {
  let label: Option<String> = row.get(7)?;
  Ok(Order {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    quantity: row.get(2)?,
    unit_rate: row.get(3)?,
    total: row.get(4)?,
    date: row.get(5)?,
    note: row.get(6)?,
    label: OrderLabel::from_stored(label.as_deref()).unwrap_or_default(),
    created_at: row.get(8)?,
    updated_at: row.get(9)?,
  })
}

pub fn insert(conn: &Connection, owner: &str, input: &OrderInput, date: NaiveDate) -> Result<Order, AppError> {
  let ts = now();
  let order = Order {
    id: 0,
    owner_id: owner.to_string(),
    quantity: input.quantity,
    unit_rate: input.unit_rate,
    total: input.quantity * input.unit_rate,
    date: Some(date.format("%Y-%m-%d").to_string()),
    note: input.note.clone().unwrap_or_default(),
    label: input.label.unwrap_or_default(),
    created_at: Some(ts.clone()),
    updated_at: Some(ts),
  };
  let id = insert_record(conn, &order)?;
  Ok(Order { id, ..order })
}

pub fn insert_record(conn: &Connection, order: &Order) -> Result<i64, AppError> {
  conn.execute(
    "INSERT INTO orders (owner_id, quantity, unit_rate, total, date, note, label, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      order.owner_id,
      order.quantity,
      order.unit_rate,
      order.total,
      order.date,
      order.note,
      order.label.as_str(),
      order.created_at,
      order.updated_at
    ],
  )?;
  let id = conn.last_insert_rowid();
  debug!(id, "order inserted");
  Ok(id)
}

pub fn update(conn: &Connection, owner: &str, id: i64, input: &OrderInput, date: NaiveDate) -> Result<Order, AppError> {
  let changed = conn.execute(
    "UPDATE orders SET quantity = ?1, unit_rate = ?2, total = ?3, date = ?4, note = ?5, label = ?6, updated_at = ?7
     WHERE id = ?8 AND owner_id = ?9",
    params![
      input.quantity,
      input.unit_rate,
      input.quantity * input.unit_rate,
      date.format("%Y-%m-%d").to_string(),
      input.note.clone().unwrap_or_default(),
      input.label.unwrap_or_default().as_str(),
      now(),
      id,
      owner
    ],
  )?;
  ensure_found(changed, "Order")?;
  debug!(id, "order updated");
  get(conn, owner, id)?.ok_or_else(|| AppError::not_found("Order"))
}

pub fn delete(conn: &Connection, owner: &str, id: i64) -> Result<(), AppError> {
  let changed = conn.execute("DELETE FROM orders WHERE id = ?1 AND owner_id = ?2", params![id, owner])?;
  ensure_found(changed, "Order")?;
  debug!(id, "order deleted");
  Ok(())
}

pub fn get(conn: &Connection, owner: &str, id: i64) -> Result<Option<Order>, AppError> {
  let order = conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM orders WHERE id = ?1 AND owner_id = ?2"),
      params![id, owner],
      map_row,
    )
    .optional()?;
  Ok(order)
}

pub fn list(conn: &Connection, owner: &str) -> Result<Vec<Order>, AppError> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COLUMNS} FROM orders WHERE owner_id = ?1 ORDER BY COALESCE(date, created_at) ASC, id ASC"
  ))?;
  let rows = stmt.query_map(params![owner], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
