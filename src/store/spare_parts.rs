use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::AppError;
use crate::models::{SparePart, SparePartInput};
use crate::store::{ensure_found, now};

const COLUMNS: &str = "id, owner_id, motorcycle_id, name, quantity, unit_price, total, current_odometer, \
                       next_service_odometer, date, note, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<SparePart> {
  Ok(SparePart {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    motorcycle_id: row.get(2)?,
    name: row.get(3)?,
    quantity: row.get(4)?,
    unit_price: row.get(5)?,
    total: row.get(6)?,
    current_odometer: row.get(7)?,
    next_service_odometer: row.get(8)?,
    date: row.get(9)?,
    note: row.get(10)?,
    created_at: row.get(11)?,
    updated_at: row.get(12)?,
  })
}

pub fn insert(conn: &Connection, owner: &str, input: &SparePartInput, date: NaiveDate) -> Result<SparePart, AppError> {
  let ts = now();
  let part = SparePart {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id: input.motorcycle_id,
    name: input.name.trim().to_string(),
    quantity: input.quantity,
    unit_price: input.unit_price,
    total: input.quantity * input.unit_price,
    current_odometer: input.current_odometer,
    next_service_odometer: input.next_service_odometer,
    date: Some(date.format("%Y-%m-%d").to_string()),
    note: input.note.clone().unwrap_or_default(),
    created_at: Some(ts.clone()),
    updated_at: Some(ts),
  };
  let id = insert_record(conn, &part)?;
  Ok(SparePart { id, ..part })
}

pub fn insert_record(conn: &Connection, part: &SparePart) -> Result<i64, AppError> {
  conn.execute(
    "INSERT INTO spare_parts (owner_id, motorcycle_id, name, quantity, unit_price, total, current_odometer,
       next_service_odometer, date, note, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      part.owner_id,
      part.motorcycle_id,
      part.name,
      part.quantity,
      part.unit_price,
      part.total,
      part.current_odometer,
      part.next_service_odometer,
      part.date,
      part.note,
      part.created_at,
      part.updated_at
    ],
  )?;
  let id = conn.last_insert_rowid();
  debug!(id, motorcycle_id = part.motorcycle_id, "spare part inserted");
  Ok(id)
}

pub fn update(
  conn: &Connection,
  owner: &str,
  id: i64,
  input: &SparePartInput,
  date: NaiveDate,
) -> Result<SparePart, AppError> {
  let changed = conn.execute(
    "UPDATE spare_parts SET motorcycle_id = ?1, name = ?2, quantity = ?3, unit_price = ?4, total = ?5,
       current_odometer = ?6, next_service_odometer = ?7, date = ?8, note = ?9, updated_at = ?10
     WHERE id = ?11 AND owner_id = ?12",
    params![
      input.motorcycle_id,
      input.name.trim(),
      input.quantity,
      input.unit_price,
      input.quantity * input.unit_price,
      input.current_odometer,
      input.next_service_odometer,
      date.format("%Y-%m-%d").to_string(),
      input.note.clone().unwrap_or_default(),
      now(),
      id,
      owner
    ],
  )?;
  ensure_found(changed, "Sparepart")?;
  debug!(id, "spare part updated");
  get(conn, owner, id)?.ok_or_else(|| AppError::not_found("Sparepart"))
}

pub fn delete(conn: &Connection, owner: &str, id: i64) -> Result<(), AppError> {
  let changed = conn.execute("DELETE FROM spare_parts WHERE id = ?1 AND owner_id = ?2", params![id, owner])?;
  ensure_found(changed, "Sparepart")?;
  debug!(id, "spare part deleted");
  Ok(())
}

pub fn delete_for_motorcycle(conn: &Connection, owner: &str, motorcycle_id: i64) -> Result<usize, AppError> {
  let changed = conn.execute(
    "DELETE FROM spare_parts WHERE motorcycle_id = ?1 AND owner_id = ?2",
    params![motorcycle_id, owner],
  )?;
  Ok(changed)
}

pub fn get(conn: &Connection, owner: &str, id: i64) -> Result<Option<SparePart>, AppError> {
  let part = conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM spare_parts WHERE id = ?1 AND owner_id = ?2"),
      params![id, owner],
      map_row,
    )
    .optional()?;
  Ok(part)
}

pub fn list(conn: &Connection, owner: &str, motorcycle_id: Option<i64>) -> Result<Vec<SparePart>, AppError> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COLUMNS} FROM spare_parts
     WHERE owner_id = ?1 AND (?2 IS NULL OR motorcycle_id = ?2)
     ORDER BY COALESCE(date, created_at) DESC, id DESC"
  ))?;
  let rows = stmt.query_map(params![owner, motorcycle_id], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
