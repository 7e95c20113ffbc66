use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::AppError;
use crate::models::OdometerReading;
use crate::store::{ensure_found, now};

const COLUMNS: &str = "id, owner_id, motorcycle_id, date, odometer_km, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<OdometerReading> {
  Ok(OdometerReading {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    motorcycle_id: row.get(2)?,
    date: row.get(3)?,
    odometer_km: row.get(4)?,
    created_at: row.get(5)?,
    updated_at: row.get(6)?,
  })
}

/// One reading per (owner, motorcycle, date); a second reading for the same day replaces the first.
pub fn record(
  conn: &Connection,
  owner: &str,
  motorcycle_id: i64,
  date: NaiveDate,
  odometer_km: f64,
) -> Result<OdometerReading, AppError> {
  let ts = now();
  let reading = OdometerReading {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id,
    date: Some(date.format("%Y-%m-%d").to_string()),
    odometer_km,
    created_at: Some(ts.clone()),
    updated_at: Some(ts),
  };
  let id = upsert_record(conn, &reading)?;
  let stored = conn.query_row(
    &format!("SELECT {COLUMNS} FROM odometer_readings WHERE id = ?1"),
    params![id],
    map_row,
  )?;
  Ok(stored)
}

pub fn upsert_record(conn: &Connection, reading: &OdometerReading) -> Result<i64, AppError> {
  let id: i64 = conn.query_row(
    "INSERT INTO odometer_readings (owner_id, motorcycle_id, date, odometer_km, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (owner_id, motorcycle_id, date)
     DO UPDATE SET odometer_km = excluded.odometer_km, updated_at = excluded.updated_at
     RETURNING id",
    params![
      reading.owner_id,
      reading.motorcycle_id,
      reading.date,
      reading.odometer_km,
      reading.created_at,
      reading.updated_at
    ],
    |row| row.get(0),
  )?;
  debug!(id, motorcycle_id = reading.motorcycle_id, "odometer reading stored");
  Ok(id)
}

pub fn delete(conn: &Connection, owner: &str, id: i64) -> Result<(), AppError> {
  let changed = conn.execute(
    "DELETE FROM odometer_readings WHERE id = ?1 AND owner_id = ?2",
    params![id, owner],
  )?;
  ensure_found(changed, "Data KM")?;
  Ok(())
}

pub fn list(conn: &Connection, owner: &str, motorcycle_id: Option<i64>) -> Result<Vec<OdometerReading>, AppError> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COLUMNS} FROM odometer_readings
     WHERE owner_id = ?1 AND (?2 IS NULL OR motorcycle_id = ?2)
     ORDER BY COALESCE(date, created_at) ASC, id ASC"
  ))?;
  let rows = stmt.query_map(params![owner, motorcycle_id], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn same_day_reading_replaces_previous() {
    let db = db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
      let first = record(conn, "u-1", 7, date, 1200.0)?;
      let second = record(conn, "u-1", 7, date, 1250.0)?;
      assert_eq!(first.id, second.id);

      let readings = list(conn, "u-1", Some(7))?;
      assert_eq!(readings.len(), 1);
      assert_eq!(readings[0].odometer_km, 1250.0);

      record(conn, "u-1", 8, date, 300.0)?;
      assert_eq!(list(conn, "u-1", None)?.len(), 2);
      Ok(())
    })
    .unwrap();
  }
}
