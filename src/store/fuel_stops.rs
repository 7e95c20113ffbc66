use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::domain::validation::location_or_default;
use crate::error::AppError;
use crate::models::{FuelStop, FuelStopInput};
use crate::store::{ensure_found, now};

fn map_row(row: &Row<'_>) -> rusqlite::Result<FuelStop> {
  Ok(FuelStop {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    motorcycle_id: row.get(2)?,
    date: row.get(3)?,
    liter_price: row.get(4)?,
    liters: row.get(5)?,
    total: row.get(6)?,
    location: row.get(7)?,
    created_at: row.get(8)?,
  })
}

pub fn insert(conn: &Connection, owner: &str, input: &FuelStopInput, date: NaiveDate) -> Result<FuelStop, AppError> {
  let stop = FuelStop {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id: input.motorcycle_id,
    date: Some(date.format("%Y-%m-%d").to_string()),
    liter_price: input.liter_price,
    liters: input.liters,
    total: input.total,
    location: location_or_default(input.location.as_deref()),
    created_at: Some(now()),
  };
  let id = insert_record(conn, &stop)?;
  Ok(FuelStop { id, ..stop })
}

pub fn insert_record(conn: &Connection, stop: &FuelStop) -> Result<i64, AppError> {
  conn.execute(
    "INSERT INTO fuel_stops (owner_id, motorcycle_id, date, liter_price, liters, total, location, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      stop.owner_id,
      stop.motorcycle_id,
      stop.date,
      stop.liter_price,
      stop.liters,
      stop.total,
      stop.location,
      stop.created_at
    ],
  )?;
  let id = conn.last_insert_rowid();
  debug!(id, "fuel stop inserted");
  Ok(id)
}

pub fn delete(conn: &Connection, owner: &str, id: i64) -> Result<(), AppError> {
  let changed = conn.execute("DELETE FROM fuel_stops WHERE id = ?1 AND owner_id = ?2", params![id, owner])?;
  ensure_found(changed, "Data BBM")?;
  debug!(id, "fuel stop deleted");
  Ok(())
}

pub fn list(conn: &Connection, owner: &str) -> Result<Vec<FuelStop>, AppError> {
  let mut stmt = conn.prepare(
    "SELECT id, owner_id, motorcycle_id, date, liter_price, liters, total, location, created_at
     FROM fuel_stops WHERE owner_id = ?1
     ORDER BY COALESCE(date, created_at) DESC, id DESC",
  )?;
  let rows = stmt.query_map(params![owner], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;

  #[test]
  fn missing_location_is_filled_in() {
    let db = db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      let input = FuelStopInput {
        motorcycle_id: None,
        date: "2024-03-03".into(),
        liter_price: 10000.0,
        liters: 2.0,
        total: 20000.0,
        location: None,
      };
      let stop = insert(conn, "u-1", &input, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())?;
      assert_eq!(stop.location, "Lokasi tidak disebutkan");
      assert_eq!(list(conn, "u-1")?, vec![stop]);
      Ok(())
    })
    .unwrap();
  }
}
