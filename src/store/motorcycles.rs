use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::AppError;
use crate::models::{Motorcycle, MotorcycleInput};
use crate::store::{ensure_found, now, spare_parts};

fn map_row(row: &Row<'_>) -> rusqlite::Result<Motorcycle> {
  Ok(Motorcycle {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    name: row.get(2)?,
    model: row.get(3)?,
    year: row.get(4)?,
    created_at: row.get(5)?,
  })
}

pub fn insert(conn: &Connection, owner: &str, input: &MotorcycleInput) -> Result<Motorcycle, AppError> {
  let motorcycle = Motorcycle {
    id: 0,
    owner_id: owner.to_string(),
    name: input.name.trim().to_string(),
    model: input.model.trim().to_string(),
    year: input.year.trim().to_string(),
    created_at: Some(now()),
  };
  let id = insert_record(conn, &motorcycle)?;
  Ok(Motorcycle { id, ..motorcycle })
}

pub fn insert_record(conn: &Connection, motorcycle: &Motorcycle) -> Result<i64, AppError> {
  conn.execute(
    "INSERT INTO motorcycles (owner_id, name, model, year, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      motorcycle.owner_id,
      motorcycle.name,
      motorcycle.model,
      motorcycle.year,
      motorcycle.created_at
    ],
  )?;
  let id = conn.last_insert_rowid();
  debug!(id, "motorcycle inserted");
  Ok(id)
}

pub fn get(conn: &Connection, owner: &str, id: i64) -> Result<Option<Motorcycle>, AppError> {
  let motorcycle = conn
    .query_row(
      "SELECT id, owner_id, name, model, year, created_at FROM motorcycles WHERE id = ?1 AND owner_id = ?2",
      params![id, owner],
      map_row,
    )
    .optional()?;
  Ok(motorcycle)
}

pub fn list(conn: &Connection, owner: &str) -> Result<Vec<Motorcycle>, AppError> {
  let mut stmt = conn.prepare(
    "SELECT id, owner_id, name, model, year, created_at FROM motorcycles WHERE owner_id = ?1 ORDER BY name, id",
  )?;
  let rows = stmt.query_map(params![owner], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delete(conn: &mut Connection, owner: &str, id: i64) -> Result<usize, AppError> {
  let tx = conn.transaction()?;
  let changed = tx.execute("DELETE FROM motorcycles WHERE id = ?1 AND owner_id = ?2", params![id, owner])?;
  ensure_found(changed, "Motor")?;
  let parts = spare_parts::delete_for_motorcycle(&tx, owner, id)?;
  tx.commit()?;
  debug!(id, parts, "motorcycle deleted");
  Ok(parts)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db;
  use crate::models::SparePartInput;
  use chrono::NaiveDate;

  #[test]
  fn delete_cascades_to_spare_parts() {
    let db = db::open_in_memory().unwrap();
    db::with_conn(&db, |conn| {
      let input = MotorcycleInput {
        name: "Beat".into(),
        model: "Honda".into(),
        year: "2020".into(),
      };
      let keep = insert(conn, "u-1", &input)?;
      let gone = insert(conn, "u-1", &input)?;
      let date = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
      for motorcycle_id in [keep.id, gone.id, gone.id] {
        let part = SparePartInput {
          motorcycle_id,
          name: "Oli".into(),
          quantity: 1.0,
          unit_price: 45000.0,
          current_odometer: 1000.0,
          next_service_odometer: 3000.0,
          date: "2024-03-03".into(),
          note: None,
        };
        spare_parts::insert(conn, "u-1", &part, date)?;
      }

      assert_eq!(delete(conn, "u-1", gone.id)?, 2);
      assert!(get(conn, "u-1", gone.id)?.is_none());
      assert_eq!(spare_parts::list(conn, "u-1", None)?.len(), 1);
      assert_eq!(delete(conn, "u-1", gone.id).unwrap_err().code, "NOT_FOUND");
      Ok(())
    })
    .unwrap();
  }
}
