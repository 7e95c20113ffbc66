use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::domain::closing::ClosingSummary;
use crate::domain::period::{SubPeriod, YearMonth};
use crate::error::AppError;
use crate::models::ClosedPeriod;
use crate::store::now;

const COLUMNS: &str = "id, owner_id, year_month, sub_period, start_date, end_date, total_orders, qty_by_label, \
                       nominal_by_label, total_qty, total_nominal, created_at";

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
  rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_day(idx: usize, value: String) -> rusqlite::Result<NaiveDate> {
  NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|err| conversion_error(idx, err))
}

fn parse_labels(idx: usize, value: String) -> rusqlite::Result<BTreeMap<String, f64>> {
  serde_json::from_str(&value).map_err(|err| conversion_error(idx, err))
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ClosedPeriod> {
  let sub_period: String = row.get(3)?;
  Ok(ClosedPeriod {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    year_month: row.get(2)?,
    sub_period: sub_period.parse().map_err(|err| conversion_error(3, err))?,
    start_date: parse_day(4, row.get(4)?)?,
    end_date: parse_day(5, row.get(5)?)?,
    total_orders: row.get(6)?,
    qty_by_label: parse_labels(7, row.get(7)?)?,
    nominal_by_label: parse_labels(8, row.get(8)?)?,
    total_qty: row.get(9)?,
    total_nominal: row.get(10)?,
    created_at: row.get(11)?,
  })
}

/// Append only. Fails with a DB_ERROR on a second entry for the same (owner, month, sub-period).
pub fn append(
  conn: &Connection,
  owner: &str,
  month: YearMonth,
  sub: SubPeriod,
  bounds: (NaiveDate, NaiveDate),
  summary: &ClosingSummary,
) -> Result<ClosedPeriod, AppError> {
  let entry = ClosedPeriod {
    id: 0,
    owner_id: owner.to_string(),
    year_month: month.to_string(),
    sub_period: sub,
    start_date: bounds.0,
    end_date: bounds.1,
    total_orders: summary.total_orders,
    qty_by_label: summary.qty_by_label.clone(),
    nominal_by_label: summary.nominal_by_label.clone(),
    total_qty: summary.total_qty,
    total_nominal: summary.total_nominal,
    created_at: now(),
  };
  conn.execute(
    "INSERT INTO closed_periods (owner_id, year_month, sub_period, start_date, end_date, total_orders,
       qty_by_label, nominal_by_label, total_qty, total_nominal, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      entry.owner_id,
      entry.year_month,
      entry.sub_period.as_str(),
      entry.start_date.format("%Y-%m-%d").to_string(),
      entry.end_date.format("%Y-%m-%d").to_string(),
      entry.total_orders,
      serde_json::to_string(&entry.qty_by_label)?,
      serde_json::to_string(&entry.nominal_by_label)?,
      entry.total_qty,
      entry.total_nominal,
      entry.created_at
    ],
  )?;
  let id = conn.last_insert_rowid();
  debug!(id, month = %entry.year_month, sub = %sub, "ledger entry appended");
  Ok(ClosedPeriod { id, ..entry })
}

pub fn find(conn: &Connection, owner: &str, month: YearMonth, sub: SubPeriod) -> Result<Option<ClosedPeriod>, AppError> {
  let entry = conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM closed_periods WHERE owner_id = ?1 AND year_month = ?2 AND sub_period = ?3"),
      params![owner, month.to_string(), sub.as_str()],
      map_row,
    )
    .optional()?;
  Ok(entry)
}

pub fn get(conn: &Connection, owner: &str, id: i64) -> Result<Option<ClosedPeriod>, AppError> {
  let entry = conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM closed_periods WHERE id = ?1 AND owner_id = ?2"),
      params![id, owner],
      map_row,
    )
    .optional()?;
  Ok(entry)
}

pub fn list(conn: &Connection, owner: &str) -> Result<Vec<ClosedPeriod>, AppError> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COLUMNS} FROM closed_periods WHERE owner_id = ?1 ORDER BY start_date DESC, id DESC"
  ))?;
  let rows = stmt.query_map(params![owner], map_row)?;
  Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
