use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{dates, validation};
use crate::error::AppError;
use crate::models::{
  BulkResult, ExportKind, FuelStop, Motorcycle, OdometerReading, Order, OrderLabel, RestoreMode, SparePart, User,
};
use crate::store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocTimestamp {
  Text(String),
  Epoch {
    seconds: i64,
    #[serde(default)]
    nanoseconds: u32,
  },
}

impl DocTimestamp {
  pub fn to_rfc3339(&self) -> Option<String> {
    match self {
      DocTimestamp::Text(text) if text.trim().is_empty() => None,
      DocTimestamp::Text(text) => Some(text.trim().to_string()),
      DocTimestamp::Epoch { seconds, nanoseconds } => {
        DateTime::<Utc>::from_timestamp(*seconds, *nanoseconds).map(|ts| ts.to_rfc3339())
      }
    }
  }
}

// Unreadable values become NaN so record validation rejects them instead of storing 0.
fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(Value::Null) => None,
    Some(Value::Number(n)) => Some(n.as_f64().unwrap_or(f64::NAN)),
    Some(Value::String(s)) if s.trim().is_empty() => None,
    Some(Value::String(s)) => Some(s.trim().parse().unwrap_or(f64::NAN)),
    Some(_) => Some(f64::NAN),
  })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::String(s)) => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub qty: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub tarif: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub total: Option<f64>,
  #[serde(default, alias = "date")]
  pub tanggal: Option<String>,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default)]
  pub label_type: Option<String>,
  #[serde(default)]
  pub created_at: Option<DocTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparePartDoc {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient_text")]
  pub motorcycle_id: Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub quantity: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub price: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub total: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub current_km: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub next_km: Option<f64>,
  #[serde(default, alias = "tanggal")]
  pub date: Option<String>,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default)]
  pub created_at: Option<DocTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelStopDoc {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient_text")]
  pub motorcycle_id: Option<String>,
  #[serde(default, alias = "tanggal")]
  pub date: Option<String>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub price: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub liters: Option<f64>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub total: Option<f64>,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub created_at: Option<DocTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorcycleDoc {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub model: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub year: Option<String>,
  #[serde(default)]
  pub created_at: Option<DocTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmDoc {
  #[serde(default, deserialize_with = "lenient_text")]
  pub id: Option<String>,
  #[serde(default, deserialize_with = "lenient_text")]
  pub motorcycle_id: Option<String>,
  #[serde(default, alias = "tanggal")]
  pub date: Option<String>,
  #[serde(default, deserialize_with = "lenient_opt_f64")]
  pub km: Option<f64>,
  #[serde(default)]
  pub created_at: Option<DocTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
  pub created_at: Option<DocTimestamp>,
  #[serde(default)]
  pub user_id: String,
  #[serde(default)]
  pub user_email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub export_type: Option<ExportKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
  #[serde(default)]
  pub orders: Vec<OrderDoc>,
  #[serde(default)]
  pub spareparts: Vec<SparePartDoc>,
  #[serde(default)]
  pub fuel_stops: Vec<FuelStopDoc>,
  #[serde(default)]
  pub motorcycles: Vec<MotorcycleDoc>,
  #[serde(default)]
  pub daily_km_history: Vec<KmDoc>,
  pub metadata: BackupMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreProgress {
  pub kind: &'static str,
  pub done: usize,
  pub total: usize,
}

pub fn build_document(conn: &Connection, user: &User, kind: ExportKind) -> Result<BackupDocument, AppError> {
  let owner = user.id.as_str();
  let mut doc = BackupDocument {
    orders: Vec::new(),
    spareparts: Vec::new(),
    fuel_stops: Vec::new(),
    motorcycles: Vec::new(),
    daily_km_history: Vec::new(),
    metadata: BackupMetadata {
      created_at: Some(DocTimestamp::Text(Utc::now().to_rfc3339())),
      user_id: user.id.clone(),
      user_email: user.email.clone(),
      export_type: match kind {
        ExportKind::Full => None,
        other => Some(other),
      },
    },
  };

  if kind.includes_orders() {
    doc.orders = store::orders::list(conn, owner)?.into_iter().map(order_doc).collect();
  }
  if kind.includes_spare_parts() {
    doc.spareparts = store::spare_parts::list(conn, owner, None)?
      .into_iter()
      .map(spare_part_doc)
      .collect();
  }
  if kind.includes_fuel_stops() {
    doc.fuel_stops = store::fuel_stops::list(conn, owner)?.into_iter().map(fuel_stop_doc).collect();
  }
  if kind.includes_motorcycles() {
    let total = doc.motorcycles.len();
    for (idx, item) in doc.motorcycles.iter().enumerate() {
      let outcome = motorcycle_from_doc(owner, item)
        .and_then(|motorcycle| store::motorcycles::insert_record(conn, &motorcycle))
        .map(|new_id| {
          if let Some(old) = &item.id {
            motorcycle_ids.insert(old.clone(), new_id);
          }
        });
      record("motorcycles", idx + 1, total, source_id(&item.id, idx), outcome, result)?;
    }
  }

  if kind.includes_orders() {
    let total = doc.orders.len();
    for (idx, item) in doc.orders.iter().enumerate() {
      let outcome = order_from_doc(owner, item).and_then(|order| store::orders::insert_record(conn, &order).map(|_| ()));
      record("orders", idx + 1, total, source_id(&item.id, idx), outcome, result)?;
    }
  }

  if kind.includes_spare_parts() {
    let total = doc.spareparts.len();
    for (idx, item) in doc.spareparts.iter().enumerate() {
      let outcome = remap_motorcycle(conn, owner, &motorcycle_ids, item.motorcycle_id.as_deref())
        .and_then(|motorcycle_id| motorcycle_id.ok_or_else(|| missing_motorcycle("sparepart")))
        .and_then(|motorcycle_id| spare_part_from_doc(owner, motorcycle_id, item))
        .and_then(|part| store::spare_parts::insert_record(conn, &part).map(|_| ()));
      record("spareparts", idx + 1, total, source_id(&item.id, idx), outcome, result)?;
    }
  }

  if kind.includes_fuel_stops() {
    let total = doc.fuel_stops.len();
    for (idx, item) in doc.fuel_stops.iter().enumerate() {
      let outcome = remap_motorcycle(conn, owner, &motorcycle_ids, item.motorcycle_id.as_deref())
        .and_then(|motorcycle_id| fuel_stop_from_doc(owner, motorcycle_id, item))
        .and_then(|stop| store::fuel_stops::insert_record(conn, &stop))
        .map(|_| ());
      record("fuelStops", idx + 1, total, source_id(&item.id, idx), outcome, result)?;
    }
  }

  if kind.includes_odometer() {
    // Same-day readings upsert onto one row; the latest createdAt is written last and wins.
    let mut readings: Vec<(usize, &KmDoc, Option<NaiveDate>, Option<String>)> = doc
      .daily_km_history
      .iter()
      .enumerate()
      .map(|(idx, item)| {
        let created_at = timestamp(&item.created_at);
        (idx, item, reading_day(item.date.as_deref(), created_at.as_deref()), created_at)
      })
      .collect();
    readings.sort_by(|a, b| (a.2, &a.3).cmp(&(b.2, &b.3)));

    let total = readings.len();
    for (done, (idx, item, day, _)) in readings.into_iter().enumerate() {
      let outcome = remap_motorcycle(conn, owner, &motorcycle_ids, item.motorcycle_id.as_deref())
        .and_then(|motorcycle_id| motorcycle_id.ok_or_else(|| missing_motorcycle("riwayat KM")))
        .and_then(|motorcycle_id| reading_from_doc(owner, motorcycle_id, day, item))
        .and_then(|reading| store::odometer::upsert_record(conn, &reading))
        .map(|_| ());
      record("dailyKmHistory", done + 1, total, source_id(&item.id, idx), outcome, result)?;
    }
  }

  Ok(())
}

fn source_id(id: &Option<String>, idx: usize) -> String {
  id.clone().unwrap_or_else(|| format!("#{}", idx + 1))
}

fn missing_motorcycle(what: &str) -> AppError {
  AppError::new("BACKUP_INVALID", format!("Motor untuk {what} tidak ditemukan"))
}

fn remap_motorcycle(
  conn: &Connection,
  owner: &str,
  restored: &HashMap<String, i64>,
  source: Option<&str>,
) -> Result<Option<i64>, AppError> {
  let Some(source) = source.map(str::trim).filter(|value| !value.is_empty()) else {
    return Ok(None);
  };
  if let Some(id) = restored.get(source) {
    return Ok(Some(*id));
  }
  if let Ok(id) = source.parse::<i64>() {
    if store::motorcycles::get(conn, owner, id)?.is_some() {
      return Ok(Some(id));
    }
  }
  Err(missing_motorcycle("data"))
}

fn timestamp(value: &Option<DocTimestamp>) -> Option<String> {
  value.as_ref().and_then(DocTimestamp::to_rfc3339)
}

fn day_text(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .map(str::to_string)
}

fn required(value: Option<f64>, code: &str, field: &str) -> Result<f64, AppError> {
  value.ok_or_else(|| AppError::new(code, format!("{field} wajib diisi")))
}

fn order_from_doc(owner: &str, doc: &OrderDoc) -> Result<Order, AppError> {
  let quantity = required(doc.qty, "INVALID_QTY", "Jumlah")?;
  let unit_rate = required(doc.tarif, "INVALID_RATE", "Tarif")?;
  validation::ensure_quantity_positive(quantity)?;
  validation::ensure_rate(unit_rate)?;
  Ok(Order {
    id: 0,
    owner_id: owner.to_string(),
    quantity,
    unit_rate,
    total: quantity * unit_rate,
    date: day_text(&doc.tanggal),
    note: doc.note.clone().unwrap_or_default(),
    label: OrderLabel::from_stored(doc.label_type.as_deref())?,
    created_at: timestamp(&doc.created_at),
    updated_at: None,
  })
}

fn spare_part_from_doc(owner: &str, motorcycle_id: i64, doc: &SparePartDoc) -> Result<SparePart, AppError> {
  validation::ensure_required(&doc.name, "Nama sparepart")?;
  let quantity = required(doc.quantity, "INVALID_QTY", "Jumlah")?;
  let unit_price = required(doc.price, "INVALID_PRICE", "Harga")?;
  let current_odometer = doc.current_km.unwrap_or(0.0);
  let next_service_odometer = doc.next_km.unwrap_or(0.0);
  validation::ensure_quantity_positive(quantity)?;
  validation::ensure_unit_price(unit_price)?;
  validation::ensure_service_odometers(current_odometer, next_service_odometer)?;
  Ok(SparePart {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id,
    name: doc.name.clone(),
    quantity,
    unit_price,
    total: quantity * unit_price,
    current_odometer,
    next_service_odometer,
    date: day_text(&doc.date),
    note: doc.note.clone().unwrap_or_default(),
    created_at: timestamp(&doc.created_at),
    updated_at: None,
  })
}

fn fuel_stop_from_doc(owner: &str, motorcycle_id: Option<i64>, doc: &FuelStopDoc) -> Result<FuelStop, AppError> {
  let liter_price = required(doc.price, "INVALID_PRICE", "Harga per liter")?;
  let liters = required(doc.liters, "INVALID_QTY", "Jumlah liter")?;
  let total = doc.total.unwrap_or(liter_price * liters);
  validation::ensure_fuel_amounts(liter_price, liters, total)?;
  Ok(FuelStop {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id,
    date: day_text(&doc.date),
    liter_price,
    liters,
    total,
    location: validation::location_or_default(doc.location.as_deref()),
    created_at: timestamp(&doc.created_at),
  })
}

fn motorcycle_from_doc(owner: &str, doc: &MotorcycleDoc) -> Result<Motorcycle, AppError> {
  validation::ensure_required(&doc.name, "Nama motor")?;
  Ok(Motorcycle {
    id: 0,
    owner_id: owner.to_string(),
    name: doc.name.clone(),
    model: doc.model.clone(),
    year: doc.year.clone().unwrap_or_default(),
    created_at: timestamp(&doc.created_at),
  })
}

fn reading_day(date: Option<&str>, created_at: Option<&str>) -> Option<NaiveDate> {
  date
    .and_then(dates::parse_day)
    .or_else(|| created_at.and_then(dates::parse_timestamp))
}

fn reading_from_doc(
  owner: &str,
  motorcycle_id: i64,
  day: Option<NaiveDate>,
  doc: &KmDoc,
) -> Result<OdometerReading, AppError> {
  let odometer_km = required(doc.km, "INVALID_ODOMETER", "KM")?;
  validation::ensure_odometer(odometer_km)?;
  let created_at = timestamp(&doc.created_at);
  Ok(OdometerReading {
    id: 0,
    owner_id: owner.to_string(),
    motorcycle_id,
    date: day.map(|day| day.format("%Y-%m-%d").to_string()).or_else(|| day_text(&doc.date)),
    odometer_km,
    updated_at: created_at.clone(),
    created_at,
  })
}

fn text_ts(value: Option<String>) -> Option<DocTimestamp> {
  value.map(DocTimestamp::Text)
}

fn order_doc(order: Order) -> OrderDoc {
  OrderDoc {
    id: Some(order.id.to_string()),
    qty: Some(order.quantity),
    tarif: Some(order.unit_rate),
    total: Some(order.total),
    tanggal: order.date,
    note: Some(order.note),
    label_type: Some(order.label.as_str().to_string()),
    created_at: text_ts(order.created_at),
  }
}

fn spare_part_doc(part: SparePart) -> SparePartDoc {
  SparePartDoc {
    id: Some(part.id.to_string()),
    motorcycle_id: Some(part.motorcycle_id.to_string()),
    name: part.name,
    quantity: Some(part.quantity),
    price: Some(part.unit_price),
    total: Some(part.total),
    current_km: Some(part.current_odometer),
    next_km: Some(part.next_service_odometer),
    date: part.date,
    note: Some(part.note),
    created_at: text_ts(part.created_at),
  }
}

fn fuel_stop_doc(stop: FuelStop) -> FuelStopDoc {
  FuelStopDoc {
    id: Some(stop.id.to_string()),
    motorcycle_id: stop.motorcycle_id.map(|id| id.to_string()),
    date: stop.date,
    price: Some(stop.liter_price),
    liters: Some(stop.liters),
    total: Some(stop.total),
    location: Some(stop.location),
    created_at: text_ts(stop.created_at),
  }
}

fn motorcycle_doc(motorcycle: Motorcycle) -> MotorcycleDoc {
  MotorcycleDoc {
    id: Some(motorcycle.id.to_string()),
    name: motorcycle.name,
    model: motorcycle.model,
    year: Some(motorcycle.year),
    created_at: text_ts(motorcycle.created_at),
  }
}

fn km_doc(reading: OdometerReading) -> KmDoc {
  KmDoc {
    id: Some(reading.id.to_string()),
    motorcycle_id: Some(reading.motorcycle_id.to_string()),
    date: reading.date,
    km: Some(reading.odometer_km),
    created_at: text_ts(reading.created_at),
  }
}

pub fn created_on(doc: &BackupDocument) -> Option<NaiveDate> {
  timestamp(&doc.metadata.created_at).and_then(|ts| dates::parse_timestamp(&ts))
}
