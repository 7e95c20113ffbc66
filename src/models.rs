use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::period::SubPeriod;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
  pub id: String,
  pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
  pub service_warning_km: f64,
  pub currency_prefix: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderLabel {
  #[default]
  Klik,
  Paket,
}

impl OrderLabel {
  pub const ALL: [OrderLabel; 2] = [OrderLabel::Klik, OrderLabel::Paket];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderLabel::Klik => "klik",
      OrderLabel::Paket => "paket",
    }
  }

  pub fn from_stored(value: Option<&str>) -> Result<Self, AppError> {
    match value.map(str::trim) {
      None | Some("") => Ok(OrderLabel::Klik),
      Some(other) => other.parse(),
    }
  }
}

impl fmt::Display for OrderLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderLabel {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_ascii_lowercase().as_str() {
      "klik" => Ok(OrderLabel::Klik),
      "paket" => Ok(OrderLabel::Paket),
      _ => Err(AppError::new("INVALID_LABEL", "Label harus klik atau paket")),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
  pub id: i64,
  pub owner_id: String,
  pub quantity: f64,
  pub unit_rate: f64,
  pub total: f64,
  pub date: Option<String>,
  pub note: String,
  pub label: OrderLabel,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderInput {
  pub quantity: f64,
  pub unit_rate: f64,
  pub date: String,
  pub note: Option<String>,
  pub label: Option<OrderLabel>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Motorcycle {
  pub id: i64,
  pub owner_id: String,
  pub name: String,
  pub model: String,
  pub year: String,
  pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MotorcycleInput {
  pub name: String,
  pub model: String,
  pub year: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SparePart {
  pub id: i64,
  pub owner_id: String,
  pub motorcycle_id: i64,
  pub name: String,
  pub quantity: f64,
  pub unit_price: f64,
  pub total: f64,
  pub current_odometer: f64,
  pub next_service_odometer: f64,
  pub date: Option<String>,
  pub note: String,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SparePartInput {
  pub motorcycle_id: i64,
  pub name: String,
  pub quantity: f64,
  pub unit_price: f64,
  pub current_odometer: f64,
  pub next_service_odometer: f64,
  pub date: String,
  pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FuelStop {
  pub id: i64,
  pub owner_id: String,
  pub motorcycle_id: Option<i64>,
  pub date: Option<String>,
  pub liter_price: f64,
  pub liters: f64,
  pub total: f64,
  pub location: String,
  pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FuelStopInput {
  pub motorcycle_id: Option<i64>,
  pub date: String,
  pub liter_price: f64,
  pub liters: f64,
  pub total: f64,
  pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OdometerReading {
  pub id: i64,
  pub owner_id: String,
  pub motorcycle_id: i64,
  pub date: Option<String>,
  pub odometer_km: f64,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OdometerInput {
  pub motorcycle_id: i64,
  pub date: String,
  pub odometer_km: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClosedPeriod {
  pub id: i64,
  pub owner_id: String,
  pub year_month: String,
  pub sub_period: SubPeriod,
  pub start_date: NaiveDate,
  /// Exclusive.
  pub end_date: NaiveDate,
  pub total_orders: i64,
  pub qty_by_label: BTreeMap<String, f64>,
  pub nominal_by_label: BTreeMap<String, f64>,
  pub total_qty: f64,
  pub total_nominal: f64,
  pub created_at: String,
}

impl ClosedPeriod {
  pub fn covers(&self, date: NaiveDate) -> bool {
    date >= self.start_date && date < self.end_date
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CloseOutcome {
  Closed { entry: ClosedPeriod },
  NothingToClose { start_date: NaiveDate, end_date: NaiveDate },
  AlreadyClosed { entry: ClosedPeriod },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendPoint {
  pub month_key: String,
  pub month: String,
  pub income: f64,
  pub expenses: f64,
  pub profit: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DashboardReport {
  pub total_income: f64,
  pub total_expenses: f64,
  pub total_fuel_costs: f64,
  pub total_sparepart_costs: f64,
  pub net_profit: f64,
  pub total_distance: f64,
  pub total_orders: usize,
  pub total_fuel_stops: usize,
  pub avg_fuel_price: f64,
  pub working_days_in_period: u32,
  pub elapsed_working_days: u32,
  pub monthly_trends: Vec<TrendPoint>,
  pub net_income_per_month: BTreeMap<String, f64>,
  pub net_income_per_period: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceStatus {
  Ok { remaining_km: f64 },
  DueSoon { remaining_km: f64 },
  Overdue { exceeded_km: f64 },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceReminder {
  pub spare_part_id: i64,
  pub name: String,
  pub current_odometer: f64,
  pub next_service_odometer: f64,
  pub status: ServiceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub id: i64,
  pub ts: String,
  pub owner_id: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub payload_json: String,
  pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
  #[default]
  Full,
  Orders,
  Spareparts,
  Fuel,
  Motorcycles,
}

impl ExportKind {
  pub fn includes_orders(&self) -> bool {
    matches!(self, ExportKind::Full | ExportKind::Orders)
  }

  pub fn includes_spare_parts(&self) -> bool {
    matches!(self, ExportKind::Full | ExportKind::Spareparts)
  }

  pub fn includes_fuel_stops(&self) -> bool {
    matches!(self, ExportKind::Full | ExportKind::Fuel)
  }

  pub fn includes_motorcycles(&self) -> bool {
    matches!(self, ExportKind::Full | ExportKind::Motorcycles)
  }

  pub fn includes_odometer(&self) -> bool {
    matches!(self, ExportKind::Full)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
  #[default]
  Atomic,
  BestEffort,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BulkFailure {
  pub kind: String,
  pub source_id: String,
  pub error: AppError,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BulkResult {
  pub succeeded: Vec<String>,
  pub failed: Vec<BulkFailure>,
  pub first_error: Option<AppError>,
}

impl BulkResult {
  pub fn push_ok(&mut self, source_id: String) {
    self.succeeded.push(source_id);
  }

  pub fn push_failed(&mut self, kind: &str, source_id: String, error: AppError) {
    if self.first_error.is_none() {
      self.first_error = Some(error.clone());
    }
    self.failed.push(BulkFailure {
      kind: kind.to_string(),
      source_id,
      error,
    });
  }

  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}
