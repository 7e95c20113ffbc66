use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::dates::Dated;
use crate::domain::period::{elapsed_working_days, trailing_months, working_days_between, PeriodFilter, YearMonth};
use crate::error::AppError;
use crate::models::{DashboardReport, FuelStop, OdometerReading, Order, SparePart, TrendPoint};
use crate::store;

const TREND_MONTHS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AggregationRequest {
  pub motorcycle_id: Option<i64>,
  pub month: Option<YearMonth>,
  pub period: PeriodFilter,
}

impl AggregationRequest {
  /// Month + sub-period test on a resolved date. The sub-period is a day-of-month test even without a month.
  fn matches_date(&self, date: NaiveDate) -> bool {
    if let Some(month) = self.month {
      if !month.contains(date) {
        return false;
      }
    }
    self.period.matches_day(date.day())
  }

  fn matches_motorcycle(&self, motorcycle_id: Option<i64>) -> bool {
    match self.motorcycle_id {
      None => true,
      Some(wanted) => motorcycle_id == Some(wanted),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub orders: Vec<Order>,
  pub spare_parts: Vec<SparePart>,
  pub fuel_stops: Vec<FuelStop>,
  pub odometer: Vec<OdometerReading>,
}

pub fn load_snapshot(conn: &Connection, owner: &str) -> Result<Snapshot, AppError> {
  Ok(Snapshot {
    orders: store::orders::list(conn, owner)?,
    spare_parts: store::spare_parts::list(conn, owner, None)?,
    fuel_stops: store::fuel_stops::list(conn, owner)?,
    odometer: store::odometer::list(conn, owner, None)?,
  })
}

pub fn build_dashboard(snapshot: &Snapshot, request: &AggregationRequest, today: NaiveDate) -> DashboardReport {
  let orders: Vec<&Order> = snapshot
    .orders
    .iter()
    .filter(|o| request.matches_date(o.resolved_date(today)))
    .collect();
  let parts: Vec<&SparePart> = snapshot
    .spare_parts
    .iter()
    .filter(|p| request.matches_motorcycle(Some(p.motorcycle_id)) && request.matches_date(p.resolved_date(today)))
    .collect();
  let fuel: Vec<&FuelStop> = snapshot
    .fuel_stops
    .iter()
    .filter(|f| request.matches_motorcycle(f.motorcycle_id) && request.matches_date(f.resolved_date(today)))
    .collect();
  let readings: Vec<&OdometerReading> = snapshot
    .odometer
    .iter()
    .filter(|r| request.matches_motorcycle(Some(r.motorcycle_id)) && request.matches_date(r.resolved_date(today)))
    .collect();

  let total_income: f64 = orders.iter().map(|o| o.total).sum();
  let total_sparepart_costs: f64 = parts.iter().map(|p| p.total).sum();
  let total_fuel_costs: f64 = fuel.iter().map(|f| f.total).sum();
  let total_expenses = total_sparepart_costs + total_fuel_costs;
  let net_profit = total_income - total_expenses;

  let window_month = request.month.unwrap_or_else(|| YearMonth::of(today));
  let (start, end) = request.period.window(window_month);

  let mut net_income_per_period = BTreeMap::new();
  net_income_per_period.insert(format!("{}-{}", YearMonth::of(today), request.period), net_profit);

  DashboardReport {
    total_income,
    total_expenses,
    total_fuel_costs,
    total_sparepart_costs,
    net_profit,
    total_distance: total_distance(&readings, today),
    total_orders: orders.len(),
    total_fuel_stops: fuel.len(),
    avg_fuel_price: average_fuel_price(&fuel),
    working_days_in_period: working_days_between(start, end),
    elapsed_working_days: elapsed_working_days(start, end, today),
    monthly_trends: monthly_trends(snapshot, today),
    net_income_per_month: net_income_per_month(snapshot, today),
    net_income_per_period,
  }
}

/// Per motorcycle, in date order, summing only forward deltas. Of several readings on one day the
/// most recently created counts.
pub fn total_distance(readings: &[&OdometerReading], today: NaiveDate) -> f64 {
  let mut by_motorcycle: BTreeMap<i64, Vec<&OdometerReading>> = BTreeMap::new();
  for reading in readings {
    by_motorcycle.entry(reading.motorcycle_id).or_default().push(reading);
  }

  by_motorcycle
    .into_values()
    .map(|mut series| {
      series.sort_by(|a, b| {
        (a.resolved_date(today), a.created_at.as_deref(), a.id).cmp(&(
          b.resolved_date(today),
          b.created_at.as_deref(),
          b.id,
        ))
      });
      series.reverse();
      series.dedup_by_key(|reading| reading.resolved_date(today));
      series.reverse();
      series
        .windows(2)
        .map(|pair| (pair[1].odometer_km - pair[0].odometer_km).max(0.0))
        .sum::<f64>()
    })
    .sum()
}

pub fn average_fuel_price(stops: &[&FuelStop]) -> f64 {
  if stops.is_empty() {
    return 0.0;
  }
  stops.iter().map(|s| s.liter_price).sum::<f64>() / stops.len() as f64
}

#[derive(Default)]
struct MonthTotals {
  income: f64,
  expenses: f64,
}

fn totals_by_month(snapshot: &Snapshot, today: NaiveDate) -> BTreeMap<YearMonth, MonthTotals> {
  let mut months: BTreeMap<YearMonth, MonthTotals> = BTreeMap::new();
  for order in &snapshot.orders {
    months.entry(YearMonth::of(order.resolved_date(today))).or_default().income += order.total;
  }
  for part in &snapshot.spare_parts {
    months.entry(YearMonth::of(part.resolved_date(today))).or_default().expenses += part.total;
  }
  for stop in &snapshot.fuel_stops {
    months.entry(YearMonth::of(stop.resolved_date(today))).or_default().expenses += stop.total;
  }
  months
}

pub fn monthly_trends(snapshot: &Snapshot, today: NaiveDate) -> Vec<TrendPoint> {
  let totals = totals_by_month(snapshot, today);
  trailing_months(YearMonth::of(today), TREND_MONTHS)
    .into_iter()
    .map(|month| {
      let (income, expenses) = totals
        .get(&month)
        .map(|t| (t.income, t.expenses))
        .unwrap_or((0.0, 0.0));
      TrendPoint {
        month_key: month.to_string(),
        month: month.short_label(),
        income,
        expenses,
        profit: income - expenses,
      }
    })
    .collect()
}

pub fn net_income_per_month(snapshot: &Snapshot, today: NaiveDate) -> BTreeMap<String, f64> {
  totals_by_month(snapshot, today)
    .into_iter()
    .map(|(month, t)| (month.to_string(), t.income - t.expenses))
    .collect()
}

type CacheKey = (String, AggregationRequest, NaiveDate);

#[derive(Default)]
pub struct ReportCache {
  entries: Mutex<HashMap<CacheKey, DashboardReport>>,
}

impl ReportCache {
  pub fn get_or_build(
    &self,
    owner: &str,
    request: &AggregationRequest,
    today: NaiveDate,
    build: impl FnOnce() -> Result<DashboardReport, AppError>,
  ) -> Result<DashboardReport, AppError> {
    let key = (owner.to_string(), *request, today);
    if let Some(report) = self.entries.lock()?.get(&key) {
      debug!(owner, "dashboard served from cache");
      return Ok(report.clone());
    }
    let report = build()?;
    let mut entries = self.entries.lock()?;
    entries.retain(|(_, _, day), _| *day == today);
    entries.insert(key, report.clone());
    Ok(report)
  }

  pub fn invalidate(&self, owner: &str) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.retain(|(cached_owner, _, _), _| cached_owner != owner);
    }
  }

  pub fn len(&self) -> usize {
    self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::period::SubPeriod;
  use crate::models::OrderLabel;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn order(date: &str, total: f64) -> Order {
    Order {
      id: 0,
      owner_id: "u-1".into(),
      quantity: 1.0,
      unit_rate: total,
      total,
      date: Some(date.into()),
      note: String::new(),
      label: OrderLabel::Klik,
      created_at: None,
      updated_at: None,
    }
  }

  fn fuel(motorcycle_id: Option<i64>, date: &str, price: f64) -> FuelStop {
    FuelStop {
      id: 0,
      owner_id: "u-1".into(),
      motorcycle_id,
      date: Some(date.into()),
      liter_price: price,
      liters: 1.0,
      total: price,
      location: String::new(),
      created_at: None,
    }
  }

  fn reading(id: i64, motorcycle_id: i64, date: &str, km: f64) -> OdometerReading {
    OdometerReading {
      id,
      owner_id: "u-1".into(),
      motorcycle_id,
      date: Some(date.into()),
      odometer_km: km,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn out_of_order_reading_is_clamped() {
    let today = day(2024, 2, 1);
    let readings = vec![
      reading(1, 1, "2024-01-01", 1000.0),
      reading(2, 1, "2024-01-05", 1200.0),
      reading(3, 1, "2024-01-03", 900.0),
    ];
    let refs: Vec<&OdometerReading> = readings.iter().collect();
    assert_eq!(total_distance(&refs, today), 300.0);
  }

  #[test]
  fn latest_reading_of_a_day_counts() {
    let today = day(2024, 2, 1);
    let undated = |id: i64, created_at: &str, km: f64| OdometerReading {
      date: None,
      created_at: Some(created_at.into()),
      ..reading(id, 1, "", km)
    };
    let readings = vec![
      reading(1, 1, "2024-01-01", 1000.0),
      undated(2, "2024-01-02T09:00:00Z", 1200.0),
      undated(3, "2024-01-02T08:00:00Z", 1500.0),
      reading(4, 1, "2024-01-03", 1300.0),
    ];
    let refs: Vec<&OdometerReading> = readings.iter().collect();
    assert_eq!(total_distance(&refs, today), 300.0);
  }

  #[test]
  fn distance_never_mixes_motorcycles() {
    let today = day(2024, 2, 1);
    let readings = vec![
      reading(1, 1, "2024-01-01", 1000.0),
      reading(2, 2, "2024-01-02", 50.0),
      reading(3, 1, "2024-01-03", 1100.0),
      reading(4, 2, "2024-01-04", 80.0),
    ];
    let refs: Vec<&OdometerReading> = readings.iter().collect();
    assert_eq!(total_distance(&refs, today), 130.0);
  }

  #[test]
  fn average_fuel_price_uses_liter_price() {
    let stops = vec![fuel(None, "2024-03-01", 10000.0), fuel(None, "2024-03-02", 12000.0)];
    let refs: Vec<&FuelStop> = stops.iter().collect();
    assert_eq!(average_fuel_price(&refs), 11000.0);
    assert_eq!(average_fuel_price(&[]), 0.0);
  }

  #[test]
  fn motorcycle_filter_does_not_touch_income() {
    let today = day(2024, 3, 20);
    let snapshot = Snapshot {
      orders: vec![order("2024-03-03", 5000.0), order("2024-03-18", 7000.0)],
      fuel_stops: vec![
        fuel(Some(1), "2024-03-04", 10000.0),
        fuel(Some(2), "2024-03-05", 12000.0),
        fuel(None, "2024-03-06", 11000.0),
      ],
      ..Snapshot::default()
    };
    let request = AggregationRequest {
      motorcycle_id: Some(1),
      month: Some(YearMonth::new(2024, 3).unwrap()),
      period: PeriodFilter::Sub(SubPeriod::FirstHalf),
    };
    let report = build_dashboard(&snapshot, &request, today);

    assert_eq!(report.total_income, 5000.0);
    assert_eq!(report.total_orders, 1);
    assert_eq!(report.total_fuel_costs, 10000.0);
    assert_eq!(report.total_fuel_stops, 1);
    assert_eq!(report.net_profit, -5000.0);
    assert_eq!(report.working_days_in_period, 11);
    assert_eq!(report.elapsed_working_days, 11);
    assert_eq!(report.net_income_per_period["2024-03-1-15"], -5000.0);

    let all = build_dashboard(&snapshot, &AggregationRequest::default(), today);
    assert_eq!(all.total_fuel_stops, 3);
    assert_eq!(all.total_income, 12000.0);
  }

  #[test]
  fn sub_period_applies_without_month() {
    let today = day(2024, 3, 20);
    let snapshot = Snapshot {
      orders: vec![order("2024-01-03", 1.0), order("2024-02-20", 2.0), order("2024-03-10", 4.0)],
      ..Snapshot::default()
    };
    let request = AggregationRequest {
      period: PeriodFilter::Sub(SubPeriod::FirstHalf),
      ..AggregationRequest::default()
    };
    assert_eq!(build_dashboard(&snapshot, &request, today).total_income, 5.0);
  }

  #[test]
  fn trends_and_net_income_ignore_filters() {
    let today = day(2024, 3, 20);
    let snapshot = Snapshot {
      orders: vec![order("2023-08-01", 100.0), order("2024-01-10", 500.0), order("2024-03-02", 300.0)],
      fuel_stops: vec![fuel(Some(2), "2024-03-05", 120.0)],
      ..Snapshot::default()
    };
    let request = AggregationRequest {
      motorcycle_id: Some(1),
      month: Some(YearMonth::new(2024, 1).unwrap()),
      period: PeriodFilter::Sub(SubPeriod::SecondHalf),
    };
    let report = build_dashboard(&snapshot, &request, today);

    let labels: Vec<&str> = report.monthly_trends.iter().map(|t| t.month.as_str()).collect();
    assert_eq!(labels, ["Okt 2023", "Nov 2023", "Des 2023", "Jan 2024", "Feb 2024", "Mar 2024"]);
    assert_eq!(report.monthly_trends[5].income, 300.0);
    assert_eq!(report.monthly_trends[5].expenses, 120.0);
    assert_eq!(report.monthly_trends[5].profit, 180.0);

    assert_eq!(report.net_income_per_month.len(), 3);
    assert_eq!(report.net_income_per_month["2023-08"], 100.0);
    assert_eq!(report.net_income_per_month["2024-03"], 180.0);
    assert_eq!(report.total_income, 0.0);
  }

  #[test]
  fn cache_is_dropped_per_owner() {
    let cache = ReportCache::default();
    let today = day(2024, 3, 20);
    let request = AggregationRequest::default();
    let empty = build_dashboard(&Snapshot::default(), &request, today);

    cache.get_or_build("u-1", &request, today, || Ok(empty.clone())).unwrap();
    cache.get_or_build("u-2", &request, today, || Ok(empty.clone())).unwrap();
    let hit = cache
      .get_or_build("u-1", &request, today, || Err(AppError::new("DB_ERROR", "not expected")))
      .unwrap();
    assert_eq!(hit, empty);

    cache.invalidate("u-1");
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn cache_forgets_previous_days() {
    let cache = ReportCache::default();
    let request = AggregationRequest::default();
    let yesterday = day(2024, 3, 19);
    let today = day(2024, 3, 20);

    cache
      .get_or_build("u-1", &request, yesterday, || Ok(build_dashboard(&Snapshot::default(), &request, yesterday)))
      .unwrap();
    cache
      .get_or_build("u-2", &request, yesterday, || Ok(build_dashboard(&Snapshot::default(), &request, yesterday)))
      .unwrap();
    assert_eq!(cache.len(), 2);

    cache
      .get_or_build("u-1", &request, today, || Ok(build_dashboard(&Snapshot::default(), &request, today)))
      .unwrap();
    assert_eq!(cache.len(), 1);
  }
}
