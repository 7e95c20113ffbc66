use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::audit::log as audit;
use crate::db;
use crate::domain::closing;
use crate::domain::dates::Dated;
use crate::domain::period::{closing_bounds, PeriodFilter, SubPeriod, YearMonth};
use crate::domain::service;
use crate::domain::validation;
use crate::error::AppError;
use crate::export::{csv, excel, text};
use crate::files::backup::{self, RestoreProgress};
use crate::models::*;
use crate::reports::{self, AggregationRequest};
use crate::settings;
use crate::store;
use crate::AppState;

fn today() -> NaiveDate {
  Local::now().date_naive()
}

fn with_user<T>(state: &AppState, f: impl FnOnce(&mut Connection, &User) -> Result<T, AppError>) -> Result<T, AppError> {
  db::with_conn(&state.db, |conn| {
    let user = settings::require_user(conn)?;
    f(conn, &user)
  })
}

fn mutate<T>(state: &AppState, f: impl FnOnce(&mut Connection, &User) -> Result<T, AppError>) -> Result<T, AppError> {
  let (owner, value) = with_user(state, |conn, user| Ok((user.id.clone(), f(conn, user)?)))?;
  state.reports.invalidate(&owner);
  Ok(value)
}

fn ensure_motorcycle(conn: &Connection, owner: &str, id: i64) -> Result<Motorcycle, AppError> {
  store::motorcycles::get(conn, owner, id)?.ok_or_else(|| AppError::not_found("Motor"))
}

pub fn login(state: &AppState, user: User) -> Result<User, AppError> {
  db::with_conn(&state.db, |conn| {
    settings::login(conn, &user)?;
    audit::record(conn, &user.id, "LOGIN", "SESSION", None, &user.email);
    Ok(())
  })?;
  info!(user = %user.id, "logged in");
  Ok(user)
}

pub fn logout(state: &AppState) -> Result<(), AppError> {
  db::with_conn(&state.db, |conn| {
    if let Some(user) = settings::current_user(conn)? {
      audit::record(conn, &user.id, "LOGOUT", "SESSION", None, &user.email);
      state.reports.invalidate(&user.id);
    }
    settings::logout(conn)
  })
}

pub fn current_user(state: &AppState) -> Result<Option<User>, AppError> {
  db::with_conn(&state.db, |conn| settings::current_user(conn))
}

pub fn get_settings(state: &AppState) -> Result<Settings, AppError> {
  db::with_conn(&state.db, |conn| settings::get_settings(conn))
}

pub fn update_settings(state: &AppState, input: Settings) -> Result<Settings, AppError> {
  mutate(state, |conn, user| {
    settings::update_settings(conn, &input)?;
    audit::record(conn, &user.id, "UPDATE_SETTINGS", "SETTINGS", None, &input);
    Ok(input)
  })
}

pub fn create_motorcycle(state: &AppState, input: MotorcycleInput) -> Result<Motorcycle, AppError> {
  validation::validate_motorcycle(&input)?;
  mutate(state, |conn, user| {
    let motorcycle = store::motorcycles::insert(conn, &user.id, &input)?;
    audit::record(conn, &user.id, "MOTORCYCLE_CREATE", "MOTORCYCLE", Some(motorcycle.id.to_string()), &input);
    Ok(motorcycle)
  })
}

pub fn list_motorcycles(state: &AppState) -> Result<Vec<Motorcycle>, AppError> {
  with_user(state, |conn, user| store::motorcycles::list(conn, &user.id))
}

pub fn delete_motorcycle(state: &AppState, id: i64) -> Result<usize, AppError> {
  mutate(state, |conn, user| {
    let removed = store::motorcycles::delete(conn, &user.id, id)?;
    audit::record(
      conn,
      &user.id,
      "MOTORCYCLE_DELETE",
      "MOTORCYCLE",
      Some(id.to_string()),
      &serde_json::json!({ "spareparts_removed": removed }),
    );
    info!(id, removed, "motorcycle deleted");
    Ok(removed)
  })
}

pub fn create_order(state: &AppState, input: OrderInput) -> Result<Order, AppError> {
  let date = validation::validate_order(&input)?;
  mutate(state, |conn, user| {
    let order = store::orders::insert(conn, &user.id, &input, date)?;
    audit::record(conn, &user.id, "ORDER_CREATE", "ORDER", Some(order.id.to_string()), &input);
    Ok(order)
  })
}

pub fn update_order(state: &AppState, id: i64, input: OrderInput) -> Result<Order, AppError> {
  let date = validation::validate_order(&input)?;
  mutate(state, |conn, user| {
    let order = store::orders::update(conn, &user.id, id, &input, date)?;
    audit::record(conn, &user.id, "ORDER_UPDATE", "ORDER", Some(id.to_string()), &input);
    Ok(order)
  })
}

pub fn delete_order(state: &AppState, id: i64) -> Result<(), AppError> {
  mutate(state, |conn, user| {
    store::orders::delete(conn, &user.id, id)?;
    audit::record(conn, &user.id, "ORDER_DELETE", "ORDER", Some(id.to_string()), &serde_json::json!({}));
    Ok(())
  })
}

fn open_orders_for(conn: &Connection, owner: &str, month: Option<YearMonth>, today: NaiveDate) -> Result<Vec<Order>, AppError> {
  let ledger = store::ledger::list(conn, owner)?;
  let orders = closing::open_orders(store::orders::list(conn, owner)?, &ledger, today);
  Ok(match month {
    Some(month) => orders
      .into_iter()
      .filter(|order| month.contains(order.resolved_date(today)))
      .collect(),
    None => orders,
  })
}

pub fn list_open_orders(state: &AppState, month: Option<YearMonth>) -> Result<Vec<Order>, AppError> {
  let today = today();
  with_user(state, |conn, user| open_orders_for(conn, &user.id, month, today))
}

pub fn list_closed_period_orders(state: &AppState, period_id: i64) -> Result<Vec<Order>, AppError> {
  let today = today();
  with_user(state, |conn, user| {
    let entry = store::ledger::get(conn, &user.id, period_id)?.ok_or_else(|| AppError::not_found("Tutup buku"))?;
    let orders = store::orders::list(conn, &user.id)?;
    Ok(
      closing::orders_in_range(&orders, entry.start_date, entry.end_date, today)
        .into_iter()
        .cloned()
        .collect(),
    )
  })
}

pub fn create_spare_part(state: &AppState, input: SparePartInput) -> Result<SparePart, AppError> {
  let date = validation::validate_spare_part(&input)?;
  mutate(state, |conn, user| {
    ensure_motorcycle(conn, &user.id, input.motorcycle_id)?;
    let part = store::spare_parts::insert(conn, &user.id, &input, date)?;
    audit::record(conn, &user.id, "SPAREPART_CREATE", "SPAREPART", Some(part.id.to_string()), &input);
    Ok(part)
  })
}

pub fn update_spare_part(state: &AppState, id: i64, input: SparePartInput) -> Result<SparePart, AppError> {
  let date = validation::validate_spare_part(&input)?;
  mutate(state, |conn, user| {
    ensure_motorcycle(conn, &user.id, input.motorcycle_id)?;
    let part = store::spare_parts::update(conn, &user.id, id, &input, date)?;
    audit::record(conn, &user.id, "SPAREPART_UPDATE", "SPAREPART", Some(id.to_string()), &input);
    Ok(part)
  })
}

pub fn delete_spare_part(state: &AppState, id: i64) -> Result<(), AppError> {
  mutate(state, |conn, user| {
    store::spare_parts::delete(conn, &user.id, id)?;
    audit::record(conn, &user.id, "SPAREPART_DELETE", "SPAREPART", Some(id.to_string()), &serde_json::json!({}));
    Ok(())
  })
}

pub fn list_spare_parts(state: &AppState, motorcycle_id: Option<i64>) -> Result<Vec<SparePart>, AppError> {
  with_user(state, |conn, user| store::spare_parts::list(conn, &user.id, motorcycle_id))
}

pub fn create_fuel_stop(state: &AppState, input: FuelStopInput) -> Result<FuelStop, AppError> {
  let date = validation::validate_fuel_stop(&input)?;
  mutate(state, |conn, user| {
    if let Some(motorcycle_id) = input.motorcycle_id {
      ensure_motorcycle(conn, &user.id, motorcycle_id)?;
    }
    let stop = store::fuel_stops::insert(conn, &user.id, &input, date)?;
    audit::record(conn, &user.id, "FUEL_CREATE", "FUEL_STOP", Some(stop.id.to_string()), &input);
    Ok(stop)
  })
}

pub fn delete_fuel_stop(state: &AppState, id: i64) -> Result<(), AppError> {
  mutate(state, |conn, user| {
    store::fuel_stops::delete(conn, &user.id, id)?;
    audit::record(conn, &user.id, "FUEL_DELETE", "FUEL_STOP", Some(id.to_string()), &serde_json::json!({}));
    Ok(())
  })
}

pub fn list_fuel_stops(state: &AppState) -> Result<Vec<FuelStop>, AppError> {
  with_user(state, |conn, user| store::fuel_stops::list(conn, &user.id))
}

pub fn record_odometer(state: &AppState, input: OdometerInput) -> Result<OdometerReading, AppError> {
  let date = validation::validate_odometer(&input)?;
  mutate(state, |conn, user| {
    ensure_motorcycle(conn, &user.id, input.motorcycle_id)?;
    let reading = store::odometer::record(conn, &user.id, input.motorcycle_id, date, input.odometer_km)?;
    audit::record(conn, &user.id, "KM_RECORD", "ODOMETER", Some(reading.id.to_string()), &input);
    Ok(reading)
  })
}

pub fn delete_odometer(state: &AppState, id: i64) -> Result<(), AppError> {
  mutate(state, |conn, user| {
    store::odometer::delete(conn, &user.id, id)?;
    audit::record(conn, &user.id, "KM_DELETE", "ODOMETER", Some(id.to_string()), &serde_json::json!({}));
    Ok(())
  })
}

pub fn list_odometer(state: &AppState, motorcycle_id: Option<i64>) -> Result<Vec<OdometerReading>, AppError> {
  with_user(state, |conn, user| store::odometer::list(conn, &user.id, motorcycle_id))
}

pub fn close_book(state: &AppState, year: i32, month: u32, sub_period: SubPeriod) -> Result<CloseOutcome, AppError> {
  let month = YearMonth::new(year, month)?;
  let bounds = closing_bounds(month, sub_period);
  let today = today();

  let outcome = mutate(state, |conn, user| {
    if let Some(entry) = store::ledger::find(conn, &user.id, month, sub_period)? {
      return Ok(CloseOutcome::AlreadyClosed { entry });
    }

    let orders = store::orders::list(conn, &user.id)?;
    let selected = closing::orders_in_range(&orders, bounds.0, bounds.1, today);
    let Some(summary) = closing::summarize(&selected) else {
      return Ok(CloseOutcome::NothingToClose {
        start_date: bounds.0,
        end_date: bounds.1,
      });
    };

    let entry = store::ledger::append(conn, &user.id, month, sub_period, bounds, &summary)?;
    audit::record(conn, &user.id, "CLOSE_BOOK", "CLOSED_PERIOD", Some(entry.id.to_string()), &entry);
    Ok(CloseOutcome::Closed { entry })
  })?;

  match &outcome {
    CloseOutcome::Closed { entry } => {
      info!(month = %month, sub = %sub_period, orders = entry.total_orders, "book closed")
    }
    CloseOutcome::NothingToClose { .. } => info!(month = %month, sub = %sub_period, "nothing to close"),
    CloseOutcome::AlreadyClosed { .. } => info!(month = %month, sub = %sub_period, "period already closed"),
  }
  Ok(outcome)
}

pub fn list_closed_periods(state: &AppState) -> Result<Vec<ClosedPeriod>, AppError> {
  with_user(state, |conn, user| store::ledger::list(conn, &user.id))
}

pub fn dashboard(state: &AppState, request: AggregationRequest) -> Result<DashboardReport, AppError> {
  let today = today();
  with_user(state, |conn, user| {
    state.reports.get_or_build(&user.id, &request, today, || {
      let snapshot = reports::load_snapshot(conn, &user.id)?;
      debug!(
        orders = snapshot.orders.len(),
        fuel_stops = snapshot.fuel_stops.len(),
        "dashboard recomputed"
      );
      Ok(reports::build_dashboard(&snapshot, &request, today))
    })
  })
}

pub fn text_report(state: &AppState, month: YearMonth, filter: PeriodFilter, with_amounts: bool) -> Result<String, AppError> {
  let today = today();
  with_user(state, |conn, user| {
    let currency = settings::get_settings(conn)?.currency_prefix;
    let orders = open_orders_for(conn, &user.id, Some(month), today)?;
    Ok(text::render_orders(&orders, month, filter, with_amounts, &currency, today))
  })
}

pub fn service_reminders(state: &AppState, motorcycle_id: i64) -> Result<Vec<ServiceReminder>, AppError> {
  let today = today();
  with_user(state, |conn, user| {
    ensure_motorcycle(conn, &user.id, motorcycle_id)?;
    let readings = store::odometer::list(conn, &user.id, Some(motorcycle_id))?;
    let Some(current_km) = service::current_odometer(&readings, today) else {
      return Ok(Vec::new());
    };
    let warning_km = settings::get_settings(conn)?.service_warning_km;
    let parts = store::spare_parts::list(conn, &user.id, Some(motorcycle_id))?;
    Ok(service::reminders(&parts, current_km, warning_km))
  })
}

fn export_path(app_dir: &Path, output: Option<PathBuf>, file_name: String) -> Result<PathBuf, AppError> {
  let path = match output {
    Some(path) => path,
    None => app_dir.join("Exports").join(file_name),
  };
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  Ok(path)
}

pub fn export_orders_csv(state: &AppState, month: Option<YearMonth>, output: Option<PathBuf>) -> Result<PathBuf, AppError> {
  let today = today();
  let suffix = month.map(|m| m.to_string()).unwrap_or_else(|| "semua".to_string());
  let path = export_path(&state.app_dir, output, format!("orderan_{suffix}.csv"))?;
  with_user(state, |conn, user| {
    let orders = open_orders_for(conn, &user.id, month, today)?;
    let count = csv::export_orders_csv(&orders, &path, today)?;
    audit::record(conn, &user.id, "EXPORT_CSV", "EXPORT", None, &path.display().to_string());
    info!(path = %path.display(), count, "orders exported");
    Ok(())
  })?;
  Ok(path)
}

pub fn export_excel(state: &AppState, output: Option<PathBuf>) -> Result<PathBuf, AppError> {
  let today = today();
  let file_name = format!("buku_{}.xlsx", Utc::now().format("%Y%m%d_%H%M"));
  let path = export_path(&state.app_dir, output, file_name)?;
  with_user(state, |conn, user| {
    let currency = settings::get_settings(conn)?.currency_prefix;
    let ledger = store::ledger::list(conn, &user.id)?;
    let orders = open_orders_for(conn, &user.id, None, today)?;
    excel::export_workbook(&ledger, &orders, &path, &currency, today)?;
    audit::record(conn, &user.id, "EXPORT_EXCEL", "EXPORT", None, &path.display().to_string());
    info!(path = %path.display(), "workbook exported");
    Ok(())
  })?;
  Ok(path)
}

pub fn create_backup(state: &AppState, kind: ExportKind, output: Option<PathBuf>) -> Result<PathBuf, AppError> {
  with_user(state, |conn, user| {
    let path = backup::create_backup(conn, &state.app_dir, user, kind, output)?;
    audit::record(conn, &user.id, "BACKUP_CREATE", "BACKUP", None, &path.display().to_string());
    Ok(path)
  })
}

pub fn restore_backup(state: &AppState, path: &Path, mode: RestoreMode) -> Result<BulkResult, AppError> {
  let doc = backup::read_document(path)?;
  if let Some(created) = backup::created_on(&doc) {
    info!(path = %path.display(), %created, "restoring backup");
  }
  mutate(state, |conn, user| {
    let mut report = |progress: RestoreProgress| {
      debug!(kind = progress.kind, done = progress.done, total = progress.total, "restore progress");
    };
    let result = backup::restore(conn, user, &doc, mode, &mut report)?;
    audit::record(
      conn,
      &user.id,
      "BACKUP_RESTORE",
      "BACKUP",
      None,
      &serde_json::json!({
        "path": path.display().to_string(),
        "succeeded": result.succeeded.len(),
        "failed": result.failed.len(),
      }),
    );
    Ok(result)
  })
}

pub fn list_audit_log(state: &AppState, page: i64, page_size: i64) -> Result<Paginated<AuditLogEntry>, AppError> {
  with_user(state, |conn, user| audit::list_audit_log(conn, &user.id, page, page_size))
}
