use chrono::NaiveDate;

use motoring_buchhaltung::commands;
use motoring_buchhaltung::domain::period::{working_days_between, PeriodFilter, SubPeriod, YearMonth};
use motoring_buchhaltung::models::*;
use motoring_buchhaltung::reports::AggregationRequest;
use motoring_buchhaltung::AppState;

fn rider() -> User {
  User {
    id: "rider-1".into(),
    email: "rider@example.com".into(),
  }
}

fn logged_in() -> AppState {
  let state = AppState::in_memory().unwrap();
  commands::login(&state, rider()).unwrap();
  state
}

fn order(date: &str, label: OrderLabel, quantity: f64, unit_rate: f64) -> OrderInput {
  OrderInput {
    quantity,
    unit_rate,
    date: date.into(),
    note: None,
    label: Some(label),
  }
}

fn motorcycle(state: &AppState) -> Motorcycle {
  commands::create_motorcycle(
    state,
    MotorcycleInput {
      name: "Beat".into(),
      model: "Honda Beat".into(),
      year: "2020".into(),
    },
  )
  .unwrap()
}

fn march() -> YearMonth {
  YearMonth::new(2024, 3).unwrap()
}

#[test]
fn closing_first_half_snapshots_labels_and_hides_orders() {
  let state = logged_in();
  commands::create_order(&state, order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0)).unwrap();
  commands::create_order(&state, order("2024-03-03", OrderLabel::Paket, 2.0, 1500.0)).unwrap();
  commands::create_order(&state, order("2024-03-20", OrderLabel::Klik, 1.0, 1000.0)).unwrap();

  let entry = match commands::close_book(&state, 2024, 3, SubPeriod::FirstHalf).unwrap() {
    CloseOutcome::Closed { entry } => entry,
    other => panic!("expected a new ledger entry, got {other:?}"),
  };
  assert_eq!(entry.total_orders, 2);
  assert_eq!(entry.total_qty, 7.0);
  assert_eq!(entry.total_nominal, 8000.0);
  assert_eq!(entry.qty_by_label.get("klik"), Some(&5.0));
  assert_eq!(entry.qty_by_label.get("paket"), Some(&2.0));
  assert_eq!(entry.nominal_by_label.get("klik"), Some(&5000.0));
  assert_eq!(entry.nominal_by_label.get("paket"), Some(&3000.0));

  let open = commands::list_open_orders(&state, Some(march())).unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(open[0].date.as_deref(), Some("2024-03-20"));

  let closed = commands::list_closed_period_orders(&state, entry.id).unwrap();
  assert_eq!(closed.len(), 2);
}

#[test]
fn closing_twice_or_empty_is_not_an_error() {
  let state = logged_in();
  commands::create_order(&state, order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0)).unwrap();

  let empty = commands::close_book(&state, 2024, 4, SubPeriod::FirstHalf).unwrap();
  assert!(matches!(empty, CloseOutcome::NothingToClose { .. }));

  assert!(matches!(
    commands::close_book(&state, 2024, 3, SubPeriod::FirstHalf).unwrap(),
    CloseOutcome::Closed { .. }
  ));
  assert!(matches!(
    commands::close_book(&state, 2024, 3, SubPeriod::FirstHalf).unwrap(),
    CloseOutcome::AlreadyClosed { .. }
  ));
  assert_eq!(commands::list_closed_periods(&state).unwrap().len(), 1);
}

#[test]
fn text_report_skips_closed_orders() {
  let state = logged_in();
  commands::create_order(&state, order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0)).unwrap();
  commands::create_order(&state, order("2024-03-20", OrderLabel::Paket, 2.0, 1500.0)).unwrap();
  commands::close_book(&state, 2024, 3, SubPeriod::FirstHalf).unwrap();

  let report = commands::text_report(&state, march(), PeriodFilter::All, true).unwrap();
  assert!(report.contains("20._2 Rp3.000"));
  assert!(report.contains("Total klik: 0"));
  assert!(report.contains("Total nominal: Rp3.000"));
}

#[test]
fn dashboard_filters_by_motorcycle_and_month() {
  let state = logged_in();
  let bike = motorcycle(&state);
  let other = motorcycle(&state);

  for (date, km) in [("2024-01-01", 1000.0), ("2024-01-05", 1200.0), ("2024-01-03", 900.0)] {
    commands::record_odometer(
      &state,
      OdometerInput {
        motorcycle_id: bike.id,
        date: date.into(),
        odometer_km: km,
      },
    )
    .unwrap();
  }
  for (motorcycle_id, price) in [(Some(bike.id), 10000.0), (Some(bike.id), 12000.0), (Some(other.id), 50000.0), (None, 1.0)] {
    commands::create_fuel_stop(
      &state,
      FuelStopInput {
        motorcycle_id,
        date: "2024-01-04".into(),
        liter_price: price,
        liters: 1.0,
        total: price,
        location: None,
      },
    )
    .unwrap();
  }
  commands::create_order(&state, order("2024-01-04", OrderLabel::Klik, 30.0, 1000.0)).unwrap();

  let report = commands::dashboard(
    &state,
    AggregationRequest {
      motorcycle_id: Some(bike.id),
      month: Some(YearMonth::new(2024, 1).unwrap()),
      period: PeriodFilter::All,
    },
  )
  .unwrap();

  assert_eq!(report.avg_fuel_price, 11000.0);
  assert_eq!(report.total_distance, 300.0);
  assert_eq!(report.total_fuel_stops, 2);
  assert_eq!(report.total_income, 30000.0);
  assert_eq!(report.net_profit, 8000.0);
  assert_eq!(report.working_days_in_period, 23);
}

#[test]
fn empty_dashboard_has_zero_fuel_average() {
  let state = logged_in();
  let report = commands::dashboard(&state, AggregationRequest::default()).unwrap();
  assert_eq!(report.avg_fuel_price, 0.0);
  assert_eq!(report.total_distance, 0.0);
}

#[test]
fn single_day_working_day_counts() {
  let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
  let wednesday = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
  assert_eq!(working_days_between(sunday, sunday), 0);
  assert_eq!(working_days_between(wednesday, wednesday), 1);
}

#[test]
fn backup_round_trip_into_fresh_store() {
  let dir = tempfile::tempdir().unwrap();
  let source = logged_in();
  let bike = motorcycle(&source);
  commands::create_order(&source, order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0)).unwrap();
  commands::create_spare_part(
    &source,
    SparePartInput {
      motorcycle_id: bike.id,
      name: "Oli".into(),
      quantity: 1.0,
      unit_price: 55000.0,
      current_odometer: 1000.0,
      next_service_odometer: 3000.0,
      date: "2024-03-04".into(),
      note: None,
    },
  )
  .unwrap();
  commands::create_fuel_stop(
    &source,
    FuelStopInput {
      motorcycle_id: None,
      date: "2024-03-05".into(),
      liter_price: 10000.0,
      liters: 2.0,
      total: 20000.0,
      location: None,
    },
  )
  .unwrap();
  commands::record_odometer(
    &source,
    OdometerInput {
      motorcycle_id: bike.id,
      date: "2024-03-05".into(),
      odometer_km: 1100.0,
    },
  )
  .unwrap();

  let path = commands::create_backup(&source, ExportKind::Full, Some(dir.path().join("full.json"))).unwrap();

  let target = AppState::open(dir.path().join("target")).unwrap();
  commands::login(&target, rider()).unwrap();
  motorcycle(&target);
  let result = commands::restore_backup(&target, &path, RestoreMode::Atomic).unwrap();
  assert!(result.is_complete());
  assert_eq!(result.succeeded.len(), 5);

  let bikes = commands::list_motorcycles(&target).unwrap();
  assert_eq!(bikes.len(), 2);
  let restored_bike = bikes.iter().max_by_key(|m| m.id).unwrap();
  let parts = commands::list_spare_parts(&target, Some(restored_bike.id)).unwrap();
  assert_eq!(parts.len(), 1);
  assert_eq!(commands::list_fuel_stops(&target).unwrap()[0].location, "Lokasi tidak disebutkan");
  assert_eq!(commands::list_odometer(&target, Some(restored_bike.id)).unwrap().len(), 1);
}

#[test]
fn backup_from_another_rider_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let source = logged_in();
  commands::create_order(&source, order("2024-03-03", OrderLabel::Klik, 1.0, 1000.0)).unwrap();
  let path = commands::create_backup(&source, ExportKind::Orders, Some(dir.path().join("orders.json"))).unwrap();

  let target = AppState::in_memory().unwrap();
  commands::login(
    &target,
    User {
      id: "rider-2".into(),
      email: "other@example.com".into(),
    },
  )
  .unwrap();
  let err = commands::restore_backup(&target, &path, RestoreMode::BestEffort).unwrap_err();
  assert_eq!(err.code, "BACKUP_INVALID");
  assert!(commands::list_open_orders(&target, None).unwrap().is_empty());
}

#[test]
fn records_are_scoped_to_the_session_user() {
  let state = logged_in();
  commands::create_order(&state, order("2024-03-03", OrderLabel::Klik, 1.0, 1000.0)).unwrap();
  commands::logout(&state).unwrap();
  assert_eq!(commands::list_open_orders(&state, None).unwrap_err().code, "NOT_LOGGED_IN");

  commands::login(
    &state,
    User {
      id: "rider-2".into(),
      email: "other@example.com".into(),
    },
  )
  .unwrap();
  assert!(commands::list_open_orders(&state, None).unwrap().is_empty());
}

#[test]
fn writes_leave_an_audit_trail() {
  let state = logged_in();
  let created = commands::create_order(&state, order("2024-03-03", OrderLabel::Klik, 1.0, 1000.0)).unwrap();
  commands::delete_order(&state, created.id).unwrap();

  let page = commands::list_audit_log(&state, 1, 10).unwrap();
  let actions: Vec<&str> = page.items.iter().map(|e| e.action.as_str()).collect();
  assert!(actions.contains(&"ORDER_CREATE"));
  assert!(actions.contains(&"ORDER_DELETE"));
  assert!(actions.contains(&"LOGIN"));
}
