use std::path::PathBuf;

use chrono::{Duration, Local};
use rand::seq::SliceRandom;
use rand::Rng;

use motoring_buchhaltung::commands;
use motoring_buchhaltung::db;
use motoring_buchhaltung::logging;
use motoring_buchhaltung::models::*;
use motoring_buchhaltung::AppState;

const LOCATIONS: [&str; 5] = ["SPBU Sudirman", "SPBU Kalimalang", "Pertamini Gang 3", "SPBU Cibubur", "SPBU Pasar Minggu"];
const PARTS: [(&str, f64, f64); 5] = [
  ("Oli mesin", 55000.0, 2000.0),
  ("Kampas rem", 45000.0, 8000.0),
  ("Busi", 25000.0, 6000.0),
  ("Rantai", 180000.0, 15000.0),
  ("Ban belakang", 250000.0, 20000.0),
];
const NOTES: [&str; 4] = ["Antar makanan", "Antar penumpang", "Kirim paket", "Belanja titipan"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
  logging::init(false);
  let days = std::env::args()
    .nth(1)
    .and_then(|value| value.parse::<i64>().ok())
    .unwrap_or(90);

  let app_dir = if let Ok(path) = std::env::var("MOTORING_SEED_DIR") {
    PathBuf::from(path)
  } else {
    db::resolve_app_dir()?
  };

  let state = AppState::open(app_dir.clone())?;
  commands::login(
    &state,
    User {
      id: "demo-user".into(),
      email: "demo@example.com".into(),
    },
  )?;

  let created = seed(&state, days)?;
  println!("Seeded {} catatan demo in {}", created, app_dir.display());
  Ok(())
}

fn seed(state: &AppState, days: i64) -> Result<usize, Box<dyn std::error::Error>> {
  let mut rng = rand::thread_rng();
  let today = Local::now().date_naive();
  let mut created = 0;

  let motorcycle = commands::create_motorcycle(
    state,
    MotorcycleInput {
      name: "Vario Demo".into(),
      model: "Honda Vario 125".into(),
      year: "2021".into(),
    },
  )?;
  created += 1;

  let mut odometer = rng.gen_range(5000.0..15000.0_f64).round();
  for offset in (0..days).rev() {
    let date = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();

    for _ in 0..rng.gen_range(3..12) {
      let label = if rng.gen_bool(0.7) { OrderLabel::Klik } else { OrderLabel::Paket };
      let unit_rate = match label {
        OrderLabel::Klik => 1000.0,
        OrderLabel::Paket => 2500.0,
      };
      commands::create_order(
        state,
        OrderInput {
          quantity: rng.gen_range(1..6) as f64,
          unit_rate,
          date: date.clone(),
          note: NOTES.choose(&mut rng).map(|note| format!("Demo: {note}")),
          label: Some(label),
        },
      )?;
      created += 1;
    }

    odometer += rng.gen_range(40.0..140.0_f64).round();
    commands::record_odometer(
      state,
      OdometerInput {
        motorcycle_id: motorcycle.id,
        date: date.clone(),
        odometer_km: odometer,
      },
    )?;
    created += 1;

    if rng.gen_bool(0.4) {
      let liter_price = [10000.0, 12500.0, 13900.0][rng.gen_range(0..3)];
      let liters = (rng.gen_range(2.0..4.5_f64) * 100.0).round() / 100.0;
      commands::create_fuel_stop(
        state,
        FuelStopInput {
          motorcycle_id: Some(motorcycle.id),
          date: date.clone(),
          liter_price,
          liters,
          total: liter_price * liters,
          location: LOCATIONS.choose(&mut rng).map(|location| location.to_string()),
        },
      )?;
      created += 1;
    }

    if rng.gen_bool(0.05) {
      if let Some((name, price, interval)) = PARTS.choose(&mut rng) {
        let next_service = odometer + interval;
        commands::create_spare_part(
          state,
          SparePartInput {
            motorcycle_id: motorcycle.id,
            name: name.to_string(),
            quantity: 1.0,
            unit_price: *price,
            current_odometer: odometer,
            next_service_odometer: next_service,
            date: date.clone(),
            note: None,
          },
        )?;
        created += 1;
      }
    }
  }

  Ok(created)
}
