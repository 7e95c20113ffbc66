use chrono::NaiveDate;

use crate::domain::dates::Dated;
use crate::models::{OdometerReading, ServiceReminder, ServiceStatus, SparePart};

pub fn current_odometer(readings: &[OdometerReading], today: NaiveDate) -> Option<f64> {
  if let Some(reading) = readings.iter().find(|r| r.resolved_date(today) == today) {
    return Some(reading.odometer_km);
  }
  readings
    .iter()
    .max_by_key(|r| (r.resolved_date(today), r.id))
    .map(|r| r.odometer_km)
}

pub fn status_for(next_service_km: f64, current_km: f64, warning_km: f64) -> ServiceStatus {
  let remaining = next_service_km - current_km;
  if remaining < 0.0 {
    ServiceStatus::Overdue { exceeded_km: -remaining }
  } else if remaining <= warning_km {
    ServiceStatus::DueSoon { remaining_km: remaining }
  } else {
    ServiceStatus::Ok { remaining_km: remaining }
  }
}

pub fn reminders(parts: &[SparePart], current_km: f64, warning_km: f64) -> Vec<ServiceReminder> {
  parts
    .iter()
    .filter(|part| part.next_service_odometer > 0.0)
    .map(|part| ServiceReminder {
      spare_part_id: part.id,
      name: part.name.clone(),
      current_odometer: current_km,
      next_service_odometer: part.next_service_odometer,
      status: status_for(part.next_service_odometer, current_km, warning_km),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reading(id: i64, date: &str, km: f64) -> OdometerReading {
    OdometerReading {
      id,
      owner_id: "u-1".into(),
      motorcycle_id: 1,
      date: Some(date.into()),
      odometer_km: km,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn prefers_reading_from_today() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let readings = vec![reading(1, "2024-03-10", 5000.0), reading(2, "2024-03-12", 5100.0)];
    assert_eq!(current_odometer(&readings, today), Some(5000.0));

    let readings = vec![reading(1, "2024-03-08", 4900.0), reading(2, "2024-03-05", 4800.0)];
    assert_eq!(current_odometer(&readings, today), Some(4900.0));
    assert_eq!(current_odometer(&[], today), None);
  }

  #[test]
  fn status_thresholds() {
    assert_eq!(status_for(10000.0, 10500.0, 1000.0), ServiceStatus::Overdue { exceeded_km: 500.0 });
    assert_eq!(status_for(10000.0, 9000.0, 1000.0), ServiceStatus::DueSoon { remaining_km: 1000.0 });
    assert_eq!(status_for(10000.0, 10000.0, 1000.0), ServiceStatus::DueSoon { remaining_km: 0.0 });
    assert_eq!(status_for(10000.0, 8000.0, 1000.0), ServiceStatus::Ok { remaining_km: 2000.0 });
  }
}
