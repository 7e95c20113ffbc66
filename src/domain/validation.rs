use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{FuelStopInput, MotorcycleInput, OdometerInput, OrderInput, SparePartInput};

pub const TOTAL_TOLERANCE: f64 = 0.01;
pub const DEFAULT_LOCATION: &str = "Lokasi tidak disebutkan";

pub fn parse_date(date: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
    .map_err(|_| AppError::new("INVALID_DATE", "Tanggal harus YYYY-MM-DD"))
}

pub fn ensure_quantity_positive(quantity: f64) -> Result<(), AppError> {
  if !quantity.is_finite() || quantity <= 0.0 {
    Err(AppError::new("INVALID_QTY", "Jumlah harus lebih besar dari 0"))
  } else {
    Ok(())
  }
}

pub fn ensure_rate(rate: f64) -> Result<(), AppError> {
  if !rate.is_finite() || rate < 0.0 {
    Err(AppError::new("INVALID_RATE", "Tarif tidak boleh negatif"))
  } else {
    Ok(())
  }
}

pub fn ensure_required(value: &str, field: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    Err(AppError::new("REQUIRED", format!("{field} wajib diisi")))
  } else {
    Ok(())
  }
}

pub fn validate_order(input: &OrderInput) -> Result<NaiveDate, AppError> {
  ensure_quantity_positive(input.quantity)?;
  ensure_rate(input.unit_rate)?;
  parse_date(&input.date)
}

pub fn ensure_unit_price(price: f64) -> Result<(), AppError> {
  if !price.is_finite() || price < 0.0 {
    Err(AppError::new("INVALID_PRICE", "Harga tidak boleh negatif"))
  } else {
    Ok(())
  }
}

pub fn ensure_service_odometers(current: f64, next: f64) -> Result<(), AppError> {
  if !current.is_finite() || current < 0.0 {
    return Err(AppError::new("INVALID_ODOMETER", "KM saat ini tidak boleh negatif"));
  }
  if !next.is_finite() || next < current {
    return Err(AppError::new(
      "INVALID_ODOMETER",
      "KM servis berikutnya harus lebih besar atau sama dengan KM saat ini",
    ));
  }
  Ok(())
}

pub fn ensure_fuel_amounts(liter_price: f64, liters: f64, total: f64) -> Result<(), AppError> {
  if !liter_price.is_finite() || liter_price <= 0.0 {
    return Err(AppError::new("INVALID_PRICE", "Harga per liter harus lebih besar dari 0"));
  }
  if !liters.is_finite() || liters <= 0.0 {
    return Err(AppError::new("INVALID_QTY", "Jumlah liter harus lebih besar dari 0"));
  }
  if !total.is_finite() || total <= 0.0 {
    return Err(AppError::new("INVALID_TOTAL", "Total harus lebih besar dari 0"));
  }
  if (total - liter_price * liters).abs() > TOTAL_TOLERANCE {
    return Err(AppError::new("INVALID_TOTAL", "Total tidak sesuai dengan harga x liter"));
  }
  Ok(())
}

pub fn ensure_odometer(km: f64) -> Result<(), AppError> {
  if !km.is_finite() || km < 0.0 {
    Err(AppError::new("INVALID_ODOMETER", "KM tidak boleh negatif"))
  } else {
    Ok(())
  }
}

pub fn validate_spare_part(input: &SparePartInput) -> Result<NaiveDate, AppError> {
  ensure_required(&input.name, "Nama sparepart")?;
  ensure_quantity_positive(input.quantity)?;
  ensure_unit_price(input.unit_price)?;
  ensure_service_odometers(input.current_odometer, input.next_service_odometer)?;
  parse_date(&input.date)
}

pub fn validate_fuel_stop(input: &FuelStopInput) -> Result<NaiveDate, AppError> {
  ensure_fuel_amounts(input.liter_price, input.liters, input.total)?;
  parse_date(&input.date)
}

pub fn validate_odometer(input: &OdometerInput) -> Result<NaiveDate, AppError> {
  ensure_odometer(input.odometer_km)?;
  parse_date(&input.date)
}

pub fn validate_motorcycle(input: &MotorcycleInput) -> Result<(), AppError> {
  ensure_required(&input.name, "Nama motor")?;
  ensure_required(&input.model, "Model motor")?;
  ensure_required(&input.year, "Tahun motor")
}

pub fn location_or_default(location: Option<&str>) -> String {
  match location.map(str::trim) {
    Some(value) if !value.is_empty() => value.to_string(),
    _ => DEFAULT_LOCATION.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fuel(price: f64, liters: f64, total: f64) -> FuelStopInput {
    FuelStopInput {
      motorcycle_id: None,
      date: "2024-03-03".into(),
      liter_price: price,
      liters,
      total,
      location: None,
    }
  }

  #[test]
  fn fuel_total_must_match_within_tolerance() {
    assert!(validate_fuel_stop(&fuel(10000.0, 1.5, 15000.0)).is_ok());
    assert!(validate_fuel_stop(&fuel(10000.0, 1.5, 15000.005)).is_ok());
    assert_eq!(validate_fuel_stop(&fuel(10000.0, 1.5, 15001.0)).unwrap_err().code, "INVALID_TOTAL");
    assert_eq!(validate_fuel_stop(&fuel(0.0, 1.5, 1.0)).unwrap_err().code, "INVALID_PRICE");
    assert_eq!(validate_fuel_stop(&fuel(10000.0, 0.0, 1.0)).unwrap_err().code, "INVALID_QTY");
  }

  #[test]
  fn spare_part_next_service_not_below_current() {
    let input = SparePartInput {
      motorcycle_id: 1,
      name: "Oli".into(),
      quantity: 1.0,
      unit_price: 50000.0,
      current_odometer: 12000.0,
      next_service_odometer: 11000.0,
      date: "2024-03-03".into(),
      note: None,
    };
    assert_eq!(validate_spare_part(&input).unwrap_err().code, "INVALID_ODOMETER");
  }

  #[test]
  fn order_requires_positive_quantity_and_date() {
    let mut input = OrderInput {
      quantity: 0.0,
      unit_rate: 1000.0,
      date: "2024-03-03".into(),
      note: None,
      label: None,
    };
    assert_eq!(validate_order(&input).unwrap_err().code, "INVALID_QTY");
    input.quantity = 2.0;
    input.date = "03/03/2024".into();
    assert_eq!(validate_order(&input).unwrap_err().code, "INVALID_DATE");
    input.date = "2024-03-03".into();
    assert!(validate_order(&input).is_ok());
  }

  #[test]
  fn blank_location_gets_default() {
    assert_eq!(location_or_default(Some("  ")), DEFAULT_LOCATION);
    assert_eq!(location_or_default(Some("SPBU Pertamina")), "SPBU Pertamina");
  }
}
