use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{FuelStop, OdometerReading, Order, SparePart};

/// Calendar day of a record: explicit date, then the creation timestamp as a UTC date, then `today`.
/// Values that do not parse are treated as missing.
pub fn resolve_date(explicit: Option<&str>, created_at: Option<&str>, today: NaiveDate) -> NaiveDate {
  explicit
    .and_then(parse_day)
    .or_else(|| created_at.and_then(parse_timestamp))
    .unwrap_or(today)
}

pub fn parse_day(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .or_else(|| parse_timestamp(value))
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }
  if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
    return Some(ts.with_timezone(&Utc).date_naive());
  }
  value
    .get(..10)
    .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub trait Dated {
  fn explicit_date(&self) -> Option<&str>;
  fn created_at(&self) -> Option<&str>;

  fn resolved_date(&self, today: NaiveDate) -> NaiveDate {
    resolve_date(self.explicit_date(), self.created_at(), today)
  }
}

macro_rules! impl_dated {
  ($($ty:ty),*) => {
    $(
      impl Dated for $ty {
        fn explicit_date(&self) -> Option<&str> {
          self.date.as_deref()
        }

        fn created_at(&self) -> Option<&str> {
          self.created_at.as_deref()
        }
      }
    )*
  };
}

impl_dated!(Order, SparePart, FuelStop, OdometerReading);
